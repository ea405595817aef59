use std::fs::File;
use std::io::{BufRead, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::run_file::RunFile;

/// An unsorted chunk file written by the [ChunkSplitter].
#[derive(Debug)]
pub(crate) struct Chunk {
    file: RunFile,
    rows: usize,
    length: u64,
}

impl Chunk {
    pub(crate) fn file(&self) -> &RunFile {
        &self.file
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn length(&self) -> u64 {
        self.length
    }
}

/// Splits a source stream into line aligned chunk files `1.unsorted`, `2.unsorted`, ...
///
/// Each chunk takes `chunk_size` bytes and is then extended up to and including the next line
/// break, so every chunk but the last is at least `chunk_size` bytes long and no line is split.
/// The concatenation of the chunks in sequence order is the source.
pub(crate) struct ChunkSplitter<R: BufRead> {
    reader: R,
    dir: PathBuf,
    chunk_size: u64,
    endl: u8,
    writer_buffer_size: usize,
    sequence: usize,
    max_rows: usize,
    buffer: Vec<u8>,
    extension: Vec<u8>,
    done: bool,
}

impl<R: BufRead> ChunkSplitter<R> {
    pub(crate) fn new(reader: R, dir: &Path, chunk_size: u64, endl: u8, writer_buffer_size: usize) -> ChunkSplitter<R> {
        ChunkSplitter {
            reader,
            dir: dir.to_path_buf(),
            chunk_size,
            endl,
            writer_buffer_size,
            sequence: 0,
            max_rows: 0,
            buffer: Vec::new(),
            extension: Vec::new(),
            done: false,
        }
    }

    /// The largest number of lines seen in a single chunk so far.
    pub(crate) fn max_rows(&self) -> usize {
        self.max_rows
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>, anyhow::Error> {
        self.buffer.clear();
        self.extension.clear();
        (&mut self.reader).take(self.chunk_size).read_to_end(&mut self.buffer)?;
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let mut rows = memchr::memchr_iter(self.endl, &self.buffer).count();
        if self.buffer.last() != Some(&self.endl) {
            // the boundary fell inside a line, extend forward to the next line break or the end
            self.reader.read_until(self.endl, &mut self.extension)?;
            rows += 1;
        }

        self.sequence += 1;
        let file = RunFile::unsorted(&self.dir, self.sequence);
        let output = File::create(file.path())
            .with_context(|| anyhow!("path: {}", file.path().display()))?;
        let mut writer = BufWriter::with_capacity(self.writer_buffer_size, output);
        writer.write_all(&self.buffer)?;
        writer.write_all(&self.extension)?;
        writer.flush()
            .with_context(|| anyhow!("path: {}", file.path().display()))?;

        self.max_rows = self.max_rows.max(rows);
        let length = (self.buffer.len() + self.extension.len()) as u64;
        Ok(
            Some(
                Chunk {
                    file,
                    rows,
                    length,
                }
            )
        )
    }
}

impl<R: BufRead> Iterator for ChunkSplitter<R> {
    type Item = Result<Chunk, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.read_chunk();
        match result {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.context(format!("splitting chunk {}", self.sequence + 1))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::BufReader;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;
    use tempfile::TempDir;

    use crate::chunk_splitter::{Chunk, ChunkSplitter};

    #[fixture]
    fn tmp_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn split(source: &[u8], dir: &TempDir, chunk_size: u64, endl: u8) -> Result<(Vec<Chunk>, usize), anyhow::Error> {
        let mut splitter = ChunkSplitter::new(BufReader::new(source), dir.path(), chunk_size, endl, 16);
        let chunks = splitter.by_ref().collect::<Result<Vec<Chunk>, anyhow::Error>>()?;
        Ok((chunks, splitter.max_rows()))
    }

    fn random_source(rng: &mut StdRng, lines: usize) -> Vec<u8> {
        let mut source = Vec::new();
        for _ in 0..lines {
            let len = rng.gen_range(0..30);
            let text: String = (0..len).map(|_| rng.gen_range('a'..='z')).collect();
            source.extend_from_slice(format!("{}. {}\n", rng.gen_range(-1000..1000), text).as_bytes());
        }
        source
    }

    #[rstest]
    fn test_empty_source(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let (chunks, max_rows) = split(b"", &tmp_dir, 20_000, b'\n')?;
        assert_eq!(chunks.len(), 0);
        assert_eq!(max_rows, 0);
        assert_eq!(fs::read_dir(tmp_dir.path())?.count(), 0);
        Ok(())
    }

    #[rstest]
    #[case(1000)]
    #[case(30)]
    fn test_chunk_greater_or_equal_to_source(tmp_dir: TempDir, #[case] chunk_size: u64) -> Result<(), anyhow::Error> {
        let source = b"3. bob\n1. amy\n2. amy\n12. x\n";
        assert!(source.len() as u64 <= chunk_size);
        let (chunks, max_rows) = split(source, &tmp_dir, chunk_size, b'\n')?;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].rows(), 4);
        assert_eq!(chunks[0].length(), source.len() as u64);
        assert_eq!(max_rows, 4);
        assert_eq!(fs::read(chunks[0].file().path())?, source);
        assert_eq!(chunks[0].file().path(), &tmp_dir.path().join("1.unsorted"));
        Ok(())
    }

    #[rstest]
    fn test_boundary_extended_forward(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let source = b"1. abc\n2. defgh\n3. i\n";
        let (chunks, max_rows) = split(source, &tmp_dir, 9, b'\n')?;
        assert_eq!(chunks.len(), 2);
        assert_eq!(fs::read(chunks[0].file().path())?, b"1. abc\n2. defgh\n");
        assert_eq!(fs::read(chunks[1].file().path())?, b"3. i\n");
        assert_eq!(chunks[0].rows(), 2);
        assert_eq!(chunks[1].rows(), 1);
        assert_eq!(max_rows, 2);
        Ok(())
    }

    #[rstest]
    fn test_boundary_on_line_break(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let source = b"1. abc\n2. def\n";
        let (chunks, _) = split(source, &tmp_dir, 7, b'\n')?;
        assert_eq!(chunks.len(), 2);
        assert_eq!(fs::read(chunks[0].file().path())?, b"1. abc\n");
        assert_eq!(fs::read(chunks[1].file().path())?, b"2. def\n");
        Ok(())
    }

    #[rstest]
    fn test_last_line_without_line_break(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let source = b"1. abc\n2. def\n3. g";
        let (chunks, max_rows) = split(source, &tmp_dir, 10, b'\n')?;
        assert_eq!(chunks.len(), 2);
        assert_eq!(fs::read(chunks[1].file().path())?, b"3. g");
        assert_eq!(chunks[1].rows(), 1);
        assert_eq!(max_rows, 2);
        Ok(())
    }

    #[rstest]
    fn test_custom_endl(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let source = b"1. a\nb;2. c;";
        let (chunks, max_rows) = split(source, &tmp_dir, 3, b';')?;
        assert_eq!(chunks.len(), 2);
        assert_eq!(fs::read(chunks[0].file().path())?, b"1. a\nb;");
        assert_eq!(max_rows, 1);
        Ok(())
    }

    #[rstest]
    #[case(1)]
    #[case(17)]
    #[case(100)]
    #[case(4096)]
    fn test_no_bytes_lost(tmp_dir: TempDir, #[case] chunk_size: u64) -> Result<(), anyhow::Error> {
        let mut rng = StdRng::seed_from_u64(chunk_size);
        let source = random_source(&mut rng, 500);
        let (chunks, max_rows) = split(&source, &tmp_dir, chunk_size, b'\n')?;

        let mut concatenated = Vec::new();
        let mut total_rows = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            let content = fs::read(chunk.file().path())?;
            assert_eq!(chunk.file().sequence(), i + 1);
            assert_eq!(chunk.length(), content.len() as u64);
            assert_eq!(content.last(), Some(&b'\n'));
            if i + 1 < chunks.len() {
                assert!(content.len() as u64 >= chunk_size);
            }
            assert!(chunk.rows() <= max_rows);
            total_rows += chunk.rows();
            concatenated.extend_from_slice(&content);
        }
        assert_eq!(concatenated, source);
        assert_eq!(total_rows, 500);
        Ok(())
    }
}
