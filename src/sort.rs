use std::cmp::{max, min};
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use rlimit::{getrlimit, Resource, setrlimit};

use crate::chunk_sorter::SortBuffer;
use crate::chunk_splitter::{Chunk, ChunkSplitter};
use crate::config::Config;
use crate::generator::{DataFileGenerator, Generate};
use crate::merger::merge_runs;
use crate::progress::{NoProgress, Progress};
use crate::record::{Record, RecordReader, RecordWriter};
use crate::run_file::{clear_intermediate, RunFile};

/// Sort a data file of `<number>. <text>` records
///
/// The source `TestDataFileName` in `OperativeDictionary` is split into line aligned chunks of
/// `ChunkFileSize` bytes, every chunk is sorted in memory and the sorted runs are merged
/// `FilesMergeChunkSize` at a time into `SortedFileName`.
///
/// # Examples
/// ```no_run
/// use record_file_sort::config::Config;
/// use record_file_sort::progress::LogProgress;
/// use record_file_sort::sort::Sort;
///
/// fn sort_records() -> Result<(), anyhow::Error> {
///     let config = Config::default()
///         .with_operative_dictionary("./target/operative".into())
///         .with_chunk_file_size(50_000_000)
///         .with_files_merge_chunk_size(8);
///     let mut sort = Sort::new(config);
///     sort.with_progress(Box::new(LogProgress::new()));
///     let sorted = sort.sort()?;
///     assert!(sort.check(&sorted)?);
///     Ok(())
/// }
/// ```
pub struct Sort {
    config: Config,
    progress: Box<dyn Progress>,
    generator: Option<Box<dyn Generate>>,
}

impl Sort {
    /// Create a Sort for `config`.
    ///
    /// * progress is not reported
    /// * a missing source is generated with a [DataFileGenerator] built from `config`
    ///
    /// The Sort implementation will increase the file descriptor rlimit to accommodate
    /// `FilesMergeChunkSize` open runs
    pub fn new(config: Config) -> Sort {
        let generator = DataFileGenerator::new(config.clone());
        Sort {
            config,
            progress: Box::new(NoProgress),
            generator: Some(Box::new(generator)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the progress observer.
    pub fn with_progress(&mut self, progress: Box<dyn Progress>) {
        self.progress = progress;
    }

    /// Set the generator used when the source does not exist.
    pub fn with_generator(&mut self, generator: Box<dyn Generate>) {
        self.generator = Some(generator);
    }

    /// Fail instead of generating a missing source.
    pub fn without_generator(&mut self) {
        self.generator = None;
    }

    /// Generate the source with the configured generator.
    pub fn generate(&self) -> Result<PathBuf, anyhow::Error> {
        match &self.generator {
            Some(generator) => generator.generate(),
            None => bail!("No data file generator configured"),
        }
    }

    /// Sort the source into `SortedFileName` and return the path of the result.
    pub fn sort(&self) -> Result<PathBuf, anyhow::Error> {
        self.config.validate()?;
        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let new_soft = min(max((self.config.files_merge_chunk_size() + 64) as u64, current_soft), current_hard);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        Self::set_rlimits(new_soft, current_hard)?;
        let result = self.internal_sort();
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        Self::set_rlimits(current_soft, current_hard)?;
        result
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    /// Check that `path` is sorted. Every line must be a valid record.
    pub fn check(&self, path: &Path) -> Result<bool, anyhow::Error> {
        let mut reader = RecordReader::open(path, self.config.reader_buffer_size(), self.config.endl()?)?;
        let mut previous: Option<Record> = None;
        while let Some(current) = reader.read_record()
            .with_context(|| format!("file: {}", path.display()))? {
            if let Some(previous) = &previous {
                if previous > &current {
                    log::info!("{} is not sorted at line {}", path.display(), reader.line_number());
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }

    fn internal_sort(&self) -> Result<PathBuf, anyhow::Error> {
        log::info!("Start sort");
        let dir = self.config.operative_dictionary();
        fs::create_dir_all(dir)
            .with_context(|| anyhow!("path: {}", dir.display()))?;
        let stale = clear_intermediate(dir)?;
        if stale > 0 {
            log::warn!("Removed {} intermediate files left in {}", stale, dir.display());
        }

        let destination = self.config.destination_path();
        if destination.exists() {
            log::info!("Removing previous result {}", destination.display());
            fs::remove_file(&destination)
                .with_context(|| anyhow!("Remove {}", destination.display()))?;
        }

        let source = self.acquire_source()?;
        let (chunks, max_rows) = self.split(&source)?;

        match chunks.len() {
            0 => {
                log::warn!("Source {} is empty", source.display());
                RecordWriter::create(&destination, self.config.writer_buffer_size(), self.config.endl()?)?
                    .finish()?;
            }
            1 => {
                log::info!("Single chunk, sorting directly into {}", destination.display());
                SortBuffer::with_capacity(max_rows)
                    .sort_chunk(chunks[0].file().path(), &destination, &self.config)?;
            }
            _ => {
                self.sort_and_merge(&chunks, max_rows, &destination)?;
            }
        }

        log::info!("Finish sort, result: {}", destination.display());
        Ok(destination)
    }

    fn acquire_source(&self) -> Result<PathBuf, anyhow::Error> {
        let source = self.config.source_path();
        if !source.exists() {
            match &self.generator {
                Some(generator) => {
                    log::warn!("No file to be sorted at {}, generating one", source.display());
                    generator.generate()?;
                }
                None => bail!("Source file {} does not exist", source.display()),
            }
        }
        Ok(source)
    }

    fn split(&self, source: &Path) -> Result<(Vec<Chunk>, usize), anyhow::Error> {
        let file = File::open(source)
            .with_context(|| anyhow!("path: {}", source.display()))?;
        let length = file.metadata()?.len();
        let chunk_size = self.config.chunk_file_size();
        log::info!("Splitting {} ({} bytes) into chunks of {} bytes", source.display(), length, chunk_size);

        self.progress.start(length.div_ceil(chunk_size) as usize, "Splitting source into chunks");
        let mut splitter = ChunkSplitter::new(
            BufReader::with_capacity(self.config.reader_buffer_size(), file),
            self.config.operative_dictionary(),
            chunk_size,
            self.config.endl()?,
            self.config.writer_buffer_size(),
        );
        let mut chunks = Vec::new();
        for chunk in splitter.by_ref() {
            let chunk = chunk?;
            log::debug!("Chunk {}, rows: {}, length: {} bytes", chunk.file().sequence(), chunk.rows(), chunk.length());
            chunks.push(chunk);
            self.progress.tick();
        }
        self.progress.finish();

        let max_rows = splitter.max_rows();
        log::info!("Split into {} chunks, max rows in a chunk: {}", chunks.len(), max_rows);
        Ok((chunks, max_rows))
    }

    fn sort_and_merge(&self, chunks: &[Chunk], max_rows: usize, destination: &Path) -> Result<(), anyhow::Error> {
        log::info!("Sorting {} chunks", chunks.len());
        self.progress.start(chunks.len(), "Sorting chunks");
        let mut buffer = SortBuffer::with_capacity(max_rows);
        log::debug!("Sort buffer capacity: {} records", buffer.capacity());
        let mut runs: Vec<RunFile> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let run = chunk.file().to_sorted();
            buffer.sort_chunk(chunk.file().path(), run.path(), &self.config)?;
            runs.push(run);
            self.progress.tick();
        }
        self.progress.finish();
        drop(buffer);

        merge_runs(runs, destination, &self.config, self.progress.as_ref())
    }
}
