use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};

use crate::config::Config;
use crate::record::{Record, RecordReader, RecordWriter};

/// Reusable scratch space for sorting chunks in memory.
///
/// Allocated once with the largest row count of any chunk and cleared after every chunk, so
/// sorting chunk after chunk does not reallocate.
pub(crate) struct SortBuffer {
    records: Vec<Record>,
}

impl SortBuffer {
    pub(crate) fn with_capacity(rows: usize) -> SortBuffer {
        SortBuffer {
            records: Vec::with_capacity(rows),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.records.capacity()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sort the chunk at `source` into `destination` and delete `source`.
    ///
    /// Every line is parsed before `destination` is created, so a malformed line leaves no output
    /// behind and keeps `source` for inspection. The buffer is cleared on every exit path.
    pub(crate) fn sort_chunk(&mut self, source: &Path, destination: &Path, config: &Config) -> Result<usize, anyhow::Error> {
        debug_assert!(self.is_empty());
        let result = self.load(source, config)
            .and_then(|_| {
                self.records.sort_unstable();
                self.write(destination, config)
            });
        self.records.clear();
        let rows = result?;

        fs::remove_file(source)
            .with_context(|| anyhow!("Remove {}", source.display()))?;
        log::debug!("Sorted {} into {}, rows: {}", source.display(), destination.display(), rows);
        Ok(rows)
    }

    fn load(&mut self, source: &Path, config: &Config) -> Result<(), anyhow::Error> {
        let capacity = self.records.capacity();
        let mut reader = RecordReader::open(source, config.reader_buffer_size(), config.endl()?)?;
        while let Some(record) = reader.read_record()
            .with_context(|| format!("file: {}", source.display()))? {
            self.records.push(record);
        }
        if self.records.len() > capacity {
            log::warn!("Chunk {} has {} rows, sort buffer capacity was {}", source.display(), self.records.len(), capacity);
        }
        Ok(())
    }

    fn write(&self, destination: &Path, config: &Config) -> Result<usize, anyhow::Error> {
        let mut writer = RecordWriter::create(destination, config.writer_buffer_size(), config.endl()?)?;
        for record in &self.records {
            writer.write(record)?;
        }
        writer.finish()
            .with_context(|| anyhow!("path: {}", destination.display()))
    }
}
