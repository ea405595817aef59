use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Write};

use anyhow::Context;

use crate::config::Config;
use crate::record::{Record, RecordReader, RecordWriter};
use crate::run_file::RunFile;

/// A sorted run being merged, with its next record buffered as `head`.
///
/// Runs order by head record, then by run sequence, so equal records are taken from runs in
/// sequence order.
pub(crate) struct UnmergedRun {
    file: RunFile,
    reader: RecordReader<BufReader<File>>,
    head: Record,
}

impl UnmergedRun {
    /// Open the run and buffer its first record. An empty run yields `None`.
    pub(crate) fn open(file: RunFile, config: &Config) -> Result<Option<UnmergedRun>, anyhow::Error> {
        let mut reader = RecordReader::open(file.path(), config.reader_buffer_size(), config.endl()?)?;
        let head = reader.read_record()
            .with_context(|| format!("file: {}", file.path().display()))?;
        Ok(
            head.map(|head|
                UnmergedRun {
                    file,
                    reader,
                    head,
                }
            )
        )
    }

    /// Write the head record and buffer the next one. Returns false when the run is exhausted.
    pub(crate) fn write_head<W: Write>(&mut self, writer: &mut RecordWriter<W>) -> Result<bool, anyhow::Error> {
        writer.write(&self.head)?;
        match self.reader.read_record()
            .with_context(|| format!("file: {}", self.file.path().display()))? {
            Some(record) => {
                self.head = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn head(&self) -> &Record {
        &self.head
    }

    pub(crate) fn file(&self) -> &RunFile {
        &self.file
    }
}

impl Eq for UnmergedRun {}

impl PartialEq<Self> for UnmergedRun {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for UnmergedRun {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnmergedRun {
    fn cmp(&self, other: &Self) -> Ordering {
        self.head().cmp(other.head())
            .then_with(|| self.file().cmp(other.file()))
    }
}
