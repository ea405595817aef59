use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};

use crate::run_file::is_intermediate;

/// Settings for generating and sorting a data file.
///
/// Field names follow the settings file, for example:
/// ```json
/// {
///   "Settings": {
///     "OperativeDictionary": "./target/operative",
///     "TestDataFileName": "unsorted.dat",
///     "ChunkFileSize": 100000000,
///     "FilesMergeChunkSize": 16
///   }
/// }
/// ```
/// Every option is optional and falls back to [Config::default].
///
/// # Examples
/// ```
/// use record_file_sort::config::Config;
///
/// let config = Config::default()
///     .with_operative_dictionary("./target/operative".into())
///     .with_chunk_file_size(10_000_000)
///     .with_files_merge_chunk_size(8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    operative_dictionary: PathBuf,
    test_data_file_name: String,
    sorted_file_name: String,
    test_file_rows_generation_count: usize,
    chunk_file_size: u64,
    files_merge_chunk_size: usize,
    reader_buffer_size: usize,
    writer_buffer_size: usize,
    new_line_sign: char,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SettingsFile {
    settings: Config,
}

impl Default for Config {
    /// * working directory is `./target/operative`
    /// * source is `unsorted.dat`, result is `sorted.dat`
    /// * chunks of 100 MB, merged 16 at a time
    /// * 64 KiB read and write buffers
    /// * line break is `'\n'`
    fn default() -> Self {
        Config {
            operative_dictionary: PathBuf::from("./target/operative"),
            test_data_file_name: "unsorted.dat".to_string(),
            sorted_file_name: "sorted.dat".to_string(),
            test_file_rows_generation_count: 1_000_000,
            chunk_file_size: 100_000_000,
            files_merge_chunk_size: 16,
            reader_buffer_size: 65_536,
            writer_buffer_size: 65_536,
            new_line_sign: '\n',
        }
    }
}

impl Config {
    /// Load settings from a JSON file. Options may be at the top level or inside a `Settings`
    /// object.
    pub fn from_file(path: &Path) -> Result<Config, anyhow::Error> {
        let content = fs::read_to_string(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| anyhow!("path: {}", path.display()))
    }

    /// Parse settings from a JSON string. Options may be at the top level or inside a `Settings`
    /// object.
    pub fn from_json(content: &str) -> Result<Config, anyhow::Error> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let config = if value.get("Settings").is_some() {
            serde_json::from_value::<SettingsFile>(value)?.settings
        } else {
            serde_json::from_value::<Config>(value)?
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.chunk_file_size == 0 {
            bail!("ChunkFileSize must be greater than 0");
        }
        if self.files_merge_chunk_size < 2 {
            bail!("FilesMergeChunkSize must be at least 2, got {}", self.files_merge_chunk_size);
        }
        if self.reader_buffer_size == 0 || self.writer_buffer_size == 0 {
            bail!("ReaderBufferSize and WriterBufferSize must be greater than 0");
        }
        self.endl()?;
        if self.test_data_file_name.is_empty() || self.sorted_file_name.is_empty() {
            bail!("TestDataFileName and SortedFileName must not be empty");
        }
        for name in [&self.test_data_file_name, &self.sorted_file_name] {
            if is_intermediate(name)? {
                bail!("{} is reserved for intermediate chunk and run files", name);
            }
        }
        if self.test_data_file_name == self.sorted_file_name {
            bail!("TestDataFileName and SortedFileName must differ, both are {}", self.sorted_file_name);
        }
        Ok(())
    }

    pub fn operative_dictionary(&self) -> &PathBuf {
        &self.operative_dictionary
    }

    pub fn test_data_file_name(&self) -> &str {
        &self.test_data_file_name
    }

    pub fn sorted_file_name(&self) -> &str {
        &self.sorted_file_name
    }

    /// Full path of the file to be sorted.
    pub fn source_path(&self) -> PathBuf {
        self.operative_dictionary.join(&self.test_data_file_name)
    }

    /// Full path of the sort result.
    pub fn destination_path(&self) -> PathBuf {
        self.operative_dictionary.join(&self.sorted_file_name)
    }

    pub fn test_file_rows_generation_count(&self) -> usize {
        self.test_file_rows_generation_count
    }

    pub fn chunk_file_size(&self) -> u64 {
        self.chunk_file_size
    }

    pub fn files_merge_chunk_size(&self) -> usize {
        self.files_merge_chunk_size
    }

    pub fn reader_buffer_size(&self) -> usize {
        self.reader_buffer_size
    }

    pub fn writer_buffer_size(&self) -> usize {
        self.writer_buffer_size
    }

    pub fn new_line_sign(&self) -> char {
        self.new_line_sign
    }

    /// The line break as a byte. Fails for a `NewLineSign` that does not fit in one byte.
    pub(crate) fn endl(&self) -> Result<u8, anyhow::Error> {
        u8::try_from(self.new_line_sign)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| anyhow!("NewLineSign must be a single byte character, got {:?}", self.new_line_sign))
    }

    /// Set the directory for the source, the intermediate files and the result.
    pub fn with_operative_dictionary(mut self, operative_dictionary: PathBuf) -> Config {
        self.operative_dictionary = operative_dictionary;
        self
    }

    pub fn with_test_data_file_name(mut self, test_data_file_name: &str) -> Config {
        self.test_data_file_name = test_data_file_name.to_string();
        self
    }

    pub fn with_sorted_file_name(mut self, sorted_file_name: &str) -> Config {
        self.sorted_file_name = sorted_file_name.to_string();
        self
    }

    pub fn with_test_file_rows_generation_count(mut self, rows: usize) -> Config {
        self.test_file_rows_generation_count = rows;
        self
    }

    /// The source will be split in chunks of at least `chunk_file_size` bytes respecting line
    /// boundaries.
    pub fn with_chunk_file_size(mut self, chunk_file_size: u64) -> Config {
        self.chunk_file_size = chunk_file_size;
        self
    }

    /// Set the maximal number of runs merged, and files open, at once.
    pub fn with_files_merge_chunk_size(mut self, files_merge_chunk_size: usize) -> Config {
        self.files_merge_chunk_size = files_merge_chunk_size;
        self
    }

    pub fn with_reader_buffer_size(mut self, reader_buffer_size: usize) -> Config {
        self.reader_buffer_size = reader_buffer_size;
        self
    }

    pub fn with_writer_buffer_size(mut self, writer_buffer_size: usize) -> Config {
        self.writer_buffer_size = writer_buffer_size;
        self
    }

    /// Set line ending char - not supporting CRLF
    pub fn with_new_line_sign(mut self, new_line_sign: char) -> Config {
        self.new_line_sign = new_line_sign;
        self
    }
}
