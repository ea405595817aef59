//! This crate implements an external sort for text files of numbered records, too large to be
//! sorted in memory.
//!
//! Every line of the file is a record of the form `<number>. <text>`, for example `415. Apple`.
//! Records are ordered by text, compared byte by byte, and records with equal text by number.
//!
//! The file is split into line aligned chunks of a configured size, each chunk is sorted in memory
//! using a single reusable buffer, and the sorted runs are merged with a k-way merge that never
//! opens more than a configured number of runs at once, in as many passes as needed. Memory use is
//! bounded by the chunk size and open files by the merge fan-in.
//!
//! # Examples
//! ```no_run
//! use record_file_sort::config::Config;
//! use record_file_sort::sort::Sort;
//!
//! fn sort_records() -> Result<(), anyhow::Error> {
//!     // the source is <OperativeDictionary>/<TestDataFileName>, all intermediate files and the
//!     // result are written to the same directory
//!     let config = Config::default()
//!         .with_operative_dictionary("./target/operative".into())
//!         .with_test_data_file_name("unsorted.dat")
//!         // read the source in chunks of at least 10 MB, respecting line boundaries
//!         .with_chunk_file_size(10_000_000)
//!         // merge at most 8 sorted runs at a time
//!         .with_files_merge_chunk_size(8);
//!
//!     let sort = Sort::new(config);
//!     let sorted = sort.sort()?;
//!     println!("sorted into {}", sorted.display());
//!     Ok(())
//! }
//! ```
//!

pub(crate) mod chunk_sorter;
pub(crate) mod chunk_splitter;
pub(crate) mod merger;
pub(crate) mod run_file;
pub(crate) mod unmerged_run;

pub mod config;
pub mod error;
pub mod generator;
pub mod progress;
pub mod record;
pub mod sort;
