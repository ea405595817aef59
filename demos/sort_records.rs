use std::path::PathBuf;

use anyhow::{anyhow, bail, Error};
use simple_logger::SimpleLogger;

use record_file_sort::config::Config;
use record_file_sort::generator::{DataFileGenerator, Generate};
use record_file_sort::progress::LogProgress;
use record_file_sort::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn generate(config: &Config) -> Result<PathBuf, Error> {
    DataFileGenerator::new(config.clone()).with_seed(1000).generate()
}

fn sort_in_one_chunk(config: &Config) -> Result<PathBuf, Error> {
    let sort = Sort::new(config.clone().with_sorted_file_name("single.dat"));
    sort.sort()
}

fn sort_in_many_passes(config: &Config) -> Result<PathBuf, Error> {
    // 100 KB chunks merged two at a time
    let mut sort = Sort::new(
        config.clone()
            .with_sorted_file_name("multi-pass.dat")
            .with_chunk_file_size(100_000)
            .with_files_merge_chunk_size(2)
    );
    sort.with_progress(Box::new(LogProgress::new()));
    sort.sort()
}

// cargo run -r --example sort_records
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().init().map_err(|e| anyhow!("{e}"))?;
    let config = Config::default()
        .with_operative_dictionary(PathBuf::from("./target/demo"))
        .with_test_file_rows_generation_count(100_000);

    generate(&config)?;
    let single = sort_in_one_chunk(&config)?;
    let multi_pass = sort_in_many_passes(&config)?;

    let sort = Sort::new(config);
    for path in [&single, &multi_pass] {
        if !sort.check(path)? {
            bail!("{} is not sorted", path.display());
        }
    }
    if std::fs::read(&single)? != std::fs::read(&multi_pass)? {
        bail!("{} and {} differ", single.display(), multi_pass.display());
    }
    log::info!("Sorted {} and {}", single.display(), multi_pass.display());
    Ok(())
}
