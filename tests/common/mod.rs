use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use data_encoding::HEXLOWER;
use record_file_sort::config::Config;

/// Create a fresh working directory under ./target/results/
pub fn setup() -> PathBuf {
    let dir = temp_file_name("./target/results/");
    fs::create_dir_all(&dir).unwrap_or_else(|_|
        panic!("Failed to create results directory: {:?}", dir)
    );
    dir
}

pub fn teardown(dir: PathBuf) {
    fs::remove_dir_all(&dir).unwrap_or_else(|_|
        panic!("Failed to remove results directory: {:?}", dir)
    );
}

#[allow(dead_code)]
pub fn config(dir: &PathBuf) -> Config {
    Config::default()
        .with_operative_dictionary(dir.clone())
        .with_reader_buffer_size(256)
        .with_writer_buffer_size(256)
}

#[allow(dead_code)]
pub fn read_lines(path: PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn write_lines(path: PathBuf, lines: &[&str]) -> Result<(), anyhow::Error> {
    let content: String = lines.iter().map(|line| format!("{line}\n")).collect();
    fs::write(path, content)?;
    Ok(())
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}
