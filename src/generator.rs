use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::record::{Record, RecordWriter};

/// Produces a data file to be sorted.
pub trait Generate {
    /// Write the data file and return its path.
    fn generate(&self) -> Result<PathBuf, anyhow::Error>;
}

const FIRST_NAMES: [&str; 16] = [
    "Aaron", "Bruno", "Caleb", "Dmitri", "Elias", "Felix", "Gideon", "Hugo",
    "Isaac", "Jonas", "Kai", "Liam", "Marco", "Noah", "Oscar", "Pavel",
];

const FEMALE_FIRST_NAMES: [&str; 12] = [
    "Ada", "Beatrice", "Clara", "Dana", "Elena", "Freya", "Greta", "Hanna",
    "Iris", "Julia", "Lena", "Mira",
];

const LAST_NAMES: [&str; 12] = [
    "Anders", "Brooks", "Carter", "Dorsey", "Ellison", "Fischer", "Garcia", "Hoffman",
    "Ivanova", "Jensen", "Kowalski", "Lindqvist",
];

/// Writes `TestFileRowsGenerationCount` random records to `TestDataFileName` inside a freshly
/// recreated `OperativeDictionary`.
///
/// Numbers are uniform in `0..=rows * 12`. A number divisible by 10 gets a full name, any other a
/// first name, so the file has many equal texts that are ordered by number.
///
/// # Examples
/// ```no_run
/// use record_file_sort::config::Config;
/// use record_file_sort::generator::{DataFileGenerator, Generate};
///
/// let config = Config::default().with_test_file_rows_generation_count(1000);
/// let path = DataFileGenerator::new(config).with_seed(42).generate().unwrap();
/// ```
pub struct DataFileGenerator {
    config: Config,
    seed: Option<u64>,
}

impl DataFileGenerator {
    pub fn new(config: Config) -> DataFileGenerator {
        DataFileGenerator {
            config,
            seed: None,
        }
    }

    /// Generate the same file on every run.
    pub fn with_seed(mut self, seed: u64) -> DataFileGenerator {
        self.seed = Some(seed);
        self
    }

    fn reset_operative_dictionary(&self) -> Result<(), anyhow::Error> {
        let dir = self.config.operative_dictionary();
        if dir.exists() {
            fs::remove_dir_all(dir)
                .with_context(|| anyhow!("path: {}", dir.display()))?;
        }
        fs::create_dir_all(dir)
            .with_context(|| anyhow!("path: {}", dir.display()))
    }

    fn random_record(rng: &mut StdRng, max_number: i64) -> Record {
        let number = rng.gen_range(0..=max_number);
        let text = if number % 10 == 0 {
            format!(
                "{} {}",
                FEMALE_FIRST_NAMES.choose(rng).unwrap_or(&"Ada"),
                LAST_NAMES.choose(rng).unwrap_or(&"Anders"),
            )
        } else {
            FIRST_NAMES.choose(rng).unwrap_or(&"Aaron").to_string()
        };
        Record::new(number, text)
    }
}

impl Generate for DataFileGenerator {
    fn generate(&self) -> Result<PathBuf, anyhow::Error> {
        self.config.validate()?;
        self.reset_operative_dictionary()?;

        let rows = self.config.test_file_rows_generation_count();
        let path = self.config.source_path();
        log::info!("Generating data file {} with {} lines", path.display(), rows);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let max_number = (rows as i64).saturating_mul(12);
        let mut writer = RecordWriter::create(&path, self.config.writer_buffer_size(), self.config.endl()?)?;
        for _ in 0..rows {
            writer.write(&Self::random_record(&mut rng, max_number))?;
        }
        let lines = writer.finish()
            .with_context(|| anyhow!("path: {}", path.display()))?;

        log::info!("{} lines of data were written to {}", lines, path.display());
        Ok(path)
    }
}
