use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, Context};
use regex::Regex;

pub(crate) const UNSORTED_EXTENSION: &str = "unsorted";
pub(crate) const SORTED_EXTENSION: &str = "sorted";
const TMP_EXTENSION: &str = "tmp";
const REMOVAL_EXTENSION: &str = "removal";

/// A numbered chunk or run file in the working directory, ordered by its sequence number.
#[derive(Clone, Debug)]
pub(crate) struct RunFile {
    path: PathBuf,
    sequence: usize,
}

impl RunFile {
    pub(crate) fn new(path: PathBuf, sequence: usize) -> RunFile {
        RunFile {
            path,
            sequence,
        }
    }

    /// `<dir>/<sequence>.unsorted`
    pub(crate) fn unsorted(dir: &Path, sequence: usize) -> RunFile {
        RunFile::new(dir.join(format!("{sequence}.{UNSORTED_EXTENSION}")), sequence)
    }

    /// `<dir>/<sequence>.sorted`
    pub(crate) fn sorted(dir: &Path, sequence: usize) -> RunFile {
        RunFile::new(dir.join(format!("{sequence}.{SORTED_EXTENSION}")), sequence)
    }

    /// The sorted run with the same sequence number.
    pub(crate) fn to_sorted(&self) -> RunFile {
        let mut path = self.path.clone();
        path.set_file_name(format!("{}.{SORTED_EXTENSION}", self.sequence));
        RunFile::new(path, self.sequence)
    }

    /// The in-progress file of this run, `<sequence>.sorted.tmp`.
    pub(crate) fn tmp_path(&self) -> PathBuf {
        with_extra_extension(&self.path, TMP_EXTENSION)
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }

    pub(crate) fn sequence(&self) -> usize {
        self.sequence
    }
}

impl Eq for RunFile {}

impl PartialEq<Self> for RunFile {
    fn eq(&self, other: &Self) -> bool {
        self.sequence.eq(&other.sequence)
    }
}

impl PartialOrd<Self> for RunFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RunFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

fn with_extra_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

/// List the sorted runs currently in `dir`, ordered by sequence number (`10.sorted` after
/// `9.sorted`). Other files, including in-progress `.tmp` files, are ignored.
pub(crate) fn list_sorted_runs(dir: &Path) -> Result<Vec<RunFile>, anyhow::Error> {
    let pattern = Regex::new(&format!(r"^(\d+)\.{SORTED_EXTENSION}$"))?;
    let mut runs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| anyhow!("path: {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(captures) = name.to_str().and_then(|name| pattern.captures(name)) else {
            continue;
        };
        let sequence = captures[1].parse::<usize>()
            .with_context(|| anyhow!("run file: {}", entry.path().display()))?;
        runs.push(RunFile::new(entry.path(), sequence));
    }
    runs.sort();
    Ok(runs)
}

static INTERMEDIATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn intermediate_pattern() -> Result<&'static Regex, anyhow::Error> {
    if let Some(pattern) = INTERMEDIATE_PATTERN.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(&format!(
        r"^\d+\.({UNSORTED_EXTENSION}|{SORTED_EXTENSION}|{SORTED_EXTENSION}\.{TMP_EXTENSION})(\.{REMOVAL_EXTENSION})?$"
    ))?;
    Ok(INTERMEDIATE_PATTERN.get_or_init(|| pattern))
}

/// Whether `name` is reserved for chunk and run files.
pub(crate) fn is_intermediate(name: &str) -> Result<bool, anyhow::Error> {
    Ok(intermediate_pattern()?.is_match(name))
}

/// Delete chunk and run files left in `dir` by an interrupted sort. Returns the number of files
/// removed.
pub(crate) fn clear_intermediate(dir: &Path) -> Result<usize, anyhow::Error> {
    let pattern = intermediate_pattern()?;
    let mut removed = 0;
    for entry in fs::read_dir(dir).with_context(|| anyhow!("path: {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() && entry.file_name().to_str().is_some_and(|name| pattern.is_match(name)) {
            fs::remove_file(entry.path())
                .with_context(|| anyhow!("Remove {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Move `from` to `to`, replacing `to` if it exists.
pub(crate) fn promote(from: &Path, to: &Path) -> Result<(), anyhow::Error> {
    fs::rename(from, to)
        .with_context(|| anyhow!("Rename {} to {}", from.display(), to.display()))
}

/// Delete a consumed run. The file is first renamed to `<name>.removal` so that a failed delete
/// never leaves a file matching a live run name. A stale `.removal` sibling is replaced.
pub(crate) fn remove_run(path: &Path) -> Result<(), anyhow::Error> {
    let removal = with_extra_extension(path, REMOVAL_EXTENSION);
    promote(path, &removal)?;
    fs::remove_file(&removal)
        .with_context(|| anyhow!("Remove {}", removal.display()))
}
