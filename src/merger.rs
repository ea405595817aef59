//! Fan-in limited k-way merge of sorted runs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;

use anyhow::{anyhow, bail, Context};

use crate::config::Config;
use crate::progress::Progress;
use crate::record::RecordWriter;
use crate::run_file::{list_sorted_runs, promote, remove_run, RunFile};
use crate::unmerged_run::UnmergedRun;

/// Merge `runs` into `destination` opening at most `FilesMergeChunkSize` runs at a time.
///
/// While there are more runs than the fan-in, runs are merged group by group, in sequence order,
/// into `1.sorted`, `2.sorted`, ... and the run list is read again from the working directory.
/// The last pass writes straight into `destination`. A single remaining run is renamed to
/// `destination`, no runs at all produce an empty `destination`.
///
/// On failure the partial output and the not yet deleted runs are left in place.
pub(crate) fn merge_runs(mut runs: Vec<RunFile>, destination: &Path, config: &Config, progress: &dyn Progress) -> Result<(), anyhow::Error> {
    let fan_in = config.files_merge_chunk_size();
    let dir = config.operative_dictionary();
    runs.sort();
    let mut pass = 0;
    loop {
        pass += 1;
        match runs.len() {
            0 => {
                RecordWriter::create(destination, config.writer_buffer_size(), config.endl()?)?
                    .finish()?;
                return Ok(());
            }
            1 => {
                promote(runs[0].path(), destination)?;
                return Ok(());
            }
            n if n <= fan_in => {
                log::info!("Merge pass {}, merging {} runs into {}", pass, n, destination.display());
                progress.start(n, &format!("Merge pass {pass}"));
                let lines = merge_pass(&runs, destination, config, progress)?;
                progress.finish();
                log::info!("Finished merging, merged length: {} lines", lines);
                return Ok(());
            }
            n => {
                log::info!("Merge pass {}, merging {} runs in groups of {}", pass, n, fan_in);
                progress.start(n, &format!("Merge pass {pass}"));
                for (i, group) in runs.chunks(fan_in).enumerate() {
                    let merged = RunFile::sorted(dir, i + 1);
                    if group.len() == 1 {
                        promote(group[0].path(), merged.path())?;
                        progress.tick();
                    } else {
                        let tmp_path = merged.tmp_path();
                        merge_pass(group, &tmp_path, config, progress)?;
                        promote(&tmp_path, merged.path())?;
                    }
                }
                progress.finish();
                runs = list_sorted_runs(dir)?;
            }
        }
    }
}

/// Merge at most `FilesMergeChunkSize` sorted runs into `output` in one pass, then delete the runs.
///
/// Every open run has exactly one buffered record in the frontier, the smallest of them is the
/// next record of the output. Returns the number of records written.
pub(crate) fn merge_pass(runs: &[RunFile], output: &Path, config: &Config, progress: &dyn Progress) -> Result<usize, anyhow::Error> {
    if runs.len() > config.files_merge_chunk_size() {
        bail!("Cannot merge {} runs at once, FilesMergeChunkSize is {}", runs.len(), config.files_merge_chunk_size());
    }

    let mut frontier = BinaryHeap::with_capacity(runs.len());
    for run in runs {
        match UnmergedRun::open(run.clone(), config)? {
            Some(unmerged) => frontier.push(Reverse(unmerged)),
            None => progress.tick(),
        }
    }

    let mut writer = RecordWriter::create(output, config.writer_buffer_size(), config.endl()?)?;
    while let Some(Reverse(mut run)) = frontier.pop() {
        if run.write_head(&mut writer)? {
            frontier.push(Reverse(run));
        } else {
            log::debug!("Run {} exhausted", run.file().path().display());
            progress.tick();
        }
    }
    let lines = writer.finish()
        .with_context(|| anyhow!("path: {}", output.display()))?;

    for run in runs {
        remove_run(run.path())?;
    }
    Ok(lines)
}
