//! Recovers the reference-accumulation sample index from filenames after an interruption.
//!
//! The `ref_` rasters of every ready-set channel must advance in lock-step. If they are all
//! present but disagree on their index, everything is pulled back to the smallest index and
//! accumulation resumes right after it. If any are missing the partial state is discarded.

use std::collections::BTreeSet;

use crate::foundation::core::SampleIndex;
use crate::foundation::error::{FoldError, FoldResult};
use crate::store::exr_io::RasterStore;
use crate::store::naming;

#[derive(Clone, Debug)]
pub struct ReadySet {
    pub channels: Vec<String>,
    /// Frames the renderer emits per sample, including any trailing frames past the scene range.
    pub frame_count: usize,
    pub start: SampleIndex,
    /// Exclusive upper bound of sample indices.
    pub target: SampleIndex,
}

impl ReadySet {
    pub fn expected_files(&self) -> usize {
        self.frame_count * self.channels.len()
    }

    fn tracks(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResumeDecision {
    /// No state on disk.
    Fresh,
    /// State was incomplete or inconsistent and has been discarded.
    Restarted { found: usize, expected: usize },
    /// All ready-set rasters aligned at `at`.
    Aligned { at: SampleIndex, renamed: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumePoint {
    pub next: SampleIndex,
    pub decision: ResumeDecision,
}

impl ResumePoint {
    pub fn is_complete(&self, ready: &ReadySet) -> bool {
        self.next >= ready.target
    }
}

/// Inspect the staging store and decide where reference accumulation continues.
///
/// Calling this twice with no renders in between yields the same result.
pub fn detect_resume(staging: &RasterStore, ready: &ReadySet) -> FoldResult<ResumePoint> {
    let root = staging.root();
    if root.exists() && !root.is_dir() {
        return Err(FoldError::resume(format!(
            "staging path '{}' is not a directory",
            root.display()
        )));
    }
    if !root.is_dir() {
        std::fs::create_dir_all(root)?;
        return Ok(fresh(ready));
    }

    let mut tracked = Vec::new();
    for name in staging.list()? {
        if let Some(parsed) = naming::parse_ref(&name)
            && ready.tracks(&parsed.channel)
        {
            tracked.push((name, parsed));
            continue;
        }
        if naming::parse_staged(&name).is_some() && !name.starts_with(naming::REF_PREFIX) {
            // Raw sample left behind by an interrupted post-process; the next render replaces it.
            staging.remove_if_present(&name)?;
        }
    }

    if tracked.is_empty() {
        return Ok(fresh(ready));
    }

    let expected = ready.expected_files();
    let pairs: BTreeSet<(&str, u32)> = tracked
        .iter()
        .map(|(_, p)| (p.channel.as_str(), p.frame.0))
        .collect();
    let min = tracked
        .iter()
        .map(|(_, p)| p.sample)
        .min()
        .unwrap_or(ready.start);

    if tracked.len() != expected || pairs.len() != tracked.len() || min < ready.start {
        tracing::warn!(
            found = tracked.len(),
            expected,
            "no complete reference state, restarting from {}",
            ready.start.0
        );
        let found = tracked.len();
        for (name, _) in &tracked {
            staging.remove_if_present(name)?;
        }
        return Ok(ResumePoint {
            next: ready.start,
            decision: ResumeDecision::Restarted { found, expected },
        });
    }

    let mut renamed = 0;
    for (name, parsed) in &tracked {
        if parsed.sample == min {
            continue;
        }
        let target = naming::ref_file_name(&parsed.channel, parsed.frame, min);
        staging.rename(name, &target)?;
        renamed += 1;
    }

    let next = min.next();
    tracing::info!(renamed, "restarting reference accumulation from {}", next.0);
    Ok(ResumePoint {
        next,
        decision: ResumeDecision::Aligned { at: min, renamed },
    })
}

fn fresh(ready: &ReadySet) -> ResumePoint {
    ResumePoint {
        next: ready.start,
        decision: ResumeDecision::Fresh,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/process/resume.rs"]
mod tests;
