//! Incremental sample accumulation.
//!
//! Each (channel, frame) pair keeps exactly one merged raster on disk, tagged with the sample
//! index it was last updated at. Folding sample `n` reads the merged raster for `n - 1`, writes
//! the running mean for `n`, then drops both the old merged raster and the raw sample.

use crate::foundation::core::{FrameIndex, SampleIndex};
use crate::foundation::error::{FoldError, FoldResult};
use crate::store::exr_io::RasterStore;
use crate::store::naming;
use crate::store::raster::Raster;

/// How a channel's samples combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelRole {
    /// Plain running mean.
    Plain,
    /// Never averaged: the first sample is kept verbatim.
    MotionVector,
    /// Running mean, re-normalised to unit length per pixel.
    Normal,
}

impl ChannelRole {
    pub fn classify(channel: &str) -> Self {
        if channel.contains("mvec") {
            Self::MotionVector
        } else if channel.contains("normal") {
            Self::Normal
        } else {
            Self::Plain
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoldOutcome {
    /// First sample: the raw raster was renamed into place.
    Promoted,
    /// A new running mean was written.
    Merged,
    /// Motion vectors: the raw sample was discarded, the earlier value kept.
    Kept,
}

/// One accumulation step expressed in file names relative to a store.
#[derive(Clone, Copy, Debug)]
pub struct FoldStep<'a> {
    /// Freshly rendered sample.
    pub raw: &'a str,
    /// Current merged raster, `None` for the first sample.
    pub prev: Option<&'a str>,
    /// Name of the merged raster to produce.
    pub next: &'a str,
    /// Number of samples already folded into `prev`.
    pub folded: u32,
    pub role: ChannelRole,
    /// Motion vectors only: rename `prev` to `next` so the kept value tracks the sample index.
    pub carry_motion: bool,
}

pub fn apply_fold(store: &RasterStore, step: FoldStep<'_>) -> FoldResult<FoldOutcome> {
    let Some(prev) = step.prev else {
        store.rename(step.raw, step.next)?;
        return Ok(FoldOutcome::Promoted);
    };

    if step.role == ChannelRole::MotionVector {
        if !store.exists(prev) {
            return Err(FoldError::store(format!(
                "motion vectors '{}' missing, keeping raw sample '{}'",
                prev, step.raw
            )));
        }
        store.remove_if_present(step.raw)?;
        if step.carry_motion && prev != step.next {
            store.rename(prev, step.next)?;
        }
        return Ok(FoldOutcome::Kept);
    }

    let mean = store.read(prev)?;
    let sample = store.read(step.raw)?;
    let mut merged = Raster::fold_mean(&mean, &sample, step.folded)?;
    if step.role == ChannelRole::Normal {
        merged.normalize_vectors();
    }
    store.write(step.next, &merged)?;

    store.remove_if_present(step.raw)?;
    if prev != step.next {
        store.remove_if_present(prev)?;
    }
    Ok(FoldOutcome::Merged)
}

/// Fold the raw `{channel}_{frame}` raster into the merged artifact for `sample`.
pub fn fold_sample(
    store: &RasterStore,
    channel: &str,
    frame: FrameIndex,
    sample: SampleIndex,
) -> FoldResult<FoldOutcome> {
    let raw = naming::raw_file_name(channel, frame);
    let next = naming::merged_file_name(sample, channel, frame);
    let role = ChannelRole::classify(channel);
    // Motion vectors stay under the sample-0 name for the whole run.
    let prev = sample.prev().map(|p| match role {
        ChannelRole::MotionVector => naming::merged_file_name(SampleIndex(0), channel, frame),
        _ => naming::merged_file_name(p, channel, frame),
    });
    apply_fold(
        store,
        FoldStep {
            raw: &raw,
            prev: prev.as_deref(),
            next: &next,
            folded: sample.0,
            role,
            carry_motion: false,
        },
    )
}

/// Fold a staged reference sample into the `ref_` state for the same (channel, frame).
///
/// Reference accumulation starts counting at `start`, so the weight of the running mean is the
/// number of indices between `start` and the previous sample.
pub fn fold_reference_sample(
    store: &RasterStore,
    channel: &str,
    frame: FrameIndex,
    sample: SampleIndex,
    start: SampleIndex,
) -> FoldResult<FoldOutcome> {
    if sample < start {
        return Err(FoldError::validation(format!(
            "reference sample {} precedes start index {}",
            sample.0, start.0
        )));
    }
    let raw = naming::staged_file_name(channel, frame, sample);
    let next = naming::ref_file_name(channel, frame, sample);
    let last = SampleIndex(sample.0.saturating_sub(1).max(start.0));
    let prev = (sample != start).then(|| naming::ref_file_name(channel, frame, last));
    apply_fold(
        store,
        FoldStep {
            raw: &raw,
            prev: prev.as_deref(),
            next: &next,
            folded: last.0 - start.0 + 1,
            role: ChannelRole::classify(channel),
            carry_motion: true,
        },
    )
}

/// Per-frame summary of [`fold_frame`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameFold {
    pub promoted: usize,
    pub merged: usize,
    pub kept: usize,
}

/// Fold every raw raster present for `frame`. A failing channel is logged and does not stop the
/// remaining channels; the frame reports an error if any channel failed.
pub fn fold_frame(
    store: &RasterStore,
    frame: FrameIndex,
    sample: SampleIndex,
) -> FoldResult<FrameFold> {
    let channels: Vec<String> = store
        .list()?
        .iter()
        .filter_map(|f| naming::parse_raw(f))
        .filter(|raw| raw.frame == frame)
        .map(|raw| raw.channel)
        .collect();

    let mut out = FrameFold::default();
    let mut failed = Vec::new();
    for channel in &channels {
        match fold_sample(store, channel, frame, sample) {
            Ok(FoldOutcome::Promoted) => out.promoted += 1,
            Ok(FoldOutcome::Merged) => out.merged += 1,
            Ok(FoldOutcome::Kept) => out.kept += 1,
            Err(e) => {
                tracing::error!(frame = frame.0, channel = %channel, "accumulate failed: {e}");
                failed.push(channel.as_str());
            }
        }
    }
    if !failed.is_empty() {
        return Err(FoldError::store(format!(
            "frame {}: {} channel(s) not accumulated: {}",
            frame.0,
            failed.len(),
            failed.join(", ")
        )));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/process/accumulate.rs"]
mod tests;
