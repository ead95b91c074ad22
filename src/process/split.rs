//! Decomposes packed renderer outputs into single-purpose rasters.

use std::ops::Range;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FoldError, FoldResult};
use crate::store::exr_io::RasterStore;
use crate::store::naming;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitOutput {
    pub channel: String,
    pub components: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitRule {
    pub source: String,
    pub outputs: Vec<SplitOutput>,
    pub remove_source: bool,
}

impl SplitRule {
    pub fn new(source: &str, remove_source: bool) -> Self {
        Self {
            source: source.to_string(),
            outputs: Vec::new(),
            remove_source,
        }
    }

    pub fn output(mut self, channel: &str, components: Range<usize>) -> Self {
        self.outputs.push(SplitOutput {
            channel: channel.to_string(),
            components,
        });
        self
    }
}

/// Packed material attributes emitted with every jittered sample.
pub fn material_rules() -> Vec<SplitRule> {
    vec![
        SplitRule::new("specRough", true)
            .output("roughness", 3..4)
            .output("specularAlbedo", 0..3),
        SplitRule::new("diffuseOpacity", true)
            .output("diffuseAlbedo", 0..3)
            .output("opacity", 3..4),
    ]
}

/// Depth from the center-sample G-buffer. The source is kept for downstream use.
pub fn center_depth_rules() -> Vec<SplitRule> {
    vec![SplitRule::new("linearZ", false).output("depth", 0..1)]
}

/// Depth from the multi-sample G-buffer.
pub fn multi_depth_rules() -> Vec<SplitRule> {
    vec![SplitRule::new("linearZ_multi", true).output("depth_multi", 0..1)]
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub written: usize,
    pub missing: Vec<String>,
}

/// Apply `rules` to the raw rasters of `frame` in `src`, writing results into `dst`.
///
/// A missing source is a warning; a source that cannot be split stops this frame.
pub fn split_frame(
    src: &RasterStore,
    dst: &RasterStore,
    frame: FrameIndex,
    rules: &[SplitRule],
) -> FoldResult<SplitReport> {
    let mut report = SplitReport::default();
    for rule in rules {
        let source = naming::raw_file_name(&rule.source, frame);
        if !src.exists(&source) {
            tracing::warn!("{} not found", src.path(&source).display());
            report.missing.push(rule.source.clone());
            continue;
        }
        let packed = src.read(&source)?;
        for out in &rule.outputs {
            let part = packed.select_components(out.components.clone()).map_err(|e| {
                FoldError::validation(format!("split {source} into {}: {e}", out.channel))
            })?;
            dst.write(&naming::raw_file_name(&out.channel, frame), &part)?;
            report.written += 1;
        }
        if rule.remove_source {
            src.remove_if_present(&source)?;
        }
    }
    Ok(report)
}

/// Re-normalise a vector raster in place. Returns `false` when it is absent.
pub fn renormalize_in_place(
    store: &RasterStore,
    channel: &str,
    frame: FrameIndex,
) -> FoldResult<bool> {
    let name = naming::raw_file_name(channel, frame);
    if !store.exists(&name) {
        tracing::warn!("{} not found", store.path(&name).display());
        return Ok(false);
    }
    let mut r = store.read(&name)?;
    r.normalize_vectors();
    store.write(&name, &r)?;
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/process/split.rs"]
mod tests;
