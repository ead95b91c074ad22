//! Per-method post-processing of one rendered sample.

use anyhow::Context as _;

use crate::foundation::core::{FrameIndex, SampleIndex};
use crate::foundation::error::{FoldError, FoldResult};
use crate::process::accumulate::{fold_frame, fold_reference_sample};
use crate::process::frames::{apply_channel_suffix, discover_frames, purge_trailing_frames};
use crate::process::split::{
    center_depth_rules, material_rules, multi_depth_rules, renormalize_in_place, split_frame,
};
use crate::run::config::ReferenceConfig;
use crate::run::method::{Method, SampleLoop};
use crate::run::scenes::SceneDef;
use crate::schedule::pool::{BatchReport, WorkerPool};
use crate::store::exr_io::RasterStore;
use crate::store::naming;

/// Name of the reference staging directory inside the output directory.
pub const STAGING_DIR: &str = "tmp";

pub struct PostContext<'a> {
    pub out: &'a RasterStore,
    pub pool: &'a WorkerPool,
    pub scene: &'a SceneDef,
    pub reference: &'a ReferenceConfig,
    pub samples_per_pixel: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostReport {
    pub frames: Vec<FrameIndex>,
    pub batch: BatchReport,
    pub purged: usize,
}

/// Post-process everything the renderer just wrote for `sample`.
#[tracing::instrument(skip(ctx), fields(scene = %ctx.scene.name))]
pub fn postprocess(ctx: &PostContext<'_>, method: Method, sample: SampleIndex) -> FoldResult<PostReport> {
    let frames = discover_frames(ctx.out)?;
    if frames.is_empty() {
        tracing::info!("no rasters found, skipping post-processing");
        return Ok(PostReport::default());
    }

    let out = ctx.out;
    let batch = match method {
        Method::Input | Method::SecondInput => {
            let suffix = method.channel_suffix();
            ctx.pool
                .run_batch(&frames, |&f| process_input_frame(out, f, sample, suffix))
        }
        Method::Ref => BatchReport::default(),
        Method::RefRestir => {
            let staging = out.child(STAGING_DIR);
            if stage_reference_sample(out, &staging, &ctx.reference.ready_set, sample)? == 0 {
                tracing::error!("no reference rasters found for sample {}", sample.0);
                return Ok(PostReport {
                    frames,
                    ..PostReport::default()
                });
            }
            let channels = &ctx.reference.ready_set;
            let start = ctx.reference.start();
            ctx.pool.run_batch(&frames, |&f| {
                fold_reference_frame(&staging, channels, f, sample, start)
            })
        }
        Method::CenterGbuf => {
            let rules = center_depth_rules();
            ctx.pool
                .run_batch(&frames, |&f| split_frame(out, out, f, &rules).map(|_| ()))
        }
        Method::MultiGbuf => {
            let rules = multi_depth_rules();
            ctx.pool.run_batch(&frames, |&f| {
                split_frame(out, out, f, &rules)?;
                renormalize_in_place(out, "normal_multi", f)?;
                Ok(())
            })
        }
    };

    let last_standard = sample.0.saturating_add(1) >= ctx.samples_per_pixel;
    let purge = match method.sample_loop() {
        SampleLoop::Standard => last_standard,
        SampleLoop::Reference | SampleLoop::Single => true,
    };
    let purged = if purge && !ctx.scene.keep_trailing_frames {
        purge_trailing_frames(out, &frames, ctx.scene.range()?)?
    } else {
        0
    };

    if !batch.is_clean() {
        tracing::warn!(
            failed = batch.failures.len(),
            "post-processing finished with failed frames"
        );
    }
    Ok(PostReport {
        frames,
        batch,
        purged,
    })
}

/// Split packed material channels, tag second-input channels, then accumulate.
pub fn process_input_frame(
    store: &RasterStore,
    frame: FrameIndex,
    sample: SampleIndex,
    suffix: Option<&str>,
) -> FoldResult<()> {
    split_frame(store, store, frame, &material_rules())?;
    if let Some(suffix) = suffix {
        apply_channel_suffix(store, frame, suffix)?;
    }
    fold_frame(store, frame, sample)?;
    Ok(())
}

/// Move the ready-set rasters the renderer just wrote into the staging directory, tagged with
/// `sample`. Returns how many were moved.
pub fn stage_reference_sample(
    out: &RasterStore,
    staging: &RasterStore,
    channels: &[String],
    sample: SampleIndex,
) -> FoldResult<usize> {
    std::fs::create_dir_all(staging.root())
        .with_context(|| format!("create staging dir '{}'", staging.root().display()))?;
    let mut moved = 0;
    for name in out.list()? {
        let Some(raw) = naming::parse_raw(&name) else {
            continue;
        };
        if !channels.contains(&raw.channel) {
            continue;
        }
        let from = out.path(&name);
        let to = staging.path(&naming::staged_file_name(&raw.channel, raw.frame, sample));
        std::fs::rename(&from, &to)
            .with_context(|| format!("stage '{}' -> '{}'", from.display(), to.display()))?;
        moved += 1;
    }
    Ok(moved)
}

/// Fold one staged sample into the reference state of every ready-set channel of `frame`.
pub fn fold_reference_frame(
    staging: &RasterStore,
    channels: &[String],
    frame: FrameIndex,
    sample: SampleIndex,
    start: SampleIndex,
) -> FoldResult<()> {
    let mut failed = Vec::new();
    for channel in channels {
        if let Err(e) = fold_reference_sample(staging, channel, frame, sample, start) {
            tracing::error!(frame = frame.0, channel = %channel, "reference fold failed: {e}");
            failed.push(channel.as_str());
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(FoldError::store(format!(
            "frame {}: reference not updated for {}",
            frame.0,
            failed.join(", ")
        )))
    }
}

/// Move the final reference rasters out of staging and remove the staging directory.
///
/// Returns how many rasters were moved. Missing rasters are logged per frame.
pub fn flatten_reference(
    out: &RasterStore,
    channels: &[String],
    last: SampleIndex,
) -> FoldResult<usize> {
    let staging = out.child(STAGING_DIR);
    let mut frames: Vec<FrameIndex> = staging
        .list()?
        .iter()
        .filter_map(|f| naming::parse_ref(f))
        .map(|p| p.frame)
        .collect();
    frames.sort_unstable();
    frames.dedup();

    let mut moved = 0;
    for &frame in &frames {
        for channel in channels {
            let src = staging.path(&naming::ref_file_name(channel, frame, last));
            if !src.is_file() {
                tracing::error!(frame = frame.0, "reference raster not found: {}", src.display());
                continue;
            }
            let dst = out.path(&naming::final_ref_file_name(channel, frame));
            std::fs::rename(&src, &dst)
                .with_context(|| format!("move '{}' -> '{}'", src.display(), dst.display()))?;
            moved += 1;
        }
    }
    std::fs::remove_dir_all(staging.root())
        .with_context(|| format!("remove staging dir '{}'", staging.root().display()))?;
    Ok(moved)
}

#[cfg(test)]
#[path = "../../tests/unit/run/postprocess.rs"]
mod tests;
