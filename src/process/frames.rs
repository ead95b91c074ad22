use std::collections::BTreeSet;

use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::FoldResult;
use crate::store::exr_io::RasterStore;
use crate::store::naming;

/// How many frames past the declared range are checked for stale output.
pub const TRAILING_PURGE_WINDOW: u32 = 10;

/// Frame indices present in the store, from the numeric suffix of every raster name.
pub fn discover_frames(store: &RasterStore) -> FoldResult<Vec<FrameIndex>> {
    let frames: BTreeSet<FrameIndex> = store
        .list()?
        .iter()
        .filter_map(|f| naming::trailing_frame(f))
        .collect();
    Ok(frames.into_iter().collect())
}

/// Delete rasters for frames the renderer emitted past the declared animation range.
///
/// The window starts right after `first + len(declared)`, where `first` is the smallest frame
/// observed on disk.
pub fn purge_trailing_frames(
    store: &RasterStore,
    frames: &[FrameIndex],
    declared: FrameRange,
) -> FoldResult<usize> {
    let Some(first) = frames.first() else {
        return Ok(0);
    };
    let lo = first.0.saturating_add(declared.len_frames());
    let hi = lo.saturating_add(TRAILING_PURGE_WINDOW);

    let mut removed = 0;
    for name in store.list()? {
        let Some(frame) = naming::trailing_frame(&name) else {
            continue;
        };
        if (lo..hi).contains(&frame.0) && store.remove_if_present(&name)? {
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(removed, "purged stale trailing frames");
    }
    Ok(removed)
}

/// Rename every raw raster of `frame` from `{channel}_` to `{channel}{suffix}_`.
pub fn apply_channel_suffix(store: &RasterStore, frame: FrameIndex, suffix: &str) -> FoldResult<usize> {
    let mut renamed = 0;
    for name in store.list()? {
        let Some(raw) = naming::parse_raw(&name) else {
            continue;
        };
        if raw.frame != frame {
            continue;
        }
        let target = naming::raw_file_name(&format!("{}{suffix}", raw.channel), frame);
        store.rename(&name, &target)?;
        renamed += 1;
    }
    Ok(renamed)
}

#[cfg(test)]
#[path = "../../tests/unit/process/frames.rs"]
mod tests;
