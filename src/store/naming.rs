//! On-disk naming of raster artifacts.
//!
//! - raw per-sample raster: `{channel}_{frame:04}.exr`
//! - merged artifact: `{sample:04}_{channel}_{frame:04}.exr`
//! - staged reference sample: `{channel}_{frame:04}_{sample:04}.exr`
//! - reference accumulation state: `ref_{channel}_{frame:04}_{sample:04}.exr`
//!
//! Channel names may themselves contain `_` (`linearZ_multi`), so numeric fields are always
//! peeled off from the right.

use crate::foundation::core::{FrameIndex, SampleIndex};

pub const RASTER_EXT: &str = "exr";
pub const REF_PREFIX: &str = "ref_";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawName {
    pub channel: String,
    pub frame: FrameIndex,
}

/// A reference-state or staged file: channel, frame and the sample it was last updated at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedName {
    pub channel: String,
    pub frame: FrameIndex,
    pub sample: SampleIndex,
}

pub fn raw_file_name(channel: &str, frame: FrameIndex) -> String {
    format!("{channel}_{:04}.{RASTER_EXT}", frame.0)
}

pub fn merged_file_name(sample: SampleIndex, channel: &str, frame: FrameIndex) -> String {
    format!("{:04}_{channel}_{:04}.{RASTER_EXT}", sample.0, frame.0)
}

pub fn staged_file_name(channel: &str, frame: FrameIndex, sample: SampleIndex) -> String {
    format!("{channel}_{:04}_{:04}.{RASTER_EXT}", frame.0, sample.0)
}

pub fn ref_file_name(channel: &str, frame: FrameIndex, sample: SampleIndex) -> String {
    format!("{REF_PREFIX}{channel}_{:04}_{:04}.{RASTER_EXT}", frame.0, sample.0)
}

/// Flattened reference output once accumulation is complete.
pub fn final_ref_file_name(channel: &str, frame: FrameIndex) -> String {
    format!("{REF_PREFIX}{channel}_{:04}.{RASTER_EXT}", frame.0)
}

pub fn is_raster_file(file_name: &str) -> bool {
    stem(file_name).is_some()
}

/// True when the name carries a four-digit sample prefix, i.e. it is a merged artifact.
pub fn has_sample_prefix(file_name: &str) -> bool {
    let b = file_name.as_bytes();
    b.len() >= 4 && b[..4].iter().all(u8::is_ascii_digit)
}

/// Numeric suffix of the file stem, read as a frame index.
pub fn trailing_frame(file_name: &str) -> Option<FrameIndex> {
    let (_, tail) = stem(file_name)?.rsplit_once('_')?;
    parse_index(tail).map(FrameIndex)
}

pub fn parse_raw(file_name: &str) -> Option<RawName> {
    if has_sample_prefix(file_name) {
        return None;
    }
    let (channel, frame) = stem(file_name)?.rsplit_once('_')?;
    if channel.is_empty() {
        return None;
    }
    Some(RawName {
        channel: channel.to_string(),
        frame: FrameIndex(parse_index(frame)?),
    })
}

pub fn parse_staged(file_name: &str) -> Option<IndexedName> {
    parse_indexed(stem(file_name)?)
}

pub fn parse_ref(file_name: &str) -> Option<IndexedName> {
    parse_indexed(stem(file_name)?.strip_prefix(REF_PREFIX)?)
}

fn parse_indexed(s: &str) -> Option<IndexedName> {
    let (rest, sample) = s.rsplit_once('_')?;
    let (channel, frame) = rest.rsplit_once('_')?;
    if channel.is_empty() {
        return None;
    }
    Some(IndexedName {
        channel: channel.to_string(),
        frame: FrameIndex(parse_index(frame)?),
        sample: SampleIndex(parse_index(sample)?),
    })
}

fn stem(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    ext.eq_ignore_ascii_case(RASTER_EXT).then_some(stem)
}

fn parse_index(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
#[path = "../../tests/unit/store/naming.rs"]
mod tests;
