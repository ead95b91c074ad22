use crate::foundation::error::{FoldError, FoldResult};

/// Index of one time-step of an animated scene.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame {}", self.0)
    }
}

/// Zero-based count of independent samples folded into a merged raster, minus one.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SampleIndex(pub u32);

impl SampleIndex {
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Build from a declared animation range where both ends are rendered.
    pub fn from_inclusive(first: u32, last: u32) -> FoldResult<Self> {
        if first > last {
            return Err(FoldError::validation(format!(
                "animation range [{first}, {last}] is reversed"
            )));
        }
        Ok(Self {
            start: FrameIndex(first),
            end: FrameIndex(last.saturating_add(1)),
        })
    }

    pub fn len_frames(self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
