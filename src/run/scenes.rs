//! Scene registry: the ordered list of scenes a run walks through.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::FrameRange;
use crate::foundation::error::{FoldError, FoldResult};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SceneDef {
    pub name: String,
    /// Scene file handed to the renderer; relative paths are resolved against the registry base.
    pub file: PathBuf,
    /// Declared animation range, both ends rendered.
    pub anim: [u32; 2],
    /// Leave frames past the declared range on disk.
    #[serde(default)]
    pub keep_trailing_frames: bool,
}

impl SceneDef {
    pub fn range(&self) -> FoldResult<FrameRange> {
        FrameRange::from_inclusive(self.anim[0], self.anim[1])
    }

    pub fn frame_count(&self) -> u32 {
        self.anim[1].saturating_sub(self.anim[0]).saturating_add(1)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneRegistry {
    scenes: Vec<SceneDef>,
}

impl SceneRegistry {
    /// Load the registry once, resolving scene files against `base`.
    pub fn load(path: &Path, base: &Path) -> FoldResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read scene registry '{}'", path.display()))?;
        Self::from_json(&text, base)
            .map_err(|e| FoldError::validation(format!("{}: {e}", path.display())))
    }

    pub fn from_json(text: &str, base: &Path) -> FoldResult<Self> {
        let scenes: Vec<SceneDef> =
            serde_json::from_str(text).context("parse scene registry JSON")?;
        Self::new(scenes, base)
    }

    pub fn new(mut scenes: Vec<SceneDef>, base: &Path) -> FoldResult<Self> {
        if scenes.is_empty() {
            return Err(FoldError::validation("scene registry is empty"));
        }
        for (i, s) in scenes.iter_mut().enumerate() {
            if s.name.trim().is_empty() {
                return Err(FoldError::validation(format!("scene #{i} has an empty name")));
            }
            s.range()
                .map_err(|e| FoldError::validation(format!("scene '{}': {e}", s.name)))?;
            if s.file.is_relative() {
                s.file = base.join(&s.file);
            }
        }
        for (i, s) in scenes.iter().enumerate() {
            if scenes[..i].iter().any(|o| o.name == s.name) {
                return Err(FoldError::validation(format!("duplicate scene '{}'", s.name)));
            }
        }
        Ok(Self { scenes })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneDef> {
        self.scenes.iter()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/run/scenes.rs"]
mod tests;
