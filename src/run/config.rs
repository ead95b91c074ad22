//! Run configuration loaded from JSON. Every field has a default, so `{}` is a valid file.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::SampleIndex;
use crate::foundation::error::{FoldError, FoldResult};
use crate::render::invoker::{RendererConfig, RetryPolicy};
use crate::schedule::pool::PoolConfig;
use crate::store::exr_io::RasterCompression;

pub const DEFAULT_CONFIG_FILE: &str = "framefold.json";

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub renderer: RendererConfig,
    pub build: BuildConfig,
    /// Renderer working directory.
    pub output_dir: PathBuf,
    /// Finished datasets land in `<dataset_root>/<scene>`. Relative to the config file.
    pub dataset_root: PathBuf,
    /// Required for bulk transfer; datasets are moved to `<bulk_storage_root>/<dataset_root>/<scene>`.
    pub bulk_storage_root: Option<PathBuf>,
    pub samples_per_pixel: u32,
    pub reference: ReferenceConfig,
    pub ref_count: u32,
    pub ref_count_interactive: u32,
    pub second_input_seed_offset: u64,
    pub multigbuf_count: u32,
    pub retry: RetryPolicy,
    pub workers: PoolConfig,
    pub compression: RasterCompression,
    /// Scene registry file.
    pub scenes: PathBuf,
    /// Base for relative scene files. Defaults to the parent of the config file's directory.
    pub scene_base_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            build: BuildConfig::default(),
            output_dir: PathBuf::from("output"),
            dataset_root: PathBuf::from("dataset"),
            bulk_storage_root: None,
            samples_per_pixel: 2,
            reference: ReferenceConfig::default(),
            ref_count: 8192,
            ref_count_interactive: 65536,
            second_input_seed_offset: 1_000_000,
            multigbuf_count: 4,
            retry: RetryPolicy::default(),
            workers: PoolConfig::default(),
            compression: RasterCompression::default(),
            scenes: PathBuf::from("scenes.json"),
            scene_base_dir: None,
        }
    }
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Program followed by its arguments. Empty means there is nothing to build.
    pub command: Vec<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub start_sample_index: u32,
    /// Exclusive end of the reference sample range.
    pub samples_per_pixel: u32,
    /// Channels that advance in lock-step.
    pub ready_set: Vec<String>,
    /// Frames the renderer emits past the declared animation range.
    pub trailing_frames: u32,
    /// Move the final `ref_` rasters out of the staging directory once the target is reached.
    pub flatten_on_finish: bool,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            start_sample_index: 0,
            samples_per_pixel: 4096,
            ready_set: vec!["current".into(), "envLight".into(), "emissive".into()],
            trailing_frames: 1,
            flatten_on_finish: false,
        }
    }
}

impl ReferenceConfig {
    pub fn start(&self) -> SampleIndex {
        SampleIndex(self.start_sample_index)
    }

    pub fn target(&self) -> SampleIndex {
        SampleIndex(self.samples_per_pixel)
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> FoldResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: RunConfig = serde_json::from_str(&text)
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> FoldResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("config '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> FoldResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(FoldError::validation("samples_per_pixel must be >= 1"));
        }
        if self.reference.samples_per_pixel <= self.reference.start_sample_index {
            return Err(FoldError::validation(format!(
                "reference.samples_per_pixel ({}) must exceed reference.start_sample_index ({})",
                self.reference.samples_per_pixel, self.reference.start_sample_index
            )));
        }
        if self.reference.ready_set.is_empty() {
            return Err(FoldError::validation("reference.ready_set must not be empty"));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(FoldError::validation("retry.max_attempts must be >= 1 when set"));
        }
        if self.workers.max == 0 {
            return Err(FoldError::validation("workers.max must be >= 1"));
        }
        Ok(())
    }

    /// Resolve relative paths in this config against `config_dir`.
    pub fn resolve_paths(&mut self, config_dir: &Path) {
        let abs = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = config_dir.join(&*p);
            }
        };
        abs(&mut self.output_dir);
        abs(&mut self.dataset_root);
        abs(&mut self.scenes);
        if let Some(p) = self.bulk_storage_root.as_mut() {
            abs(p);
        }
        if let Some(p) = self.renderer.params_path.as_mut() {
            abs(p);
        }
        if let Some(p) = self.scene_base_dir.as_mut() {
            abs(p);
        }
        if self.scene_base_dir.is_none() {
            let base = config_dir.parent().unwrap_or(config_dir);
            self.scene_base_dir = Some(base.to_path_buf());
        }
    }

    /// File the renderer reads its parameters from unless configured otherwise.
    pub fn params_path(&self) -> PathBuf {
        if let Some(p) = &self.renderer.params_path {
            return p.clone();
        }
        let dir = self
            .output_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        dir.join("framefold_params.json")
    }

    pub fn scene_base(&self) -> PathBuf {
        self.scene_base_dir.clone().unwrap_or_else(|| PathBuf::from(".."))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/run/config.rs"]
mod tests;
