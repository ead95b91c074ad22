//! Parameter surface handed to the external renderer.
//!
//! A fresh [`RenderParams`] is built for every invocation and flattened into a
//! key/value [`ParamSurface`], which is then either written as a JSON file or exported as
//! environment variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde_json::Value;

use crate::foundation::error::FoldResult;

/// Prefix of exported environment variables.
pub const ENV_PREFIX: &str = "FRAMEFOLD_";
/// Environment variable pointing at the JSON parameter file.
pub const PARAMS_PATH_ENV: &str = "FRAMEFOLD_PARAMS";

#[derive(Clone, Debug, PartialEq)]
pub struct RenderParams {
    pub name: String,
    pub file: PathBuf,
    pub anim: [u32; 2],
    pub method: String,
    /// Absent in interactive runs, where the renderer keeps its own output location.
    pub out_dir: Option<PathBuf>,
    pub interactive: bool,
    pub ref_count: u32,
    pub seed_offset: u64,
    pub sample_index: u32,
    pub multigbuf_count: u32,
}

impl RenderParams {
    pub fn surface(&self) -> ParamSurface {
        let mut s = ParamSurface::default();
        s.set("NAME", self.name.as_str());
        s.set("FILE", path_value(&self.file));
        s.set("ANIM", vec![self.anim[0], self.anim[1]]);
        s.set("METHOD", self.method.as_str());
        if let Some(dir) = &self.out_dir {
            s.set("OUT_DIR", path_value(dir));
        }
        s.set("INTERACTIVE", self.interactive);
        s.set("REF_COUNT", self.ref_count);
        s.set("SEED_OFFSET", self.seed_offset);
        s.set("SAMPLE_INDEX", self.sample_index);
        s.set("MULTIGBUF_COUNT", self.multigbuf_count);
        s
    }
}

/// How the parameter surface reaches the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamsFormat {
    #[default]
    Json,
    Env,
}

/// Ordered key/value assignments. Setting a key again replaces its value, whatever its type.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ParamSurface(BTreeMap<String, Value>);

impl ParamSurface {
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `FRAMEFOLD_<KEY>` pairs; strings are exported bare, everything else as JSON text.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (format!("{ENV_PREFIX}{k}"), text)
            })
            .collect()
    }

    /// Write the surface as a JSON object, replacing `path` atomically.
    pub fn write_json(&self, path: &Path) -> FoldResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create params dir '{}'", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(self).context("serialize render params")?;
        let mut partial = path.as_os_str().to_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        std::fs::write(&partial, bytes)
            .with_context(|| format!("write '{}'", partial.display()))?;
        std::fs::rename(&partial, path).with_context(|| {
            format!("rename '{}' -> '{}'", partial.display(), path.display())
        })?;
        Ok(())
    }
}

fn path_value(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
#[path = "../../tests/unit/render/params.rs"]
mod tests;
