//! Frame-image store: reads and writes [`Raster`]s as OpenEXR files inside one directory.
//!
//! Writes land in a `.partial` sibling first and are renamed into place, so an interrupted
//! process never leaves a half-written file under a name the resume scan would trust.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use exr::prelude::*;

use crate::foundation::error::{FoldError, FoldResult};
use crate::store::naming;
use crate::store::raster::Raster;

/// Compression applied to rasters written by the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterCompression {
    None,
    #[default]
    Zip,
}

impl RasterCompression {
    fn encoding(self) -> Encoding {
        match self {
            Self::None => Encoding::UNCOMPRESSED,
            Self::Zip => Encoding::SMALL_LOSSLESS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RasterStore {
    root: PathBuf,
    compression: RasterCompression,
}

impl RasterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: RasterCompression::default(),
        }
    }

    pub fn with_compression(mut self, compression: RasterCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store rooted at a subdirectory of this one, sharing its settings.
    pub fn child(&self, name: &str) -> Self {
        Self {
            root: self.root.join(name),
            compression: self.compression,
        }
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.path(file_name).is_file()
    }

    pub fn read(&self, file_name: &str) -> FoldResult<Raster> {
        read_raster(&self.path(file_name))
    }

    pub fn write(&self, file_name: &str, raster: &Raster) -> FoldResult<()> {
        write_raster(&self.path(file_name), raster, self.compression)
    }

    pub fn rename(&self, from: &str, to: &str) -> FoldResult<()> {
        let (src, dst) = (self.path(from), self.path(to));
        std::fs::rename(&src, &dst)
            .with_context(|| format!("rename '{}' -> '{}'", src.display(), dst.display()))?;
        Ok(())
    }

    /// Delete a raster, tolerating its absence. Returns whether a file was removed.
    pub fn remove_if_present(&self, file_name: &str) -> FoldResult<bool> {
        let path = self.path(file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("remove '{}'", path.display()))
                .into()),
        }
    }

    /// Raster file names directly inside the store directory, sorted.
    pub fn list(&self) -> FoldResult<Vec<String>> {
        let rd = std::fs::read_dir(&self.root)
            .with_context(|| format!("list '{}'", self.root.display()))?;
        let mut out = Vec::new();
        for entry in rd {
            let entry = entry.with_context(|| format!("list '{}'", self.root.display()))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && naming::is_raster_file(name)
            {
                out.push(name.to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}

pub fn read_raster(path: &Path) -> FoldResult<Raster> {
    let image = read()
        .no_deep_data()
        .largest_resolution_level()
        .all_channels()
        .first_valid_layer()
        .all_attributes()
        .from_file(path)
        .map_err(|e| FoldError::store(format!("read '{}': {e}", path.display())))?;

    let layer = image.layer_data;
    let (width, height) = (layer.size.0, layer.size.1);
    let pixels = width * height;

    let mut planes = Vec::with_capacity(layer.channel_data.list.len());
    for channel in &layer.channel_data.list {
        let name = channel.name.to_string();
        let values: Vec<f32> = match &channel.sample_data {
            FlatSamples::F16(v) => v.iter().map(|x| x.to_f32()).collect(),
            FlatSamples::F32(v) => v.clone(),
            FlatSamples::U32(v) => v.iter().map(|&x| x as f32).collect(),
        };
        if values.len() != pixels {
            return Err(FoldError::store(format!(
                "'{}': channel '{name}' is subsampled, which is not supported",
                path.display()
            )));
        }
        planes.push((component_rank(&name), name, values));
    }
    if planes.is_empty() {
        return Err(FoldError::store(format!(
            "'{}' has no channels",
            path.display()
        )));
    }
    planes.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let components = planes.len();
    let mut data = vec![0f32; pixels * components];
    for (c, (_, _, values)) in planes.iter().enumerate() {
        for (i, v) in values.iter().enumerate() {
            data[i * components + c] = *v;
        }
    }
    Raster::new(width as u32, height as u32, components, data)
}

pub fn write_raster(path: &Path, raster: &Raster, compression: RasterCompression) -> FoldResult<()> {
    let names = component_names(raster.components)?;
    let mut list = SmallVec::<[AnyChannel<FlatSamples>; 4]>::new();
    for (c, name) in names.iter().enumerate() {
        let plane: Vec<f32> = raster
            .data
            .iter()
            .skip(c)
            .step_by(raster.components)
            .copied()
            .collect();
        let name = Text::new_or_none(*name)
            .ok_or_else(|| FoldError::store(format!("invalid EXR channel name: {name}")))?;
        list.push(AnyChannel {
            name,
            sample_data: FlatSamples::F32(plane),
            quantize_linearly: false,
            sampling: Vec2(1, 1),
        });
    }

    let image = Image::from_encoded_channels(
        (raster.width as usize, raster.height as usize),
        compression.encoding(),
        AnyChannels::sort(list),
    );

    let partial = partial_path(path);
    image
        .write()
        .to_file(&partial)
        .map_err(|e| FoldError::store(format!("write '{}': {e}", partial.display())))?;
    std::fs::rename(&partial, path).with_context(|| {
        format!("rename '{}' -> '{}'", partial.display(), path.display())
    })?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn component_names(components: usize) -> FoldResult<&'static [&'static str]> {
    match components {
        1 => Ok(&["Y"]),
        2 => Ok(&["R", "G"]),
        3 => Ok(&["R", "G", "B"]),
        4 => Ok(&["R", "G", "B", "A"]),
        n => Err(FoldError::store(format!(
            "unsupported raster component count: {n}"
        ))),
    }
}

fn component_rank(name: &str) -> u8 {
    let leaf = name.rsplit('.').next().unwrap_or(name);
    match leaf {
        "R" => 0,
        "G" => 1,
        "B" => 2,
        "A" => 3,
        _ => 4,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/exr_io.rs"]
mod tests;
