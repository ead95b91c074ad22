use std::ops::Range;

use crate::foundation::error::{FoldError, FoldResult};

/// A 2-D grid of pixels, each a fixed-length vector of `f32` components.
///
/// Pixels are stored interleaved and row-major: component `c` of pixel `(x, y)` lives at
/// `(y * width + x) * components + c`.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub components: usize,
    pub data: Vec<f32>,
}

impl Raster {
    pub fn new(width: u32, height: u32, components: usize, data: Vec<f32>) -> FoldResult<Self> {
        if components == 0 {
            return Err(FoldError::validation("raster must have at least one component"));
        }
        let expected = pixel_count(width, height)?
            .checked_mul(components)
            .ok_or_else(|| FoldError::validation("raster dimensions overflow"))?;
        if data.len() != expected {
            return Err(FoldError::validation(format!(
                "raster {width}x{height}x{components} expects {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            components,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, components: usize, value: f32) -> FoldResult<Self> {
        let n = pixel_count(width, height)?.saturating_mul(components);
        Self::new(width, height, components, vec![value; n])
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let i = (y as usize * self.width as usize + x as usize) * self.components;
        &self.data[i..i + self.components]
    }

    pub fn same_shape(&self, other: &Raster) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.components == other.components
    }

    /// Copy out a contiguous run of components from every pixel.
    pub fn select_components(&self, range: Range<usize>) -> FoldResult<Raster> {
        if range.is_empty() || range.end > self.components {
            return Err(FoldError::validation(format!(
                "component range {}..{} is outside a {}-component raster",
                range.start, range.end, self.components
            )));
        }
        let width = range.len();
        let mut data = Vec::with_capacity(self.pixel_count() * width);
        for px in self.data.chunks_exact(self.components) {
            data.extend_from_slice(&px[range.clone()]);
        }
        Raster::new(self.width, self.height, width, data)
    }

    /// Online-mean update: `(count * mean + sample) / (count + 1)`.
    ///
    /// `count` is the number of samples already folded into `mean`.
    pub fn fold_mean(mean: &Raster, sample: &Raster, count: u32) -> FoldResult<Raster> {
        if !mean.same_shape(sample) {
            return Err(FoldError::validation(format!(
                "cannot fold {}x{}x{} sample into {}x{}x{} mean",
                sample.width,
                sample.height,
                sample.components,
                mean.width,
                mean.height,
                mean.components
            )));
        }
        let n = f64::from(count);
        let inv = 1.0 / (n + 1.0);
        let data = mean
            .data
            .iter()
            .zip(&sample.data)
            .map(|(&m, &s)| ((n * f64::from(m) + f64::from(s)) * inv) as f32)
            .collect();
        Ok(Raster {
            width: mean.width,
            height: mean.height,
            components: mean.components,
            data,
        })
    }

    /// Scale each pixel vector to unit Euclidean length. Zero-length pixels stay as they are.
    pub fn normalize_vectors(&mut self) {
        for px in self.data.chunks_exact_mut(self.components) {
            let norm = px.iter().map(|v| v * v).sum::<f32>().sqrt();
            let div = if norm == 0.0 { 1.0 } else { norm };
            for v in px.iter_mut() {
                *v /= div;
            }
        }
    }
}

fn pixel_count(width: u32, height: u32) -> FoldResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| FoldError::validation("raster dimensions overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/store/raster.rs"]
mod tests;
