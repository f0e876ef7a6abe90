//! PNG previews of generated chunks.

use std::io::Cursor;
use std::path::Path;

use relief_config::DrawMode;
use relief_terrain::{ColorMap, FalloffField, HeightField, MapData};

/// Errors raised while exporting a preview.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("preview of {width}x{height} pixels is too large to encode")]
    Dimensions { width: usize, height: usize },
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("failed to write preview: {0}")]
    Io(#[from] std::io::Error),
}

/// Row-major RGBA image.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PreviewImage {
    /// Grayscale image of the chunk heights, without the padding ring.
    pub fn from_heights(field: &HeightField) -> Self {
        Self::grayscale(field.width(), field.height(), field.values())
    }

    pub fn from_color_map(color_map: &ColorMap) -> Self {
        let size = color_map.size();
        Self {
            width: size,
            height: size,
            pixels: color_map.to_rgba_bytes(),
        }
    }

    pub fn from_falloff(falloff: &FalloffField) -> Self {
        Self::grayscale(falloff.size(), falloff.size(), falloff.values())
    }

    fn grayscale(width: usize, height: usize, values: &[f32]) -> Self {
        let pixels = values
            .iter()
            .flat_map(|&value| {
                let level = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
                [level, level, level, u8::MAX]
            })
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// The image `mode` draws for `map_data`. `Mesh` has no image.
    pub fn render(mode: DrawMode, map_data: &MapData) -> Option<Self> {
        match mode {
            DrawMode::NoiseMap => Some(Self::from_heights(&map_data.trimmed_heights())),
            DrawMode::ColorMap => Some(Self::from_color_map(map_data.color_map())),
            DrawMode::FalloffMap => Some(Self::from_falloff(&FalloffField::generate(
                map_data.chunk_size(),
            ))),
            DrawMode::Mesh => None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// RGBA bytes, four per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, PreviewError> {
        let dimensions = PreviewError::Dimensions {
            width: self.width,
            height: self.height,
        };
        let (Ok(width), Ok(height)) = (u32::try_from(self.width), u32::try_from(self.height))
        else {
            return Err(dimensions);
        };

        let mut png_buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(Cursor::new(&mut png_buf), width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(png_buf)
    }

    /// Encode and write to `path`, creating parent directories.
    pub fn save_png(&self, path: &Path) -> Result<(), PreviewError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.encode_png()?)?;
        Ok(())
    }
}

/// File name for a preview of the origin chunk, or `None` for modes that
/// produce no image.
pub fn preview_file_name(mode: DrawMode) -> Option<&'static str> {
    match mode {
        DrawMode::NoiseMap => Some("noise_map.png"),
        DrawMode::ColorMap => Some("color_map.png"),
        DrawMode::FalloffMap => Some("falloff_map.png"),
        DrawMode::Mesh => None,
    }
}
