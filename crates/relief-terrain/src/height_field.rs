//! Row-major 2D grids for heights and classified colors.

use crate::region::Color;

/// A 2D grid of height samples stored row-major (`index = y * width + x`).
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl HeightField {
    /// Create a field with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    /// Wrap existing row-major samples.
    ///
    /// Returns `None` if `values.len() != width * height`.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Option<Self> {
        (values.len() == width * height).then_some(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the field.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the field.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.values[y * self.width + x] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Copy of the top-left `size × size` square.
    ///
    /// # Panics
    ///
    /// Panics if `size` exceeds either dimension.
    pub fn trimmed(&self, size: usize) -> HeightField {
        assert!(size <= self.width && size <= self.height);
        let mut values = Vec::with_capacity(size * size);
        for y in 0..size {
            let row = y * self.width;
            values.extend_from_slice(&self.values[row..row + size]);
        }
        HeightField {
            width: size,
            height: size,
            values,
        }
    }

    /// Smallest and largest sample, or `None` for an empty field.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.values.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// A square, row-major grid of classified colors (`index = y * size + x`).
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    size: usize,
    colors: Vec<Color>,
}

impl ColorMap {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            size,
            colors: vec![Color::default(); size * size],
        }
    }

    #[inline]
    pub(crate) fn set(&mut self, x: usize, y: usize, color: Color) {
        self.colors[y * self.size + x] = color;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Color {
        self.colors[y * self.size + x]
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Flatten into RGBA bytes, row-major.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.to_rgba()).collect()
    }
}
