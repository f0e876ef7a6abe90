//! Square falloff mask that pushes terrain down toward the chunk edges.

/// Steepness of the falloff curve.
const FALLOFF_EXPONENT: f32 = 3.0;
/// Shift of the curve's midpoint toward the edge.
const FALLOFF_SHIFT: f32 = 2.2;

/// A seed-independent `size × size` attenuation mask, row-major.
///
/// Values are near 0 in the middle and approach 1 at the border.
#[derive(Clone, Debug, PartialEq)]
pub struct FalloffField {
    size: usize,
    values: Vec<f32>,
}

impl FalloffField {
    /// Generate the standard falloff mask.
    pub fn generate(size: usize) -> Self {
        let mut values = Vec::with_capacity(size * size);
        for j in 0..size {
            for i in 0..size {
                let x = i as f32 / size as f32 * 2.0 - 1.0;
                let y = j as f32 / size as f32 * 2.0 - 1.0;
                values.push(evaluate(x.abs().max(y.abs())));
            }
        }
        Self { size, values }
    }

    /// A mask with every cell set to `value`.
    pub fn filled(size: usize, value: f32) -> Self {
        Self {
            size,
            values: vec![value; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.size + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

fn evaluate(value: f32) -> f32 {
    let a = FALLOFF_EXPONENT;
    let b = FALLOFF_SHIFT;
    let rise = value.powf(a);
    rise / (rise + (b - b * value).powf(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_low_edges_high() {
        let field = FalloffField::generate(101);
        assert!(field.get(50, 50) < 0.01, "center = {}", field.get(50, 50));
        assert!(field.get(0, 50) > 0.99, "edge = {}", field.get(0, 50));
        assert!(field.get(50, 0) > 0.99);
    }

    #[test]
    fn test_values_within_unit_range() {
        let field = FalloffField::generate(64);
        assert_eq!(field.values().len(), 64 * 64);
        assert!(field.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_symmetric_about_diagonal() {
        let field = FalloffField::generate(33);
        for y in 0..33 {
            for x in 0..33 {
                assert_eq!(field.get(x, y), field.get(y, x));
            }
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(FalloffField::generate(48), FalloffField::generate(48));
    }
}
