//! Height-threshold classification: maps a normalized height to a region color.

use serde::{Deserialize, Serialize};

/// An 8-bit RGBA color.
///
/// The default value is fully transparent black, which is also what
/// [`RegionClassifier::classify`] yields for heights below every threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Returns the channels as `[r, g, b, a]`.
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A single classification rule: heights at or above `min_height` take `color`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionThreshold {
    /// Human-readable region name (e.g., "shallow_water").
    pub name: String,
    /// Lowest height (inclusive) that belongs to this region.
    pub min_height: f32,
    /// Color written to the color map for this region.
    pub color: Color,
}

impl RegionThreshold {
    pub fn new(name: impl Into<String>, min_height: f32, color: Color) -> Self {
        Self {
            name: name.into(),
            min_height,
            color,
        }
    }
}

/// The default region table, lowest threshold first.
pub fn default_regions() -> Vec<RegionThreshold> {
    vec![
        RegionThreshold::new("deep_water", 0.0, Color::rgb(50, 99, 195)),
        RegionThreshold::new("shallow_water", 0.3, Color::rgb(54, 103, 199)),
        RegionThreshold::new("sand", 0.4, Color::rgb(210, 208, 125)),
        RegionThreshold::new("grass", 0.45, Color::rgb(86, 152, 23)),
        RegionThreshold::new("forest", 0.55, Color::rgb(62, 107, 18)),
        RegionThreshold::new("rock", 0.6, Color::rgb(90, 69, 60)),
        RegionThreshold::new("high_rock", 0.7, Color::rgb(75, 60, 53)),
        RegionThreshold::new("snow", 0.9, Color::rgb(255, 255, 255)),
    ]
}

/// Classifies heights against an ordered region table.
///
/// The table must be sorted ascending by `min_height`. Settings validation
/// rejects unsorted tables before a classifier is ever built from them.
#[derive(Clone, Debug)]
pub struct RegionClassifier {
    regions: Vec<RegionThreshold>,
}

impl RegionClassifier {
    pub fn new(regions: Vec<RegionThreshold>) -> Self {
        Self { regions }
    }

    /// Returns the color of the highest region whose `min_height <= height`.
    ///
    /// Scans from the lowest threshold upward and stops at the first region
    /// that does not match. A height below every threshold yields
    /// [`Color::default()`]; tables need a `min_height = 0.0` entry for total
    /// coverage of `[0, 1]`.
    pub fn classify(&self, height: f32) -> Color {
        self.classify_index(height)
            .map(|i| self.regions[i].color)
            .unwrap_or_default()
    }

    /// Index of the matching region, or `None` if `height` is below every threshold.
    pub fn classify_index(&self, height: f32) -> Option<usize> {
        let mut matched = None;
        for (i, region) in self.regions.iter().enumerate() {
            if height >= region.min_height {
                matched = Some(i);
            } else {
                break;
            }
        }
        matched
    }

    pub fn regions(&self) -> &[RegionThreshold] {
        &self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_band() -> RegionClassifier {
        RegionClassifier::new(vec![
            RegionThreshold::new("water", 0.0, Color::BLUE),
            RegionThreshold::new("land", 0.4, Color::GREEN),
            RegionThreshold::new("snow", 0.8, Color::WHITE),
        ])
    }

    #[test]
    fn test_classify_picks_greatest_threshold_at_or_below() {
        let c = three_band();
        assert_eq!(c.classify(0.0), Color::BLUE);
        assert_eq!(c.classify(0.39), Color::BLUE);
        assert_eq!(c.classify(0.4), Color::GREEN);
        assert_eq!(c.classify(0.5), Color::GREEN);
        assert_eq!(c.classify(0.8), Color::WHITE);
        assert_eq!(c.classify(1.0), Color::WHITE);
    }

    #[test]
    fn test_classify_index_monotonic_in_height() {
        let c = RegionClassifier::new(default_regions());
        let mut previous = 0;
        for step in 0..=1000 {
            let h = step as f32 / 1000.0;
            let idx = c.classify_index(h).expect("table starts at 0.0");
            assert!(
                idx >= previous,
                "Region index decreased at h={h}: {idx} < {previous}"
            );
            assert!(c.regions()[idx].min_height <= h);
            if let Some(next) = c.regions().get(idx + 1) {
                assert!(next.min_height > h);
            }
            previous = idx;
        }
    }

    #[test]
    fn test_height_below_all_thresholds_yields_default() {
        let c = RegionClassifier::new(vec![
            RegionThreshold::new("land", 0.2, Color::GREEN),
            RegionThreshold::new("snow", 0.8, Color::WHITE),
        ]);
        assert_eq!(c.classify_index(0.1), None);
        assert_eq!(c.classify(0.1), Color::default());
    }

    #[test]
    fn test_empty_table_yields_default() {
        let c = RegionClassifier::new(Vec::new());
        assert_eq!(c.classify(0.5), Color::default());
    }

    #[test]
    fn test_equal_thresholds_last_one_wins() {
        let c = RegionClassifier::new(vec![
            RegionThreshold::new("a", 0.0, Color::BLUE),
            RegionThreshold::new("b", 0.5, Color::GREEN),
            RegionThreshold::new("c", 0.5, Color::WHITE),
        ]);
        assert_eq!(c.classify(0.5), Color::WHITE);
    }

    #[test]
    fn test_default_regions_sorted_and_cover_zero() {
        let regions = default_regions();
        assert_eq!(regions[0].min_height, 0.0);
        assert!(regions.windows(2).all(|w| w[0].min_height <= w[1].min_height));
    }
}
