use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct `#rrggbb` colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category label → hex colour
// ---------------------------------------------------------------------------

/// One legend row of a chart descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Maps category labels (groups, sexes) to distinct colours.
///
/// Built over the full label set so a label keeps its colour whichever
/// subset of labels is on screen.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, String>,
    default_color: String,
}

impl ColorMap {
    /// Build a colour map from the labels, in iteration order.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a String>) -> Self {
        let labels: Vec<&String> = labels.into_iter().collect();
        let palette = generate_palette(labels.len());
        let mapping = labels
            .into_iter()
            .zip(palette)
            .map(|(label, color)| (label.clone(), color))
            .collect();

        ColorMap {
            mapping,
            default_color: "#808080".to_string(),
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &str) -> &str {
        self.mapping
            .get(label)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }

    /// Legend rows for the given labels, in the order given.
    pub fn legend_for<'a>(&self, labels: impl IntoIterator<Item = &'a String>) -> Vec<LegendEntry> {
        labels
            .into_iter()
            .map(|label| LegendEntry {
                label: label.clone(),
                color: self.color_for(label).to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct_hex() {
        let colours = generate_palette(6);
        assert_eq!(colours.len(), 6);
        for c in &colours {
            assert_eq!(c.len(), 7);
            assert!(c.starts_with('#'));
        }
        let mut unique = colours.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 6);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn colour_is_stable_for_subsets() {
        let all: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
        let map = ColorMap::new(&all);
        let subset = map.legend_for(&all[1..]);
        assert_eq!(subset[0].label, "2");
        assert_eq!(subset[0].color, map.color_for("2"));
        assert_eq!(map.color_for("unknown"), "#808080");
    }
}
