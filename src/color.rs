use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::MONTH_NAMES;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Marker colour for habitat locations.
pub const HABITAT_COLOR: Color32 = Color32::from_rgb(34, 139, 34);

// ---------------------------------------------------------------------------
// Month colouring for wildfire markers
// ---------------------------------------------------------------------------

/// One colour per calendar month, plus a neutral one for unknown months.
#[derive(Debug, Clone)]
pub struct MonthPalette {
    colors: Vec<Color32>,
    unknown: Color32,
}

impl Default for MonthPalette {
    fn default() -> Self {
        MonthPalette {
            colors: generate_palette(MONTH_NAMES.len()),
            unknown: Color32::GRAY,
        }
    }
}

impl MonthPalette {
    pub fn color_for(&self, month: Option<u32>) -> Color32 {
        month
            .and_then(|m| m.checked_sub(1))
            .and_then(|i| self.colors.get(i as usize))
            .copied()
            .unwrap_or(self.unknown)
    }

    /// Legend entries (month label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(&'static str, Color32)> {
        MONTH_NAMES
            .iter()
            .zip(self.colors.iter())
            .map(|(name, c)| (*name, *c))
            .collect()
    }
}
