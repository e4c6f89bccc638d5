//! Physical length <-> pixel count conversion.
//!
//! Resolutions are always pixels per inch; lengths carry their own unit.

use serde::{Deserialize, Serialize};

use crate::error::{invalid, Result};

/// Length unit used for physical label dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    #[serde(alias = "cm")]
    Centimeter,
    #[serde(alias = "mm")]
    Millimeter,
    #[serde(alias = "in")]
    Inch,
}

impl LengthUnit {
    /// How many of this unit make one inch.
    pub const fn per_inch(self) -> f64 {
        match self {
            Self::Centimeter => 2.54,
            Self::Millimeter => 25.4,
            Self::Inch => 1.0,
        }
    }
}

/// Width and height of a label in real-world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub unit: LengthUnit,
}

impl PhysicalSize {
    pub const fn new(width: f64, height: f64, unit: LengthUnit) -> Self {
        Self {
            width,
            height,
            unit,
        }
    }

    /// Pixel dimensions of this size on a grid with the given per-axis densities.
    pub fn to_pixels(&self, dpi_x: f64, dpi_y: f64) -> Result<(u32, u32)> {
        Ok((
            to_pixels(self.width, self.unit, dpi_x)?,
            to_pixels(self.height, self.unit, dpi_y)?,
        ))
    }
}

/// `round(length / units_per_inch * dpi)`.
pub fn to_pixels(length: f64, unit: LengthUnit, dpi: f64) -> Result<u32> {
    require_positive("length", length)?;
    require_positive("resolution", dpi)?;
    let px = (length / unit.per_inch() * dpi).round();
    if px > f64::from(u32::MAX) {
        return Err(invalid(format!(
            "{length} {unit:?} at {dpi} dpi does not fit a pixel grid"
        )));
    }
    Ok(px as u32)
}

/// Inverse of [`to_pixels`], up to its rounding error.
pub fn to_length(pixels: u32, unit: LengthUnit, dpi: f64) -> Result<f64> {
    require_positive("resolution", dpi)?;
    Ok(f64::from(pixels) / dpi * unit.per_inch())
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be a positive finite number, got {value}")))
    }
}
