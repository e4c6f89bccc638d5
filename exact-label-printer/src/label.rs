//! Label definition: physical size, render resolution, barcode, text lines.

use serde::{Deserialize, Serialize};

use crate::barcode::Symbology;
use crate::consts::{BARCODE_HEIGHT_CM, BARCODE_WIDTH_RATIO, CROP_KEEP, LINE_GAP_PX, RENDER_DPI};
use crate::error::{invalid, Result};
use crate::units::{self, LengthUnit, PhysicalSize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub unit: LengthUnit,
    /// Pixels per inch of the composed raster.
    #[serde(default = "default_render_dpi")]
    pub render_dpi: f64,
    pub barcode: BarcodeSpec,
    #[serde(default)]
    pub lines: Vec<TextLine>,
    /// Vertical pixels between stacked elements.
    #[serde(default = "default_line_gap")]
    pub line_gap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeSpec {
    pub data: String,
    #[serde(default)]
    pub symbology: Symbology,
    /// Fraction of the encoded raster's height kept, from the top.
    #[serde(default = "default_crop")]
    pub crop_ratio: f64,
    /// Target height, in the label's unit.
    #[serde(default = "default_barcode_height")]
    pub height: f64,
    /// Upper bound on barcode width as a fraction of label width.
    #[serde(default = "default_width_ratio")]
    pub max_width_ratio: f64,
}

/// One stacked text line. `text` may contain `{barcode}`, `{date}`, `{time}`
/// and `{datetime}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub font_px: f32,
}

impl TextLine {
    pub fn new(text: impl Into<String>, font_px: f32) -> Self {
        Self {
            text: text.into(),
            font_px,
        }
    }
}

fn default_render_dpi() -> f64 {
    RENDER_DPI
}

fn default_line_gap() -> u32 {
    LINE_GAP_PX
}

fn default_crop() -> f64 {
    CROP_KEEP
}

fn default_barcode_height() -> f64 {
    BARCODE_HEIGHT_CM
}

fn default_width_ratio() -> f64 {
    BARCODE_WIDTH_RATIO
}

impl BarcodeSpec {
    pub fn new(data: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            data: data.into(),
            symbology,
            crop_ratio: CROP_KEEP,
            height: BARCODE_HEIGHT_CM,
            max_width_ratio: BARCODE_WIDTH_RATIO,
        }
    }
}

impl LabelSpec {
    /// A label in centimeters at the default render resolution, no text lines.
    pub fn new(width_cm: f64, height_cm: f64, barcode: BarcodeSpec) -> Self {
        Self {
            width: width_cm,
            height: height_cm,
            unit: LengthUnit::Centimeter,
            render_dpi: RENDER_DPI,
            barcode,
            lines: Vec::new(),
            line_gap: LINE_GAP_PX,
        }
    }

    pub fn with_render_dpi(mut self, dpi: f64) -> Self {
        self.render_dpi = dpi;
        self
    }

    pub fn with_line(mut self, text: impl Into<String>, font_px: f32) -> Self {
        self.lines.push(TextLine::new(text, font_px));
        self
    }

    pub fn physical_size(&self) -> PhysicalSize {
        PhysicalSize::new(self.width, self.height, self.unit)
    }

    /// Canvas pixel dimensions at the render resolution.
    pub fn canvas_size(&self) -> Result<(u32, u32)> {
        self.physical_size().to_pixels(self.render_dpi, self.render_dpi)
    }

    /// Barcode target height in canvas pixels.
    pub fn barcode_height_px(&self) -> Result<u32> {
        units::to_pixels(self.barcode.height, self.unit, self.render_dpi)
    }

    /// Rejects anything that cannot produce a sensible canvas.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.canvas_size()?;
        if w == 0 || h == 0 {
            return Err(invalid(format!(
                "label {}x{} {:?} at {} dpi rounds to an empty canvas",
                self.width, self.height, self.unit, self.render_dpi
            )));
        }
        if self.barcode.data.trim().is_empty() {
            return Err(invalid("barcode data is empty"));
        }
        let k = self.barcode.crop_ratio;
        if !(k > 0.0 && k <= 1.0) {
            return Err(invalid(format!("crop ratio must be in (0, 1], got {k}")));
        }
        let r = self.barcode.max_width_ratio;
        if !(r > 0.0 && r <= 1.0) {
            return Err(invalid(format!("barcode width ratio must be in (0, 1], got {r}")));
        }
        if self.barcode_height_px()? == 0 {
            return Err(invalid("barcode height rounds to zero pixels"));
        }
        for (i, line) in self.lines.iter().enumerate() {
            if !(line.font_px.is_finite() && line.font_px > 0.0) {
                return Err(invalid(format!(
                    "line {} font size must be positive, got {}",
                    i + 1,
                    line.font_px
                )));
            }
        }
        Ok(())
    }
}
