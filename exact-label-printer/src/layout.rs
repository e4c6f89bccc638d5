//! Composes the barcode and text lines onto one canvas at render resolution.
//!
//! Layout is barcode-first: the barcode block sits at the top of the canvas,
//! horizontally centered, and each text line stacks directly below the
//! previous element. Content that runs past the canvas bottom is still drawn
//! (and clipped) but reported as [`Overflow`].

use chrono::{Local, NaiveDateTime};
use image::{imageops, GrayImage, Luma};

use crate::barcode::SymbolSource;
use crate::error::Result;
use crate::fonts::{FontChain, FontFallback};
use crate::graphics::{self, shape_for_display};
use crate::label::LabelSpec;
use crate::template;
use crate::units::PhysicalSize;

/// A pixel box in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePlacement {
    /// Line content after placeholder expansion.
    pub text: String,
    pub rect: Placement,
    /// Font provider that served this line.
    pub font: String,
}

/// Content extends below or past the right edge of the canvas and will
/// print truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub content_bottom: u32,
    pub canvas_height: u32,
    pub content_right: u32,
    pub canvas_width: u32,
}

impl Overflow {
    /// Rows cut off at the bottom.
    pub fn excess(&self) -> u32 {
        self.content_bottom.saturating_sub(self.canvas_height)
    }

    /// Columns cut off at the right.
    pub fn horizontal_excess(&self) -> u32 {
        self.content_right.saturating_sub(self.canvas_width)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutReport {
    pub barcode: Placement,
    pub lines: Vec<LinePlacement>,
    pub overflow: Option<Overflow>,
    pub font_fallbacks: Vec<FontFallback>,
}

impl LayoutReport {
    /// Lowest edge of all placed content.
    pub fn content_bottom(&self) -> u32 {
        self.lines
            .iter()
            .map(|l| l.rect.bottom())
            .fold(self.barcode.bottom(), u32::max)
    }

    /// Rightmost edge of all placed content.
    pub fn content_right(&self) -> u32 {
        self.lines
            .iter()
            .map(|l| l.rect.right())
            .fold(self.barcode.right(), u32::max)
    }
}

/// The composed raster plus what is needed to reproduce it at physical size.
#[derive(Debug, Clone)]
pub struct ComposedLabel {
    raster: GrayImage,
    size: PhysicalSize,
    render_dpi: f64,
    report: LayoutReport,
}

impl ComposedLabel {
    pub fn raster(&self) -> &GrayImage {
        &self.raster
    }

    pub fn into_raster(self) -> GrayImage {
        self.raster
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn physical_size(&self) -> PhysicalSize {
        self.size
    }

    pub fn render_dpi(&self) -> f64 {
        self.render_dpi
    }

    pub fn report(&self) -> &LayoutReport {
        &self.report
    }

    pub fn overflow(&self) -> Option<Overflow> {
        self.report.overflow
    }
}

pub struct LayoutEngine<S> {
    source: S,
    fonts: FontChain,
}

impl<S: SymbolSource> LayoutEngine<S> {
    pub fn new(source: S, fonts: FontChain) -> Self {
        Self { source, fonts }
    }

    pub fn fonts(&self) -> &FontChain {
        &self.fonts
    }

    /// Compose with the local clock for date/time placeholders.
    pub fn compose(&self, spec: &LabelSpec) -> Result<ComposedLabel> {
        self.compose_at(spec, Local::now().naive_local())
    }

    pub fn compose_at(&self, spec: &LabelSpec, now: NaiveDateTime) -> Result<ComposedLabel> {
        spec.validate()?;
        let (w, h) = spec.canvas_size()?;
        let mut canvas = GrayImage::from_pixel(w, h, Luma([255]));

        let barcode = self.place_barcode(&mut canvas, spec)?;
        let mut report = LayoutReport {
            barcode,
            ..LayoutReport::default()
        };

        let mut cursor = barcode.bottom();
        for line in &spec.lines {
            let text = template::expand(&line.text, &spec.barcode.data, &now);
            let visible = shape_for_display(text.trim()).into_owned();
            let resolved = self.fonts.resolve(line.font_px);
            let (lw, lh) = resolved.face.measure(&visible);

            let rect = Placement {
                x: center_x(w, lw),
                y: cursor,
                width: lw,
                height: lh,
            };
            resolved.face.draw(&mut canvas, rect.x, rect.y, &visible);
            tracing::debug!(
                text = %text,
                x = rect.x,
                y = rect.y,
                width = lw,
                height = lh,
                font = %resolved.provider,
                "placed text line"
            );

            report.font_fallbacks.extend(resolved.skipped);
            report.lines.push(LinePlacement {
                text,
                rect,
                font: resolved.provider,
            });
            cursor = rect.bottom() + spec.line_gap;
        }

        let (bottom, right) = (report.content_bottom(), report.content_right());
        if bottom > h || right > w {
            tracing::warn!(
                content_bottom = bottom,
                canvas_height = h,
                content_right = right,
                canvas_width = w,
                "label content exceeds the label and will print truncated"
            );
            report.overflow = Some(Overflow {
                content_bottom: bottom,
                canvas_height: h,
                content_right: right,
                canvas_width: w,
            });
        }

        Ok(ComposedLabel {
            raster: canvas,
            size: spec.physical_size(),
            render_dpi: spec.render_dpi,
            report,
        })
    }

    /// Encode, crop to the top `k` of the raster, scale to the target height
    /// (width clamped to the ratio bound), paste centered at the top.
    fn place_barcode(&self, canvas: &mut GrayImage, spec: &LabelSpec) -> Result<Placement> {
        let bc = &spec.barcode;
        let symbol = self.source.encode(&bc.data, bc.symbology)?;
        let (bw, bh) = (symbol.width(), symbol.height());

        let keep_h = ((f64::from(bh) * bc.crop_ratio).floor() as u32).clamp(1, bh.max(1));
        let cropped = imageops::crop_imm(&symbol.raster, 0, 0, bw, keep_h).to_image();

        let target_h = spec.barcode_height_px()?;
        let aspect_w = (f64::from(target_h) * f64::from(bw) / f64::from(keep_h)).floor() as u32;
        let max_w = (f64::from(canvas.width()) * bc.max_width_ratio).floor() as u32;
        let target_w = aspect_w.min(max_w).max(1);
        if aspect_w > max_w {
            tracing::debug!(aspect_w, max_w, "barcode width clamped to label ratio");
        }

        let scaled = graphics::resample(&cropped, target_w, target_h);
        let placement = Placement {
            x: center_x(canvas.width(), target_w),
            y: 0,
            width: target_w,
            height: target_h,
        };
        graphics::paste(canvas, &scaled, placement.x, placement.y);
        Ok(placement)
    }
}

fn center_x(canvas_w: u32, obj_w: u32) -> u32 {
    canvas_w.saturating_sub(obj_w) / 2
}
