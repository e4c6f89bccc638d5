use std::borrow::Cow;
use std::convert::Infallible;

use ar_reshaper::{ArabicReshaper, ReshaperConfig};
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use rusttype::{point, Font, Scale};
use unicode_bidi::BidiInfo;

/// `embedded-graphics` draw target over a grayscale canvas. `On` paints black.
pub struct CanvasTarget<'a> {
    canvas: &'a mut GrayImage,
}

impl<'a> CanvasTarget<'a> {
    pub fn new(canvas: &'a mut GrayImage) -> Self {
        Self { canvas }
    }
}

impl OriginDimensions for CanvasTarget<'_> {
    fn size(&self) -> Size {
        Size::new(self.canvas.width(), self.canvas.height())
    }
}

impl DrawTarget for CanvasTarget<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = self.canvas.dimensions();
        for Pixel(p, color) in pixels {
            let inside = p.x >= 0 && p.y >= 0 && (p.x as u32) < w && (p.y as u32) < h;
            if color == BinaryColor::On && inside {
                self.canvas.put_pixel(p.x as u32, p.y as u32, Luma([0]));
            }
        }
        Ok(())
    }
}

// ======== RTL text ========

/// Visual-order string: BiDi runs; reshape only RTL runs.
pub fn shape_for_display(text: &str) -> Cow<'_, str> {
    let info = BidiInfo::new(text, None);
    if !info.has_rtl() {
        return Cow::Borrowed(text);
    }
    let Some(para) = info.paragraphs.first() else {
        return Cow::Borrowed(text);
    };
    let reshaper = ArabicReshaper::new(ReshaperConfig::default());
    let (levels, ranges) = info.visual_runs(para, para.range.clone());

    let mut out = String::with_capacity(text.len());
    for (level, range) in levels.into_iter().zip(ranges) {
        let slice = &text[range];
        if !level.is_rtl() {
            out.push_str(slice);
            continue;
        }
        let shaped = reshaper.reshape(slice);
        // digits inside an RTL run keep their order
        if slice.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
            out.extend(shaped.chars().rev());
        } else {
            out.push_str(&shaped);
        }
    }
    Cow::Owned(out)
}

// ======== TrueType ========

/// Tight width (right-most inked pixel) and line height of `text`.
pub fn measure_truetype(font: &Font<'_>, px: f32, text: &str) -> (u32, u32) {
    if text.is_empty() {
        return (0, 0);
    }
    let scale = Scale::uniform(px);
    let vm = font.v_metrics(scale);
    let height = (vm.ascent - vm.descent).ceil().max(0.0) as u32;
    let width = font
        .layout(text, scale, point(0.0, vm.ascent))
        .filter_map(|g| g.pixel_bounding_box().map(|bb| bb.max.x))
        .max()
        .unwrap_or(0)
        .max(0) as u32;
    (width, height)
}

/// Draw `text` with its line box top-left at (`x`, `y`), blending coverage onto the canvas.
pub fn draw_truetype(canvas: &mut GrayImage, font: &Font<'_>, px: f32, x: u32, y: u32, text: &str) {
    let scale = Scale::uniform(px);
    let ascent = font.v_metrics(scale).ascent;
    let (w, h) = canvas.dimensions();
    for g in font.layout(text, scale, point(x as f32, y as f32 + ascent)) {
        let Some(bb) = g.pixel_bounding_box() else {
            continue;
        };
        g.draw(|gx, gy, v| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px >= 0 && py >= 0 && (px as u32) < w && (py as u32) < h {
                let cur = canvas.get_pixel_mut(px as u32, py as u32);
                cur.0[0] = (f32::from(cur.0[0]) * (1.0 - v)).round() as u8;
            }
        });
    }
}

// ======== Raster helpers ========

/// Copy `img` onto `canvas` with its top-left at (`x`, `y`); out-of-bounds parts are dropped.
pub fn paste(canvas: &mut GrayImage, img: &GrayImage, x: u32, y: u32) {
    imageops::replace(canvas, img, i64::from(x), i64::from(y));
}

/// Smooth resample used for barcode scaling.
pub fn resample(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    imageops::resize(img, width.max(1), height.max(1), FilterType::Lanczos3)
}

/// Device-side blit: stretch the render raster onto a device pixel rectangle.
pub fn stretch(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width.max(1), height.max(1), FilterType::Triangle)
}

/// Hard black/white at `level` (pixels darker than it become black).
pub fn to_monochrome(img: &GrayImage, level: u8) -> GrayImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        *px = if px.0[0] < level { Luma([0]) } else { Luma([255]) };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn latin_text_is_unchanged() {
        assert!(matches!(shape_for_display("Ward 8 (55667788)"), Cow::Borrowed(_)));
    }

    #[test]
    fn arabic_text_is_reordered() {
        let shaped = shape_for_display("\u{0645}\u{0627}\u{0621}");
        assert!(matches!(shaped, Cow::Owned(_)));
        assert!(!shaped.is_empty());
    }

    #[test]
    fn canvas_target_clips_out_of_bounds() {
        let mut canvas = GrayImage::from_pixel(4, 4, Luma([255]));
        let mut target = CanvasTarget::new(&mut canvas);
        Rectangle::new(Point::new(2, 2), Size::new(10, 10))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut target)
            .unwrap();
        assert_eq!(canvas.get_pixel(3, 3).0[0], 0);
        assert_eq!(canvas.get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn paste_clips_to_canvas() {
        let mut canvas = GrayImage::from_pixel(10, 10, Luma([255]));
        let block = GrayImage::from_pixel(6, 6, Luma([0]));
        paste(&mut canvas, &block, 7, 7);
        assert_eq!(canvas.get_pixel(9, 9).0[0], 0);
        assert_eq!(canvas.get_pixel(6, 6).0[0], 255);
    }

    #[test]
    fn stretch_hits_exact_rectangle() {
        let img = GrayImage::from_pixel(650, 236, Luma([255]));
        assert_eq!(stretch(&img, 1299, 472).dimensions(), (1299, 472));
        assert_eq!(resample(&img, 0, 10).dimensions(), (1, 10));
    }

    #[test]
    fn monochrome_threshold() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([100]));
        img.put_pixel(1, 0, Luma([200]));
        let mono = to_monochrome(&img, 128);
        assert_eq!(mono.get_pixel(0, 0).0[0], 0);
        assert_eq!(mono.get_pixel(1, 0).0[0], 255);
    }
}
