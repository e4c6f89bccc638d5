//! Font resolution for label text.
//!
//! A [`FontChain`] is an ordered list of [`FontProvider`]s. Each provider is
//! asked in turn for a face at the requested pixel size; the first one that
//! can serve it wins. The chain always ends with [`BuiltinFont`], a set of
//! fixed bitmap faces that cannot fail, so resolving text never errors.

use std::fmt;
use std::path::{Path, PathBuf};

use embedded_graphics::{
    mono_font::{
        ascii::{
            FONT_10X20, FONT_4X6, FONT_5X7, FONT_5X8, FONT_6X10, FONT_6X12, FONT_6X13, FONT_6X9,
            FONT_7X13, FONT_7X14, FONT_8X13, FONT_9X15, FONT_9X18,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use image::GrayImage;
use rusttype::Font;

use crate::error::{LabelError, Result};
use crate::graphics::{self, CanvasTarget};

/// Ascending by height; the builtin provider picks the tallest that fits.
const BITMAP_FACES: [&MonoFont<'static>; 13] = [
    &FONT_4X6, &FONT_5X7, &FONT_5X8, &FONT_6X9, &FONT_6X10, &FONT_6X12, &FONT_6X13, &FONT_7X13,
    &FONT_8X13, &FONT_7X14, &FONT_9X15, &FONT_9X18, &FONT_10X20,
];

/// A face ready to measure and draw at one pixel size.
#[derive(Clone)]
pub enum Face {
    TrueType { font: Font<'static>, px: f32 },
    Bitmap(&'static MonoFont<'static>),
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrueType { px, .. } => write!(f, "TrueType({px}px)"),
            Self::Bitmap(font) => write!(
                f,
                "Bitmap({}x{})",
                font.character_size.width, font.character_size.height
            ),
        }
    }
}

impl Face {
    /// Pixel width and height `text` occupies when drawn. Empty text is `(0, 0)`.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        if text.is_empty() {
            return (0, 0);
        }
        match self {
            Self::TrueType { font, px } => graphics::measure_truetype(font, *px, text),
            Self::Bitmap(font) => {
                let n = text.chars().count() as u32;
                let width = n * font.character_size.width + (n - 1) * font.character_spacing;
                (width, font.character_size.height)
            }
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw(&self, canvas: &mut GrayImage, x: u32, y: u32, text: &str) {
        if text.is_empty() {
            return;
        }
        match self {
            Self::TrueType { font, px } => graphics::draw_truetype(canvas, font, *px, x, y, text),
            Self::Bitmap(font) => {
                let style = MonoTextStyle::new(*font, BinaryColor::On);
                let origin = Point::new(x as i32, y as i32);
                let mut target = CanvasTarget::new(canvas);
                let _ = Text::with_baseline(text, origin, style, Baseline::Top).draw(&mut target);
            }
        }
    }
}

pub trait FontProvider: Send + Sync {
    /// Human-readable name used in logs and layout reports.
    fn name(&self) -> &str;

    /// A face at `px` pixels, or why this provider cannot serve it.
    fn face(&self, px: f32) -> Result<Face>;
}

/// A TrueType/OpenType file, parsed once when the provider is built.
pub struct TrueTypeFile {
    name: String,
    font: std::result::Result<Font<'static>, String>,
}

impl TrueTypeFile {
    /// Never fails: an unreadable file becomes a provider that declines every request.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let font = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                Font::try_from_vec(bytes).ok_or_else(|| "not a valid font".to_string())
            });
        if let Err(reason) = &font {
            tracing::debug!(path = %path.display(), %reason, "font file unavailable");
        }
        Self {
            name: path.display().to_string(),
            font,
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            font: Font::try_from_vec(bytes).ok_or_else(|| "not a valid font".to_string()),
        }
    }
}

impl FontProvider for TrueTypeFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn face(&self, px: f32) -> Result<Face> {
        match &self.font {
            Ok(font) => Ok(Face::TrueType {
                font: font.clone(),
                px,
            }),
            Err(reason) => Err(LabelError::Font(format!("{}: {reason}", self.name))),
        }
    }
}

/// Fixed-size bitmap faces compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFont;

impl BuiltinFont {
    /// Tallest bitmap face no taller than `px`, or the smallest one.
    pub fn select(px: f32) -> &'static MonoFont<'static> {
        let target = px.round().max(0.0) as u32;
        BITMAP_FACES
            .iter()
            .rev()
            .find(|f| f.character_size.height <= target)
            .copied()
            .unwrap_or(BITMAP_FACES[0])
    }
}

impl FontProvider for BuiltinFont {
    fn name(&self) -> &str {
        "builtin"
    }

    fn face(&self, px: f32) -> Result<Face> {
        Ok(Face::Bitmap(Self::select(px)))
    }
}

/// A provider that was skipped while resolving a face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFallback {
    pub provider: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedFace {
    pub face: Face,
    /// Name of the provider that served the face.
    pub provider: String,
    /// Providers tried before it, in order.
    pub skipped: Vec<FontFallback>,
}

pub struct FontChain {
    providers: Vec<Box<dyn FontProvider>>,
}

impl FontChain {
    /// `providers` in priority order; the builtin bitmap faces are appended.
    pub fn new(providers: Vec<Box<dyn FontProvider>>) -> Self {
        let mut providers = providers;
        providers.push(Box::new(BuiltinFont));
        Self { providers }
    }

    /// Preferred file first, then the fallback files, then the builtin faces.
    pub fn from_paths(preferred: Option<&Path>, fallbacks: &[PathBuf]) -> Self {
        let providers = preferred
            .into_iter()
            .chain(fallbacks.iter().map(PathBuf::as_path))
            .map(|p| Box::new(TrueTypeFile::load(p)) as Box<dyn FontProvider>)
            .collect();
        Self::new(providers)
    }

    /// Only the builtin bitmap faces. Fully deterministic metrics.
    pub fn builtin() -> Self {
        Self::new(Vec::new())
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn resolve(&self, px: f32) -> ResolvedFace {
        let mut skipped = Vec::new();
        for provider in &self.providers {
            match provider.face(px) {
                Ok(face) => {
                    if !skipped.is_empty() {
                        tracing::debug!(
                            provider = provider.name(),
                            skipped = skipped.len(),
                            "font fallback"
                        );
                    }
                    return ResolvedFace {
                        face,
                        provider: provider.name().to_string(),
                        skipped,
                    };
                }
                Err(e) => skipped.push(FontFallback {
                    provider: provider.name().to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        // unreachable in practice: the chain ends with BuiltinFont
        ResolvedFace {
            face: BuiltinFont.face(px).unwrap_or(Face::Bitmap(BITMAP_FACES[0])),
            provider: BuiltinFont.name().to_string(),
            skipped,
        }
    }
}

impl Default for FontChain {
    fn default() -> Self {
        Self::from_paths(None, &system_fallbacks())
    }
}

/// Common sans faces per platform, tried after the preferred font.
pub fn system_fallbacks() -> Vec<PathBuf> {
    let candidates: &[&str] = if cfg!(windows) {
        &[r"C:\Windows\Fonts\calibri.ttf", r"C:\Windows\Fonts\arial.ttf"]
    } else if cfg!(target_os = "macos") {
        &["/System/Library/Fonts/Supplemental/Arial.ttf", "/Library/Fonts/Arial.ttf"]
    } else {
        &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        ]
    };
    candidates.iter().map(PathBuf::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_picks_tallest_face_that_fits() {
        assert_eq!(BuiltinFont::select(16.0).character_size.height, 15);
        assert_eq!(BuiltinFont::select(12.0).character_size.height, 12);
        assert_eq!(BuiltinFont::select(40.0).character_size.height, 20);
        assert_eq!(BuiltinFont::select(2.0).character_size.height, 6);
    }

    #[test]
    fn bitmap_measure_counts_characters() {
        let face = Face::Bitmap(&FONT_9X15);
        assert_eq!(face.measure("55667788"), (72, 15));
        assert_eq!(face.measure(""), (0, 0));
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let chain = FontChain::from_paths(Some(Path::new("/nonexistent/Calibri.ttf")), &[]);
        let resolved = chain.resolve(16.0);
        assert_eq!(resolved.provider, "builtin");
        assert_eq!(resolved.skipped.len(), 1);
        assert!(resolved.skipped[0].provider.contains("Calibri.ttf"));
        assert!(matches!(resolved.face, Face::Bitmap(_)));
    }

    #[test]
    fn garbage_bytes_are_declined() {
        let chain = FontChain::new(vec![Box::new(TrueTypeFile::from_bytes(
            "junk",
            b"not a font".to_vec(),
        ))]);
        let resolved = chain.resolve(12.0);
        assert_eq!(resolved.provider, "builtin");
        assert_eq!(resolved.skipped[0].provider, "junk");
    }

    #[test]
    fn builtin_chain_has_single_provider() {
        assert_eq!(FontChain::builtin().provider_names(), vec!["builtin"]);
        assert!(FontChain::builtin().resolve(16.0).skipped.is_empty());
    }

    #[test]
    fn bitmap_draw_leaves_ink() {
        let mut canvas = GrayImage::from_pixel(100, 30, image::Luma([255]));
        let face = Face::Bitmap(BuiltinFont::select(16.0));
        face.draw(&mut canvas, 5, 5, "55667788");
        assert!(canvas.pixels().any(|p| p.0[0] == 0));
    }
}
