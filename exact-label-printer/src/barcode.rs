//! Barcode symbol encoding into a grayscale raster.
//!
//! The layout engine only sees [`SymbolSource`]; [`RasterEncoder`] is the
//! built-in implementation for Code 128 and EAN-13.

use std::fmt;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::consts::{BARCODE_BAR_HEIGHT_PX, BARCODE_MODULE_PX, BARCODE_QUIET_ZONE};
use crate::error::{LabelError, Result};
use crate::graphics::CanvasTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    #[default]
    Code128,
    Ean13,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code128 => f.write_str("Code 128"),
            Self::Ean13 => f.write_str("EAN-13"),
        }
    }
}

/// Raster produced by a symbol encoder. Black bars on white.
#[derive(Debug, Clone)]
pub struct EncodedSymbol {
    pub raster: GrayImage,
}

impl EncodedSymbol {
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }
}

/// Anything that can turn barcode data into a raster.
pub trait SymbolSource {
    fn encode(&self, data: &str, symbology: Symbology) -> Result<EncodedSymbol>;
}

/// Raster geometry used by [`RasterEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Width of one module in pixels.
    pub module_px: u32,
    pub bar_height_px: u32,
    /// Blank modules on each side of the symbol.
    pub quiet_zone: u32,
    /// Print the data in digits below the bars.
    pub human_readable: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            module_px: BARCODE_MODULE_PX,
            bar_height_px: BARCODE_BAR_HEIGHT_PX,
            quiet_zone: BARCODE_QUIET_ZONE,
            human_readable: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RasterEncoder {
    options: RasterOptions,
}

impl RasterEncoder {
    pub fn new(options: RasterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RasterOptions {
        self.options
    }
}

impl SymbolSource for RasterEncoder {
    fn encode(&self, data: &str, symbology: Symbology) -> Result<EncodedSymbol> {
        let fail = |reason: String| LabelError::Encoding {
            data: data.to_string(),
            symbology,
            reason,
        };
        let (modules, text) = match symbology {
            Symbology::Code128 => (code128_modules(data).map_err(fail)?, data.to_string()),
            Symbology::Ean13 => {
                let full = ean13_with_checksum(data).map_err(fail)?;
                (ean13_modules(&full), full)
            }
        };
        let raster = rasterize(&modules, &text, &self.options);
        tracing::debug!(
            %symbology,
            modules = modules.len(),
            width = raster.width(),
            height = raster.height(),
            "encoded barcode"
        );
        Ok(EncodedSymbol { raster })
    }
}

fn rasterize(modules: &[bool], text: &str, opts: &RasterOptions) -> GrayImage {
    let m = opts.module_px.max(1);
    let bar_h = opts.bar_height_px.max(1);
    let width = (modules.len() as u32 + 2 * opts.quiet_zone) * m;
    let text_band = if opts.human_readable {
        FONT_10X20.character_size.height + 4
    } else {
        0
    };
    let mut img = GrayImage::from_pixel(width, bar_h + text_band, Luma([255]));

    for (i, _) in modules.iter().enumerate().filter(|(_, dark)| **dark) {
        let x0 = (opts.quiet_zone + i as u32) * m;
        for x in x0..x0 + m {
            for y in 0..bar_h {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    if opts.human_readable {
        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let text_w = text.chars().count() as i32 * FONT_10X20.character_size.width as i32;
        let x = (width as i32 - text_w) / 2;
        let mut target = CanvasTarget::new(&mut img);
        let _ = Text::with_baseline(text, Point::new(x, bar_h as i32 + 2), style, Baseline::Top)
            .draw(&mut target);
    }
    img
}

// ======== Code 128 ========

/// Bar/space widths for symbol values 0..=105, each summing to 11 modules.
const CODE128_PATTERNS: [&[u8; 6]; 106] = [
    b"212222", b"222122", b"222221", b"121223", b"121322", b"131222", b"122213", b"122312",
    b"132212", b"221213", b"221312", b"231212", b"112232", b"122132", b"122231", b"113222",
    b"123122", b"123221", b"223211", b"221132", b"221231", b"213212", b"223112", b"312131",
    b"311222", b"321122", b"321221", b"312212", b"322112", b"322211", b"212123", b"212321",
    b"232121", b"111323", b"131123", b"131321", b"112313", b"132113", b"132311", b"211313",
    b"231113", b"231311", b"112133", b"112331", b"132131", b"113123", b"113321", b"133121",
    b"313121", b"211331", b"231131", b"213113", b"213311", b"213131", b"311123", b"311321",
    b"331121", b"312113", b"312311", b"332111", b"314111", b"221411", b"431111", b"111224",
    b"111422", b"121124", b"121421", b"141122", b"141221", b"112214", b"112412", b"122114",
    b"122411", b"142112", b"142211", b"241211", b"221114", b"413111", b"241112", b"134111",
    b"111242", b"121142", b"121241", b"114212", b"124112", b"124211", b"411212", b"421112",
    b"421211", b"212141", b"214121", b"412121", b"111143", b"111341", b"131141", b"114113",
    b"114311", b"411113", b"411311", b"113141", b"114131", b"311141", b"411131", b"211412",
    b"211214", b"211232",
];
const CODE128_STOP: &[u8; 7] = b"2331112";
const START_B: u8 = 104;
const START_C: u8 = 105;
/// Switches from subset C to subset B.
const CODE_B: u8 = 100;

/// Symbol values for `data`, start code first, checksum last, stop excluded.
///
/// All-digit data of two or more digits uses subset C; an odd trailing digit
/// switches to subset B for the last symbol. Everything else is subset B.
pub fn code128_values(data: &str) -> Result<Vec<u8>, String> {
    if data.is_empty() {
        return Err("no data".into());
    }
    let mut values = Vec::with_capacity(data.len() + 3);
    let bytes = data.as_bytes();
    if bytes.len() >= 2 && bytes.iter().all(u8::is_ascii_digit) {
        values.push(START_C);
        let mut pairs = bytes.chunks_exact(2);
        for pair in pairs.by_ref() {
            values.push((pair[0] - b'0') * 10 + (pair[1] - b'0'));
        }
        if let [last] = pairs.remainder() {
            values.push(CODE_B);
            values.push(last - b' ');
        }
    } else {
        values.push(START_B);
        for ch in data.chars() {
            match ch {
                ' '..='~' => values.push(ch as u8 - b' '),
                other => return Err(format!("character {other:?} is outside Code 128 set B")),
            }
        }
    }
    let sum = values
        .iter()
        .enumerate()
        .map(|(i, &v)| u32::from(v) * (i as u32).max(1))
        .sum::<u32>();
    values.push((sum % 103) as u8);
    Ok(values)
}

pub fn code128_modules(data: &str) -> Result<Vec<bool>, String> {
    let values = code128_values(data)?;
    let mut modules = Vec::with_capacity(values.len() * 11 + 13);
    for &v in &values {
        push_widths(&mut modules, CODE128_PATTERNS[v as usize]);
    }
    push_widths(&mut modules, CODE128_STOP);
    Ok(modules)
}

fn push_widths(out: &mut Vec<bool>, widths: &[u8]) {
    for (i, w) in widths.iter().enumerate() {
        let dark = i % 2 == 0;
        out.extend(std::iter::repeat(dark).take(usize::from(w - b'0')));
    }
}

// ======== EAN-13 ========

const EAN_L: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];
const EAN_G: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
    "0001001", "0010111",
];
const EAN_R: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
    "1001000", "1110100",
];
/// Left-half parity per leading digit, `G` marks even parity.
const EAN_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

/// Check digit for the first 12 digits of an EAN-13 code.
pub fn ean13_check_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .take(12)
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    (10 - (sum % 10)) % 10
}

/// Accepts 12 digits (check digit appended) or 13 digits (check digit verified).
pub fn ean13_with_checksum(code: &str) -> Result<String, String> {
    let digits = code
        .chars()
        .map(|c| c.to_digit(10).ok_or_else(|| format!("{c:?} is not a digit")))
        .collect::<Result<Vec<u32>, String>>()?;
    match digits.len() {
        12 => Ok(format!("{code}{}", ean13_check_digit(&digits))),
        13 => {
            let expected = ean13_check_digit(&digits);
            if digits[12] == expected {
                Ok(code.to_string())
            } else {
                Err(format!("check digit {} should be {expected}", digits[12]))
            }
        }
        n => Err(format!("expected 12 or 13 digits, got {n}")),
    }
}

/// 95 modules for a validated 13-digit code.
fn ean13_modules(full: &str) -> Vec<bool> {
    let digits: Vec<usize> = full
        .bytes()
        .map(|b| usize::from(b.wrapping_sub(b'0')) % 10)
        .collect();
    let mut bits = String::with_capacity(95);
    bits.push_str("101");
    let parity = EAN_PARITY[digits[0]].as_bytes();
    for (i, &d) in digits[1..7].iter().enumerate() {
        bits.push_str(if parity[i] == b'G' { EAN_G[d] } else { EAN_L[d] });
    }
    bits.push_str("01010");
    for &d in &digits[7..13] {
        bits.push_str(EAN_R[d]);
    }
    bits.push_str("101");
    bits.bytes().map(|b| b == b'1').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code128_patterns_are_eleven_modules() {
        for p in CODE128_PATTERNS {
            assert_eq!(p.iter().map(|b| u32::from(b - b'0')).sum::<u32>(), 11);
        }
    }

    #[test]
    fn even_digit_data_uses_subset_c() {
        let values = code128_values("55667788").unwrap();
        // 105 + 55 + 66*2 + 77*3 + 88*4 = 875, 875 % 103 = 51
        assert_eq!(values, vec![START_C, 55, 66, 77, 88, 51]);
        assert_eq!(code128_modules("55667788").unwrap().len(), 6 * 11 + 13);
    }

    #[test]
    fn odd_digit_data_ends_in_subset_b() {
        let values = code128_values("508020005").unwrap();
        // 105 + 50 + 80*2 + 20*3 + 0*4 + 100*5 + 21*6 = 1001, 1001 % 103 = 74
        assert_eq!(values, vec![START_C, 50, 80, 20, 0, CODE_B, 21, 74]);
        // half the width of an all-B encoding of the same digits
        assert_eq!(code128_modules("508020005").unwrap().len(), 8 * 11 + 13);
        assert_eq!(code128_values("7").unwrap()[0], START_B);
    }

    #[test]
    fn text_data_uses_subset_b() {
        let values = code128_values("Ab1").unwrap();
        assert_eq!(values[0], START_B);
        assert_eq!(&values[1..4], &[33, 66, 17]);
    }

    #[test]
    fn code128_rejects_non_ascii() {
        assert!(code128_values("caf\u{e9}").is_err());
        assert!(code128_values("").is_err());
    }

    #[test]
    fn ean13_check_digit_known_code() {
        assert_eq!(ean13_with_checksum("400638133393").unwrap(), "4006381333931");
        assert!(ean13_with_checksum("4006381333931").is_ok());
        assert!(ean13_with_checksum("4006381333932").is_err());
        assert!(ean13_with_checksum("12345").is_err());
        assert!(ean13_with_checksum("12345678901a").is_err());
    }

    #[test]
    fn ean13_has_95_modules_with_guards() {
        let modules = ean13_modules("4006381333931");
        assert_eq!(modules.len(), 95);
        assert_eq!(&modules[..3], &[true, false, true]);
        assert_eq!(&modules[45..50], &[false, true, false, true, false]);
        assert_eq!(&modules[92..], &[true, false, true]);
    }

    #[test]
    fn raster_dimensions_follow_options() {
        let encoder = RasterEncoder::new(RasterOptions {
            module_px: 3,
            bar_height_px: 40,
            quiet_zone: 5,
            human_readable: false,
        });
        let symbol = encoder.encode("55667788", Symbology::Code128).unwrap();
        assert_eq!(symbol.width(), (79 + 10) * 3);
        assert_eq!(symbol.height(), 40);
        // quiet zone is white, first bar is black
        assert_eq!(symbol.raster.get_pixel(0, 0).0[0], 255);
        assert_eq!(symbol.raster.get_pixel(15, 0).0[0], 0);
    }

    #[test]
    fn human_readable_band_sits_below_bars() {
        let symbol = RasterEncoder::default()
            .encode("55667788", Symbology::Code128)
            .unwrap();
        assert_eq!(symbol.height(), BARCODE_BAR_HEIGHT_PX + 24);
        let band_has_ink = (0..symbol.width()).any(|x| {
            (BARCODE_BAR_HEIGHT_PX..symbol.height())
                .any(|y| symbol.raster.get_pixel(x, y).0[0] == 0)
        });
        assert!(band_has_ink);
    }

    #[test]
    fn invalid_ean_is_an_encoding_failure() {
        let err = RasterEncoder::default()
            .encode("ABC", Symbology::Ean13)
            .unwrap_err();
        assert!(matches!(err, LabelError::Encoding { symbology: Symbology::Ean13, .. }));
    }
}
