//! EPL2 raw-graphics sink for Zebra-class thermal printers.
//!
//! The device raster is thresholded to 1 bit and sent as a single `GW`
//! graphic inside an `N … P1` job. EPL2 printers do not report their
//! resolution, so it is configured (203 dpi for the LP-2824 family).

use std::io;

use image::GrayImage;

use crate::consts::{DARKNESS, EPL_DPI, GAP_DOTS, INVERT_BITS, SPEED};
use crate::error::DeviceError;
use crate::graphics;
use crate::printer;
use crate::projector::{DeviceRect, DeviceResolution};
use crate::sink::PrintSink;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EplSettings {
    pub dpi: f64,
    pub darkness: u8, // D0..D15
    pub speed: u8,    // S1..S6
    pub gap_dots: u32,
    /// Invert GW bits (GW expects 0 = black on most firmware).
    pub invert: bool,
}

impl Default for EplSettings {
    fn default() -> Self {
        Self {
            dpi: EPL_DPI,
            darkness: DARKNESS,
            speed: SPEED,
            gap_dots: GAP_DOTS,
            invert: INVERT_BITS,
        }
    }
}

/// Where finished EPL jobs go.
pub trait RawTransport {
    fn send(&mut self, device: &str, job: &[u8]) -> io::Result<()>;
}

/// The OS spooler (Windows) or a file in the temp dir (elsewhere).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpoolerTransport;

impl RawTransport for SpoolerTransport {
    fn send(&mut self, device: &str, job: &[u8]) -> io::Result<()> {
        printer::send_raw_to_printer(device, job)
    }
}

/// Collects jobs in memory.
impl RawTransport for Vec<Vec<u8>> {
    fn send(&mut self, _device: &str, job: &[u8]) -> io::Result<()> {
        self.push(job.to_vec());
        Ok(())
    }
}

pub struct EplJob {
    device: String,
    buf: Vec<u8>,
    ready: bool,
}

pub struct EplSink<T = SpoolerTransport> {
    settings: EplSettings,
    transport: T,
}

impl EplSink<SpoolerTransport> {
    pub fn new(settings: EplSettings) -> Self {
        Self::with_transport(settings, SpoolerTransport)
    }
}

impl<T: RawTransport> EplSink<T> {
    pub fn with_transport(settings: EplSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: RawTransport> PrintSink for EplSink<T> {
    type Handle = EplJob;

    fn open(&mut self, device: &str) -> Result<EplJob, DeviceError> {
        Ok(EplJob {
            device: device.to_string(),
            buf: Vec::new(),
            ready: false,
        })
    }

    fn resolution(&mut self, _job: &EplJob) -> Result<DeviceResolution, DeviceError> {
        Ok(DeviceResolution::uniform(self.settings.dpi))
    }

    fn draw(
        &mut self,
        job: &mut EplJob,
        rect: DeviceRect,
        raster: &GrayImage,
    ) -> Result<(), DeviceError> {
        if rect.left < 0 || rect.top < 0 {
            return Err(DeviceError::Draw(format!(
                "EPL2 cannot address negative origin {},{}",
                rect.left, rect.top
            )));
        }
        let stretched = graphics::stretch(raster, rect.width, rect.height);
        let dots = graphics::to_monochrome(&stretched, 128);
        let s = &self.settings;
        let buf = &mut job.buf;
        epl_line(buf, "N");
        epl_line(buf, &format!("q{}", rect.right()));
        epl_line(buf, &format!("Q{},{}", rect.bottom(), s.gap_dots));
        epl_line(buf, &format!("D{}", s.darkness.min(15)));
        epl_line(buf, &format!("S{}", s.speed.clamp(1, 6)));
        let (w, h, rows) = image_to_row_bytes(&dots, s.invert);
        gw_bytes(buf, rect.left as u32, rect.top as u32, w, h, &rows);
        epl_line(buf, "P1"); // exactly one label
        job.ready = true;
        Ok(())
    }

    fn close(&mut self, job: EplJob) -> Result<(), DeviceError> {
        if !job.ready {
            tracing::debug!(device = %job.device, "discarding unfinished EPL job");
            return Ok(());
        }
        self.transport
            .send(&job.device, &job.buf)
            .map_err(|e| DeviceError::Close(format!("sending EPL job to '{}': {e}", job.device)))
    }
}

// ======== EPL2 helpers (binary GW + CRLF) ========

pub fn epl_line(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// Pack a black/white image MSB-first, 1 = black before optional inversion.
pub fn image_to_row_bytes(img: &GrayImage, invert: bool) -> (u32, u32, Vec<u8>) {
    let (w, h) = img.dimensions();
    let bpr = w.div_ceil(8) as usize;
    let mut out = vec![0u8; bpr * h as usize];

    for (x, y, px) in img.enumerate_pixels() {
        if px.0[0] < 128 {
            let i = y as usize * bpr + (x as usize / 8);
            out[i] |= 1 << (7 - (x as usize % 8));
        }
    }
    if invert {
        for b in &mut out {
            *b = !*b;
        }
    }
    (w, h, out)
}

pub fn gw_bytes(buf: &mut Vec<u8>, x: u32, y: u32, w: u32, h: u32, rows: &[u8]) {
    let bpr = w.div_ceil(8);
    epl_line(buf, &format!("GW{},{},{},{}", x, y, bpr, h));
    buf.extend_from_slice(rows); // raw binary
    buf.extend_from_slice(b"\r\n");
}
