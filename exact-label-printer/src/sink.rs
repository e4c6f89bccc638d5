//! Print sinks and the job wrapper that drives them.
//!
//! A sink is used in a fixed order for one job: `open`, `resolution`, `draw`,
//! `close`. [`print_composed`] guarantees `close` runs whenever `open`
//! succeeded, whatever happens in between.

use std::path::PathBuf;

use image::{GrayImage, Luma};

use crate::error::{DeviceError, Result};
use crate::graphics;
use crate::layout::ComposedLabel;
use crate::projector::{DeviceProjector, DeviceRect, DeviceResolution};

pub trait PrintSink {
    type Handle;

    fn open(&mut self, device: &str) -> Result<Self::Handle, DeviceError>;

    fn resolution(&mut self, handle: &Self::Handle) -> Result<DeviceResolution, DeviceError>;

    /// Stretch `raster` to exactly `rect`, in device pixels. No further scaling.
    fn draw(
        &mut self,
        handle: &mut Self::Handle,
        rect: DeviceRect,
        raster: &GrayImage,
    ) -> Result<(), DeviceError>;

    fn close(&mut self, handle: Self::Handle) -> Result<(), DeviceError>;
}

/// Project `label` onto the device's grid and hand it to the sink.
///
/// Returns the rectangle that was drawn. The device handle is closed on every
/// path after a successful open; when both the job and the close fail, the
/// job's error is returned and the close error is logged.
pub fn print_composed<P: PrintSink>(
    sink: &mut P,
    device: &str,
    label: &ComposedLabel,
    projector: &DeviceProjector,
) -> Result<DeviceRect> {
    let mut handle = sink.open(device)?;

    let job = (|| -> Result<DeviceRect> {
        let resolution = sink.resolution(&handle)?;
        let rect = projector.project(label, resolution)?;
        tracing::debug!(
            device,
            dpi_x = resolution.dpi_x,
            dpi_y = resolution.dpi_y,
            width = rect.width,
            height = rect.height,
            "projected label onto device grid"
        );
        sink.draw(&mut handle, rect, label.raster())?;
        Ok(rect)
    })();

    let closed = sink.close(handle);
    match (job, closed) {
        (Ok(rect), Ok(())) => {
            tracing::info!(device, width = rect.width, height = rect.height, "label printed");
            Ok(rect)
        }
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::error!(device, error = %close_err, "closing printer after failed job");
            Err(e)
        }
    }
}

// ======== Recording sink ========

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Open(String),
    Resolution,
    Draw { rect: DeviceRect, source: (u32, u32) },
    Close(String),
}

#[derive(Debug)]
pub struct RecordingHandle {
    device: String,
}

/// In-memory sink for tests and dry runs. Records every call and keeps the
/// device-resolution raster of the last draw.
#[derive(Debug, Default)]
pub struct RecordingSink {
    resolution: Option<DeviceResolution>,
    fail_open: bool,
    fail_draw: bool,
    pub events: Vec<SinkEvent>,
    pub last_page: Option<GrayImage>,
}

impl RecordingSink {
    pub fn new(resolution: DeviceResolution) -> Self {
        Self {
            resolution: Some(resolution),
            ..Self::default()
        }
    }

    /// A device that never reports its resolution.
    pub fn without_resolution() -> Self {
        Self::default()
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_draw(mut self) -> Self {
        self.fail_draw = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        let opens = self.events.iter().filter(|e| matches!(e, SinkEvent::Open(_))).count();
        let closes = self.events.iter().filter(|e| matches!(e, SinkEvent::Close(_))).count();
        opens == closes
    }
}

impl PrintSink for RecordingSink {
    type Handle = RecordingHandle;

    fn open(&mut self, device: &str) -> Result<RecordingHandle, DeviceError> {
        if self.fail_open {
            return Err(DeviceError::Open {
                device: device.to_string(),
                reason: "device busy".into(),
            });
        }
        self.events.push(SinkEvent::Open(device.to_string()));
        Ok(RecordingHandle {
            device: device.to_string(),
        })
    }

    fn resolution(&mut self, _handle: &RecordingHandle) -> Result<DeviceResolution, DeviceError> {
        self.events.push(SinkEvent::Resolution);
        self.resolution
            .ok_or_else(|| DeviceError::Resolution("device reported no resolution".into()))
    }

    fn draw(
        &mut self,
        _handle: &mut RecordingHandle,
        rect: DeviceRect,
        raster: &GrayImage,
    ) -> Result<(), DeviceError> {
        self.events.push(SinkEvent::Draw {
            rect,
            source: raster.dimensions(),
        });
        if self.fail_draw {
            return Err(DeviceError::Draw("access denied".into()));
        }
        self.last_page = Some(graphics::stretch(raster, rect.width, rect.height));
        Ok(())
    }

    fn close(&mut self, handle: RecordingHandle) -> Result<(), DeviceError> {
        self.events.push(SinkEvent::Close(handle.device));
        Ok(())
    }
}

// ======== PNG sink ========

pub struct PngHandle {
    path: PathBuf,
    page: Option<GrayImage>,
}

/// Writes each job as a PNG page at a fixed device resolution, one file per
/// device name. Useful for proofing label stock without a printer.
#[derive(Debug, Clone)]
pub struct PngSink {
    dir: PathBuf,
    resolution: DeviceResolution,
}

impl PngSink {
    pub fn new(dir: impl Into<PathBuf>, resolution: DeviceResolution) -> Self {
        Self {
            dir: dir.into(),
            resolution,
        }
    }

    pub fn page_path(&self, device: &str) -> PathBuf {
        self.dir.join(format!("{}.png", sanitize_device_name(device)))
    }
}

impl PrintSink for PngSink {
    type Handle = PngHandle;

    fn open(&mut self, device: &str) -> Result<PngHandle, DeviceError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| DeviceError::Open {
            device: device.to_string(),
            reason: format!("{}: {e}", self.dir.display()),
        })?;
        Ok(PngHandle {
            path: self.page_path(device),
            page: None,
        })
    }

    fn resolution(&mut self, _handle: &PngHandle) -> Result<DeviceResolution, DeviceError> {
        Ok(self.resolution)
    }

    fn draw(
        &mut self,
        handle: &mut PngHandle,
        rect: DeviceRect,
        raster: &GrayImage,
    ) -> Result<(), DeviceError> {
        let right = u32::try_from(rect.right()).unwrap_or(0);
        let bottom = u32::try_from(rect.bottom()).unwrap_or(0);
        if right == 0 || bottom == 0 || rect.left < 0 || rect.top < 0 {
            return Err(DeviceError::Draw(format!("rectangle {rect:?} is off the page")));
        }
        let mut page = GrayImage::from_pixel(right, bottom, Luma([255]));
        let stretched = graphics::stretch(raster, rect.width, rect.height);
        graphics::paste(&mut page, &stretched, rect.left as u32, rect.top as u32);
        handle.page = Some(page);
        Ok(())
    }

    fn close(&mut self, handle: PngHandle) -> Result<(), DeviceError> {
        let Some(page) = handle.page else {
            return Ok(());
        };
        page.save(&handle.path)
            .map_err(|e| DeviceError::Close(format!("{}: {e}", handle.path.display())))?;
        tracing::info!(path = %handle.path.display(), "wrote label page");
        Ok(())
    }
}

pub(crate) fn sanitize_device_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_names_become_file_names() {
        assert_eq!(
            sanitize_device_name("Datamax O'Neil E4204B Mark III"),
            "Datamax_O_Neil_E4204B_Mark_III"
        );
    }

    #[test]
    fn png_sink_writes_page_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSink::new(dir.path(), DeviceResolution::uniform(600.0));
        let mut handle = sink.open("Zebra LP2824").unwrap();
        let raster = GrayImage::from_pixel(65, 24, Luma([0]));
        let rect = DeviceRect {
            left: 2,
            top: 2,
            width: 130,
            height: 47,
        };
        sink.draw(&mut handle, rect, &raster).unwrap();
        sink.close(handle).unwrap();

        let page = image::open(sink.page_path("Zebra LP2824")).unwrap().to_luma8();
        assert_eq!(page.dimensions(), (132, 49));
        assert_eq!(page.get_pixel(0, 0).0[0], 255);
        assert_eq!(page.get_pixel(60, 20).0[0], 0);
    }

    #[test]
    fn png_sink_skips_file_when_nothing_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSink::new(dir.path(), DeviceResolution::uniform(300.0));
        let handle = sink.open("idle").unwrap();
        sink.close(handle).unwrap();
        assert!(!sink.page_path("idle").exists());
    }
}
