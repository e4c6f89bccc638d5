//! Maps a composed label onto a device's own pixel grid.
//!
//! The destination rectangle comes from the label's physical size and the
//! device's reported density only. The render resolution never enters the
//! computation, so the printed size does not depend on it.

use crate::error::{DeviceError, Result};
use crate::layout::ComposedLabel;
use crate::units::PhysicalSize;

/// Pixel density reported by an output device, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceResolution {
    pub dpi_x: f64,
    pub dpi_y: f64,
}

impl DeviceResolution {
    pub const fn new(dpi_x: f64, dpi_y: f64) -> Self {
        Self { dpi_x, dpi_y }
    }

    pub const fn uniform(dpi: f64) -> Self {
        Self::new(dpi, dpi)
    }

    /// Zero, negative or non-finite densities cannot be projected onto.
    pub fn validate(&self) -> Result<(), DeviceError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.dpi_x) && ok(self.dpi_y) {
            Ok(())
        } else {
            Err(DeviceError::InvalidResolution {
                dpi_x: self.dpi_x,
                dpi_y: self.dpi_y,
            })
        }
    }
}

/// Destination rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl DeviceRect {
    pub fn right(&self) -> i32 {
        self.left + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height as i32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceProjector {
    inset_x: i32,
    inset_y: i32,
}

impl DeviceProjector {
    /// Rectangle anchored at the device origin.
    pub const fn new() -> Self {
        Self {
            inset_x: 0,
            inset_y: 0,
        }
    }

    /// Rectangle anchored `(x, y)` device pixels in from the origin.
    pub const fn with_inset(x: i32, y: i32) -> Self {
        Self {
            inset_x: x,
            inset_y: y,
        }
    }

    pub fn project(&self, label: &ComposedLabel, device: DeviceResolution) -> Result<DeviceRect> {
        self.project_size(&label.physical_size(), device)
    }

    pub fn project_size(
        &self,
        size: &PhysicalSize,
        device: DeviceResolution,
    ) -> Result<DeviceRect> {
        device.validate()?;
        let (width, height) = size.to_pixels(device.dpi_x, device.dpi_y)?;
        Ok(DeviceRect {
            left: self.inset_x,
            top: self.inset_y,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabelError;
    use crate::units::LengthUnit;

    const LABEL: PhysicalSize = PhysicalSize::new(5.5, 2.0, LengthUnit::Centimeter);

    #[test]
    fn label_at_600_dpi() {
        let rect = DeviceProjector::new()
            .project_size(&LABEL, DeviceResolution::uniform(600.0))
            .unwrap();
        assert_eq!(
            rect,
            DeviceRect {
                left: 0,
                top: 0,
                width: 1299,
                height: 472
            }
        );
    }

    #[test]
    fn axes_use_their_own_density() {
        let rect = DeviceProjector::new()
            .project_size(&LABEL, DeviceResolution::new(300.0, 600.0))
            .unwrap();
        assert_eq!((rect.width, rect.height), (650, 472));
    }

    #[test]
    fn size_scales_with_device_density() {
        let p = DeviceProjector::new();
        let at_300 = p.project_size(&LABEL, DeviceResolution::uniform(300.0)).unwrap();
        let at_1200 = p.project_size(&LABEL, DeviceResolution::uniform(1200.0)).unwrap();
        assert!((i64::from(at_1200.width) - 4 * i64::from(at_300.width)).abs() <= 2);
        assert!((i64::from(at_1200.height) - 4 * i64::from(at_300.height)).abs() <= 2);
    }

    #[test]
    fn inset_moves_origin_only() {
        let rect = DeviceProjector::with_inset(1, 1)
            .project_size(&LABEL, DeviceResolution::uniform(600.0))
            .unwrap();
        assert_eq!((rect.left, rect.top, rect.right(), rect.bottom()), (1, 1, 1300, 473));
    }

    #[test]
    fn zero_resolution_is_fatal() {
        for res in [
            DeviceResolution::uniform(0.0),
            DeviceResolution::new(600.0, -1.0),
            DeviceResolution::new(f64::NAN, 600.0),
        ] {
            let err = DeviceProjector::new().project_size(&LABEL, res).unwrap_err();
            assert!(matches!(
                err,
                LabelError::Device(DeviceError::InvalidResolution { .. })
            ));
        }
    }
}
