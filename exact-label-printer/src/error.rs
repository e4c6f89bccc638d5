use thiserror::Error;

use crate::barcode::Symbology;

/// Errors produced while composing or printing a label.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cannot encode {data:?} as {symbology}: {reason}")]
    Encoding {
        data: String,
        symbology: Symbology,
        reason: String,
    },

    #[error("font error: {0}")]
    Font(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Failures reported by a print sink. Surfaced to the caller verbatim.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("cannot open printer '{device}': {reason}")]
    Open { device: String, reason: String },

    #[error("printer did not report a resolution: {0}")]
    Resolution(String),

    #[error("invalid device resolution {dpi_x}x{dpi_y} dpi")]
    InvalidResolution { dpi_x: f64, dpi_y: f64 },

    #[error("drawing to printer failed: {0}")]
    Draw(String),

    #[error("closing printer failed: {0}")]
    Close(String),

    #[error("{0}")]
    Unsupported(String),
}

pub type Result<T, E = LabelError> = std::result::Result<T, E>;

pub(crate) fn invalid(msg: impl Into<String>) -> LabelError {
    LabelError::InvalidConfiguration(msg.into())
}
