//! Station configuration file: which label to compose and where to print it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{DARKNESS, GAP_DOTS, INVERT_BITS, PNG_DPI, SPEED};
use crate::epl::EplSettings;
use crate::error::{invalid, DeviceError, Result};
use crate::fonts::{system_fallbacks, FontChain};
use crate::label::LabelSpec;
use crate::projector::{DeviceProjector, DeviceResolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Write the device page as a PNG file.
    #[default]
    Png,
    /// Raw EPL2 graphics job through the spooler.
    Epl,
    /// Windows GDI printer driver.
    Gdi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub inset_x: i32,
    #[serde(default)]
    pub inset_y: i32,
    /// Device density for backends that cannot report one (png, epl).
    #[serde(default)]
    pub dpi: Option<f64>,
    #[serde(default = "default_darkness")]
    pub darkness: u8,
    #[serde(default = "default_speed")]
    pub speed: u8,
    #[serde(default = "default_gap")]
    pub gap_dots: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_darkness() -> u8 {
    DARKNESS
}

fn default_speed() -> u8 {
    SPEED
}

fn default_gap() -> u32 {
    GAP_DOTS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("labels")
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            device: String::new(),
            inset_x: 0,
            inset_y: 0,
            dpi: None,
            darkness: DARKNESS,
            speed: SPEED,
            gap_dots: GAP_DOTS,
            output_dir: default_output_dir(),
        }
    }
}

impl PrinterConfig {
    pub fn projector(&self) -> DeviceProjector {
        DeviceProjector::with_inset(self.inset_x, self.inset_y)
    }

    /// Density of the output page. A PNG page is virtual and defaults to
    /// 600 dpi; an EPL2 printer cannot report its density, so it must be
    /// configured. GDI devices report their own and ignore this.
    pub fn resolution(&self) -> Result<DeviceResolution, DeviceError> {
        match (self.backend, self.dpi) {
            (_, Some(dpi)) => Ok(DeviceResolution::uniform(dpi)),
            (Backend::Png, None) => Ok(DeviceResolution::uniform(PNG_DPI)),
            (Backend::Epl | Backend::Gdi, None) => Err(DeviceError::Resolution(format!(
                "set printer.dpi for '{}', the {:?} backend has no density to assume",
                self.device, self.backend
            ))),
        }
    }

    pub fn epl_settings(&self) -> Result<EplSettings, DeviceError> {
        Ok(EplSettings {
            dpi: self.resolution()?.dpi_x,
            darkness: self.darkness,
            speed: self.speed,
            gap_dots: self.gap_dots,
            invert: INVERT_BITS,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontConfig {
    #[serde(default)]
    pub preferred: Option<PathBuf>,
    #[serde(default = "system_fallbacks")]
    pub fallbacks: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            preferred: None,
            fallbacks: system_fallbacks(),
        }
    }
}

impl FontConfig {
    pub fn chain(&self) -> FontChain {
        FontChain::from_paths(self.preferred.as_deref(), &self.fallbacks)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub label: LabelSpec,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub fonts: FontConfig,
}

impl StationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&raw)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            backend = ?config.printer.backend,
            "loaded station config"
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.label.validate()?;
        if let Some(dpi) = self.printer.dpi {
            DeviceResolution::uniform(dpi).validate()?;
        }
        if self.printer.backend == Backend::Epl {
            self.printer.resolution()?;
        }
        if self.printer.darkness > 15 {
            return Err(invalid(format!("darkness must be 0..=15, got {}", self.printer.darkness)));
        }
        if !(1..=6).contains(&self.printer.speed) {
            return Err(invalid(format!("speed must be 1..=6, got {}", self.printer.speed)));
        }
        Ok(())
    }
}
