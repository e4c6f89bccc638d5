//! `label-station`: compose a barcode label from a JSON config and print it
//! at its exact physical size.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exact_label_printer::{
    list_printers, print_composed, Backend, ComposedLabel, DeviceProjector, EplSink, LayoutEngine,
    PngSink, PrintSink, RasterEncoder, StationConfig,
};

/// Overrides `printer.device` from the config file.
const PRINTER_ENV: &str = "LABEL_PRINTER";

#[derive(Parser)]
#[command(version, about = "Compose barcode labels and print them at exact physical size")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose the configured label and send it to the printer
    Print {
        /// Station config (JSON)
        config: PathBuf,

        /// Printer to use instead of the configured one
        #[arg(short, long)]
        device: Option<String>,

        /// Also save the render-resolution raster to this PNG
        #[arg(long, value_name = "PNG")]
        preview: Option<PathBuf>,
    },
    /// Compose the configured label and save it as PNG without printing
    Preview {
        /// Station config (JSON)
        config: PathBuf,

        /// Output PNG path
        output: PathBuf,
    },
    /// List installed printers
    Printers,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Print {
            config,
            device,
            preview,
        } => print(&config, device, preview.as_deref()),
        Command::Preview { config, output } => {
            let station = load_config(&config)?;
            let label = compose(&station)?;
            save_preview(&label, &output)
        }
        Command::Printers => {
            let printers = list_printers().context("listing printers")?;
            if printers.is_empty() {
                info!("no printers found");
            }
            for name in printers {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<StationConfig> {
    StationConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

fn compose(station: &StationConfig) -> Result<ComposedLabel> {
    let engine = LayoutEngine::new(RasterEncoder::default(), station.fonts.chain());
    let label = engine.compose(&station.label).context("composing label")?;
    if let Some(overflow) = label.overflow() {
        tracing::warn!(
            bottom_px = overflow.excess(),
            right_px = overflow.horizontal_excess(),
            "label content is clipped"
        );
    }
    Ok(label)
}

fn save_preview(label: &ComposedLabel, path: &Path) -> Result<()> {
    label
        .raster()
        .save(path)
        .with_context(|| format!("saving preview {}", path.display()))?;
    info!(path = %path.display(), width = label.width(), height = label.height(), "wrote preview");
    Ok(())
}

fn print(config: &Path, device: Option<String>, preview: Option<&Path>) -> Result<()> {
    let station = load_config(config)?;
    let device = device
        .or_else(|| std::env::var(PRINTER_ENV).ok().filter(|d| !d.trim().is_empty()))
        .unwrap_or_else(|| station.printer.device.clone());
    if device.trim().is_empty() {
        bail!("no printer given: set printer.device, {PRINTER_ENV} or --device");
    }

    let label = compose(&station)?;
    if let Some(path) = preview {
        save_preview(&label, path)?;
    }

    let printer = &station.printer;
    let projector = printer.projector();
    match printer.backend {
        Backend::Png => {
            let mut sink = PngSink::new(&printer.output_dir, printer.resolution()?);
            send(&mut sink, &device, &label, &projector)?;
            println!("{}", sink.page_path(&device).display());
        }
        Backend::Epl => {
            let mut sink = EplSink::new(printer.epl_settings()?);
            send(&mut sink, &device, &label, &projector)?;
        }
        Backend::Gdi => print_gdi(&device, &label, &projector)?,
    }
    Ok(())
}

fn send<P: PrintSink>(
    sink: &mut P,
    device: &str,
    label: &ComposedLabel,
    projector: &DeviceProjector,
) -> Result<()> {
    let rect = print_composed(sink, device, label, projector)
        .with_context(|| format!("printing to '{device}'"))?;
    info!(
        device,
        left = rect.left,
        top = rect.top,
        width = rect.width,
        height = rect.height,
        "label sent"
    );
    Ok(())
}

#[cfg(windows)]
fn print_gdi(device: &str, label: &ComposedLabel, projector: &DeviceProjector) -> Result<()> {
    let mut sink = exact_label_printer::GdiSink::default();
    send(&mut sink, device, label, projector)
}

#[cfg(not(windows))]
fn print_gdi(_device: &str, _label: &ComposedLabel, _projector: &DeviceProjector) -> Result<()> {
    Err(exact_label_printer::DeviceError::Unsupported(
        "the gdi backend is only available on Windows".into(),
    ))
    .context("printing")
}
