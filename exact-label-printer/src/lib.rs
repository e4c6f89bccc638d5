//! Exact-size barcode label composition and printing.
//!
//! A label is composed once at a fixed render resolution: the barcode (cropped
//! to its top part and scaled to a physical height) at the top, centered text
//! lines stacked below. Printing projects the physical label size onto the
//! device's own pixel grid, so the printed size depends only on the label
//! dimensions and the density the device reports.
//!
//! ```no_run
//! use exact_label_printer::{
//!     BarcodeSpec, DeviceProjector, DeviceResolution, FontChain, LabelSpec, LayoutEngine,
//!     PngSink, RasterEncoder, Symbology, print_composed,
//! };
//!
//! let spec = LabelSpec::new(5.5, 2.0, BarcodeSpec::new("55667788", Symbology::Code128))
//!     .with_line("{barcode}", 16.0);
//! let engine = LayoutEngine::new(RasterEncoder::default(), FontChain::default());
//! let label = engine.compose(&spec)?;
//! let mut sink = PngSink::new("labels", DeviceResolution::uniform(600.0));
//! print_composed(&mut sink, "proof", &label, &DeviceProjector::new())?;
//! # Ok::<(), exact_label_printer::LabelError>(())
//! ```

pub mod barcode;
pub mod config;
pub mod consts;
pub mod epl;
pub mod error;
pub mod fonts;
pub mod graphics;
pub mod label;
pub mod layout;
pub mod printer;
pub mod projector;
pub mod sink;
pub mod template;
pub mod units;

pub use barcode::{EncodedSymbol, RasterEncoder, RasterOptions, SymbolSource, Symbology};
pub use config::{Backend, FontConfig, PrinterConfig, StationConfig};
pub use epl::{EplSettings, EplSink, RawTransport, SpoolerTransport};
pub use error::{DeviceError, LabelError, Result};
pub use fonts::{BuiltinFont, Face, FontChain, FontFallback, FontProvider, TrueTypeFile};
pub use label::{BarcodeSpec, LabelSpec, TextLine};
pub use layout::{ComposedLabel, LayoutEngine, LayoutReport, LinePlacement, Overflow, Placement};
pub use printer::{list_printers, send_raw_to_printer};
#[cfg(windows)]
pub use printer::GdiSink;
pub use projector::{DeviceProjector, DeviceRect, DeviceResolution};
pub use sink::{print_composed, PngSink, PrintSink, RecordingSink, SinkEvent};
pub use units::{LengthUnit, PhysicalSize};
