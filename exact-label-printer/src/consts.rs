// Label defaults and printer tuning constants
pub const RENDER_DPI: f64 = 300.0;      // internal raster fidelity, never affects printed size
pub const CROP_KEEP: f64 = 0.50;        // keep top half of the encoded barcode
pub const BARCODE_HEIGHT_CM: f64 = 0.45;
pub const BARCODE_WIDTH_RATIO: f64 = 0.40;
pub const LINE_GAP_PX: u32 = 0;

// encoder raster geometry (crop & scale happen afterwards)
pub const BARCODE_MODULE_PX: u32 = 2;
pub const BARCODE_BAR_HEIGHT_PX: u32 = 120;
pub const BARCODE_QUIET_ZONE: u32 = 10; // modules each side

// EPL2 (Zebra LP-2824 class, 203 dpi)
pub const EPL_DPI: f64 = 203.0;
pub const DARKNESS: u8 = 8;    // D0..D15
pub const SPEED: u8 = 2;       // S1..S6
pub const GAP_DOTS: u32 = 24;
pub const INVERT_BITS: bool = true; // GW expects 0 = black

pub const PNG_DPI: f64 = 600.0;
