use std::io;

/// Send raw bytes to the named printer. On Windows uses the spooler; on other
/// platforms writes the job to a file in the temp dir.
pub fn send_raw_to_printer(printer_name: &str, data: &[u8]) -> io::Result<()> {
    #[cfg(windows)]
    {
        win::send_raw(printer_name, data)
    }

    #[cfg(not(windows))]
    {
        let path = std::env::temp_dir().join(format!(
            "{}_label_job.bin",
            crate::sink::sanitize_device_name(printer_name)
        ));
        std::fs::write(&path, data)?;
        tracing::info!(
            path = %path.display(),
            bytes = data.len(),
            "no spooler on this platform, wrote raw job to file"
        );
        Ok(())
    }
}

/// List installed printers (Windows only). On other platforms returns an empty list.
pub fn list_printers() -> io::Result<Vec<String>> {
    #[cfg(windows)]
    {
        win::enum_printers()
    }

    #[cfg(not(windows))]
    {
        Ok(Vec::new())
    }
}

#[cfg(windows)]
pub use win::{GdiHandle, GdiSink};

#[cfg(windows)]
mod win {
    use std::ffi::{OsStr, OsString};
    use std::io;
    use std::iter::once;
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use std::ptr::{null, null_mut};

    use image::GrayImage;
    use winapi::shared::minwindef::DWORD;
    use winapi::shared::windef::HDC;
    use winapi::um::errhandlingapi::GetLastError;
    use winapi::um::winbase::{
        FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS,
    };
    use winapi::um::wingdi::{
        AbortDoc, CreateDCW, DeleteDC, EndDoc, EndPage, GetDeviceCaps, StartDocW, StartPage,
        StretchDIBits, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, DOCINFOW, GDI_ERROR,
        LOGPIXELSX, LOGPIXELSY, RGBQUAD, SRCCOPY,
    };
    use winapi::um::winspool::{
        ClosePrinter, EndDocPrinter, EndPagePrinter, EnumPrintersW, OpenPrinterW,
        StartDocPrinterW, StartPagePrinter, WritePrinter, DOC_INFO_1W, PRINTER_ENUM_CONNECTIONS,
        PRINTER_ENUM_LOCAL, PRINTER_INFO_4W,
    };

    use crate::error::DeviceError;
    use crate::projector::{DeviceRect, DeviceResolution};
    use crate::sink::PrintSink;

    fn wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(once(0)).collect()
    }

    fn os_error(call: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("{call} failed: {}", last_error_string()))
    }

    pub(super) fn send_raw(printer_name: &str, data: &[u8]) -> io::Result<()> {
        // keep these buffers alive for the duration of the calls
        let mut name = wide(printer_name);
        let mut doc_name = wide("Label (raw)");
        let mut data_type = wide("RAW");

        unsafe {
            let mut handle = null_mut();
            if OpenPrinterW(name.as_mut_ptr(), &mut handle, null_mut()) == 0 {
                return Err(os_error("OpenPrinterW"));
            }

            let mut doc_info = DOC_INFO_1W {
                pDocName: doc_name.as_mut_ptr(),
                pOutputFile: null_mut(),
                pDatatype: data_type.as_mut_ptr(),
            };
            if StartDocPrinterW(handle, 1, &mut doc_info as *mut _ as *mut _) == 0 {
                let err = os_error("StartDocPrinterW");
                ClosePrinter(handle);
                return Err(err);
            }
            if StartPagePrinter(handle) == 0 {
                let err = os_error("StartPagePrinter");
                EndDocPrinter(handle);
                ClosePrinter(handle);
                return Err(err);
            }

            let mut written: DWORD = 0;
            let ok = WritePrinter(
                handle,
                data.as_ptr() as *mut _,
                data.len() as DWORD,
                &mut written,
            );
            let write_err = (ok == 0).then(|| os_error("WritePrinter"));

            EndPagePrinter(handle);
            EndDocPrinter(handle);
            ClosePrinter(handle);

            if let Some(err) = write_err {
                return Err(err);
            }
            if written as usize != data.len() {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("partial write: wrote {} of {} bytes", written, data.len()),
                ));
            }
        }
        Ok(())
    }

    pub(super) fn enum_printers() -> io::Result<Vec<String>> {
        let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
        unsafe {
            let mut bytes_needed: DWORD = 0;
            let mut returned: DWORD = 0;
            // first call sizes the buffer
            EnumPrintersW(flags, null_mut(), 4, null_mut(), 0, &mut bytes_needed, &mut returned);
            if bytes_needed == 0 {
                return Ok(Vec::new());
            }

            let mut buffer = vec![0u8; bytes_needed as usize];
            if EnumPrintersW(
                flags,
                null_mut(),
                4,
                buffer.as_mut_ptr(),
                bytes_needed,
                &mut bytes_needed,
                &mut returned,
            ) == 0
            {
                return Err(os_error("EnumPrintersW"));
            }

            let infos = std::slice::from_raw_parts(
                buffer.as_ptr() as *const PRINTER_INFO_4W,
                returned as usize,
            );
            let mut names = Vec::with_capacity(infos.len());
            for info in infos {
                if info.pPrinterName.is_null() {
                    continue;
                }
                let mut len = 0;
                while *info.pPrinterName.add(len) != 0 {
                    len += 1;
                }
                let slice = std::slice::from_raw_parts(info.pPrinterName, len);
                names.push(OsString::from_wide(slice).to_string_lossy().into_owned());
            }
            Ok(names)
        }
    }

    fn last_error_string() -> String {
        unsafe {
            let err = GetLastError();
            if err == 0 {
                return "unknown error".to_string();
            }
            let mut buf = [0u16; 1024];
            let len = FormatMessageW(
                FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
                null(),
                err,
                0,
                buf.as_mut_ptr(),
                buf.len() as u32,
                null_mut(),
            );
            if len == 0 {
                return format!("OS error {err}");
            }
            let s = OsString::from_wide(&buf[..len as usize]).to_string_lossy().into_owned();
            format!("{} (code {err})", s.trim())
        }
    }

    /// 8-bit DIB header with a full grayscale palette.
    #[repr(C)]
    struct GrayBitmapInfo {
        header: BITMAPINFOHEADER,
        colors: [RGBQUAD; 256],
    }

    pub struct GdiHandle {
        dc: HDC,
        device: String,
    }

    /// Prints through the GDI device context of an installed printer driver.
    /// The driver reports `LOGPIXELSX/Y`; the raster is stretched into the
    /// projected rectangle with `StretchDIBits`, bypassing any page fit.
    #[derive(Debug, Clone)]
    pub struct GdiSink {
        doc_name: String,
    }

    impl GdiSink {
        pub fn new(doc_name: impl Into<String>) -> Self {
            Self {
                doc_name: doc_name.into(),
            }
        }
    }

    impl Default for GdiSink {
        fn default() -> Self {
            Self::new("Label Image (Exact Size)")
        }
    }

    impl PrintSink for GdiSink {
        type Handle = GdiHandle;

        fn open(&mut self, device: &str) -> Result<GdiHandle, DeviceError> {
            let name = wide(device);
            let dc = unsafe { CreateDCW(null(), name.as_ptr(), null(), null()) };
            if dc.is_null() {
                return Err(DeviceError::Open {
                    device: device.to_string(),
                    reason: last_error_string(),
                });
            }
            Ok(GdiHandle {
                dc,
                device: device.to_string(),
            })
        }

        fn resolution(&mut self, handle: &GdiHandle) -> Result<DeviceResolution, DeviceError> {
            let (x, y) = unsafe {
                (
                    GetDeviceCaps(handle.dc, LOGPIXELSX),
                    GetDeviceCaps(handle.dc, LOGPIXELSY),
                )
            };
            if x <= 0 || y <= 0 {
                return Err(DeviceError::Resolution(format!(
                    "'{}' reported {x}x{y} dpi",
                    handle.device
                )));
            }
            Ok(DeviceResolution::new(f64::from(x), f64::from(y)))
        }

        fn draw(
            &mut self,
            handle: &mut GdiHandle,
            rect: DeviceRect,
            raster: &GrayImage,
        ) -> Result<(), DeviceError> {
            let (w, h) = raster.dimensions();
            let stride = ((w + 3) & !3) as usize;
            let mut bits = vec![255u8; stride * h as usize];
            for (y, row) in raster.rows().enumerate() {
                for (x, px) in row.enumerate() {
                    bits[y * stride + x] = px.0[0];
                }
            }

            let mut info = GrayBitmapInfo {
                header: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w as i32,
                    biHeight: -(h as i32), // top-down
                    biPlanes: 1,
                    biBitCount: 8,
                    biCompression: BI_RGB,
                    biSizeImage: 0,
                    biXPelsPerMeter: 0,
                    biYPelsPerMeter: 0,
                    biClrUsed: 256,
                    biClrImportant: 0,
                },
                colors: [RGBQUAD {
                    rgbBlue: 0,
                    rgbGreen: 0,
                    rgbRed: 0,
                    rgbReserved: 0,
                }; 256],
            };
            for (i, c) in info.colors.iter_mut().enumerate() {
                let v = i as u8;
                c.rgbBlue = v;
                c.rgbGreen = v;
                c.rgbRed = v;
            }

            let doc_name = wide(&self.doc_name);
            let doc = DOCINFOW {
                cbSize: std::mem::size_of::<DOCINFOW>() as i32,
                lpszDocName: doc_name.as_ptr(),
                lpszOutput: null(),
                lpszDatatype: null(),
                fwType: 0,
            };

            unsafe {
                if StartDocW(handle.dc, &doc) <= 0 {
                    return Err(DeviceError::Draw(format!("StartDoc: {}", last_error_string())));
                }
                if StartPage(handle.dc) <= 0 {
                    let reason = last_error_string();
                    AbortDoc(handle.dc);
                    return Err(DeviceError::Draw(format!("StartPage: {reason}")));
                }
                let lines = StretchDIBits(
                    handle.dc,
                    rect.left,
                    rect.top,
                    rect.width as i32,
                    rect.height as i32,
                    0,
                    0,
                    w as i32,
                    h as i32,
                    bits.as_ptr() as *const _,
                    &info as *const GrayBitmapInfo as *const BITMAPINFO,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );
                if lines == 0 || lines == GDI_ERROR as i32 {
                    let reason = last_error_string();
                    AbortDoc(handle.dc);
                    return Err(DeviceError::Draw(format!("StretchDIBits: {reason}")));
                }
                EndPage(handle.dc);
                if EndDoc(handle.dc) <= 0 {
                    return Err(DeviceError::Draw(format!("EndDoc: {}", last_error_string())));
                }
            }
            Ok(())
        }

        fn close(&mut self, handle: GdiHandle) -> Result<(), DeviceError> {
            if unsafe { DeleteDC(handle.dc) } == 0 {
                return Err(DeviceError::Close(format!(
                    "DeleteDC for '{}': {}",
                    handle.device,
                    last_error_string()
                )));
            }
            Ok(())
        }
    }
}
