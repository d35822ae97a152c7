//! Pdfium page rendering.
//!
//! Requires the `pdf` feature and a Pdfium shared library, either on the system
//! library path or in the directory named by `PDFIUM_LIB_DIR`.

mod bindings;
pub mod rendering;

pub use bindings::PDFIUM_LIB_DIR_ENV;
pub use rendering::{PageRenderOptions, PdfiumRasterizer};
