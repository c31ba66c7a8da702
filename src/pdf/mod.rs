//! PDF processing layer
//!
//! This module provides PDF processing functionality using PDFium and qpdf.

mod pdfium;
mod qpdf;
mod range;

pub use pdfium::{
    add_watermark, images_to_pdf, page_text, pdfium_available, render_pages_to_jpeg,
    JpegRenderOptions, RenderedPage, WatermarkTemplate,
};
pub use qpdf::QpdfWrapper;
pub use range::parse_page_range;
