//! PDFium-backed operations: rasterizing, composing and stamping pages

use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use pdfium_render::prelude::*;

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    // Try to bind to system library or use static linking
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Whether a PDFium library can be bound on this host
pub fn pdfium_available() -> bool {
    create_pdfium().is_ok()
}

fn load_document<'a>(pdfium: &'a Pdfium, data: &'a [u8]) -> Result<PdfDocument<'a>> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }

    pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| match e {
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                Error::PasswordRequired
            }
            _ => Error::Pdfium {
                reason: format!("{}", e),
            },
        })
}

/// Extracted text of every page, in page order
pub fn page_text(data: &[u8]) -> Result<Vec<String>> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data)?;

    document
        .pages()
        .iter()
        .enumerate()
        .map(|(i, page)| {
            page.text().map(|text| text.all()).map_err(|e| Error::Pdfium {
                reason: format!("Failed to read text of page {}: {}", i + 1, e),
            })
        })
        .collect()
}

/// Rendering parameters for [`render_pages_to_jpeg`]
#[derive(Debug, Clone)]
pub struct JpegRenderOptions {
    /// Scale factor applied to the page size in points
    pub scale: f32,
    /// JPEG quality, 1-100
    pub quality: u8,
    /// Upper bound on width * height of a single rendered page
    pub max_pixels: u64,
}

impl Default for JpegRenderOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            quality: 90,
            max_pixels: 100_000_000,
        }
    }
}

/// A page rasterized to JPEG
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Page number (1-indexed)
    pub page: u32,
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Render every page of a PDF to JPEG
///
/// `on_progress` is called after each page with the number of pages done
/// and the page count.
pub fn render_pages_to_jpeg<F>(
    data: &[u8],
    options: &JpegRenderOptions,
    mut on_progress: F,
) -> Result<Vec<RenderedPage>>
where
    F: FnMut(u32, u32),
{
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data)?;

    let pages = document.pages();
    let page_count = pages.len() as u32;
    let mut rendered = Vec::with_capacity(page_count as usize);

    for page_index in 0..pages.len() {
        let page_num = page_index as u32 + 1;
        let page = pages.get(page_index).map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", page_num, e),
        })?;

        let target_width = (page.width().value * options.scale).ceil() as u64;
        let target_height = (page.height().value * options.scale).ceil() as u64;
        if target_width * target_height > options.max_pixels {
            return Err(Error::ImageDimensionExceeded {
                detail: format!(
                    "page {} would render at {}x{} pixels, more than {}",
                    page_num, target_width, target_height, options.max_pixels
                ),
            });
        }

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(options.scale)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to render page {}: {}", page_num, e),
            })?;

        // JPEG has no alpha channel
        let rgb = bitmap.as_image().to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, options.quality).encode_image(&rgb)?;

        rendered.push(RenderedPage {
            page: page_num,
            width,
            height,
            jpeg,
        });

        on_progress(page_num, page_count);
    }

    Ok(rendered)
}

/// Compose images into a PDF, one page per image in the order given
///
/// Each image is converted to 8-bit RGB and placed on a page of exactly its
/// pixel size, one pixel per point.
pub fn images_to_pdf(images: &[DynamicImage]) -> Result<Vec<u8>> {
    if images.is_empty() {
        return Err(Error::Pdfium {
            reason: "No images provided".to_string(),
        });
    }

    let pdfium = create_pdfium()?;
    let mut document = pdfium.create_new_pdf().map_err(|e| Error::Pdfium {
        reason: format!("Failed to create document: {}", e),
    })?;

    for (i, source) in images.iter().enumerate() {
        let image = DynamicImage::ImageRgb8(source.to_rgb8());
        let width = PdfPoints::new(image.width() as f32);
        let height = PdfPoints::new(image.height() as f32);

        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::from_points(width, height))
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to add page for image {}: {}", i + 1, e),
            })?;

        page.objects_mut()
            .create_image_object(
                PdfPoints::ZERO,
                PdfPoints::ZERO,
                &image,
                Some(width),
                Some(height),
            )
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to place image {}: {}", i + 1, e),
            })?;
    }

    document.save_to_bytes().map_err(|e| Error::Pdfium {
        reason: format!("Failed to save PDF: {}", e),
    })
}

/// The label stamped on every page by [`add_watermark`]
#[derive(Debug, Clone)]
pub struct WatermarkTemplate {
    pub text: String,
    pub font_size: f32,
    /// Counter-clockwise rotation in degrees
    pub angle: f32,
    /// Fill opacity, 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f32,
}

impl WatermarkTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: 60.0,
            angle: 45.0,
            opacity: 0.3,
        }
    }

    fn fill_color(&self) -> PdfColor {
        let alpha = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        PdfColor::new(128, 128, 128, alpha)
    }
}

/// Stamp the watermark template centred on every page, on top of the
/// existing content
pub fn add_watermark(data: &[u8], template: &WatermarkTemplate) -> Result<Vec<u8>> {
    let pdfium = create_pdfium()?;
    let mut document = load_document(&pdfium, data)?;

    let font = document.fonts_mut().helvetica_bold();
    let font_size = PdfPoints::new(template.font_size);
    let color = template.fill_color();

    let pages = document.pages();
    for page_index in 0..pages.len() {
        let page_num = page_index as u32 + 1;
        let pdfium_error = |e: PdfiumError| Error::Pdfium {
            reason: format!("Failed to watermark page {}: {}", page_num, e),
        };

        let mut page = pages.get(page_index).map_err(pdfium_error)?;
        let (page_width, page_height) = (page.width(), page.height());

        let mut label = PdfPageTextObject::new(&document, &template.text, font, font_size)
            .map_err(pdfium_error)?;
        label.set_fill_color(color).map_err(pdfium_error)?;

        // Centre the label on the origin, rotate it, then move it to the page centre
        let label_width = label.width().map_err(pdfium_error)?;
        label
            .translate(label_width / -2.0, font_size / -3.0)
            .map_err(pdfium_error)?;
        label
            .rotate_counter_clockwise_degrees(template.angle)
            .map_err(pdfium_error)?;
        label
            .translate(page_width / 2.0, page_height / 2.0)
            .map_err(pdfium_error)?;

        page.objects_mut()
            .add_text_object(label)
            .map_err(pdfium_error)?;
    }

    document.save_to_bytes().map_err(|e| Error::Pdfium {
        reason: format!("Failed to save watermarked PDF: {}", e),
    })
}
