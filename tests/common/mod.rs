//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pdf_tools_server::{router, AppState, ServerConfig};
use qpdf::{QPdf, QPdfObject, QPdfObjectLike};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Router plus the directories it writes to
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub workspace: TempDir,
    pub processed: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let processed = tempfile::tempdir().unwrap();
        let mut config = ServerConfig {
            workspace_root: workspace.path().to_path_buf(),
            processed_dir: processed.path().to_path_buf(),
            ..ServerConfig::default()
        };
        adjust(&mut config);

        let state = AppState::new(config);
        Self {
            app: router(state.clone()),
            state,
            workspace,
            processed,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Number of workspaces still on disk
    pub fn leftover_workspaces(&self) -> usize {
        entries(self.workspace.path())
    }
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Hand-built `multipart/form-data` body
pub struct MultipartBody {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----PdfToolsBoundary7MA4YWxkTrZu0gW",
            body: Vec::new(),
        }
    }

    pub fn file(mut self, field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        write!(self.body, "--{}\r\n", self.boundary).unwrap();
        write!(
            self.body,
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .unwrap();
        write!(self.body, "Content-Type: {}\r\n\r\n", content_type).unwrap();
        self.body.extend_from_slice(data);
        write!(self.body, "\r\n").unwrap();
        self
    }

    pub fn pdf(self, field: &str, file_name: &str, data: &[u8]) -> Self {
        self.file(field, file_name, "application/pdf", data)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        write!(self.body, "--{}\r\n", self.boundary).unwrap();
        write!(
            self.body,
            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            name, value
        )
        .unwrap();
        self
    }

    pub fn request(mut self, uri: &str) -> Request<Body> {
        write!(self.body, "--{}--\r\n", self.boundary).unwrap();
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Build a PDF whose page `i` is `widths[i]` points wide
pub fn sample_pdf(widths: &[u32]) -> Vec<u8> {
    let qpdf = QPdf::empty();
    for (i, width) in widths.iter().enumerate() {
        let font = qpdf
            .parse_object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>")
            .unwrap();
        let fonts = qpdf.new_dictionary_from([("/F1", font.into_indirect())]);
        let resources = qpdf.new_dictionary_from([("/Font", QPdfObject::from(fonts))]);
        let contents = qpdf.new_stream(format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", i + 1));
        let page = qpdf.new_dictionary_from([
            ("/Type", qpdf.new_name("/Page")),
            (
                "/MediaBox",
                qpdf.parse_object(&format!("[0 0 {} 792]", width)).unwrap(),
            ),
            ("/Contents", QPdfObject::from(contents)),
            ("/Resources", QPdfObject::from(resources)),
        ]);
        qpdf.add_page(&page.into_indirect(), false).unwrap();
    }
    qpdf.writer().write_to_memory().unwrap()
}

/// Page widths of a PDF, read back from each MediaBox
pub fn page_widths(data: &[u8]) -> Vec<u32> {
    let qpdf = QPdf::read_from_memory(data).unwrap();
    qpdf.get_pages()
        .unwrap()
        .iter()
        .map(|page| {
            let media_box = page.get("/MediaBox").unwrap().to_string();
            media_box
                .trim_matches(|c| c == '[' || c == ']')
                .split_whitespace()
                .nth(2)
                .and_then(|w| w.parse::<f64>().ok())
                .unwrap() as u32
        })
        .collect()
}

/// A small solid-colour PNG
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Names and contents of every entry in a zip archive
pub fn unzip(data: &[u8]) -> Vec<(String, Vec<u8>)> {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}
