//! Operation handlers
//!
//! Each public handler reads the form, runs its `process_*` counterpart in a
//! scoped workspace and turns the outcome into a response with [`finish`].

use super::response::{
    content_type_for, deliver, Delivery, OperationOutput, OutputFile, RequestedDelivery,
};
use super::AppState;
use crate::archive::zip_entries;
use crate::error::{Error, Result};
use crate::pdf::{self, parse_page_range, QpdfWrapper, WatermarkTemplate};
use crate::progress::ProgressReporter;
use crate::upload::{secure_filename, FileKind, UploadForm, UploadedFile};
use crate::workspace::in_workspace;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::FutureExt;
use std::path::PathBuf;

type Upload = std::result::Result<Multipart, MultipartRejection>;

/// Run CPU-bound library work on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

async fn read_form(multipart: Upload) -> Result<UploadForm> {
    let multipart = multipart.map_err(|e| Error::Multipart {
        reason: e.to_string(),
    })?;
    UploadForm::from_multipart(multipart).await
}

/// Report the outcome to the session and build the response
async fn finish(
    state: &AppState,
    operation: &'static str,
    progress: &ProgressReporter,
    delivery: Delivery,
    result: Result<OperationOutput>,
) -> Response {
    let result = match result {
        Ok(output) => {
            let message = output.message.clone();
            deliver(&state.config.processed_dir, delivery, output)
                .await
                .map(|response| (message, response))
        }
        Err(e) => Err(e),
    };

    match result {
        Ok((message, response)) => {
            tracing::info!(operation, sid = ?progress.sid(), "{}", message);
            progress.complete(message);
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, operation, sid = ?progress.sid(), "{} failed", operation);
            progress.error(e.client_message());
            e.into_response()
        }
    }
}

/// Stage each upload into the workspace in submission order
async fn stage_all(
    workspace: &crate::workspace::Workspace,
    files: &[UploadedFile],
) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        staged.push(workspace.stage(i, file).await?);
    }
    Ok(staged)
}

fn read_all(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
    paths
        .iter()
        .map(|path| std::fs::read(path).map_err(Error::from))
        .collect()
}

pub async fn merge(
    State(state): State<AppState>,
    RequestedDelivery(delivery): RequestedDelivery,
    headers: HeaderMap,
    multipart: Upload,
) -> Response {
    let progress = state.reporter(&headers);
    let result = process_merge(&state, &progress, multipart).await;
    finish(&state, "merge", &progress, delivery, result).await
}

async fn process_merge(
    state: &AppState,
    progress: &ProgressReporter,
    multipart: Upload,
) -> Result<OperationOutput> {
    let form = read_form(multipart).await?;
    let files: Vec<UploadedFile> = form
        .require_files("files", FileKind::Pdf)?
        .into_iter()
        .cloned()
        .collect();
    progress.status(format!("Merging {} files", files.len()));

    let progress = progress.clone();
    in_workspace(&state.config.workspace_root, move |ws| {
        async move {
            let staged = stage_all(ws, &files).await?;
            let names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();

            let merged = blocking(move || {
                let inputs = read_all(&staged)?;
                let refs: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();
                QpdfWrapper::merge(&refs, |done, total| {
                    progress.progress(done, total, format!("Merged {}", names[done - 1]));
                })
            })
            .await?;

            tokio::fs::write(ws.output_path("merged_output.pdf"), &merged).await?;
            Ok(OperationOutput::single(
                "PDFs merged successfully",
                OutputFile::pdf("merged_output.pdf", merged),
            ))
        }
        .boxed()
    })
    .await
}

pub async fn split(
    State(state): State<AppState>,
    RequestedDelivery(delivery): RequestedDelivery,
    headers: HeaderMap,
    multipart: Upload,
) -> Response {
    let progress = state.reporter(&headers);
    let result = process_split(&state, &progress, multipart).await;
    finish(&state, "split", &progress, delivery, result).await
}

/// How a split request cuts the document
enum SplitMode {
    Ranges(String),
    At(u32),
}

async fn process_split(
    state: &AppState,
    progress: &ProgressReporter,
    multipart: Upload,
) -> Result<OperationOutput> {
    let form = read_form(multipart).await?;
    let file = form.require_file("file", FileKind::Pdf)?.clone();
    let mode = match form.text("ranges") {
        Some(ranges) => SplitMode::Ranges(ranges.to_string()),
        None => SplitMode::At(form.parse_text::<u32>("split_page")?.unwrap_or(1)),
    };
    progress.status("Splitting PDF");

    let progress = progress.clone();
    in_workspace(&state.config.workspace_root, move |ws| {
        async move {
            let staged = ws.stage(0, &file).await?;

            let output = blocking(move || {
                let data = std::fs::read(&staged)?;
                match mode {
                    SplitMode::Ranges(ranges) => {
                        let total = QpdfWrapper::get_page_count(&data, None)?;
                        let pages = parse_page_range(&ranges, total)?;
                        if pages.is_empty() {
                            return Err(Error::EmptySelection {
                                range: ranges,
                                total,
                            });
                        }
                        progress.progress(
                            0,
                            pages.len(),
                            format!("Extracting {} pages", pages.len()),
                        );
                        let extracted = QpdfWrapper::extract_pages(&data, &pages)?;
                        progress.progress(pages.len(), pages.len(), "Pages extracted");
                        Ok(OperationOutput::single(
                            "PDF split successfully",
                            OutputFile::pdf("split_output.pdf", extracted),
                        ))
                    }
                    SplitMode::At(page) => {
                        let (first, second) = QpdfWrapper::split_at(&data, page)?;
                        progress.progress(2, 2, format!("Split after page {}", page));
                        Ok(OperationOutput::bundle(
                            "PDF split successfully",
                            vec![
                                OutputFile::pdf("split_part1.pdf", first),
                                OutputFile::pdf("split_part2.pdf", second),
                            ],
                            "split_output.zip",
                        ))
                    }
                }
            })
            .await?;

            for file in &output.files {
                tokio::fs::write(ws.output_path(&file.name), &file.data).await?;
            }
            Ok(output)
        }
        .boxed()
    })
    .await
}

pub async fn compress(
    State(state): State<AppState>,
    RequestedDelivery(delivery): RequestedDelivery,
    headers: HeaderMap,
    multipart: Upload,
) -> Response {
    let progress = state.reporter(&headers);
    let result = process_compress(&state, &progress, multipart).await;
    finish(&state, "compress", &progress, delivery, result).await
}

/// Compression is a plain copy; the output is byte-identical to the input
async fn process_compress(
    state: &AppState,
    progress: &ProgressReporter,
    multipart: Upload,
) -> Result<OperationOutput> {
    let form = read_form(multipart).await?;
    let file = form.require_file("file", FileKind::Pdf)?.clone();
    progress.status("Compressing PDF");

    in_workspace(&state.config.workspace_root, move |ws| {
        async move {
            let staged = ws.stage(0, &file).await?;
            let output_path = ws.output_path("compressed_output.pdf");
            tokio::fs::copy(&staged, &output_path).await?;
            let data = tokio::fs::read(&output_path).await?;
            Ok(OperationOutput::single(
                "PDF compressed successfully",
                OutputFile::pdf("compressed_output.pdf", data),
            ))
        }
        .boxed()
    })
    .await
}

pub async fn pdf_to_jpg(
    State(state): State<AppState>,
    RequestedDelivery(delivery): RequestedDelivery,
    headers: HeaderMap,
    multipart: Upload,
) -> Response {
    let progress = state.reporter(&headers);
    let result = process_pdf_to_jpg(&state, &progress, multipart).await;
    finish(&state, "pdf_to_jpg", &progress, delivery, result).await
}

async fn process_pdf_to_jpg(
    state: &AppState,
    progress: &ProgressReporter,
    multipart: Upload,
) -> Result<OperationOutput> {
    let form = read_form(multipart).await?;
    let file = form.require_file("file", FileKind::Pdf)?.clone();
    let options = state.config.render_options();
    progress.status("Converting PDF pages to JPEG");

    let progress = progress.clone();
    in_workspace(&state.config.workspace_root, move |ws| {
        async move {
            let staged = ws.stage(0, &file).await?;

            let archive = blocking(move || {
                let data = std::fs::read(&staged)?;
                let pages = pdf::render_pages_to_jpeg(&data, &options, |done, total| {
                    progress.progress(
                        done as usize,
                        total as usize,
                        format!("Converted page {} of {}", done, total),
                    );
                })?;

                let names: Vec<String> = pages
                    .iter()
                    .map(|p| format!("page_{}.jpg", p.page))
                    .collect();
                zip_entries(
                    names
                        .iter()
                        .zip(&pages)
                        .map(|(name, page)| (name.as_str(), page.jpeg.as_slice())),
                )
            })
            .await?;

            tokio::fs::write(ws.output_path("pdf_images.zip"), &archive).await?;
            Ok(OperationOutput::single(
                "PDF converted to JPEG images",
                OutputFile::zip("pdf_images.zip", archive),
            ))
        }
        .boxed()
    })
    .await
}

pub async fn images_to_pdf(
    State(state): State<AppState>,
    RequestedDelivery(delivery): RequestedDelivery,
    headers: HeaderMap,
    multipart: Upload,
) -> Response {
    let progress = state.reporter(&headers);
    let result = process_images_to_pdf(&state, &progress, multipart).await;
    finish(&state, "images_to_pdf", &progress, delivery, result).await
}

async fn process_images_to_pdf(
    state: &AppState,
    progress: &ProgressReporter,
    multipart: Upload,
) -> Result<OperationOutput> {
    let form = read_form(multipart).await?;
    let files: Vec<UploadedFile> = form
        .require_files("files", FileKind::Image)?
        .into_iter()
        .cloned()
        .collect();
    progress.status(format!("Converting {} images to PDF", files.len()));

    let progress = progress.clone();
    in_workspace(&state.config.workspace_root, move |ws| {
        async move {
            let staged = stage_all(ws, &files).await?;

            let document = blocking(move || {
                let total = staged.len();
                let mut images = Vec::with_capacity(total);
                for (i, path) in staged.iter().enumerate() {
                    images.push(image::open(path)?);
                    progress.progress(
                        i + 1,
                        total,
                        format!("Loaded image {} of {}", i + 1, total),
                    );
                }
                pdf::images_to_pdf(&images)
            })
            .await?;

            tokio::fs::write(ws.output_path("images_output.pdf"), &document).await?;
            Ok(OperationOutput::single(
                "Images converted to PDF",
                OutputFile::pdf("images_output.pdf", document),
            ))
        }
        .boxed()
    })
    .await
}

pub async fn protect(
    State(state): State<AppState>,
    RequestedDelivery(delivery): RequestedDelivery,
    headers: HeaderMap,
    multipart: Upload,
) -> Response {
    let progress = state.reporter(&headers);
    let result = process_protect(&state, &progress, multipart).await;
    finish(&state, "protect", &progress, delivery, result).await
}

async fn process_protect(
    state: &AppState,
    progress: &ProgressReporter,
    multipart: Upload,
) -> Result<OperationOutput> {
    let form = read_form(multipart).await?;
    let file = form.require_file("file", FileKind::Pdf)?.clone();
    let password = form.require_text("password")?.to_string();
    let owner_password = form.text("owner_password").map(str::to_string);
    progress.status("Encrypting PDF");

    in_workspace(&state.config.workspace_root, move |ws| {
        async move {
            let staged = ws.stage(0, &file).await?;

            let encrypted = blocking(move || {
                let data = std::fs::read(&staged)?;
                QpdfWrapper::encrypt(&data, &password, owner_password.as_deref())
            })
            .await?;

            tokio::fs::write(ws.output_path("protected_output.pdf"), &encrypted).await?;
            Ok(OperationOutput::single(
                "PDF protected successfully",
                OutputFile::pdf("protected_output.pdf", encrypted),
            ))
        }
        .boxed()
    })
    .await
}

pub async fn add_watermark(
    State(state): State<AppState>,
    RequestedDelivery(delivery): RequestedDelivery,
    headers: HeaderMap,
    multipart: Upload,
) -> Response {
    let progress = state.reporter(&headers);
    let result = process_add_watermark(&state, &progress, multipart).await;
    finish(&state, "add_watermark", &progress, delivery, result).await
}

fn watermark_template(form: &UploadForm) -> Result<WatermarkTemplate> {
    let mut template = WatermarkTemplate::new(form.require_text("watermark_text")?);

    if let Some(opacity) = form.parse_text::<f32>("opacity")? {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(Error::InvalidField {
                field: "opacity".to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }
        template.opacity = opacity;
    }
    if let Some(font_size) = form.parse_text::<f32>("font_size")? {
        if !(font_size > 0.0 && font_size.is_finite()) {
            return Err(Error::InvalidField {
                field: "font_size".to_string(),
                reason: "must be a positive number".to_string(),
            });
        }
        template.font_size = font_size;
    }
    if let Some(angle) = form.parse_text::<f32>("angle")? {
        if !angle.is_finite() {
            return Err(Error::InvalidField {
                field: "angle".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }
        template.angle = angle;
    }

    Ok(template)
}

async fn process_add_watermark(
    state: &AppState,
    progress: &ProgressReporter,
    multipart: Upload,
) -> Result<OperationOutput> {
    let form = read_form(multipart).await?;
    let file = form.require_file("file", FileKind::Pdf)?.clone();
    let template = watermark_template(&form)?;
    progress.status("Adding watermark");

    in_workspace(&state.config.workspace_root, move |ws| {
        async move {
            let staged = ws.stage(0, &file).await?;

            let stamped = blocking(move || {
                let data = std::fs::read(&staged)?;
                pdf::add_watermark(&data, &template)
            })
            .await?;

            tokio::fs::write(ws.output_path("watermarked_output.pdf"), &stamped).await?;
            Ok(OperationOutput::single(
                "Watermark added successfully",
                OutputFile::pdf("watermarked_output.pdf", stamped),
            ))
        }
        .boxed()
    })
    .await
}

/// Serve an output stored by a `?delivery=link` request
pub async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    match process_download(&state, &filename).await {
        Ok(file) => super::response::attachment(file),
        Err(e) => {
            tracing::warn!(error = %e, filename = %filename, "download failed");
            e.into_response()
        }
    }
}

async fn process_download(state: &AppState, filename: &str) -> Result<OutputFile> {
    if filename.is_empty() || secure_filename(filename) != filename {
        return Err(Error::InvalidField {
            field: "filename".to_string(),
            reason: "not a plain file name".to_string(),
        });
    }

    let path = state.config.processed_dir.join(filename);
    let data = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            name: filename.to_string(),
        },
        _ => Error::Io(e),
    })?;

    Ok(OutputFile {
        name: filename.to_string(),
        content_type: content_type_for(filename),
        data,
    })
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
