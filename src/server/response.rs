//! Wire format: JSON envelopes, file attachments and the link delivery mode

use crate::archive::zip_entries;
use crate::error::{Error, Result};
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub const PDF: &str = "application/pdf";
pub const ZIP: &str = "application/zip";
pub const JPEG: &str = "image/jpeg";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// JSON body shared by every non-file response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl Envelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            filename: None,
            files: Vec::new(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status_code(), Json(Envelope::failure(self.client_message()))).into_response()
    }
}

/// How a finished operation hands its output back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Stream the file in the response body
    #[default]
    Attachment,
    /// Keep the output for `/download` and answer with its name
    Link,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryQuery {
    #[serde(default)]
    pub delivery: Delivery,
}

/// The `?delivery=` mode of a request. A value that does not parse is
/// rejected with the JSON error envelope.
#[derive(Debug, Clone, Copy)]
pub struct RequestedDelivery(pub Delivery);

impl<S> FromRequestParts<S> for RequestedDelivery
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Query(query) = Query::<DeliveryQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::InvalidField {
                field: "delivery".to_string(),
                reason: e.body_text(),
            })?;
        Ok(Self(query.delivery))
    }
}

/// One generated file
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub name: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

impl OutputFile {
    pub fn pdf(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            content_type: PDF,
            data,
        }
    }

    pub fn zip(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            content_type: ZIP,
            data,
        }
    }
}

/// Result of a successful operation
#[derive(Debug)]
pub struct OperationOutput {
    pub message: String,
    pub files: Vec<OutputFile>,
    /// Name of the zip used when several files are streamed at once
    pub archive_name: &'static str,
}

impl OperationOutput {
    pub fn single(message: &str, file: OutputFile) -> Self {
        Self {
            message: message.to_string(),
            files: vec![file],
            archive_name: "output.zip",
        }
    }

    pub fn bundle(message: &str, files: Vec<OutputFile>, archive_name: &'static str) -> Self {
        Self {
            message: message.to_string(),
            files,
            archive_name,
        }
    }
}

/// File body with `Content-Disposition: attachment`
pub fn attachment(file: OutputFile) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.name),
            ),
        ],
        file.data,
    )
        .into_response()
}

/// Turn an operation's output into a response according to `delivery`
pub async fn deliver(
    processed_dir: &Path,
    delivery: Delivery,
    output: OperationOutput,
) -> Result<Response> {
    match delivery {
        Delivery::Attachment => {
            let OperationOutput {
                mut files,
                archive_name,
                ..
            } = output;
            if files.len() == 1 {
                return Ok(attachment(files.remove(0)));
            }
            let archive = zip_entries(
                files
                    .iter()
                    .map(|f| (f.name.as_str(), f.data.as_slice())),
            )?;
            Ok(attachment(OutputFile::zip(archive_name, archive)))
        }
        Delivery::Link => {
            tokio::fs::create_dir_all(processed_dir).await?;

            let prefix = Uuid::new_v4().simple().to_string();
            let mut stored = Vec::with_capacity(output.files.len());
            for file in &output.files {
                let name = format!("{}_{}", prefix, file.name);
                tokio::fs::write(processed_dir.join(&name), &file.data).await?;
                stored.push(name);
            }

            let envelope = if stored.len() == 1 {
                Envelope {
                    success: true,
                    message: output.message,
                    filename: stored.pop(),
                    files: Vec::new(),
                }
            } else {
                Envelope {
                    success: true,
                    message: output.message,
                    filename: None,
                    files: stored,
                }
            };
            Ok(Json(envelope).into_response())
        }
    }
}

/// Content type for a stored output, from its extension
pub fn content_type_for(name: &str) -> &'static str {
    match name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF,
        Some("zip") => ZIP,
        Some("jpg") | Some("jpeg") => JPEG,
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_envelope() {
        let response = Error::MissingField {
            field: "password".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let json = serde_json::to_value(Envelope::failure("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "message": "boom"}));
    }

    #[test]
    fn test_delivery_query() {
        let q: DeliveryQuery = serde_json::from_str(r#"{"delivery": "link"}"#).unwrap();
        assert_eq!(q.delivery, Delivery::Link);
        let q: DeliveryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.delivery, Delivery::Attachment);
    }

    async fn delivery_for(uri: &str) -> std::result::Result<Delivery, Error> {
        let (mut parts, _) = axum::http::Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        RequestedDelivery::from_request_parts(&mut parts, &())
            .await
            .map(|RequestedDelivery(delivery)| delivery)
    }

    #[tokio::test]
    async fn test_requested_delivery() {
        assert_eq!(delivery_for("/merge").await.unwrap(), Delivery::Attachment);
        assert_eq!(
            delivery_for("/merge?delivery=link").await.unwrap(),
            Delivery::Link
        );

        let err = delivery_for("/merge?delivery=carrier-pigeon").await.unwrap_err();
        assert!(matches!(&err, Error::InvalidField { field, .. } if field == "delivery"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a_merged_output.pdf"), PDF);
        assert_eq!(content_type_for("pdf_images.ZIP"), ZIP);
        assert_eq!(content_type_for("page_1.jpg"), JPEG);
        assert_eq!(content_type_for("README"), OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_link_delivery_stores_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = OperationOutput::bundle(
            "PDF split successfully",
            vec![
                OutputFile::pdf("split_part1.pdf", b"one".to_vec()),
                OutputFile::pdf("split_part2.pdf", b"two".to_vec()),
            ],
            "split_output.zip",
        );

        let response = deliver(dir.path(), Delivery::Link, output).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("_split_part1.pdf"));
        assert!(names[1].ends_with("_split_part2.pdf"));
    }
}
