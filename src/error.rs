//! Error types for the PDF tools server

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for the PDF tools server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF tools server
#[derive(Error, Debug)]
pub enum Error {
    /// A required upload was not part of the request
    #[error("No file uploaded in field '{field}'")]
    MissingFile { field: String },

    /// A required form field was absent or blank
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    /// A form field could not be interpreted
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Upload filename does not carry an allowed extension
    #[error("Unsupported file type: {file_name}")]
    UnsupportedFileType { file_name: String },

    /// Multipart body could not be read
    #[error("Malformed multipart request: {reason}")]
    Multipart { reason: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected and no password was provided
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Incorrect password provided
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Invalid page range
    #[error("Invalid page range: {range}")]
    InvalidPageRange { range: String },

    /// Range expression was well formed but matched no page of the document
    #[error("Page range '{range}' selects no pages (total: {total})")]
    EmptySelection { range: String, total: u32 },

    /// Page number outside the document
    #[error("Page {page} out of range (total: {total})")]
    PageOutOfRange { page: u32, total: u32 },

    /// Stored output not found
    #[error("File not found: {name}")]
    FileNotFound { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// qpdf error
    #[error("qpdf error: {reason}")]
    QpdfError { reason: String },

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Zip archive error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Image dimension exceeded
    #[error("Image dimension exceeded: {detail}")]
    ImageDimensionExceeded { detail: String },

    /// Background task failed to complete
    #[error("Task join error: {reason}")]
    TaskJoin { reason: String },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::MissingFile { field } => format!("No file uploaded in field '{}'", field),
            Error::MissingField { field } => format!("Missing required field '{}'", field),
            Error::InvalidField { field, reason } => {
                format!("Invalid value for field '{}': {}", field, reason)
            }
            Error::UnsupportedFileType { file_name } => {
                format!("Unsupported file type: {}", file_name)
            }
            Error::Multipart { .. } => "Malformed multipart request".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::IncorrectPassword => "Incorrect password".to_string(),
            Error::InvalidPageRange { range } => format!("Invalid page range: {}", range),
            Error::EmptySelection { range, total } => {
                format!("Page range '{}' selects no pages (total: {})", range, total)
            }
            Error::PageOutOfRange { page, total } => {
                format!("Page {} out of range (total: {})", page, total)
            }
            Error::FileNotFound { .. } => "File not found".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::QpdfError { .. } => "PDF processing error".to_string(),
            Error::Image(_) => "Image processing error".to_string(),
            Error::Archive(_) => "Archive error".to_string(),
            Error::ImageDimensionExceeded { detail } => {
                format!("Image dimension exceeded: {}", detail)
            }
            Error::TaskJoin { .. } => "Internal error".to_string(),
        }
    }

    /// HTTP status class for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingFile { .. }
            | Error::MissingField { .. }
            | Error::InvalidField { .. }
            | Error::UnsupportedFileType { .. }
            | Error::Multipart { .. }
            | Error::InvalidPdf { .. }
            | Error::PasswordRequired
            | Error::IncorrectPassword
            | Error::InvalidPageRange { .. }
            | Error::EmptySelection { .. }
            | Error::PageOutOfRange { .. }
            | Error::ImageDimensionExceeded { .. } => StatusCode::BAD_REQUEST,
            Error::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Io(_)
            | Error::Pdfium { .. }
            | Error::QpdfError { .. }
            | Error::Image(_)
            | Error::Archive(_)
            | Error::TaskJoin { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::TaskJoin {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let errors = [
            Error::MissingFile {
                field: "file".to_string(),
            },
            Error::UnsupportedFileType {
                file_name: "notes.txt".to_string(),
            },
            Error::InvalidPageRange {
                range: "1-a".to_string(),
            },
            Error::PageOutOfRange { page: 9, total: 3 },
        ];
        for e in errors {
            assert_eq!(e.status_code(), StatusCode::BAD_REQUEST, "{}", e);
        }
    }

    #[test]
    fn test_library_errors_hide_details() {
        let e = Error::QpdfError {
            reason: "/tmp/pdf-tools-server/job-x/000_a.pdf: file is damaged".to_string(),
        };
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.client_message(), "PDF processing error");
        assert!(e.to_string().contains("damaged"));
    }

    #[test]
    fn test_missing_download_is_not_found() {
        let e = Error::FileNotFound {
            name: "merged_output.pdf".to_string(),
        };
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(e.client_message(), "File not found");
    }
}
