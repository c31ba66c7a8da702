//! Multipart upload collection and validation

use crate::error::{Error, Result};
use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;

/// Kinds of upload accepted by the operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Lowercase extensions accepted for this kind
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            FileKind::Pdf => &["pdf"],
            FileKind::Image => &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"],
        }
    }

    /// Whether `file_name` ends in an extension allowed for this kind
    pub fn allows(self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

/// A single uploaded file
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Multipart field the file arrived in
    pub field: String,
    /// Filename as declared by the client
    pub file_name: String,
    pub data: Bytes,
}

/// Files and text fields of a multipart request
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain a multipart body. Parts with a filename are files, the rest text.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| Error::Multipart {
            reason: format!("Failed to read multipart field: {e}"),
        })? {
            let name = field.name().unwrap_or("").to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await.map_err(|e| Error::Multipart {
                        reason: format!("Failed to read file data: {e}"),
                    })?;
                    // Browsers submit an empty part for untouched file inputs
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    form.push_file(UploadedFile {
                        field: name,
                        file_name,
                        data,
                    });
                }
                None => {
                    let text = field.text().await.map_err(|e| Error::Multipart {
                        reason: format!("Failed to read field '{name}': {e}"),
                    })?;
                    form.set_field(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn push_file(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Files uploaded under `field`, in submission order
    pub fn files<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| f.field == field)
    }

    /// A non-blank text field, trimmed
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A non-blank text field, or a validation error naming it
    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.text(name).ok_or_else(|| Error::MissingField {
            field: name.to_string(),
        })
    }

    /// An optional text field parsed into `T`
    pub fn parse_text<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.text(name)
            .map(|v| {
                v.parse::<T>().map_err(|e| Error::InvalidField {
                    field: name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Exactly one file of the given kind under `field`
    pub fn require_file<'a>(&'a self, field: &'a str, kind: FileKind) -> Result<&'a UploadedFile> {
        let file = self.files(field).next().ok_or_else(|| Error::MissingFile {
            field: field.to_string(),
        })?;
        check_kind(file, kind)?;
        Ok(file)
    }

    /// All files under `field`; at least one, every one of the given kind
    pub fn require_files<'a>(
        &'a self,
        field: &'a str,
        kind: FileKind,
    ) -> Result<Vec<&'a UploadedFile>> {
        let files: Vec<&'a UploadedFile> = self.files(field).collect();
        if files.is_empty() {
            return Err(Error::MissingFile {
                field: field.to_string(),
            });
        }
        for file in &files {
            check_kind(file, kind)?;
        }
        Ok(files)
    }
}

fn check_kind(file: &UploadedFile, kind: FileKind) -> Result<()> {
    if kind.allows(&file.file_name) {
        Ok(())
    } else {
        Err(Error::UnsupportedFileType {
            file_name: file.file_name.clone(),
        })
    }
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`, turns whitespace into `_`
/// and strips leading dots. Falls back to `upload` when nothing survives.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
