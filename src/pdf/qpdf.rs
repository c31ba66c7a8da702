//! qpdf FFI wrapper for PDF manipulation
//!
//! Page-level operations (merge, split, encryption) are done by copying page
//! objects between documents with the qpdf crate (vendored FFI).

use crate::error::{Error, Result};
use qpdf::{EncryptionParams, EncryptionParamsR6, PrintPermission, QPdf};

/// Wrapper for qpdf operations via FFI
pub struct QpdfWrapper;

/// Helper: open a QPdf from memory, optionally with password
fn open_qpdf(data: &[u8], password: Option<&str>) -> Result<QPdf> {
    match password {
        Some(pwd) => QPdf::read_from_memory_encrypted(data, pwd).map_err(|e| {
            match map_qpdf_error(e) {
                Error::PasswordRequired => Error::IncorrectPassword,
                other => other,
            }
        }),
        None => QPdf::read_from_memory(data).map_err(map_qpdf_error),
    }
}

/// Map qpdf crate errors to our error types
fn map_qpdf_error(e: qpdf::QPdfError) -> Error {
    match e.error_code() {
        qpdf::QPdfErrorCode::InvalidPassword => Error::PasswordRequired,
        _ => Error::QpdfError {
            reason: e.to_string(),
        },
    }
}

/// Copy the given 0-indexed pages of `source`, in order, into a fresh document
fn copy_pages(source: &QPdf, indices: impl IntoIterator<Item = u32>) -> Result<QPdf> {
    let total = source.get_num_pages().map_err(map_qpdf_error)?;
    let dest = QPdf::empty();

    for idx in indices {
        let page = source.get_page(idx).ok_or(Error::PageOutOfRange {
            page: idx + 1,
            total,
        })?;
        let copied = dest.copy_from_foreign(&page);
        dest.add_page(&copied, false).map_err(map_qpdf_error)?;
    }

    Ok(dest)
}

fn write_plain(qpdf: &QPdf) -> Result<Vec<u8>> {
    let mut writer = qpdf.writer();
    writer.preserve_encryption(false);
    writer.write_to_memory().map_err(map_qpdf_error)
}

impl QpdfWrapper {
    /// Merge multiple PDFs into one, in the order given
    ///
    /// `on_progress` is called after each input is appended with the number
    /// of inputs done and the total.
    pub fn merge<F>(inputs: &[&[u8]], mut on_progress: F) -> Result<Vec<u8>>
    where
        F: FnMut(usize, usize),
    {
        if inputs.is_empty() {
            return Err(Error::QpdfError {
                reason: "No input PDFs provided".to_string(),
            });
        }

        let dest = QPdf::empty();

        for (i, input_data) in inputs.iter().enumerate() {
            let source = QPdf::read_from_memory(input_data).map_err(|e| Error::QpdfError {
                reason: format!("Failed to read input PDF {}: {}", i, e),
            })?;

            let pages = source.get_pages().map_err(|e| Error::QpdfError {
                reason: format!("Failed to get pages from input PDF {}: {}", i, e),
            })?;

            for page in &pages {
                let copied = dest.copy_from_foreign(page);
                dest.add_page(&copied, false).map_err(map_qpdf_error)?;
            }

            on_progress(i + 1, inputs.len());
        }

        write_plain(&dest)
    }

    /// Extract the given 1-indexed pages, in the order given, into a new PDF
    pub fn extract_pages(input_data: &[u8], pages: &[u32]) -> Result<Vec<u8>> {
        let source = open_qpdf(input_data, None)?;
        let dest = copy_pages(&source, pages.iter().map(|p| p.saturating_sub(1)))?;
        write_plain(&dest)
    }

    /// Cut a PDF in two: pages `1..=split_page` and `split_page+1..=n`
    ///
    /// `split_page` is clamped to the page count, so either half may be an
    /// empty document; together they always hold every page.
    pub fn split_at(input_data: &[u8], split_page: u32) -> Result<(Vec<u8>, Vec<u8>)> {
        let source = open_qpdf(input_data, None)?;
        let total = source.get_num_pages().map_err(map_qpdf_error)?;
        let cut = split_page.min(total);

        let first = copy_pages(&source, 0..cut)?;
        let second = copy_pages(&source, cut..total)?;

        Ok((write_plain(&first)?, write_plain(&second)?))
    }

    /// Copy every page into a new document and encrypt it
    ///
    /// # Arguments
    /// * `input_data` - Raw PDF bytes
    /// * `user_password` - Password required to open the PDF
    /// * `owner_password` - Password required to change permissions (defaults to `user_password`)
    ///
    /// # Returns
    /// The encrypted PDF as bytes (AES-256, revision 6)
    pub fn encrypt(
        input_data: &[u8],
        user_password: &str,
        owner_password: Option<&str>,
    ) -> Result<Vec<u8>> {
        let source = open_qpdf(input_data, None)?;
        let total = source.get_num_pages().map_err(map_qpdf_error)?;
        let dest = copy_pages(&source, 0..total)?;

        let owner_pwd = owner_password.unwrap_or(user_password);

        let encryption = EncryptionParams::R6(EncryptionParamsR6 {
            user_password: user_password.to_string(),
            owner_password: owner_pwd.to_string(),
            allow_accessibility: true,
            allow_extract: true,
            allow_assemble: true,
            allow_annotate_and_form: true,
            allow_form_filling: true,
            allow_modify_other: true,
            allow_print: PrintPermission::Full,
            encrypt_metadata: true,
        });

        let mut writer = dest.writer();
        writer
            .preserve_encryption(false)
            .encryption_params(encryption);
        writer.write_to_memory().map_err(map_qpdf_error)
    }

    /// Get the page count of a PDF
    ///
    /// # Arguments
    /// * `input_data` - Raw PDF bytes
    /// * `password` - Optional password for encrypted PDFs
    pub fn get_page_count(input_data: &[u8], password: Option<&str>) -> Result<u32> {
        let qpdf = open_qpdf(input_data, password)?;
        qpdf.get_num_pages().map_err(map_qpdf_error)
    }
}
