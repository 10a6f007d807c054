//! Input rules applied before a submission reaches the pipeline.
//!
//! These mirror what a web front end checks on its forms: an empty URL box,
//! a missing upload, an oversized file. The CLI applies the same rules.

use thiserror::Error;

use crate::error::ExtractionError;
use crate::extract::format_for_filename;
use crate::models::DocumentFormat;

/// Rejected user input. Nothing was extracted or stored.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no URL was given")]
    EmptyUrl,

    #[error("no file was selected")]
    NoFileSelected,

    #[error("upload of {size} bytes exceeds the {limit}-byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Unsupported(#[from] ExtractionError),
}

impl InputError {
    pub fn user_message(&self) -> &'static str {
        match self {
            InputError::EmptyUrl => "Please enter a URL.",
            InputError::NoFileSelected => "No file selected.",
            InputError::FileTooLarge { .. } => "File too large. Maximum file size is 16MB.",
            InputError::Unsupported(cause) => cause.user_message(),
        }
    }
}

/// Trim the URL and prepend `https://` when it has no http(s) scheme.
///
/// ```
/// use dyslexify::boundary::prepare_url_input;
///
/// assert_eq!(prepare_url_input(" example.com ").unwrap(), "https://example.com");
/// assert_eq!(prepare_url_input("http://a.org/x").unwrap(), "http://a.org/x");
/// assert!(prepare_url_input("   ").is_err());
/// ```
pub fn prepare_url_input(input: &str) -> Result<String, InputError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(InputError::EmptyUrl);
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Ok(format!("https://{}", url))
    }
}

pub fn check_upload_size(size: u64, limit: u64) -> Result<(), InputError> {
    if size > limit {
        return Err(InputError::FileTooLarge { size, limit });
    }
    Ok(())
}

/// Validate an upload's name before any of its bytes are read.
pub fn check_upload_name(filename: &str) -> Result<DocumentFormat, InputError> {
    if filename.trim().is_empty() {
        return Err(InputError::NoFileSelected);
    }
    Ok(format_for_filename(filename)?)
}
