//! PDF Tools Server Library
//!
//! HTTP endpoints for everyday PDF manipulation:
//! - `merge`: Concatenate PDFs in submission order
//! - `split`: Extract a page range, or cut a document in two
//! - `compress`: Pass-through copy
//! - `pdf-to-jpg` / `images-to-pdf`: Convert between pages and images
//! - `protect`: AES-256 password protection
//! - `add-watermark`: Stamp a text label on every page
//!
//! Progress for long operations is pushed to WebSocket sessions.

pub mod archive;
pub mod config;
pub mod error;
pub mod pdf;
pub mod progress;
pub mod server;
pub mod upload;
pub mod workspace;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use progress::{EventEnvelope, ProgressHub, ProgressReporter, SocketEvent, SESSION_HEADER};
pub use server::{router, run_server, AppState};
