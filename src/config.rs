//! Server configuration

use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::pdf::JpegRenderOptions;

/// Runtime configuration, built once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub host: String,
    /// Port to bind (default: 5000)
    pub port: u16,
    /// Parent directory for per-request workspaces
    pub workspace_root: PathBuf,
    /// Directory for outputs kept for `/download` (default: ./processed)
    pub processed_dir: PathBuf,
    /// Maximum request body size in bytes (default: 100MB)
    pub max_upload_bytes: usize,
    /// Scale factor for PDF to JPEG rendering (default: 2.0)
    pub render_scale: f32,
    /// Maximum pixel area of one rendered page (default: 100_000_000)
    pub max_image_pixels: u64,
    /// JPEG quality for rendered pages (default: 90)
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workspace_root: std::env::temp_dir().join("pdf-tools-server"),
            processed_dir: PathBuf::from("processed"),
            max_upload_bytes: 100 * 1024 * 1024, // 100MB
            render_scale: 2.0,
            max_image_pixels: 100_000_000,
            jpeg_quality: 90,
        }
    }
}

impl ServerConfig {
    /// Build a configuration from environment variables, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            workspace_root: lookup("WORKSPACE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            processed_dir: lookup("PROCESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_dir),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            render_scale: parse_var(&lookup, "RENDER_SCALE")?.unwrap_or(defaults.render_scale),
            max_image_pixels: parse_var(&lookup, "MAX_IMAGE_PIXELS")?
                .unwrap_or(defaults.max_image_pixels),
            jpeg_quality: parse_var(&lookup, "JPEG_QUALITY")?.unwrap_or(defaults.jpeg_quality),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.render_scale > 0.0 && self.render_scale <= 10.0) {
            bail!(
                "RENDER_SCALE must be in (0, 10], got {}",
                self.render_scale
            );
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("JPEG_QUALITY must be in 1..=100, got {}", self.jpeg_quality);
        }
        Ok(())
    }

    /// Socket address to listen on. `host` may be an IP literal or a hostname.
    pub async fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("cannot resolve listen address {}:{}", self.host, self.port))?
            .next()
            .with_context(|| format!("no address found for {}:{}", self.host, self.port))
    }

    pub fn render_options(&self) -> JpegRenderOptions {
        JpegRenderOptions {
            scale: self.render_scale,
            quality: self.jpeg_quality,
            max_pixels: self.max_image_pixels,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        })
        .transpose()
}
