use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::StoreError;

pub const UPLOADS_ROUTE: &str = "uploads";
pub const PLACEHOLDER_URL: &str = "/static/placeholder.svg";

pub const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="160" height="160" viewBox="0 0 160 160">"##,
    r##"<rect width="160" height="160" fill="#e2e8f0"/>"##,
    r##"<circle cx="80" cy="62" r="30" fill="#94a3b8"/>"##,
    r##"<path d="M28 142c6-30 28-46 52-46s46 16 52 46z" fill="#94a3b8"/>"##,
    "</svg>",
);

/// Public URL of a stored photo, or of the placeholder when the candidate has none.
pub fn url(photo_path: Option<&str>) -> String {
    match photo_path {
        Some(name) => format!("/{UPLOADS_ROUTE}/{name}"),
        None => PLACEHOLDER_URL.to_owned(),
    }
}

/// Upload directory for candidate photos. Candidates only keep the generated file name.
#[derive(Clone, Debug)]
pub struct PhotoStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl PhotoStore {
    pub fn new(dir: PathBuf, max_bytes: u64) -> PhotoStore {
        PhotoStore { dir, max_bytes }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub async fn save(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        let name = generate_name(original_name);
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        debug!(photo = %name, size = bytes.len(), "photo stored");
        Ok(name)
    }

    /// Best effort: a photo that cannot be removed only costs disk space.
    pub async fn remove(&self, name: &str) {
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => debug!(photo = name, "photo removed"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(photo = name, error = %err, "could not remove photo"),
        }
    }
}

fn generate_name(original_name: Option<&str>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("candidate-{}-{suffix}{}", Utc::now().timestamp_millis(), extension(original_name))
}

fn extension(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
