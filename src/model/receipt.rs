//! Receipt images supplied alongside an expense.

use crate::error::Res;
use crate::utils;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use std::fmt::{Debug, Formatter};
use std::path::Path;

/// The content types a receipt upload may have.
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/heic"];

/// The largest receipt that may be uploaded, 5 MiB.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// An image file waiting to be uploaded to the receipt store.
#[derive(Clone, PartialEq, Eq)]
pub struct ReceiptFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ReceiptFile {
    /// Creates a `ReceiptFile`, rejecting unsupported content types and oversized files.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Res<Self> {
        let file_name = file_name.into();
        let content_type = content_type.into();
        if !ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str()) {
            bail!("Only JPEG, PNG, WebP and HEIC images can be uploaded, got '{content_type}'");
        }
        if bytes.len() > MAX_FILE_SIZE {
            bail!(
                "Receipt images must be 5MB or smaller, '{file_name}' is {} bytes",
                bytes.len()
            );
        }
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Reads a receipt from disk, inferring its content type from the file extension.
    pub async fn load(path: &Path) -> Res<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("'{}' is not a file path", path.display()))?;
        let extension = extension_of(&file_name).unwrap_or_default().to_lowercase();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "heic" => "image/heic",
            _ => bail!("Only JPEG, PNG, WebP and HEIC images can be uploaded: '{file_name}'"),
        };
        let bytes = utils::read_bytes(path).await?;
        Self::new(file_name, content_type, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The extension used for the stored blob, taken from the original file name.
    pub fn extension(&self) -> &str {
        extension_of(&self.file_name).unwrap_or(match self.content_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            _ => "jpg",
        })
    }

    /// The blob path for this receipt: `{user_id}/{expense_id}_{unix_millis}.{ext}`.
    ///
    /// The timestamp keeps a re-upload for the same expense from colliding with the blob it
    /// replaces.
    pub fn storage_path(&self, user_id: &str, expense_id: &str, now: DateTime<Utc>) -> String {
        format!(
            "{user_id}/{expense_id}_{}.{}",
            now.timestamp_millis(),
            self.extension()
        )
    }
}

impl Debug for ReceiptFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn extension_of(file_name: &str) -> Option<&str> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}
