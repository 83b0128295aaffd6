//! Game data resources
//!
//! Each game ships data files below
//! `<data_path>/games/<package>/<restype>/<basename>.<ext>`. The resource
//! type decides the file extension, so callers only name the logical
//! resource.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::ResourceError;

/// Kind of a game data resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Image,
    Text,
}

impl ResourceType {
    pub fn parse(s: &str) -> Result<Self, ResourceError> {
        match s {
            "image" => Ok(ResourceType::Image),
            "text" => Ok(ResourceType::Text),
            other => Err(ResourceError::UnknownType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Text => "text",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ResourceType::Image => "png",
            ResourceType::Text => "txt",
        }
    }
}

/// Locates game data files
#[derive(Debug, Clone)]
pub struct ResourceLoader {
    data_path: PathBuf,
}

impl ResourceLoader {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Full path of an existing resource file
    pub fn path(
        &self,
        package: &str,
        restype: ResourceType,
        basename: &str,
    ) -> Result<PathBuf, ResourceError> {
        check_name(package)?;
        check_name(basename)?;

        let path = self
            .data_path
            .join("games")
            .join(package)
            .join(restype.as_str())
            .join(format!("{}.{}", basename, restype.extension()));

        trace!(path = %path.display(), "Resolving game resource");

        if path.is_file() {
            Ok(path)
        } else {
            Err(ResourceError::NoSuchResource {
                package: package.to_string(),
                restype: restype.as_str().to_string(),
                basename: basename.to_string(),
            })
        }
    }

    /// Read a resource file completely
    pub async fn load(
        &self,
        package: &str,
        restype: ResourceType,
        basename: &str,
    ) -> crate::error::Result<Vec<u8>> {
        let path = self.path(package, restype, basename)?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Read a text resource as lines
    pub async fn load_lines(
        &self,
        package: &str,
        basename: &str,
    ) -> crate::error::Result<Vec<String>> {
        let bytes = self.load(package, ResourceType::Text, basename).await?;
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// Resource names are single path components
fn check_name(name: &str) -> Result<(), ResourceError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(ResourceError::InvalidName(name.to_string()))
    }
}

/// Guess a MIME type from the leading bytes of some data
pub fn guess_mime_type(data: &[u8]) -> &'static str {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if data.starts_with(PNG) {
        return "image/png";
    }
    if data.starts_with(JPEG) {
        return "image/jpeg";
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    match std::str::from_utf8(data) {
        Ok(text) => {
            let head = text.trim_start();
            if head.starts_with("<svg") || (head.starts_with("<?xml") && text.contains("<svg")) {
                "image/svg+xml"
            } else {
                "text/plain"
            }
        }
        Err(_) => "application/octet-stream",
    }
}
