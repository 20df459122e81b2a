use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::protocol::ResourceKey;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("path escapes the media directory: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// Host-side lookup from a frame's request to bytes.
///
/// `Ok(None)` means "not found"; the protocol has no negative answer, so the
/// request simply goes unanswered.
pub trait ResourceResolver {
    fn resolve(&self, card_id: &str, key: &ResourceKey) -> Result<Option<Attachment>, ResolveError>;
}

/// Serves files from a shared media directory.
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, raw_path: &str) -> Result<PathBuf, ResolveError> {
        let without_query = raw_path.split(['?', '#']).next().unwrap_or_default();
        let decoded = percent_decode_str(without_query).decode_utf8_lossy();
        let relative = Path::new(decoded.as_ref());
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ResolveError::InvalidPath(raw_path.to_string()));
                }
            }
        }
        if resolved == self.root {
            return Err(ResolveError::InvalidPath(raw_path.to_string()));
        }
        Ok(resolved)
    }
}

impl ResourceResolver for DirectoryResolver {
    fn resolve(&self, _card_id: &str, key: &ResourceKey) -> Result<Option<Attachment>, ResolveError> {
        let path = self.locate(&key.path)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(Attachment {
                content_type: content_type_for(&path).to_string(),
                data,
            })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Resolver over an in-memory map of paths, optionally scoped per card.
#[derive(Default)]
pub struct MemoryResolver {
    shared: HashMap<String, Attachment>,
    per_card: HashMap<(String, String), Attachment>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, attachment: Attachment) {
        self.shared.insert(path.into(), attachment);
    }

    pub fn insert_for_card(
        &mut self,
        card_id: impl Into<String>,
        path: impl Into<String>,
        attachment: Attachment,
    ) {
        self.per_card
            .insert((card_id.into(), path.into()), attachment);
    }
}

impl ResourceResolver for MemoryResolver {
    fn resolve(&self, card_id: &str, key: &ResourceKey) -> Result<Option<Attachment>, ResolveError> {
        let scoped = self
            .per_card
            .get(&(card_id.to_string(), key.path.clone()));
        Ok(scoped.or_else(|| self.shared.get(&key.path)).cloned())
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "css" => "text/css",
        "js" => "text/javascript",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
