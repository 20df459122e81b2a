use std::collections::HashMap;

use kuchiki::NodeRef;
use tracing::{debug, warn};
use uuid::Uuid;

use super::document::set_attribute;
use crate::protocol::{ElementKind, ResourceResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// In-memory object URLs, the frame's analogue of `URL.createObjectURL`.
pub struct BlobRegistry {
    origin: String,
    blobs: HashMap<String, Blob>,
}

impl BlobRegistry {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            blobs: HashMap::new(),
        }
    }

    pub fn create(&mut self, content_type: impl Into<String>, data: Vec<u8>) -> String {
        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        self.blobs.insert(
            url.clone(),
            Blob {
                content_type: content_type.into(),
                data,
            },
        );
        url
    }

    pub fn get(&self, url: &str) -> Option<&Blob> {
        self.blobs.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.blobs.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Turns resource responses into handles and writes them into the DOM.
pub struct Materializer {
    blobs: BlobRegistry,
}

impl Materializer {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            blobs: BlobRegistry::new(origin),
        }
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn materialize(&mut self, response: ResourceResponse) -> String {
        let ResourceResponse {
            key,
            content_type,
            data,
        } = response;
        let size = data.len();
        let handle = self.blobs.create(content_type, data);
        debug!(target = "ledger", key = %key, bytes = size, handle = %handle, "materialized resource");
        handle
    }

    /// Point every target at `handle`; `href` for links, `src` otherwise.
    pub fn apply(kind: ElementKind, handle: &str, targets: &[NodeRef]) -> usize {
        let attribute = kind.attribute();
        let mut patched = 0;
        for target in targets {
            if set_attribute(target, attribute, handle) {
                patched += 1;
            } else {
                warn!(target = "ledger", attribute, "waiting target is not an element; skipped");
            }
        }
        patched
    }
}
