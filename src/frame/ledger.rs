use std::collections::HashMap;
use std::mem;

use kuchiki::NodeRef;
use thiserror::Error;

use super::document::{attribute, tag_name};
use crate::protocol::{ElementKind, ResourceKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("response for {0} which was never requested")]
    UnknownKey(ResourceKey),
    #[error("response for {0} with no waiting targets")]
    NoWaitingTargets(ResourceKey),
    #[error("duplicate response for already resolved {0}")]
    AlreadyResolved(ResourceKey),
}

/// Derive the key a failing node would be requested under.
///
/// `None` for non-elements and elements without a usable reference.
pub fn key_for_node(node: &NodeRef) -> Option<ResourceKey> {
    let tag = tag_name(node)?;
    let kind = ElementKind::from_tag(&tag);
    let path = attribute(node, kind.attribute())?;
    if path.trim().is_empty() {
        return None;
    }
    Some(ResourceKey::new(kind, path))
}

#[derive(Default)]
pub struct ResourceEntry {
    targets: Vec<NodeRef>,
    handle: Option<String>,
}

impl ResourceEntry {
    pub fn targets(&self) -> &[NodeRef] {
        &self.targets
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Unrequested,
    Pending { waiting: usize },
    Resolved { handle: String },
}

/// What the frame must do after recording a load failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// First failure for the key: send exactly one request.
    Request(ResourceKey),
    /// A request is already outstanding; the node was queued.
    Queued,
    /// Already resolved: patch the node with this handle now.
    Resolved(String),
}

/// Per-frame map of requested resources.
///
/// Entries are never evicted, so a resolved key short-circuits every later
/// failure for the lifetime of the frame.
#[derive(Default)]
pub struct ResourceLedger {
    entries: HashMap<ResourceKey, ResourceEntry>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, key: ResourceKey, node: NodeRef) -> FailureOutcome {
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(
                    key.clone(),
                    ResourceEntry {
                        targets: vec![node],
                        handle: None,
                    },
                );
                FailureOutcome::Request(key)
            }
            Some(entry) => match &entry.handle {
                Some(handle) => FailureOutcome::Resolved(handle.clone()),
                None => {
                    entry.targets.push(node);
                    FailureOutcome::Queued
                }
            },
        }
    }

    /// Resolve `key`, minting its handle with `materialize` only when the
    /// response is acceptable. Returns the nodes that were waiting, in
    /// failure order, and leaves the entry's target list empty.
    pub fn resolve(
        &mut self,
        key: &ResourceKey,
        materialize: impl FnOnce() -> String,
    ) -> Result<(String, Vec<NodeRef>), LedgerError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| LedgerError::UnknownKey(key.clone()))?;
        if entry.handle.is_some() {
            return Err(LedgerError::AlreadyResolved(key.clone()));
        }
        if entry.targets.is_empty() {
            return Err(LedgerError::NoWaitingTargets(key.clone()));
        }
        let handle = materialize();
        entry.handle = Some(handle.clone());
        Ok((handle, mem::take(&mut entry.targets)))
    }

    pub fn state(&self, key: &ResourceKey) -> ResourceState {
        match self.entries.get(key) {
            None => ResourceState::Unrequested,
            Some(ResourceEntry {
                handle: Some(handle),
                ..
            }) => ResourceState::Resolved {
                handle: handle.clone(),
            },
            Some(entry) => ResourceState::Pending {
                waiting: entry.targets.len(),
            },
        }
    }

    pub fn entry(&self, key: &ResourceKey) -> Option<&ResourceEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.handle.is_none())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::document::CardDocument;

    fn nodes(html: &str, tag: &str) -> Vec<NodeRef> {
        CardDocument::parse(html).elements_by_tag(tag)
    }

    #[test]
    fn first_failure_requests_and_later_ones_queue() {
        let imgs = nodes(r#"<img src="a.png"><img src="a.png"><img src="a.png">"#, "img");
        let key = key_for_node(&imgs[0]).unwrap();
        let mut ledger = ResourceLedger::new();

        assert_eq!(
            ledger.record_failure(key.clone(), imgs[0].clone()),
            FailureOutcome::Request(key.clone())
        );
        assert_eq!(ledger.record_failure(key.clone(), imgs[1].clone()), FailureOutcome::Queued);
        assert_eq!(ledger.record_failure(key.clone(), imgs[2].clone()), FailureOutcome::Queued);
        assert_eq!(ledger.state(&key), ResourceState::Pending { waiting: 3 });
    }

    #[test]
    fn resolve_flushes_targets_and_short_circuits_later_failures() {
        let imgs = nodes(r#"<img src="a.png"><img src="a.png">"#, "img");
        let key = ResourceKey::source("a.png");
        let mut ledger = ResourceLedger::new();
        ledger.record_failure(key.clone(), imgs[0].clone());

        let (handle, targets) = ledger.resolve(&key, || "blob:null/1".to_string()).unwrap();
        assert_eq!(handle, "blob:null/1");
        assert_eq!(targets.len(), 1);
        assert!(targets[0] == imgs[0]);
        assert!(ledger.entry(&key).unwrap().targets().is_empty());

        assert_eq!(
            ledger.record_failure(key.clone(), imgs[1].clone()),
            FailureOutcome::Resolved("blob:null/1".into())
        );
        assert!(ledger.pending_keys().is_empty());
    }

    #[test]
    fn protocol_violations_do_not_materialize() {
        let mut ledger = ResourceLedger::new();
        let key = ResourceKey::source("ghost.png");
        let err = ledger
            .resolve(&key, || panic!("must not materialize"))
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownKey(key));

        let img = nodes(r#"<img src="a.png">"#, "img").remove(0);
        let key = ResourceKey::source("a.png");
        ledger.record_failure(key.clone(), img);
        ledger.resolve(&key, || "blob:null/1".into()).unwrap();
        let err = ledger
            .resolve(&key, || panic!("must not materialize twice"))
            .unwrap_err();
        assert_eq!(err, LedgerError::AlreadyResolved(key.clone()));
        assert_eq!(
            ledger.state(&key),
            ResourceState::Resolved {
                handle: "blob:null/1".into()
            }
        );
    }

    #[test]
    fn link_and_source_with_same_path_are_separate_entries() {
        let document = CardDocument::parse(r#"<link href="x"><img src="x">"#);
        let link = document.elements_by_tag("link").remove(0);
        let img = document.elements_by_tag("img").remove(0);
        let mut ledger = ResourceLedger::new();

        let link_key = key_for_node(&link).unwrap();
        let img_key = key_for_node(&img).unwrap();
        assert_eq!(link_key, ResourceKey::link("x"));
        assert!(matches!(ledger.record_failure(link_key, link), FailureOutcome::Request(_)));
        assert!(matches!(ledger.record_failure(img_key, img), FailureOutcome::Request(_)));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn nodes_without_references_have_no_key() {
        let document = CardDocument::parse(r#"<img><img src="  "><p>text</p>"#);
        for img in document.elements_by_tag("img") {
            assert!(key_for_node(&img).is_none());
        }
        assert!(key_for_node(&document.elements_by_tag("p")[0]).is_none());
    }
}
