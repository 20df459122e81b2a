//! Read-only secondary indexes over stored card documents.
//!
//! Each view is a pure filter plus projection: it never mutates a document
//! and yields at most one row per card.

use serde::{Deserialize, Serialize};

pub const CARD_ID_PREFIX: &str = "card-";

/// The fields of a stored card that the indexes read. Times are unix
/// seconds, `interval` is in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDoc {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buried_until: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default)]
    pub suspended: bool,
}

impl CardDoc {
    pub fn is_card(&self) -> bool {
        self.id.starts_with(CARD_ID_PREFIX)
    }
}

/// A map function over card documents.
pub trait MapView {
    type Key: Ord + Clone;
    type Value;

    fn map(&self, doc: &CardDoc) -> Option<(Self::Key, Self::Value)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow<K, V> {
    pub id: String,
    pub key: K,
    pub value: V,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NewCardsKey {
    #[default]
    BuriedUntil,
    Created,
}

/// Cards that have never been scheduled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewCardsMap {
    pub keyed_by: NewCardsKey,
}

impl NewCardsMap {
    pub fn by_burial() -> Self {
        Self {
            keyed_by: NewCardsKey::BuriedUntil,
        }
    }

    pub fn by_created() -> Self {
        Self {
            keyed_by: NewCardsKey::Created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCardValue {
    pub buried_until: Option<i64>,
    pub created: i64,
}

impl MapView for NewCardsMap {
    /// `None` (never buried) sorts before every timestamp.
    type Key = Option<i64>;
    type Value = NewCardValue;

    fn map(&self, doc: &CardDoc) -> Option<(Self::Key, Self::Value)> {
        if !doc.is_card() || doc.due.is_some() || doc.suspended {
            return None;
        }
        let key = match self.keyed_by {
            NewCardsKey::BuriedUntil => doc.buried_until,
            NewCardsKey::Created => Some(doc.created),
        };
        Some((
            key,
            NewCardValue {
                buried_until: doc.buried_until,
                created: doc.created,
            },
        ))
    }
}

/// Cards with a due date, in due order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldCardsMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OldCardValue {
    pub buried_until: Option<i64>,
    pub due: i64,
    pub last_review: Option<i64>,
    pub interval: Option<i64>,
}

impl MapView for OldCardsMap {
    type Key = i64;
    type Value = OldCardValue;

    fn map(&self, doc: &CardDoc) -> Option<(Self::Key, Self::Value)> {
        if !doc.is_card() || doc.suspended {
            return None;
        }
        let due = doc.due?;
        Some((
            due,
            OldCardValue {
                buried_until: doc.buried_until,
                due,
                last_review: doc.last_review,
                interval: doc.interval,
            },
        ))
    }
}

/// Evaluate `view` over `docs`, sorted by key and then by document id.
pub fn query<V: MapView>(view: &V, docs: &[CardDoc]) -> Vec<IndexRow<V::Key, V::Value>> {
    let mut rows: Vec<_> = docs
        .iter()
        .filter_map(|doc| {
            view.map(doc).map(|(key, value)| IndexRow {
                id: doc.id.clone(),
                key,
                value,
            })
        })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.id.cmp(&b.id)));
    rows
}
