use std::collections::BTreeSet;

use cardframe::schedule::{query, CardDoc, NewCardsMap, OldCardsMap};

/// Every combination of the fields the views filter on.
fn card_grid() -> Vec<CardDoc> {
    let mut docs = Vec::new();
    let mut n = 0;
    for prefix in ["card-", "deck-", "note-"] {
        for due in [None, Some(10), Some(5)] {
            for buried_until in [None, Some(99)] {
                for suspended in [false, true] {
                    n += 1;
                    docs.push(CardDoc {
                        id: format!("{prefix}{n:03}"),
                        created: 1_000 - n,
                        due,
                        buried_until,
                        suspended,
                        ..CardDoc::default()
                    });
                }
            }
        }
    }
    docs
}

fn ids<K, V>(rows: Vec<cardframe::schedule::IndexRow<K, V>>) -> BTreeSet<String> {
    rows.into_iter().map(|row| row.id).collect()
}

#[test]
fn new_and_old_views_partition_active_cards() {
    let docs = card_grid();
    let new = ids(query(&NewCardsMap::default(), &docs));
    let old = ids(query(&OldCardsMap, &docs));

    let active: BTreeSet<String> = docs
        .iter()
        .filter(|doc| doc.id.starts_with("card-") && !doc.suspended)
        .map(|doc| doc.id.clone())
        .collect();

    assert!(!new.is_empty() && !old.is_empty());
    assert!(new.is_disjoint(&old), "a card is either new or scheduled");
    let union: BTreeSet<String> = new.union(&old).cloned().collect();
    assert_eq!(union, active);
}

#[test]
fn old_view_is_ordered_by_due_date() {
    let rows = query(&OldCardsMap, &card_grid());
    let keys: Vec<i64> = rows.iter().map(|row| row.key).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(rows.iter().all(|row| row.value.due == row.key));
}

#[test]
fn views_read_stored_documents() {
    let docs: Vec<CardDoc> = serde_json::from_str(
        r#"[
            {"_id":"card-a","created":5},
            {"_id":"card-b","created":6,"due":100,"lastReview":40,"interval":60},
            {"_id":"card-c","created":7,"suspended":true},
            {"_id":"theme-x","created":1}
        ]"#,
    )
    .expect("card json");

    let new = query(&NewCardsMap::by_created(), &docs);
    assert_eq!(new.len(), 1);
    assert_eq!((new[0].id.as_str(), new[0].key), ("card-a", Some(5)));

    let old = query(&OldCardsMap, &docs);
    assert_eq!(old.len(), 1);
    assert_eq!(old[0].value.last_review, Some(40));
    assert_eq!(old[0].value.interval, Some(60));
}
