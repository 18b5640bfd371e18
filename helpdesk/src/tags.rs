//! Tag resolution shared by tickets and articles.

use crate::error::{HelpdeskError, Result};
use crate::store::RecordStore;
use crate::types::{Tag, TagId};
use helpdesk_core::environment::{Clock, IdGenerator};

/// Resolve tag names to tags, creating any that do not exist yet.
///
/// Names match exactly and case-sensitively. Repeated names collapse to one
/// tag; the result keeps the order in which names first appear. Calling
/// twice with the same names yields the same tags.
///
/// # Errors
///
/// - [`HelpdeskError::Validation`]: a name is blank
/// - [`HelpdeskError::Storage`]: the store failed
pub async fn resolve_or_create_tags(
    store: &dyn RecordStore,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    names: &[String],
) -> Result<Vec<Tag>> {
    let mut tags: Vec<Tag> = Vec::with_capacity(names.len());

    for name in names {
        if name.trim().is_empty() {
            return Err(HelpdeskError::validation("tag names must not be empty"));
        }
        if tags.iter().any(|tag| &tag.name == name) {
            continue;
        }

        let candidate = Tag {
            id: TagId::from_uuid(ids.next_id()),
            name: name.clone(),
            created_at: clock.now(),
        };
        tags.push(store.find_or_create_tag(candidate).await?);
    }

    Ok(tags)
}

/// Tag names in a stable order, for change detection.
#[must_use]
pub fn sorted_names(tags: &[Tag]) -> Vec<String> {
    let mut names: Vec<String> = tags.iter().map(|tag| tag.name.clone()).collect();
    names.sort();
    names
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{DirectoryStore, InMemoryStore};
    use helpdesk_testing::{SequentialIdGenerator, test_clock};
    use proptest::prelude::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn duplicates_collapse_and_case_matters() {
        let store = InMemoryStore::new();
        let ids = SequentialIdGenerator::new();

        let tags = resolve_or_create_tags(&store, &test_clock(), &ids, &names(&["vpn", "VPN", "vpn"]))
            .await
            .unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "vpn");
        assert_eq!(tags[1].name, "VPN");
    }

    #[tokio::test]
    async fn existing_tags_are_reused() {
        let store = InMemoryStore::new();
        let ids = SequentialIdGenerator::new();

        let first = resolve_or_create_tags(&store, &test_clock(), &ids, &names(&["billing"]))
            .await
            .unwrap();
        let second = resolve_or_create_tags(&store, &test_clock(), &ids, &names(&["mail", "billing"]))
            .await
            .unwrap();

        assert_eq!(second[1], first[0]);
        assert_eq!(store.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let store = InMemoryStore::new();
        let result =
            resolve_or_create_tags(&store, &test_clock(), &SequentialIdGenerator::new(), &names(&["  "])).await;

        assert!(matches!(result, Err(HelpdeskError::Validation(_))));
    }

    proptest! {
        #[test]
        fn one_tag_per_distinct_name(list in helpdesk_testing::properties::tag_names()) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let store = InMemoryStore::new();
            let ids = SequentialIdGenerator::new();

            let (once, twice) = runtime.block_on(async {
                let once = resolve_or_create_tags(&store, &test_clock(), &ids, &list).await.unwrap();
                let twice = resolve_or_create_tags(&store, &test_clock(), &ids, &list).await.unwrap();
                (once, twice)
            });

            let mut distinct = list.clone();
            distinct.sort();
            distinct.dedup();

            prop_assert_eq!(sorted_names(&once), distinct.clone());
            prop_assert_eq!(&once, &twice);
            let stored = runtime.block_on(store.list_tags()).unwrap();
            prop_assert_eq!(stored.len(), distinct.len());
        }
    }
}
