use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::OwnerId;

/// What the next free-text message from an owner will be read as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Pending {
    #[default]
    Idle,
    AwaitingCategoryName,
    AwaitingNoteText { category: Option<i64> },
    AwaitingDeleteSelector,
}

/// Volatile per-owner dialogue state.
#[derive(Debug, Default)]
pub(crate) struct Conversation {
    pub(crate) pending: Pending,
    /// Display number (1-based) to note id, from the last listing.
    pub(crate) note_map: BTreeMap<u32, i64>,
}

impl Conversation {
    pub(crate) fn reset(&mut self) {
        self.pending = Pending::Idle;
    }

    /// Replaces the display map with the ids of a fresh listing, in order.
    pub(crate) fn remember_listing<I>(&mut self, note_ids: I)
    where
        I: IntoIterator<Item = i64>,
    {
        self.note_map = (1u32..).zip(note_ids).collect();
    }

    /// Translates display numbers into note ids, dropping unknown numbers.
    pub(crate) fn resolve(&self, numbers: &BTreeSet<u32>) -> Vec<i64> {
        numbers
            .iter()
            .filter_map(|number| self.note_map.get(number).copied())
            .collect()
    }
}

/// Conversation records keyed by owner. Holding the guard returned by
/// [`Conversations::lock`] serializes every event of that owner; distinct
/// owners never wait on each other beyond the map lookup.
#[derive(Default)]
pub(crate) struct Conversations {
    inner: Mutex<HashMap<OwnerId, Arc<Mutex<Conversation>>>>,
}

impl Conversations {
    pub(crate) async fn lock(&self, owner: OwnerId) -> OwnedMutexGuard<Conversation> {
        let slot = {
            let mut inner = self.inner.lock().await;
            inner.entry(owner).or_default().clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn listing_rebuilds_map_from_one() {
        let mut conversation = Conversation::default();
        conversation.remember_listing([10, 11, 12]);
        conversation.remember_listing([20, 21]);
        assert_eq!(
            conversation.note_map.into_iter().collect::<Vec<_>>(),
            vec![(1, 20), (2, 21)]
        );
    }

    #[test]
    fn resolve_drops_unknown_numbers() {
        let mut conversation = Conversation::default();
        conversation.remember_listing([10, 11, 12]);
        let numbers: BTreeSet<u32> = [0, 1, 3, 9].into_iter().collect();
        assert_eq!(conversation.resolve(&numbers), vec![10, 12]);
    }

    #[test]
    fn reset_keeps_note_map() {
        let mut conversation = Conversation {
            pending: Pending::AwaitingDeleteSelector,
            ..Default::default()
        };
        conversation.remember_listing([5]);
        conversation.reset();
        assert_eq!(conversation.pending, Pending::Idle);
        assert_eq!(conversation.note_map.get(&1), Some(&5));
    }

    #[tokio::test]
    async fn same_owner_is_serialized() {
        let conversations = Arc::new(Conversations::default());
        let guard = conversations.lock(1).await;

        let other = conversations.clone();
        let blocked = tokio::spawn(async move {
            let mut conversation = other.lock(1).await;
            conversation.pending = Pending::AwaitingCategoryName;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        // A different owner is not held up.
        conversations.lock(2).await.pending = Pending::AwaitingDeleteSelector;

        drop(guard);
        blocked.await.unwrap();
        assert_eq!(conversations.lock(1).await.pending, Pending::AwaitingCategoryName);
        assert_eq!(conversations.lock(2).await.pending, Pending::AwaitingDeleteSelector);
    }
}
