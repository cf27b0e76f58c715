use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::storage::StorageResult;

/// External hints pre-assigning a winner to a prize's next draw.
pub trait ReservationStore: Send + Sync {
    /// Participant reserved for `prize_id`, if any.
    fn get(&self, prize_id: Uuid) -> BoxFuture<'static, StorageResult<Option<Uuid>>>;
    /// Reserve `participant_id` for `prize_id`, replacing any previous reservation.
    fn reserve(&self, prize_id: Uuid, participant_id: Uuid)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Drop the reservation for `prize_id`. Returns whether one existed.
    fn clear(&self, prize_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
}

/// Reservations kept in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReservationStore {
    entries: Arc<DashMap<Uuid, Uuid>>,
}

impl MemoryReservationStore {
    /// No reservations.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReservationStore for MemoryReservationStore {
    fn get(&self, prize_id: Uuid) -> BoxFuture<'static, StorageResult<Option<Uuid>>> {
        let found = self.entries.get(&prize_id).map(|entry| *entry.value());
        Box::pin(async move { Ok(found) })
    }

    fn reserve(
        &self,
        prize_id: Uuid,
        participant_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.entries.insert(prize_id, participant_id);
        Box::pin(async { Ok(()) })
    }

    fn clear(&self, prize_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.entries.remove(&prize_id).is_some();
        Box::pin(async move { Ok(removed) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reservations_are_per_prize() {
        let store = MemoryReservationStore::new();
        let (bike, mug) = (Uuid::new_v4(), Uuid::new_v4());
        let ana = Uuid::new_v4();

        store.reserve(bike, ana).await.unwrap();
        assert_eq!(store.get(bike).await.unwrap(), Some(ana));
        assert_eq!(store.get(mug).await.unwrap(), None);

        assert!(store.clear(bike).await.unwrap());
        assert!(!store.clear(bike).await.unwrap());
        assert_eq!(store.get(bike).await.unwrap(), None);
    }
}
