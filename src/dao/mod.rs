/// Draw history persistence.
pub mod history_store;
/// Persisted record shapes.
pub mod models;
/// Winner reservations per prize.
pub mod reservation_store;
/// Storage error types shared by the stores.
pub mod storage;
