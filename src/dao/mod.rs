/// Database model definitions.
pub mod models;
/// Persistence abstraction and the bundled in-memory backend.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
