pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod stores;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use stores::{AdminDirectory, AuditStore, PractitionerDirectory, SessionStore, Stores};
