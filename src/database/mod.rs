pub mod manager;
pub mod memory;
pub mod nav_store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryNavStore;
pub use nav_store::{NavStore, PgNavStore};
