//! `StoreReader`/`StoreWriter` collaborator traits the zarb state core
//! depends on, plus an in-memory reference implementation used by tests
//! across the workspace. The real on-disk store is an external
//! collaborator and is out of scope here.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{Store, StoreReader, StoreWriter};
