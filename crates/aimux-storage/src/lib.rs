mod document;
mod fs;
mod store;

pub use document::{STATE_VERSION, SlotStatus, UsageDocument};
pub use store::{StorageError, UsageStore};
