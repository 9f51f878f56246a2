//! Conversation ledger implementations for assistline.

pub mod in_memory;

pub use in_memory::InMemoryLedger;
