//! Persistent Storage Layer - SQLite WAL
//!
//! Persists session journals as an append-only table of
//! `(timestamp, role, task, event, payload)` rows. Nothing in the
//! orchestrator depends on storage; callers flush `Orchestrator::journal()`
//! whenever they want a durable copy.
//!
//! # Example
//!
//! ```no_run
//! use maestro_core::storage::JournalStore;
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = JournalStore::open(".maestro/journal.db")?;
//! for session in store.sessions()? {
//!     println!("{session}: {} entries", store.count(session)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod journal_store;

pub use journal_store::JournalStore;
