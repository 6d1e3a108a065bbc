//! Two-tier, transaction-aware cache for expensive per-object values
//! (thumbnails, histograms, display buffers). Owners write through a
//! [`cache::ObjectCacheFacade`] or a shared [`cache::SuspendableOverlay`];
//! entries land in an in-memory or SQLite-backed [`store::BackingStore`].

pub mod cache;
pub mod store;

pub use cache::{ObjectCacheFacade, SuspendableOverlay};
pub use store::{BackingStore, DiagnosticStore, DurableConfig, DurableStore, InMemoryStore};
