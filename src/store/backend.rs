use async_trait::async_trait;
use uuid::Uuid;

/// Abstract storage tier for cache entries.
///
/// An entry is keyed by `(owner, key)` and holds an opaque binary payload
/// plus an advisory dirty flag. Writes are best-effort and surface no
/// errors to the caller; implementations recover locally (log and continue).
/// Reads report structural failures (an unreadable row, a closed store)
/// since the caller is waiting on the result.
#[async_trait]
pub trait BackingStore: Send + Sync {
  /// Write or overwrite the value for `(owner, key)`.
  async fn set(&self, owner: Uuid, key: &str, value: Vec<u8>, dirty: bool);

  /// Fetch the most recently written value, irrespective of its dirty flag.
  /// `Ok(None)` is a plain miss, not an error.
  async fn get(&self, owner: Uuid, key: &str) -> Result<Option<Vec<u8>>, anyhow::Error>;

  /// Delete the entry for `(owner, key)`. Deleting an absent entry is a no-op.
  async fn remove(&self, owner: Uuid, key: &str);

  /// Delete every entry belonging to `owner`.
  async fn remove_owner(&self, owner: Uuid);

  /// Staleness of `(owner, key)`. Absent entries report `true`: the cache
  /// fails toward "assume stale, recompute", never toward "assume fresh".
  async fn is_dirty(&self, owner: Uuid, key: &str) -> bool;

  /// Update only the dirty flag of an existing entry. A flag without a
  /// value is meaningless, so marking an absent entry changes nothing.
  async fn mark_dirty(&self, owner: Uuid, key: &str, dirty: bool);
}
