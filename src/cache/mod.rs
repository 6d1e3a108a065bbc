mod facade;
mod overlay;

pub use facade::ObjectCacheFacade;
pub use overlay::SuspendableOverlay;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::store::BackingStore;

/// One owner's transaction buffer: values and dirty flags written while
/// suspended, plus keys pending removal. A key never sits in both the value
/// map and the removal set; whichever of set/remove came last wins.
#[derive(Default)]
pub(crate) struct Buffers {
  values: HashMap<String, Vec<u8>>,
  dirty: HashMap<String, bool>,
  removed: HashSet<String>,
}

impl Buffers {
  fn insert(&mut self, key: &str, value: Vec<u8>, dirty: bool) {
    self.removed.remove(key);
    self.values.insert(key.to_string(), value);
    self.dirty.insert(key.to_string(), dirty);
  }

  fn remove(&mut self, key: &str) {
    self.values.remove(key);
    self.dirty.remove(key);
    self.removed.insert(key.to_string());
  }

  fn mark_dirty(&mut self, key: &str, dirty: bool) {
    self.dirty.insert(key.to_string(), dirty);
  }

  /// `Some(Some(bytes))` for a buffered value, `Some(None)` for a pending
  /// removal (which masks the store), `None` when the buffer has no opinion.
  fn lookup(&self, key: &str) -> Option<Option<Vec<u8>>> {
    if self.removed.contains(key) {
      return Some(None);
    }
    self.values.get(key).map(|bytes| Some(bytes.clone()))
  }

  fn dirty_state(&self, key: &str) -> Option<bool> {
    if let Some(flag) = self.dirty.get(key) {
      return Some(*flag);
    }
    if self.removed.contains(key) {
      return Some(true);
    }
    None
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.values.is_empty() && self.dirty.is_empty() && self.removed.is_empty()
  }
}

/// Replay one owner's buffered operations into a store: buffered sets first,
/// each with its last-known dirty flag, then dirty-only marks, then removals.
pub(crate) async fn replay(store: &Arc<dyn BackingStore>, owner: Uuid, buffers: Buffers) {
  let Buffers {
    values,
    mut dirty,
    removed,
  } = buffers;
  for (key, value) in values {
    let flag = dirty.remove(&key).unwrap_or(false);
    store.set(owner, &key, value, flag).await;
  }
  for (key, flag) in dirty {
    store.mark_dirty(owner, &key, flag).await;
  }
  for key in removed {
    store.remove(owner, &key).await;
  }
}

pub(crate) fn encode<T>(value: &T) -> Option<Vec<u8>>
where
  T: Serialize + ?Sized,
{
  match rmp_serde::to_vec(value) {
    Ok(bytes) => Some(bytes),
    Err(e) => {
      tracing::error!("failed to encode cache value, dropping write: {}", e);
      None
    }
  }
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, anyhow::Error> {
  rmp_serde::from_slice(bytes).map_err(|e| anyhow::anyhow!("unreadable cache value: {}", e))
}
