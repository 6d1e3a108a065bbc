use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::backend::BackingStore;

/// Process-local storage tier. Nothing survives a restart; it exists so the
/// same cache code path runs for ephemeral objects and in tests.
#[derive(Default)]
pub struct InMemoryStore {
  entries: RwLock<HashMap<(Uuid, String), (Vec<u8>, bool)>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }
}

#[async_trait]
impl BackingStore for InMemoryStore {
  async fn set(&self, owner: Uuid, key: &str, value: Vec<u8>, dirty: bool) {
    self
      .entries
      .write()
      .insert((owner, key.to_string()), (value, dirty));
  }

  async fn get(&self, owner: Uuid, key: &str) -> Result<Option<Vec<u8>>, anyhow::Error> {
    Ok(
      self
        .entries
        .read()
        .get(&(owner, key.to_string()))
        .map(|(value, _)| value.clone()),
    )
  }

  async fn remove(&self, owner: Uuid, key: &str) {
    self.entries.write().remove(&(owner, key.to_string()));
  }

  async fn remove_owner(&self, owner: Uuid) {
    self.entries.write().retain(|(o, _), _| *o != owner);
  }

  async fn is_dirty(&self, owner: Uuid, key: &str) -> bool {
    self
      .entries
      .read()
      .get(&(owner, key.to_string()))
      .map(|(_, dirty)| *dirty)
      .unwrap_or(true)
  }

  async fn mark_dirty(&self, owner: Uuid, key: &str, dirty: bool) {
    if let Some(entry) = self.entries.write().get_mut(&(owner, key.to_string())) {
      entry.1 = dirty;
    }
  }
}
