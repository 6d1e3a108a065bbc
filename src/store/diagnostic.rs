use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::backend::BackingStore;

/// Pass-through decorator that traces every operation against the wrapped
/// store at `debug` level. Semantically transparent; compose it anywhere a
/// store is injected to watch cache traffic for one tier.
pub struct DiagnosticStore {
  label: String,
  inner: Arc<dyn BackingStore>,
}

impl DiagnosticStore {
  pub fn new(label: impl Into<String>, inner: Arc<dyn BackingStore>) -> Self {
    Self {
      label: label.into(),
      inner,
    }
  }
}

#[async_trait]
impl BackingStore for DiagnosticStore {
  async fn set(&self, owner: Uuid, key: &str, value: Vec<u8>, dirty: bool) {
    tracing::debug!(
      "[{}] set {}/{} ({} bytes, dirty={})",
      self.label,
      owner,
      key,
      value.len(),
      dirty
    );
    self.inner.set(owner, key, value, dirty).await;
  }

  async fn get(&self, owner: Uuid, key: &str) -> Result<Option<Vec<u8>>, anyhow::Error> {
    let result = self.inner.get(owner, key).await;
    match &result {
      Ok(Some(value)) => {
        tracing::debug!("[{}] hit {}/{} ({} bytes)", self.label, owner, key, value.len())
      }
      Ok(None) => tracing::debug!("[{}] miss {}/{}", self.label, owner, key),
      Err(e) => tracing::debug!("[{}] read {}/{} failed: {}", self.label, owner, key, e),
    }
    result
  }

  async fn remove(&self, owner: Uuid, key: &str) {
    tracing::debug!("[{}] remove {}/{}", self.label, owner, key);
    self.inner.remove(owner, key).await;
  }

  async fn remove_owner(&self, owner: Uuid) {
    tracing::debug!("[{}] remove owner {}", self.label, owner);
    self.inner.remove_owner(owner).await;
  }

  async fn is_dirty(&self, owner: Uuid, key: &str) -> bool {
    let dirty = self.inner.is_dirty(owner, key).await;
    tracing::debug!("[{}] dirty check {}/{} -> {}", self.label, owner, key, dirty);
    dirty
  }

  async fn mark_dirty(&self, owner: Uuid, key: &str, dirty: bool) {
    tracing::debug!("[{}] mark {}/{} dirty={}", self.label, owner, key, dirty);
    self.inner.mark_dirty(owner, key, dirty).await;
  }
}
