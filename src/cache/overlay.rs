use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::{decode, encode, replay, Buffers};
use crate::store::BackingStore;

struct OverlayState {
  store: Option<Arc<dyn BackingStore>>,
  suspended: bool,
  owners: HashMap<Uuid, Buffers>,
}

/// Transaction buffer shared by many owners in front of one store.
///
/// A coordinating object uses this when one burst of activity spans many
/// live-updating items: `suspend` once, let every owner's cache traffic
/// accumulate per owner, `spill` once when the burst ends. Semantics per
/// key match [`super::ObjectCacheFacade`], with the owner made explicit.
pub struct SuspendableOverlay {
  state: Mutex<OverlayState>,
}

impl SuspendableOverlay {
  pub fn new(store: Arc<dyn BackingStore>) -> Self {
    Self {
      state: Mutex::new(OverlayState {
        store: Some(store),
        suspended: false,
        owners: HashMap::new(),
      }),
    }
  }

  pub fn is_suspended(&self) -> bool {
    self.state.lock().suspended
  }

  pub fn suspend(&self) {
    self.state.lock().suspended = true;
  }

  /// End the transaction and replay every buffered owner into the store:
  /// per owner, sets first (with their last-known dirty flag), then
  /// dirty-only marks, then removals. The lock is released before the
  /// replay; concurrent writes land in a fresh overlay generation.
  pub async fn spill(&self) {
    let (store, owners) = {
      let mut state = self.state.lock();
      state.suspended = false;
      match state.store.clone() {
        Some(store) => (store, mem::take(&mut state.owners)),
        None => return,
      }
    };
    for (owner, buffers) in owners {
      replay(&store, owner, buffers).await;
    }
  }

  /// Rebind the store; an implicit spill of all buffered owners.
  pub async fn attach_store(&self, store: Arc<dyn BackingStore>) {
    let owners = {
      let mut state = self.state.lock();
      state.suspended = false;
      state.store = Some(store.clone());
      mem::take(&mut state.owners)
    };
    for (owner, buffers) in owners {
      replay(&store, owner, buffers).await;
    }
  }

  pub async fn set<T>(&self, owner: Uuid, key: &str, value: &T, dirty: bool)
  where
    T: Serialize + ?Sized,
  {
    let Some(bytes) = encode(value) else { return };
    let store = {
      let mut state = self.state.lock();
      if state.suspended || state.store.is_none() {
        state.owners.entry(owner).or_default().insert(key, bytes, dirty);
        return;
      }
      state.store.clone()
    };
    if let Some(store) = store {
      store.set(owner, key, bytes, dirty).await;
    }
  }

  pub async fn get<T: DeserializeOwned>(
    &self,
    owner: Uuid,
    key: &str,
  ) -> Result<Option<T>, anyhow::Error> {
    let (buffered, store) = {
      let state = self.state.lock();
      (
        state.owners.get(&owner).and_then(|b| b.lookup(key)),
        state.store.clone(),
      )
    };
    match buffered {
      Some(Some(bytes)) => decode(&bytes).map(Some),
      Some(None) => Ok(None),
      None => match store {
        Some(store) => match store.get(owner, key).await? {
          Some(bytes) => decode(&bytes).map(Some),
          None => Ok(None),
        },
        None => Ok(None),
      },
    }
  }

  pub async fn remove(&self, owner: Uuid, key: &str) {
    let store = {
      let mut state = self.state.lock();
      if state.suspended || state.store.is_none() {
        state.owners.entry(owner).or_default().remove(key);
        return;
      }
      state.store.clone()
    };
    if let Some(store) = store {
      store.remove(owner, key).await;
    }
  }

  pub async fn is_dirty(&self, owner: Uuid, key: &str) -> bool {
    let (buffered, store) = {
      let state = self.state.lock();
      (
        state.owners.get(&owner).and_then(|b| b.dirty_state(key)),
        state.store.clone(),
      )
    };
    match buffered {
      Some(flag) => flag,
      None => match store {
        Some(store) => store.is_dirty(owner, key).await,
        None => true,
      },
    }
  }

  pub async fn mark_dirty(&self, owner: Uuid, key: &str, dirty: bool) {
    let store = {
      let mut state = self.state.lock();
      if state.suspended || state.store.is_none() {
        state.owners.entry(owner).or_default().mark_dirty(key, dirty);
        return;
      }
      state.store.clone()
    };
    if let Some(store) = store {
      store.mark_dirty(owner, key, dirty).await;
    }
  }

  /// Owner teardown: drop the owner's buffered state and every stored entry.
  /// Immediate, regardless of suspension.
  pub async fn remove_owner(&self, owner: Uuid) {
    let store = {
      let mut state = self.state.lock();
      state.owners.remove(&owner);
      state.store.clone()
    };
    if let Some(store) = store {
      store.remove_owner(owner).await;
    }
  }
}
