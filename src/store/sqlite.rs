//! SQLite-backed storage tier.
//!
//! A single worker thread owns the database connection; every operation from
//! every caller is a job on one FIFO queue drained only by that thread. This
//! gives a total order across all submitters (a read observes all writes
//! submitted before it, including the caller's own) and keeps the connection
//! free of lock contention. Writes return as soon as the job is queued; reads
//! carry a reply slot and block the calling task until the worker answers.

use std::path::Path;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::backend::BackingStore;
use super::config::DurableConfig;

const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -8000;
PRAGMA temp_store = MEMORY;
"#;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    owner_uuid TEXT NOT NULL,
    key TEXT NOT NULL,
    value BLOB NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (owner_uuid, key)
) WITHOUT ROWID;
"#;

enum Job {
  Op(Op),
  Shutdown { ack: oneshot::Sender<()> },
}

enum Op {
  Set {
    owner: Uuid,
    key: String,
    value: Vec<u8>,
    dirty: bool,
  },
  Remove {
    owner: Uuid,
    key: String,
  },
  RemoveOwner {
    owner: Uuid,
  },
  MarkDirty {
    owner: Uuid,
    key: String,
    dirty: bool,
  },
  Get {
    owner: Uuid,
    key: String,
    reply: oneshot::Sender<Result<Option<Vec<u8>>, anyhow::Error>>,
  },
  IsDirty {
    owner: Uuid,
    key: String,
    reply: oneshot::Sender<Result<Option<bool>, anyhow::Error>>,
  },
}

/// Crash-durable storage tier behind a single writer/reader worker thread.
///
/// `close` drains the queue and releases the connection; dropping the store
/// without closing still lets the worker drain everything already queued,
/// just without waiting for it.
pub struct DurableStore {
  tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
  worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl DurableStore {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
    let conn = Connection::open(path)?;
    Self::start(conn, &DurableConfig::default())
  }

  pub fn open_with_config(config: &DurableConfig) -> Result<Self, anyhow::Error> {
    let conn = Connection::open(&config.path)?;
    Self::start(conn, config)
  }

  pub fn in_memory() -> Result<Self, anyhow::Error> {
    let conn = Connection::open_in_memory()?;
    Self::start(conn, &DurableConfig::default())
  }

  fn start(conn: Connection, config: &DurableConfig) -> Result<Self, anyhow::Error> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.execute_batch(PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;

    // The queue is deliberately unbounded: a bounded queue would make
    // writes block on disk backlog, which breaks the latency contract for
    // callers writing from live-update paths.
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = thread::Builder::new()
      .name("framestash-store".into())
      .spawn(move || worker_loop(conn, rx))?;

    tracing::info!("cache store worker started");
    Ok(Self {
      tx: Mutex::new(Some(tx)),
      worker: Mutex::new(Some(worker)),
    })
  }

  /// Drain all queued operations, let the worker release the connection,
  /// and join it. Operations submitted once closing has begun are dropped
  /// (writes) or fail with a closed-store error (reads).
  pub async fn close(&self) {
    let Some(tx) = self.tx.lock().take() else {
      return;
    };
    let (ack, done) = oneshot::channel();
    if tx.send(Job::Shutdown { ack }).is_ok() {
      let _ = done.await;
    }
    drop(tx);

    let handle = self.worker.lock().take();
    if let Some(handle) = handle {
      let _ = tokio::task::spawn_blocking(move || handle.join()).await;
    }
  }

  fn submit(&self, op: Op) {
    let tx = self.tx.lock().clone();
    match tx {
      Some(tx) => {
        if tx.send(Job::Op(op)).is_err() {
          tracing::debug!("cache store worker is gone, dropping operation");
        }
      }
      None => tracing::debug!("cache store is closed, dropping operation"),
    }
  }
}

#[async_trait]
impl BackingStore for DurableStore {
  async fn set(&self, owner: Uuid, key: &str, value: Vec<u8>, dirty: bool) {
    self.submit(Op::Set {
      owner,
      key: key.to_string(),
      value,
      dirty,
    });
  }

  async fn get(&self, owner: Uuid, key: &str) -> Result<Option<Vec<u8>>, anyhow::Error> {
    let (reply, rx) = oneshot::channel();
    self.submit(Op::Get {
      owner,
      key: key.to_string(),
      reply,
    });
    rx.await.map_err(|_| anyhow::anyhow!("cache store is closed"))?
  }

  async fn remove(&self, owner: Uuid, key: &str) {
    self.submit(Op::Remove {
      owner,
      key: key.to_string(),
    });
  }

  async fn remove_owner(&self, owner: Uuid) {
    self.submit(Op::RemoveOwner { owner });
  }

  async fn is_dirty(&self, owner: Uuid, key: &str) -> bool {
    let (reply, rx) = oneshot::channel();
    self.submit(Op::IsDirty {
      owner,
      key: key.to_string(),
      reply,
    });
    match rx.await {
      Ok(Ok(Some(dirty))) => dirty,
      Ok(Ok(None)) => true,
      Ok(Err(e)) => {
        tracing::warn!("dirty lookup failed, assuming stale: {}", e);
        true
      }
      Err(_) => true,
    }
  }

  async fn mark_dirty(&self, owner: Uuid, key: &str, dirty: bool) {
    self.submit(Op::MarkDirty {
      owner,
      key: key.to_string(),
      dirty,
    });
  }
}

fn worker_loop(conn: Connection, mut rx: mpsc::UnboundedReceiver<Job>) {
  let mut ack = None;
  while let Some(job) = rx.blocking_recv() {
    match job {
      Job::Shutdown { ack: sender } => {
        ack = Some(sender);
        break;
      }
      // A failed job must not take the worker down with it: log and move
      // on to the next one. Fire-and-forget writers never hear about it.
      Job::Op(op) => {
        if let Err(e) = run_op(&conn, op) {
          tracing::error!("cache store job failed: {}", e);
        }
      }
    }
  }
  rx.close();

  // Only the worker ever touches the connection, including releasing it.
  if let Err((_, e)) = conn.close() {
    tracing::error!("failed to close cache database: {}", e);
  }
  tracing::info!("cache store worker stopped");
  if let Some(ack) = ack {
    let _ = ack.send(());
  }
}

fn run_op(conn: &Connection, op: Op) -> rusqlite::Result<()> {
  match op {
    Op::Set {
      owner,
      key,
      value,
      dirty,
    } => {
      let mut stmt = conn.prepare_cached(
        "INSERT INTO cache_entries (owner_uuid, key, value, dirty) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (owner_uuid, key) DO UPDATE SET value = excluded.value, dirty = excluded.dirty",
      )?;
      stmt.execute(params![owner.to_string(), key, value, dirty])?;
    }
    Op::Remove { owner, key } => {
      let mut stmt =
        conn.prepare_cached("DELETE FROM cache_entries WHERE owner_uuid = ?1 AND key = ?2")?;
      stmt.execute(params![owner.to_string(), key])?;
    }
    Op::RemoveOwner { owner } => {
      let mut stmt = conn.prepare_cached("DELETE FROM cache_entries WHERE owner_uuid = ?1")?;
      stmt.execute(params![owner.to_string()])?;
    }
    Op::MarkDirty { owner, key, dirty } => {
      let mut stmt = conn.prepare_cached(
        "UPDATE cache_entries SET dirty = ?3 WHERE owner_uuid = ?1 AND key = ?2",
      )?;
      stmt.execute(params![owner.to_string(), key, dirty])?;
    }
    Op::Get { owner, key, reply } => {
      let _ = reply.send(read_value(conn, owner, &key).map_err(Into::into));
    }
    Op::IsDirty { owner, key, reply } => {
      let _ = reply.send(read_dirty(conn, owner, &key).map_err(Into::into));
    }
  }
  Ok(())
}

fn read_value(conn: &Connection, owner: Uuid, key: &str) -> rusqlite::Result<Option<Vec<u8>>> {
  let mut stmt =
    conn.prepare_cached("SELECT value FROM cache_entries WHERE owner_uuid = ?1 AND key = ?2")?;
  let mut rows = stmt.query(params![owner.to_string(), key])?;
  match rows.next()? {
    Some(row) => Ok(Some(row.get(0)?)),
    None => Ok(None),
  }
}

fn read_dirty(conn: &Connection, owner: Uuid, key: &str) -> rusqlite::Result<Option<bool>> {
  let mut stmt =
    conn.prepare_cached("SELECT dirty FROM cache_entries WHERE owner_uuid = ?1 AND key = ?2")?;
  let mut rows = stmt.query(params![owner.to_string(), key])?;
  match rows.next()? {
    Some(row) => Ok(Some(row.get(0)?)),
    None => Ok(None),
  }
}
