use serde::{Deserialize, Serialize};

/// Durable-tier configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurableConfig {
  /// Path of the cache database file.
  #[serde(default = "default_path")]
  pub path: String,

  /// How long the connection waits on a locked database before giving up.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_path() -> String {
  "framestash.db".into()
}

fn default_busy_timeout_ms() -> u64 {
  5_000
}

impl Default for DurableConfig {
  fn default() -> Self {
    Self {
      path: default_path(),
      busy_timeout_ms: default_busy_timeout_ms(),
    }
  }
}
