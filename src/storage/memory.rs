//! In-memory key/value store for tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyValueStore;

/// HashMap-backed implementation of the persistence port. Nothing survives
/// the process; used to substitute for [`super::SqliteStore`] in tests.
#[derive(Default)]
pub struct MemoryStore {
  map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let map = self.map.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(map.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut map = self.map.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    map.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut map = self.map.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    map.remove(key);
    Ok(())
  }

  fn keys(&self, prefix: &str) -> Result<Vec<String>> {
    let map = self.map.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      map
        .keys()
        .filter(|k| k.starts_with(prefix))
        .cloned()
        .collect(),
    )
  }
}
