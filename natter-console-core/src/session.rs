//! Persistent bearer-token storage.
//!
//! The token is read from storage on every call so that a login or logout
//! performed elsewhere is picked up by the next request.

use crate::error::Result;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Fixed key the token is stored under.
pub const TOKEN_KEY: &str = "natter_auth_token";

#[derive(Debug, Clone)]
pub enum TokenStore {
    /// JSON key/value file shared across invocations.
    File(PathBuf),
    /// Process-local token, e.g. supplied on the command line.
    Memory(Arc<Mutex<Option<String>>>),
}

impl TokenStore {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        TokenStore::File(path.into())
    }

    pub fn memory(token: Option<String>) -> Self {
        TokenStore::Memory(Arc::new(Mutex::new(token)))
    }

    /// Current token; unreadable storage counts as logged out.
    pub fn token(&self) -> Option<String> {
        match self {
            TokenStore::File(path) => match read_map(path) {
                Ok(map) => map
                    .get(TOKEN_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .filter(|t| !t.is_empty()),
                Err(e) => {
                    warn!("failed to read session file {}: {}", path.display(), e);
                    None
                }
            },
            TokenStore::Memory(slot) => slot.lock().ok().and_then(|t| t.clone()),
        }
    }

    pub fn save(&self, token: &str) -> Result<()> {
        match self {
            TokenStore::File(path) => {
                let mut map = read_map(path).unwrap_or_default();
                map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
                write_map(path, &map)?;
                debug!("token saved to {}", path.display());
            }
            TokenStore::Memory(slot) => {
                if let Ok(mut guard) = slot.lock() {
                    *guard = Some(token.to_string());
                }
            }
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match self {
            TokenStore::File(path) => {
                if !path.exists() {
                    return Ok(());
                }
                let mut map = read_map(path).unwrap_or_default();
                if map.remove(TOKEN_KEY).is_some() {
                    write_map(path, &map)?;
                    debug!("token cleared from {}", path.display());
                }
            }
            TokenStore::Memory(slot) => {
                if let Ok(mut guard) = slot.lock() {
                    *guard = None;
                }
            }
        }
        Ok(())
    }
}

fn read_map(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Ok(Map::new());
    }
    Ok(serde_json::from_slice(&data)?)
}

fn write_map(path: &Path, map: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(map)?)?;
    Ok(())
}
