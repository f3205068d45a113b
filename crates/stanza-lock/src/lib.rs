//! Stanza Lock Manager
//!
//! Serializes writers of the config files across processes (OS advisory
//! locks on sidecar files) and across threads (a per-file process mutex).
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use stanza_lock::{LockKind, LockManager};
//!
//! let manager = LockManager::new(
//!     PathBuf::from("config.yaml"),
//!     PathBuf::from("config-ng.yaml"),
//!     PathBuf::from("config-metadata.yaml"),
//! );
//! let guard = manager.acquire(LockKind::Main)?;
//! // ... read, mutate, write config.yaml ...
//! guard.release();
//! # Ok::<(), stanza_lock::LockError>(())
//! ```

#![warn(unreachable_pub)]

mod error;
mod lock;

pub use error::{LockError, LockResult};
pub use lock::{lock_path_for, ConfigLock, LockKind, LockManager, DEFAULT_LOCK_TIMEOUT};
