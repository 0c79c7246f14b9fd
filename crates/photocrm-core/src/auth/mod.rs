//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `SessionStore`: the single owner of the session and its lifecycle
//! - `Session` / `PersistedRecord`: in-memory state and its durable snapshot
//! - `SessionStorage`: injected durable slots (file, keychain, memory)
//! - `DefaultHeaders`: the bearer header the gateway attaches to every call
//!
//! The session survives restarts through the `auth-storage` record.

pub mod headers;
pub mod session;
pub mod storage;
pub mod store;

pub use headers::DefaultHeaders;
pub use session::{PersistedRecord, PersistedState, Session, AUTH_STORAGE_KEY};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage};
pub use store::SessionStore;
