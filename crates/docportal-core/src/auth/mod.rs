//! Authentication state for the portal.
//!
//! This module provides:
//! - `CredentialPair`: the persisted access/refresh token pair
//! - `TokenStore`: the get/set/clear contract for wherever the pair lives
//! - `FileTokenStore`, `MemoryTokenStore`, `KeyringTokenStore`: the backends
//!
//! Only `api::SessionClient` writes to a store.

pub mod credentials;
pub mod session;

pub use credentials::KeyringTokenStore;
pub use session::{CredentialPair, FileTokenStore, MemoryTokenStore, TokenStore, DEFAULT_EXPIRES_IN_SECS};
