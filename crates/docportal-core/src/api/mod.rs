//! REST API client module for the document portal.
//!
//! This module provides the `SessionClient`, which attaches the stored
//! bearer token to every call and transparently refreshes an expired access
//! token once per call, and `PortalApi`, the typed endpoints built on it.
//!
//! When a refresh is impossible the session is cleared and subscribers get
//! a `SessionEvent::Terminated` telling them to route the user to login.

pub mod client;
pub mod error;
pub mod portal;
pub mod request;

pub use client::{SessionClient, SessionEvent, DEFAULT_BASE_URL, LOGIN_ROUTE, SESSION_EXPIRED_NOTICE};
pub use error::ApiError;
pub use portal::{normalize_locale, PortalApi, DEFAULT_LOCALE};
pub use request::{ApiRequest, FormPart, RequestBody};
