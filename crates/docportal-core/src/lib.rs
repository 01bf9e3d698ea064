//! Core library for docportal.
//!
//! A client for a medical document management service. Callers browse
//! categories, upload and tag documents, and send feedback through
//! `api::PortalApi`; every request passes through `api::SessionClient`,
//! which owns the stored credential pair and recovers from expired access
//! tokens.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiError, PortalApi, SessionClient, SessionEvent};
pub use auth::{CredentialPair, TokenStore};
pub use config::Config;
