//! Core library for the photocrm studio client.
//!
//! This crate holds everything below the user interface:
//! - `auth`: the `SessionStore`, its persisted record and storage backends
//! - `api`: the base `Transport`, the `/auth` endpoints and the `Gateway`
//!   that every business call goes through
//! - `models`: users, orders, galleries, payments and dashboard payloads
//! - `notify`: the user-visible notification sink used by the gateway
//! - `config`: on-disk configuration and directory layout

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiError, Gateway, HttpTransport, StudioApi, Transport};
pub use auth::{Session, SessionStore};
pub use config::Config;
pub use notify::{Notice, Notifier};
