//! REST API module for the photocrm backend.
//!
//! Layering, bottom to top:
//! - `Transport`: sends one request and reports the raw status and body
//! - `AuthClient`: the unauthenticated `/auth/*` endpoints
//! - `Gateway`: bearer attachment, 401 refresh-and-retry, notifications
//! - `StudioApi`: typed business endpoints issued through the gateway

pub mod auth;
pub mod error;
pub mod gateway;
pub mod scope;
pub mod studio;
pub mod transport;

pub use auth::AuthClient;
pub use error::ApiError;
pub use gateway::Gateway;
pub use scope::ViewScope;
pub use studio::StudioApi;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
