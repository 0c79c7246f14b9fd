//! Data models for photocrm entities.
//!
//! - `User`: the signed-in studio member
//! - `Order`, `OrderStatus`: photography orders and their lifecycle
//! - `Gallery`, `Photo`, `PhotoSelection`: the public client gallery
//! - `PaymentSummary`, `PaymentRequest`: the checkout flow
//! - `DashboardStats`: the analytics overview

pub mod dashboard;
pub mod gallery;
pub mod order;
pub mod payment;
pub mod user;

pub use dashboard::{DashboardStats, RecentOrder};
pub use gallery::{ClientInfo, Gallery, Photo, PhotoSelection, SelectionError};
pub use order::{Order, OrderFilter, OrderStatus};
pub use payment::{PaymentOutcome, PaymentRequest, PaymentSummary, SelectedPhoto};
pub use user::User;
