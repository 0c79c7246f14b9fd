use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a photography order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    InProgress,
    PhotosUploaded,
    ClientReview,
    PaymentPending,
    Paid,
    Completed,
    Cancelled,
    /// Any status this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::PhotosUploaded => "Photos Uploaded",
            OrderStatus::ClientReview => "Client Review",
            OrderStatus::PaymentPending => "Payment Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Unknown => "Unknown",
        }
    }

    /// Wire name, as used in the `status` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::PhotosUploaded => "PHOTOS_UPLOADED",
            OrderStatus::ClientReview => "CLIENT_REVIEW",
            OrderStatus::PaymentPending => "PAYMENT_PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "CREATED" => Some(OrderStatus::Created),
            "IN_PROGRESS" => Some(OrderStatus::InProgress),
            "PHOTOS_UPLOADED" => Some(OrderStatus::PhotosUploaded),
            "CLIENT_REVIEW" => Some(OrderStatus::ClientReview),
            "PAYMENT_PENDING" => Some(OrderStatus::PaymentPending),
            "PAID" => Some(OrderStatus::Paid),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "eventDate")]
    pub event_date: Option<String>,
    pub status: OrderStatus,
    #[serde(rename = "totalAmount")]
    pub total_amount: Option<f64>,
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(rename = "photographerId")]
    pub photographer_id: Option<String>,
    #[serde(rename = "galleryUrl", default)]
    pub gallery_url: Option<String>,
    #[serde(rename = "qrCode", default)]
    pub qr_code: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn display_amount(&self) -> String {
        match self.total_amount {
            Some(amount) => format!("${:.2}", amount),
            None => "-".to_string(),
        }
    }
}

/// Search and status filter for the order list.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref search) = self.search {
            if !search.is_empty() {
                pairs.push(("search", search.clone()));
            }
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs
    }
}
