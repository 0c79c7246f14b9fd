use serde::{Deserialize, Serialize};

use super::ClientInfo;

/// A photo included in a checkout, with its price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedPhoto {
    pub id: String,
    pub filename: String,
    pub price: f64,
}

/// What the client is about to pay for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub order_id: String,
    pub total_amount: f64,
    pub currency: String,
    #[serde(default)]
    pub selected_photos: Vec<SelectedPhoto>,
    pub client_info: ClientInfo,
}

impl PaymentSummary {
    pub fn display_total(&self) -> String {
        format!("{:.2} {}", self.total_amount, self.currency)
    }

    /// Build the request that pays for everything in this summary.
    pub fn to_request(&self, payment_method: &str) -> PaymentRequest {
        PaymentRequest {
            order_id: self.order_id.clone(),
            amount: self.total_amount,
            currency: self.currency.clone(),
            payment_method: payment_method.to_string(),
            selected_photos: self.selected_photos.iter().map(|p| p.id.clone()).collect(),
        }
    }
}

/// Body of `POST /payments/process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub selected_photos: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentOutcome {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
}
