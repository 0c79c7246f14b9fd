//! Typed business endpoints for the studio: orders, analytics, the public
//! gallery and payments. All calls go through the `Gateway`.

use std::sync::Arc;

use tracing::debug;

use super::{ApiError, ApiRequest, Gateway};
use crate::models::{
    DashboardStats, Gallery, Order, OrderFilter, PaymentOutcome, PaymentRequest, PaymentSummary,
};

/// Clone is cheap - the gateway is shared.
#[derive(Clone)]
pub struct StudioApi {
    gateway: Arc<Gateway>,
}

impl StudioApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub async fn fetch_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ApiError> {
        let request = filter
            .query_pairs()
            .into_iter()
            .fold(ApiRequest::get("/orders"), |request, (key, value)| {
                request.with_query(key, &value)
            });
        let orders: Vec<Order> = self.gateway.request_json(request).await?;
        debug!(count = orders.len(), "Fetched orders");
        Ok(orders)
    }

    pub async fn fetch_order(&self, order_id: &str) -> Result<Order, ApiError> {
        self.gateway.get_json(&format!("/orders/{}", order_id)).await
    }

    pub async fn fetch_dashboard(&self) -> Result<DashboardStats, ApiError> {
        self.gateway.get_json("/analytics/dashboard").await
    }

    pub async fn fetch_public_gallery(&self, order_id: &str) -> Result<Gallery, ApiError> {
        self.gateway
            .get_json(&format!("/gallery/{}/public", order_id))
            .await
    }

    pub async fn fetch_payment(&self, order_id: &str) -> Result<PaymentSummary, ApiError> {
        self.gateway.get_json(&format!("/payments/{}", order_id)).await
    }

    pub async fn process_payment(&self, payment: &PaymentRequest) -> Result<PaymentOutcome, ApiError> {
        debug!(order_id = %payment.order_id, method = %payment.payment_method, "Processing payment");
        self.gateway.post_json("/payments/process", payment).await
    }
}
