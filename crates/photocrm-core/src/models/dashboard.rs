use serde::{Deserialize, Serialize};

use super::OrderStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentOrder {
    pub id: String,
    pub title: String,
    pub status: OrderStatus,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Studio overview from `/analytics/dashboard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(rename = "totalOrders", default)]
    pub total_orders: u64,
    #[serde(rename = "totalPhotos", default)]
    pub total_photos: u64,
    #[serde(rename = "totalRevenue", default)]
    pub total_revenue: f64,
    #[serde(rename = "totalClients", default)]
    pub total_clients: u64,
    #[serde(rename = "recentOrders", default)]
    pub recent_orders: Vec<RecentOrder>,
}
