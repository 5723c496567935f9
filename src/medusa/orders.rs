use reqwest::Method;
use serde::Deserialize;

use super::{ApiResult, MedusaClient, Order};

#[derive(Debug, Clone, Deserialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
    #[serde(default)]
    pub count: u32,
}

#[derive(Deserialize)]
struct OrderResponse {
    order: Order,
}

impl MedusaClient {
    /// Orders of the logged-in customer, newest first.
    pub async fn list_orders(&self, token: &str, limit: u32, offset: u32) -> ApiResult<OrderList> {
        let req = self
            .request(Method::GET, "/store/orders", Some(token))
            .query(&[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("order", "-created_at".to_string()),
            ]);
        self.send(req).await
    }

    pub async fn retrieve_order(&self, order_id: &str, token: Option<&str>) -> ApiResult<Order> {
        let req = self.request(Method::GET, &format!("/store/orders/{order_id}"), token);
        let resp: OrderResponse = self.send(req).await?;
        Ok(resp.order)
    }
}
