use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::{
    ApiResult, Cart, CartUpdate, MedusaClient, Order, PaymentCollection, ShippingOption,
};

#[derive(Deserialize)]
struct CartResponse {
    cart: Cart,
}

#[derive(Deserialize)]
struct ShippingOptionList {
    shipping_options: Vec<ShippingOption>,
}

#[derive(Deserialize)]
struct PaymentCollectionResponse {
    payment_collection: PaymentCollection,
}

#[derive(Deserialize)]
struct CompletionError {
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CompleteResponse {
    Order {
        order: Order,
    },
    Cart {
        cart: Cart,
        error: Option<CompletionError>,
    },
}

/// Result of `POST /store/carts/{id}/complete`.
#[derive(Debug, Clone)]
pub enum CartCompletion {
    Placed(Order),
    /// Medusa kept the cart open; the message says why (payment, stock, ...).
    Rejected { cart: Cart, message: String },
}

impl MedusaClient {
    pub async fn create_cart(&self, region_id: &str, token: Option<&str>) -> ApiResult<Cart> {
        let req = self
            .request(Method::POST, "/store/carts", token)
            .json(&json!({ "region_id": region_id }));
        let resp: CartResponse = self.send(req).await?;
        Ok(resp.cart)
    }

    pub async fn retrieve_cart(&self, cart_id: &str) -> ApiResult<Cart> {
        let req = self.request(Method::GET, &format!("/store/carts/{cart_id}"), None);
        let resp: CartResponse = self.send(req).await?;
        Ok(resp.cart)
    }

    pub async fn update_cart(&self, cart_id: &str, update: &CartUpdate) -> ApiResult<Cart> {
        let req = self
            .request(Method::POST, &format!("/store/carts/{cart_id}"), None)
            .json(update);
        let resp: CartResponse = self.send(req).await?;
        Ok(resp.cart)
    }

    pub async fn add_line_item(&self, cart_id: &str, variant_id: &str, quantity: i64) -> ApiResult<Cart> {
        let req = self
            .request(Method::POST, &format!("/store/carts/{cart_id}/line-items"), None)
            .json(&json!({ "variant_id": variant_id, "quantity": quantity }));
        let resp: CartResponse = self.send(req).await?;
        Ok(resp.cart)
    }

    pub async fn update_line_item(&self, cart_id: &str, line_id: &str, quantity: i64) -> ApiResult<Cart> {
        let req = self
            .request(
                Method::POST,
                &format!("/store/carts/{cart_id}/line-items/{line_id}"),
                None,
            )
            .json(&json!({ "quantity": quantity }));
        let resp: CartResponse = self.send(req).await?;
        Ok(resp.cart)
    }

    pub async fn delete_line_item(&self, cart_id: &str, line_id: &str) -> ApiResult<()> {
        let req = self.request(
            Method::DELETE,
            &format!("/store/carts/{cart_id}/line-items/{line_id}"),
            None,
        );
        self.send_empty(req).await
    }

    pub async fn shipping_options(&self, cart_id: &str) -> ApiResult<Vec<ShippingOption>> {
        let req = self
            .request(Method::GET, "/store/shipping-options", None)
            .query(&[("cart_id", cart_id)]);
        let list: ShippingOptionList = self.send(req).await?;
        Ok(list.shipping_options)
    }

    pub async fn add_shipping_method(&self, cart_id: &str, option_id: &str) -> ApiResult<Cart> {
        let req = self
            .request(
                Method::POST,
                &format!("/store/carts/{cart_id}/shipping-methods"),
                None,
            )
            .json(&json!({ "option_id": option_id }));
        let resp: CartResponse = self.send(req).await?;
        Ok(resp.cart)
    }

    /// Make sure the cart has a payment collection with a session for `provider_id`.
    pub async fn initiate_payment(&self, cart: &Cart, provider_id: &str) -> ApiResult<PaymentCollection> {
        let collection = match &cart.payment_collection {
            Some(existing) => existing.clone(),
            None => {
                let req = self
                    .request(Method::POST, "/store/payment-collections", None)
                    .json(&json!({ "cart_id": cart.id }));
                let resp: PaymentCollectionResponse = self.send(req).await?;
                resp.payment_collection
            }
        };

        if collection
            .payment_sessions
            .iter()
            .any(|s| s.provider_id == provider_id)
        {
            return Ok(collection);
        }

        let req = self
            .request(
                Method::POST,
                &format!("/store/payment-collections/{}/payment-sessions", collection.id),
                None,
            )
            .json(&json!({ "provider_id": provider_id }));
        let resp: PaymentCollectionResponse = self.send(req).await?;
        Ok(resp.payment_collection)
    }

    pub async fn complete_cart(&self, cart_id: &str) -> ApiResult<CartCompletion> {
        let req = self.request(
            Method::POST,
            &format!("/store/carts/{cart_id}/complete"),
            None,
        );
        let resp: CompleteResponse = self.send(req).await?;
        Ok(match resp {
            CompleteResponse::Order { order } => CartCompletion::Placed(order),
            CompleteResponse::Cart { cart, error } => CartCompletion::Rejected {
                cart,
                message: error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Cart could not be completed".to_string()),
            },
        })
    }

    /// Attach a guest cart to the logged-in customer.
    pub async fn transfer_cart(&self, cart_id: &str, token: &str) -> ApiResult<Cart> {
        let req = self.request(
            Method::POST,
            &format!("/store/carts/{cart_id}/customer"),
            Some(token),
        );
        let resp: CartResponse = self.send(req).await?;
        Ok(resp.cart)
    }
}
