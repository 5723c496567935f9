use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::{ApiResult, Customer, CustomerUpdate, MedusaClient, NewCustomer};

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct CustomerResponse {
    customer: Customer,
}

impl MedusaClient {
    /// Email/password login. Returns the customer's bearer token.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<String> {
        let req = self
            .request(Method::POST, "/auth/customer/emailpass", None)
            .json(&json!({ "email": email, "password": password }));
        let resp: TokenResponse = self.send(req).await?;
        Ok(resp.token)
    }

    /// Create an auth identity. The returned registration token can only create a customer.
    pub async fn register_identity(&self, email: &str, password: &str) -> ApiResult<String> {
        let req = self
            .request(Method::POST, "/auth/customer/emailpass/register", None)
            .json(&json!({ "email": email, "password": password }));
        let resp: TokenResponse = self.send(req).await?;
        Ok(resp.token)
    }

    pub async fn create_customer(&self, registration_token: &str, customer: &NewCustomer) -> ApiResult<Customer> {
        let req = self
            .request(Method::POST, "/store/customers", Some(registration_token))
            .json(customer);
        let resp: CustomerResponse = self.send(req).await?;
        Ok(resp.customer)
    }

    pub async fn retrieve_customer(&self, token: &str) -> ApiResult<Customer> {
        let req = self.request(Method::GET, "/store/customers/me", Some(token));
        let resp: CustomerResponse = self.send(req).await?;
        Ok(resp.customer)
    }

    pub async fn update_customer(&self, token: &str, update: &CustomerUpdate) -> ApiResult<Customer> {
        let req = self
            .request(Method::POST, "/store/customers/me", Some(token))
            .json(update);
        let resp: CustomerResponse = self.send(req).await?;
        Ok(resp.customer)
    }

    /// Ask Medusa to e-mail a reset link. Succeeds whether or not the address is known.
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<()> {
        let req = self
            .request(Method::POST, "/auth/customer/emailpass/reset-password", None)
            .json(&json!({ "identifier": email }));
        self.send_empty(req).await
    }

    /// Set a new password using the token from the reset e-mail.
    pub async fn update_password(&self, reset_token: &str, email: &str, password: &str) -> ApiResult<()> {
        let req = self
            .request(Method::POST, "/auth/customer/emailpass/update", Some(reset_token))
            .json(&json!({ "email": email, "password": password }));
        self.send_empty(req).await
    }
}
