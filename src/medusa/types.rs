use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub sku: Option<String>,
    #[serde(default)]
    pub manage_inventory: bool,
    #[serde(default)]
    pub allow_backorder: bool,
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub prices: Vec<Price>,
    pub calculated_price: Option<CalculatedPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
    pub currency_code: String,
    pub amount: f64,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
}

/// Region-aware price computed by Medusa's pricing module.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculatedPrice {
    pub id: Option<String>,
    pub calculated_amount: Option<f64>,
    pub original_amount: Option<f64>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub title: String,
    pub variant_id: Option<String>,
    pub variant_title: Option<String>,
    pub product_handle: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingMethod {
    pub id: String,
    pub name: String,
    pub shipping_option_id: Option<String>,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSession {
    pub id: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCollection {
    pub id: String,
    #[serde(default)]
    pub payment_sessions: Vec<PaymentSession>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cart {
    pub id: String,
    pub email: Option<String>,
    pub currency_code: String,
    pub region_id: Option<String>,
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    pub payment_collection: Option<PaymentCollection>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub shipping_total: f64,
    #[serde(default)]
    pub tax_total: f64,
    #[serde(default)]
    pub discount_total: f64,
    #[serde(default)]
    pub total: f64,
}

impl Cart {
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Everything Medusa needs before the cart can be completed.
    pub fn is_ready_for_completion(&self) -> bool {
        !self.items.is_empty()
            && self.email.as_deref().is_some_and(|e| !e.is_empty())
            && self
                .shipping_address
                .as_ref()
                .is_some_and(|a| a.address_1.is_some())
            && !self.shipping_methods.is_empty()
    }
}

/// Fields accepted by `POST /store/carts/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() { self.email.clone() } else { name }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub display_id: Option<i64>,
    #[serde(default)]
    pub status: String,
    pub email: Option<String>,
    pub currency_code: String,
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub shipping_total: f64,
    #[serde(default)]
    pub tax_total: f64,
    #[serde(default)]
    pub total: f64,
}

impl Order {
    /// Human-facing order number, `#1042` style.
    pub fn number(&self) -> String {
        match self.display_id {
            Some(n) => format!("#{n}"),
            None => self.id.clone(),
        }
    }
}
