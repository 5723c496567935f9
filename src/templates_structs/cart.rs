use askama::Template;

use super::{PageContext, format};
use crate::medusa::{Address, Cart, LineItem, Order, ShippingOption};

pub struct LineView {
    pub id: String,
    pub title: String,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: i64,
    pub unit_price: String,
    pub total: String,
}

impl LineView {
    fn new(item: &LineItem, currency: &str) -> Self {
        let total = item.total.unwrap_or(item.unit_price * item.quantity as f64);
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            variant_title: item.variant_title.clone(),
            thumbnail: item.thumbnail.clone(),
            quantity: item.quantity,
            unit_price: format::money(item.unit_price, currency),
            total: format::money(total, currency),
        }
    }
}

/// Lines and totals exactly as Medusa reported them, formatted for display.
pub struct CartView {
    pub lines: Vec<LineView>,
    pub item_count: i64,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
}

impl CartView {
    pub fn from_cart(cart: &Cart) -> Self {
        let currency = cart.currency_code.as_str();
        Self {
            lines: cart.items.iter().map(|i| LineView::new(i, currency)).collect(),
            item_count: cart.item_count(),
            subtotal: format::money(cart.subtotal, currency),
            shipping: format::money(cart.shipping_total, currency),
            tax: format::money(cart.tax_total, currency),
            total: format::money(cart.total, currency),
        }
    }

    pub fn from_order(order: &Order) -> Self {
        let currency = order.currency_code.as_str();
        Self {
            lines: order.items.iter().map(|i| LineView::new(i, currency)).collect(),
            item_count: order.items.iter().map(|i| i.quantity).sum(),
            subtotal: format::money(order.subtotal, currency),
            shipping: format::money(order.shipping_total, currency),
            tax: format::money(order.tax_total, currency),
            total: format::money(order.total, currency),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Template)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub cart: Option<CartView>,
    pub error: Option<String>,
}

/// Address fields as typed into the checkout form.
#[derive(Default)]
pub struct AddressForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    pub phone: String,
}

impl AddressForm {
    pub fn from_cart(cart: &Cart) -> Self {
        let address = cart.shipping_address.clone().unwrap_or_default();
        let Address {
            first_name,
            last_name,
            address_1,
            address_2,
            city,
            postal_code,
            country_code,
            phone,
        } = address;
        Self {
            email: cart.email.clone().unwrap_or_default(),
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            address_1: address_1.unwrap_or_default(),
            address_2: address_2.unwrap_or_default(),
            city: city.unwrap_or_default(),
            postal_code: postal_code.unwrap_or_default(),
            country_code: country_code.unwrap_or_else(|| "pl".to_string()),
            phone: phone.unwrap_or_default(),
        }
    }
}

pub struct ShippingRow {
    pub id: String,
    pub name: String,
    pub price: String,
    pub selected: bool,
}

impl ShippingRow {
    pub fn new(option: &ShippingOption, currency: &str, cart: &Cart) -> Self {
        Self {
            id: option.id.clone(),
            name: option.name.clone(),
            price: format::money(option.amount, currency),
            selected: cart
                .shipping_methods
                .iter()
                .any(|m| m.shipping_option_id.as_deref() == Some(option.id.as_str())),
        }
    }
}

#[derive(Template)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub summary: CartView,
    pub address: AddressForm,
    pub has_address: bool,
    pub shipping_options: Vec<ShippingRow>,
    pub has_shipping: bool,
    pub ready: bool,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "confirmation.html")]
pub struct ConfirmationTemplate {
    pub ctx: PageContext,
    pub number: String,
    pub email: String,
    pub summary: CartView,
}
