use askama::Template;

use super::{CartView, PageContext, format};
use crate::medusa::{Address, Customer, Order};

pub struct OrderRow {
    pub id: String,
    pub number: String,
    pub date: String,
    pub status: String,
    pub total: String,
}

impl OrderRow {
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            number: order.number(),
            date: order_date(order),
            status: status_label(&order.status).to_string(),
            total: format::money(order.total, &order.currency_code),
        }
    }
}

/// Customer profile fields as shown (or re-typed) in the account form.
#[derive(Default)]
pub struct ProfileValues {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl ProfileValues {
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            email: customer.email.clone(),
            first_name: customer.first_name.clone().unwrap_or_default(),
            last_name: customer.last_name.clone().unwrap_or_default(),
            phone: customer.phone.clone().unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub ctx: PageContext,
    pub display_name: String,
    pub profile: ProfileValues,
    pub orders: Vec<OrderRow>,
    pub orders_error: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "order.html")]
pub struct OrderTemplate {
    pub ctx: PageContext,
    pub number: String,
    pub date: String,
    pub status: String,
    pub address_lines: Vec<String>,
    pub summary: CartView,
}

impl OrderTemplate {
    pub fn new(ctx: PageContext, order: &Order) -> Self {
        Self {
            ctx,
            number: order.number(),
            date: order_date(order),
            status: status_label(&order.status).to_string(),
            address_lines: order.shipping_address.as_ref().map(address_lines).unwrap_or_default(),
            summary: CartView::from_order(order),
        }
    }
}

/// Full-page error state for an order that could not be fetched.
#[derive(Template)]
#[template(path = "order_error.html")]
pub struct OrderErrorTemplate {
    pub ctx: PageContext,
    pub message: String,
}

fn order_date(order: &Order) -> String {
    order
        .created_at
        .as_deref()
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.format("%d.%m.%Y").to_string())
        .unwrap_or_default()
}

fn status_label(status: &str) -> &str {
    match status {
        "pending" => "Oczekujące",
        "completed" => "Zrealizowane",
        "canceled" => "Anulowane",
        "archived" => "Zarchiwizowane",
        "requires_action" => "Wymaga działania",
        other => other,
    }
}

fn address_lines(address: &Address) -> Vec<String> {
    let name = [address.first_name.as_deref(), address.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let city = [address.postal_code.as_deref(), address.city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    [Some(name), address.address_1.clone(), address.address_2.clone(), Some(city)]
        .into_iter()
        .flatten()
        .filter(|line| !line.trim().is_empty())
        .collect()
}
