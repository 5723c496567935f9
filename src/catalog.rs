//! Variant availability and price lists, derived from Medusa's standard product data.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::medusa::{ApiResult, MedusaClient, Product, ProductQuery, ProductVariant};

const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantInventory {
    pub inventory_quantity: i64,
    pub manage_inventory: bool,
    pub allow_backorder: bool,
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantPrice {
    pub id: String,
    pub currency_code: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<i64>,
}

/// A variant can be bought when stock is not tracked, backorders are allowed, or stock is left.
pub fn is_available(manage_inventory: bool, allow_backorder: bool, inventory_quantity: i64) -> bool {
    !manage_inventory || allow_backorder || inventory_quantity > 0
}

pub fn variant_inventory(variant: &ProductVariant) -> VariantInventory {
    let quantity = variant.inventory_quantity.unwrap_or(0);
    VariantInventory {
        inventory_quantity: quantity,
        manage_inventory: variant.manage_inventory,
        allow_backorder: variant.allow_backorder,
        is_available: is_available(variant.manage_inventory, variant.allow_backorder, quantity),
    }
}

/// Raw price list of a variant. When Medusa only returned a calculated price, that one entry is used.
pub fn variant_prices(variant: &ProductVariant) -> Vec<VariantPrice> {
    if !variant.prices.is_empty() {
        return variant
            .prices
            .iter()
            .map(|p| VariantPrice {
                id: p.id.clone(),
                currency_code: p.currency_code.clone(),
                amount: p.amount,
                min_quantity: p.min_quantity,
                max_quantity: p.max_quantity,
            })
            .collect();
    }

    variant
        .calculated_price
        .as_ref()
        .and_then(|calc| {
            Some(VariantPrice {
                id: calc.id.clone().unwrap_or_else(|| variant.id.clone()),
                currency_code: calc.currency_code.clone()?,
                amount: calc.calculated_amount?,
                min_quantity: None,
                max_quantity: None,
            })
        })
        .into_iter()
        .collect()
}

pub fn inventory_map(products: &[Product]) -> BTreeMap<String, VariantInventory> {
    products
        .iter()
        .flat_map(|p| &p.variants)
        .map(|v| (v.id.clone(), variant_inventory(v)))
        .collect()
}

pub fn price_map(products: &[Product]) -> BTreeMap<String, Vec<VariantPrice>> {
    products
        .iter()
        .flat_map(|p| &p.variants)
        .map(|v| (v.id.clone(), variant_prices(v)))
        .collect()
}

/// The amount shown to shoppers: the region's calculated price, else the first raw price.
pub fn display_price(variant: &ProductVariant) -> Option<(f64, String)> {
    if let Some(calc) = &variant.calculated_price {
        if let (Some(amount), Some(currency)) = (calc.calculated_amount, &calc.currency_code) {
            return Some((amount, currency.clone()));
        }
    }
    variant
        .prices
        .first()
        .map(|p| (p.amount, p.currency_code.clone()))
}

/// Lowest display price across a product's variants ("od 99,00 zł" on listings).
pub fn lowest_price(product: &Product) -> Option<(f64, String)> {
    product
        .variants
        .iter()
        .filter_map(display_price)
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Fetch one product, or page through the whole catalogue.
pub async fn fetch_products(client: &MedusaClient, product_id: Option<&str>) -> ApiResult<Vec<Product>> {
    let mut query = ProductQuery::page(PAGE_SIZE, 0);
    if let Some(id) = product_id {
        query.ids.push(id.to_string());
    }

    let mut products = Vec::new();
    loop {
        let page = client.list_products(&query).await?;
        let fetched = page.products.len() as u32;
        products.extend(page.products);
        query.offset += fetched;
        if fetched == 0 || query.offset >= page.count {
            break;
        }
    }
    Ok(products)
}
