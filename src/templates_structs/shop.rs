use askama::Template;

use super::{PageContext, format};
use crate::catalog;
use crate::medusa::{Product, ProductVariant};

pub struct ProductCard {
    pub handle: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub price: Option<String>,
}

impl ProductCard {
    pub fn from_product(product: &Product) -> Self {
        Self {
            handle: product.handle.clone(),
            title: product.title.clone(),
            thumbnail: product.thumbnail.clone(),
            price: catalog::lowest_price(product).map(|(amount, currency)| format::money(amount, &currency)),
        }
    }
}

#[derive(Template)]
#[template(path = "shop.html")]
pub struct ShopTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductCard>,
    pub q: String,
    pub page: u32,
    pub has_prev: bool,
    pub has_next: bool,
    pub error: Option<String>,
}

pub struct VariantRow {
    pub id: String,
    pub title: String,
    pub price: Option<String>,
    pub available: bool,
}

impl VariantRow {
    pub fn from_variant(variant: &ProductVariant) -> Self {
        Self {
            id: variant.id.clone(),
            title: variant.title.clone(),
            price: catalog::display_price(variant).map(|(amount, currency)| format::money(amount, &currency)),
            available: catalog::variant_inventory(variant).is_available,
        }
    }
}

#[derive(Template)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub variants: Vec<VariantRow>,
}
