use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::app::AppState;
use crate::errors::{AppError, render};
use crate::medusa::ProductQuery;
use crate::storage::ProfileId;
use crate::templates_structs::{PageContext, ProductCard, ProductTemplate, ShopTemplate, VariantRow};

const PAGE_SIZE: u32 = 12;
/// Keeps the offset well inside `u32`.
const MAX_PAGE: u32 = 10_000;

#[derive(Deserialize)]
pub struct ShopQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page: Option<u32>,
}

pub async fn index(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    query: web::Query<ShopQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let page = query.page.unwrap_or(1).clamp(1, MAX_PAGE);

    let mut product_query = ProductQuery::page(PAGE_SIZE, (page - 1) * PAGE_SIZE);
    product_query.q = Some(query.q.clone());
    product_query.region_id = state.config.region_id.clone();

    let (products, has_next, error) = match state.medusa.list_products(&product_query).await {
        Ok(list) => {
            let shown = u32::try_from(list.products.len()).unwrap_or(u32::MAX);
            let has_next = product_query.offset.saturating_add(shown) < list.count;
            let cards = list.products.iter().map(ProductCard::from_product).collect();
            (cards, has_next, None)
        }
        Err(e) => {
            log::warn!("Product listing failed: {e}");
            (vec![], false, Some("Nie udało się załadować produktów. Spróbuj ponownie później.".to_string()))
        }
    };

    let ctx = PageContext::build(&session, &state, &profile, "/sklep").await;
    render(ShopTemplate {
        ctx,
        products,
        q: query.q,
        page,
        has_prev: page > 1,
        has_next,
        error,
    })
}

pub async fn product(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let handle = path.into_inner();
    let product = state
        .medusa
        .product_by_handle(&handle, state.config.region_id.as_deref())
        .await?
        .ok_or(AppError::NotFound)?;

    let ctx = PageContext::build(&session, &state, &profile, "/sklep").await;
    render(ProductTemplate {
        ctx,
        title: product.title.clone(),
        description: product.description.clone(),
        thumbnail: product.thumbnail.clone(),
        variants: product.variants.iter().map(VariantRow::from_variant).collect(),
    })
}
