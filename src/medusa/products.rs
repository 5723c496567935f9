use reqwest::Method;
use serde::Deserialize;

use super::{ApiResult, MedusaClient, Product, Region};

/// Variant fields the storefront needs on top of Medusa's defaults: region
/// pricing, raw price lists and stock figures.
pub const PRODUCT_FIELDS: &str = "*variants,*variants.calculated_price,*variants.prices,\
+variants.inventory_quantity,+variants.manage_inventory,+variants.allow_backorder";

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub limit: u32,
    pub offset: u32,
    pub q: Option<String>,
    pub handle: Option<String>,
    pub ids: Vec<String>,
    pub region_id: Option<String>,
}

impl ProductQuery {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.max(1).to_string()),
            ("offset", self.offset.to_string()),
            ("fields", PRODUCT_FIELDS.to_string()),
        ];
        if let Some(q) = self.q.as_ref().filter(|q| !q.trim().is_empty()) {
            params.push(("q", q.trim().to_string()));
        }
        if let Some(handle) = &self.handle {
            params.push(("handle", handle.clone()));
        }
        for id in &self.ids {
            params.push(("id[]", id.clone()));
        }
        if let Some(region_id) = &self.region_id {
            params.push(("region_id", region_id.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Deserialize)]
struct RegionList {
    regions: Vec<Region>,
}

impl MedusaClient {
    pub async fn list_products(&self, query: &ProductQuery) -> ApiResult<ProductList> {
        let req = self
            .request(Method::GET, "/store/products", None)
            .query(&query.to_params());
        self.send(req).await
    }

    pub async fn product_by_handle(
        &self,
        handle: &str,
        region_id: Option<&str>,
    ) -> ApiResult<Option<Product>> {
        let query = ProductQuery {
            limit: 1,
            handle: Some(handle.to_string()),
            region_id: region_id.map(str::to_string),
            ..ProductQuery::default()
        };
        let list = self.list_products(&query).await?;
        Ok(list.products.into_iter().find(|p| p.handle == handle))
    }

    pub async fn list_regions(&self) -> ApiResult<Vec<Region>> {
        let req = self.request(Method::GET, "/store/regions", None);
        let list: RegionList = self.send(req).await?;
        Ok(list.regions)
    }
}
