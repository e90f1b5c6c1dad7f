//! Catalog service
//!
//! The catalog backend is an external collaborator; handlers only see the
//! [`CatalogProvider`] trait. [`StaticCatalog`] serves a JSON catalog file
//! for deployments without a store backend and for tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Category, Product};
use crate::utils::errors::{OrderBuddyError, Result};

/// Source of categories and products for a tenant
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Active categories in display order
    async fn categories(&self, tenant_id: &str) -> Result<Vec<Category>>;

    /// Active products of one category in display order
    async fn products(&self, tenant_id: &str, category_id: &str) -> Result<Vec<Product>>;
}

/// Catalog of a single tenant as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantCatalog {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
}

/// In-memory catalog keyed by tenant
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tenants: HashMap<String, TenantCatalog>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `{ "<tenant>": { "categories": [...], "products": [...] } }` file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let tenants: HashMap<String, TenantCatalog> = serde_json::from_str(&raw)?;

        let catalog = Self { tenants };
        catalog.validate()?;

        info!(path = %path.display(), tenants = catalog.tenants.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Register or replace a tenant's catalog
    pub fn insert_tenant(&mut self, tenant_id: impl Into<String>, catalog: TenantCatalog) {
        self.tenants.insert(tenant_id.into(), catalog);
    }

    /// Every product must point at a known category
    fn validate(&self) -> Result<()> {
        for (tenant_id, catalog) in &self.tenants {
            for product in &catalog.products {
                if !catalog.categories.iter().any(|c| c.id == product.category_id) {
                    return Err(OrderBuddyError::Catalog(format!(
                        "product {} of tenant {} references unknown category {}",
                        product.id, tenant_id, product.category_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn tenant(&self, tenant_id: &str) -> Result<&TenantCatalog> {
        self.tenants
            .get(tenant_id)
            .ok_or_else(|| OrderBuddyError::Catalog(format!("unknown tenant {}", tenant_id)))
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn categories(&self, tenant_id: &str) -> Result<Vec<Category>> {
        let categories = self.tenant(tenant_id)?.categories.clone();
        debug!(tenant_id = tenant_id, count = categories.len(), "Listing categories");
        Ok(categories)
    }

    async fn products(&self, tenant_id: &str, category_id: &str) -> Result<Vec<Product>> {
        let products: Vec<Product> = self
            .tenant(tenant_id)?
            .products
            .iter()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        debug!(tenant_id = tenant_id, category_id = category_id, count = products.len(), "Listing products");
        Ok(products)
    }
}
