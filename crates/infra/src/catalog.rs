//! Product catalog service: CRUD and barcode lookup.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use grocer_core::{Aggregate, DomainError, ExpectedVersion, Money};
use grocer_products::{CreateProduct, Product, ProductCommand, ProductId, UpdateProductDetails};

use crate::error::ServiceError;
use crate::records::{load_all, load_product};
use crate::store::{Collection, RecordStore, WriteBatch, allocate_id};

/// Editable product fields. Stock and average cost only change through postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub barcode: Option<String>,
    pub sale_price: Money,
}

#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> CatalogService<S>
where
    S: RecordStore,
{
    pub async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        load_all(&self.store, Collection::Products).await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        Ok(load_product(&self.store, id).await?.value)
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Product>, ServiceError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list_products()
            .await?
            .into_iter()
            .find(|p| p.barcode() == Some(barcode)))
    }

    /// Create a product with zero stock and zero average cost.
    #[instrument(skip(self), err)]
    pub async fn create_product(&self, details: ProductDetails) -> Result<Product, ServiceError> {
        let mut batch = WriteBatch::new();
        let id = ProductId::new(allocate_id(&self.store, Collection::Products, &mut batch).await?);

        let mut product = Product::empty(id);
        product.execute(&ProductCommand::CreateProduct(CreateProduct {
            product_id: id,
            name: details.name,
            barcode: details.barcode,
            sale_price: details.sale_price,
            occurred_at: Utc::now(),
        }))?;
        self.ensure_unique_barcode(&product).await?;

        batch.put_typed(Collection::Products, ExpectedVersion::Exact(0), &product)?;
        self.store.commit(batch).await?;

        info!(product_id = %id, "product created");
        Ok(product)
    }

    /// Update name, barcode and sale price; stock and average cost are kept.
    #[instrument(skip(self), err)]
    pub async fn update_product(&self, id: ProductId, details: ProductDetails) -> Result<Product, ServiceError> {
        let mut loaded = load_product(&self.store, id).await?;
        loaded.value.execute(&ProductCommand::UpdateProductDetails(UpdateProductDetails {
            product_id: id,
            name: details.name,
            barcode: details.barcode,
            sale_price: details.sale_price,
            occurred_at: Utc::now(),
        }))?;
        self.ensure_unique_barcode(&loaded.value).await?;

        let mut batch = WriteBatch::new();
        batch.put_typed(
            Collection::Products,
            ExpectedVersion::Exact(loaded.revision),
            &loaded.value,
        )?;
        self.store.commit(batch).await?;

        info!(product_id = %id, "product updated");
        Ok(loaded.value)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        let loaded = load_product(&self.store, id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(Collection::Products, id.0.into(), ExpectedVersion::Exact(loaded.revision));
        self.store.commit(batch).await?;

        info!(product_id = %id, "product deleted");
        Ok(())
    }

    async fn ensure_unique_barcode(&self, product: &Product) -> Result<(), ServiceError> {
        let Some(barcode) = product.barcode() else {
            return Ok(());
        };
        if let Some(existing) = self.find_by_barcode(barcode).await? {
            if existing.id_typed() != product.id_typed() {
                return Err(DomainError::conflict(format!(
                    "barcode '{barcode}' is already used by product {}",
                    existing.id_typed()
                ))
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn details(name: &str, barcode: Option<&str>, price: i64) -> ProductDetails {
        ProductDetails {
            name: name.to_string(),
            barcode: barcode.map(str::to_string),
            sale_price: Money::from_minor(price),
        }
    }

    #[tokio::test]
    async fn create_get_list() {
        let catalog = CatalogService::new(InMemoryStore::new());
        let a = catalog.create_product(details("Rice", Some("111"), 3000)).await.unwrap();
        let b = catalog.create_product(details("Sugar", None, 2500)).await.unwrap();

        assert_eq!(a.id_typed(), ProductId::from(1));
        assert_eq!(b.id_typed(), ProductId::from(2));
        assert_eq!(a.quantity(), 0);
        assert_eq!(a.avg_cost(), Money::ZERO);

        let listed = catalog.list_products().await.unwrap();
        assert_eq!(listed, vec![a.clone(), b]);
        assert_eq!(catalog.get_product(a.id_typed()).await.unwrap(), a);
    }

    #[tokio::test]
    async fn duplicate_barcode_is_a_conflict() {
        let catalog = CatalogService::new(InMemoryStore::new());
        catalog.create_product(details("Rice", Some("111"), 3000)).await.unwrap();

        let err = catalog
            .create_product(details("Other rice", Some(" 111 "), 2900))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(catalog.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn products_without_barcode_never_collide() {
        let catalog = CatalogService::new(InMemoryStore::new());
        catalog.create_product(details("Tomatoes", None, 900)).await.unwrap();
        catalog.create_product(details("Onions", Some(""), 700)).await.unwrap();
        assert_eq!(catalog.list_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_keeps_own_barcode_and_rejects_taken_one() {
        let catalog = CatalogService::new(InMemoryStore::new());
        let rice = catalog.create_product(details("Rice", Some("111"), 3000)).await.unwrap();
        catalog.create_product(details("Sugar", Some("222"), 2500)).await.unwrap();

        let updated = catalog
            .update_product(rice.id_typed(), details("Rice 5kg", Some("111"), 14_000))
            .await
            .unwrap();
        assert_eq!(updated.name(), "Rice 5kg");

        let err = catalog
            .update_product(rice.id_typed(), details("Rice", Some("222"), 3000))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_barcode_and_delete() {
        let catalog = CatalogService::new(InMemoryStore::new());
        let rice = catalog.create_product(details("Rice", Some("111"), 3000)).await.unwrap();

        let found = catalog.find_by_barcode("111").await.unwrap();
        assert_eq!(found.map(|p| p.id_typed()), Some(rice.id_typed()));
        assert!(catalog.find_by_barcode("999").await.unwrap().is_none());

        catalog.delete_product(rice.id_typed()).await.unwrap();
        assert!(matches!(
            catalog.get_product(rice.id_typed()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete_product(rice.id_typed()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_details_write_nothing() {
        let catalog = CatalogService::new(InMemoryStore::new());
        let err = catalog.create_product(details(" ", None, 100)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = catalog.create_product(details("Salt", None, -1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        assert!(catalog.list_products().await.unwrap().is_empty());
    }
}
