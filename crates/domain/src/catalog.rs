//! Product and location reference data.

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{LocationId, ProductId};
use store::{InventoryStore, Location, NewLocation, NewProduct, Product};

use crate::error::{DomainError, Result};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=255;
const BARCODE_LENGTH: usize = 13;

/// Great-circle distance between two coordinates, in meters.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Catalog of products and locations.
pub struct Catalog<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a product after validating its name and barcode.
    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        validate_name(&product.name)?;
        if let Some(barcode) = &product.barcode {
            validate_barcode(barcode)?;
        }

        let product = self.store.insert_product(product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Products matching any of the given ids or barcodes.
    ///
    /// With both filters empty every product is returned.
    #[tracing::instrument(skip(self))]
    pub async fn find_products(
        &self,
        ids: &[ProductId],
        barcodes: &[String],
    ) -> Result<BTreeMap<ProductId, Product>> {
        let products = if ids.is_empty() && barcodes.is_empty() {
            self.store.list_products().await?
        } else {
            self.store.find_products(ids, barcodes).await?
        };
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_location(&self, location: NewLocation) -> Result<Location> {
        validate_name(&location.name)?;
        validate_coordinates(location.latitude, location.longitude)?;
        if !(location.radius.is_finite() && location.radius > 0.0) {
            return Err(DomainError::Validation(format!(
                "radius must be positive, got {}",
                location.radius
            )));
        }

        let location = self.store.insert_location(location).await?;
        tracing::info!(location_id = %location.id, "location created");
        Ok(location)
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        Ok(self.store.list_locations().await?)
    }

    pub async fn get_location(&self, id: LocationId) -> Result<Location> {
        self.store
            .get_location(id)
            .await?
            .ok_or_else(|| DomainError::not_found("location", id))
    }

    /// The location whose circle contains the point, nearest center first.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_location(&self, latitude: f64, longitude: f64) -> Result<Option<Location>> {
        validate_coordinates(latitude, longitude)?;

        let nearest = self
            .store
            .list_locations()
            .await?
            .into_iter()
            .map(|loc| {
                let distance = distance_meters(latitude, longitude, loc.latitude, loc.longitude);
                (distance, loc)
            })
            .filter(|(distance, loc)| *distance <= loc.radius)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, loc)| loc);
        Ok(nearest)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let length = name.trim().chars().count();
    if !NAME_LENGTH.contains(&length) {
        return Err(DomainError::Validation(format!(
            "name must be between {} and {} characters",
            NAME_LENGTH.start(),
            NAME_LENGTH.end()
        )));
    }
    Ok(())
}

fn validate_barcode(barcode: &str) -> Result<()> {
    if barcode.len() != BARCODE_LENGTH || !barcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::Validation(format!(
            "barcode must be {BARCODE_LENGTH} digits, got {barcode:?}"
        )));
    }
    Ok(())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(DomainError::Validation(format!(
            "latitude must be within [-90, 90], got {latitude}"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(DomainError::Validation(format!(
            "longitude must be within [-180, 180], got {longitude}"
        )));
    }
    Ok(())
}
