use serde::{Deserialize, Serialize};

use crate::api::{ListingId, ListingStatus, UserId, VehicleCapacity, VehicleType};

/// The slice of a listing this core needs from the listing management
/// collaborator. Read-only here; listing CRUD lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: ListingId,
    pub owner_id: UserId,
    pub status: ListingStatus,
    pub approx_total_cars: u32,
    pub vehicle_capacity: VehicleCapacity,
    pub hourly_rate: f64,
}

impl ListingRecord {
    /// Slot count for the vehicle type, falling back to the approximate
    /// total car count when the bucket is not declared.
    pub fn capacity_for(&self, vehicle_type: VehicleType) -> u32 {
        self.vehicle_capacity
            .bucket(vehicle_type)
            .unwrap_or(self.approx_total_cars)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingDirectoryError {
    #[error("Listing {0} not found")]
    ListingNotFound(ListingId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait::async_trait]
pub trait ListingDirectory: Send + Sync {
    async fn capacity_for(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
    ) -> Result<u32, ListingDirectoryError>;

    async fn listing_status(
        &self,
        listing_id: &ListingId,
    ) -> Result<ListingStatus, ListingDirectoryError>;

    async fn listing_owner(&self, listing_id: &ListingId) -> Result<UserId, ListingDirectoryError>;

    async fn listings_owned_by(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<ListingId>, ListingDirectoryError>;

    async fn hourly_rate(&self, listing_id: &ListingId) -> Result<f64, ListingDirectoryError>;
}

#[derive(Default)]
pub struct InMemoryListingDirectory {
    listings: parking_lot::RwLock<std::collections::HashMap<ListingId, ListingRecord>>,
}

impl InMemoryListingDirectory {
    pub fn insert_listing(&self, record: ListingRecord) {
        self.listings.write().insert(record.id.clone(), record);
    }

    fn get(&self, listing_id: &ListingId) -> Result<ListingRecord, ListingDirectoryError> {
        self.listings
            .read()
            .get(listing_id)
            .cloned()
            .ok_or_else(|| ListingDirectoryError::ListingNotFound(listing_id.clone()))
    }
}

#[async_trait::async_trait]
impl ListingDirectory for InMemoryListingDirectory {
    async fn capacity_for(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
    ) -> Result<u32, ListingDirectoryError> {
        Ok(self.get(listing_id)?.capacity_for(vehicle_type))
    }

    async fn listing_status(
        &self,
        listing_id: &ListingId,
    ) -> Result<ListingStatus, ListingDirectoryError> {
        Ok(self.get(listing_id)?.status)
    }

    async fn listing_owner(&self, listing_id: &ListingId) -> Result<UserId, ListingDirectoryError> {
        Ok(self.get(listing_id)?.owner_id)
    }

    async fn listings_owned_by(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<ListingId>, ListingDirectoryError> {
        Ok(self
            .listings
            .read()
            .values()
            .filter(|record| record.owner_id == *owner_id)
            .map(|record| record.id.clone())
            .collect())
    }

    async fn hourly_rate(&self, listing_id: &ListingId) -> Result<f64, ListingDirectoryError> {
        Ok(self.get(listing_id)?.hourly_rate)
    }
}

/// Resolves listings from the listing management service over HTTP.
pub struct HttpListingDirectory {
    listings_service_url: String,
    client: reqwest_middleware::ClientWithMiddleware,
}

impl HttpListingDirectory {
    pub fn new(listings_service_url: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = reqwest_middleware::ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(reqwest_tracing::TracingMiddleware::default())
            .build();

        Ok(Self {
            listings_service_url: listings_service_url.to_string(),
            client,
        })
    }

    /// Calls GET /api/listing/{listing_id} endpoint of the listing service
    async fn fetch_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<ListingRecord, ListingDirectoryError> {
        use anyhow::Context;

        let response = self
            .client
            .get(format!(
                "{}/api/listing/{}",
                self.listings_service_url, listing_id
            ))
            .send()
            .await
            .context("Failed to get listing")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ListingDirectoryError::ListingNotFound(listing_id.clone()));
        }
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to get listing {}", response.status()).into());
        }

        Ok(response
            .json()
            .await
            .context("Failed to deserialize listing")?)
    }
}

#[async_trait::async_trait]
impl ListingDirectory for HttpListingDirectory {
    async fn capacity_for(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
    ) -> Result<u32, ListingDirectoryError> {
        Ok(self.fetch_listing(listing_id).await?.capacity_for(vehicle_type))
    }

    async fn listing_status(
        &self,
        listing_id: &ListingId,
    ) -> Result<ListingStatus, ListingDirectoryError> {
        Ok(self.fetch_listing(listing_id).await?.status)
    }

    async fn listing_owner(&self, listing_id: &ListingId) -> Result<UserId, ListingDirectoryError> {
        Ok(self.fetch_listing(listing_id).await?.owner_id)
    }

    async fn listings_owned_by(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<ListingId>, ListingDirectoryError> {
        use anyhow::Context;

        let response = self
            .client
            .get(format!(
                "{}/api/provider/{}/listings",
                self.listings_service_url, owner_id
            ))
            .send()
            .await
            .context("Failed to list provider listings")?;

        if !response.status().is_success() {
            return Err(
                anyhow::anyhow!("Failed to list provider listings {}", response.status()).into(),
            );
        }

        Ok(response
            .json()
            .await
            .context("Failed to deserialize listing ids")?)
    }

    async fn hourly_rate(&self, listing_id: &ListingId) -> Result<f64, ListingDirectoryError> {
        Ok(self.fetch_listing(listing_id).await?.hourly_rate)
    }
}
