use anyhow::{bail, Context};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::api::{
    Booking, BookingId, BookingRequest, BookingStatus, DashboardStats, ListingId, PaymentRecord,
    Quote, StatusUpdateRequest, UserId, VehicleType,
};

pub struct ParkServiceBookingsClient {
    url: String,
    client: ClientWithMiddleware,
}

impl ParkServiceBookingsClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls POST /api/booking endpoint
    /// Returns the created booking,
    /// None if the listing had no free slot for the window
    /// and error in case of any other failure
    pub async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> anyhow::Result<Option<Booking>> {
        let response = self
            .client
            .post(format!("{}/api/booking", self.url))
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to create booking {}", error)
        }
    }

    /// Calls GET /api/booking/{booking_id} endpoint
    /// Returns booking details if the booking was present
    /// None if the booking was not in the store
    /// and error in case of any other failure
    pub async fn get_booking(&self, booking_id: &BookingId) -> anyhow::Result<Option<Booking>> {
        let response = self
            .client
            .get(format!("{}/api/booking/{}", self.url, booking_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to get booking {}", error)
        }
    }

    /// Calls GET /api/booking/scan/{code_or_id} endpoint
    pub async fn scan_booking(&self, code_or_id: &str) -> anyhow::Result<Option<Booking>> {
        let response = self
            .client
            .get(format!("{}/api/booking/scan/{}", self.url, code_or_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to scan booking {}", error)
        }
    }

    /// Calls POST /api/booking/{booking_id}/status endpoint
    pub async fn set_booking_status(
        &self,
        booking_id: &BookingId,
        status: BookingStatus,
    ) -> anyhow::Result<Option<Booking>> {
        let response = self
            .client
            .post(format!("{}/api/booking/{}/status", self.url, booking_id))
            .json(&StatusUpdateRequest { status })
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to set booking status {}", error)
        }
    }

    /// Calls GET /api/booking/{booking_id}/payment endpoint
    pub async fn get_booking_payment(
        &self,
        booking_id: &BookingId,
    ) -> anyhow::Result<Option<PaymentRecord>> {
        let response = self
            .client
            .get(format!("{}/api/booking/{}/payment", self.url, booking_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to get booking payment {}", error)
        }
    }

    /// Calls GET /api/user/{user_id}/bookings endpoint
    pub async fn list_user_bookings(&self, user_id: &UserId) -> anyhow::Result<Vec<Booking>> {
        let response = self
            .client
            .get(format!("{}/api/user/{}/bookings", self.url, user_id))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to list bookings {}", error)
        }
    }

    /// Calls GET /api/provider/{provider_id}/bookings endpoint
    pub async fn list_provider_bookings(
        &self,
        provider_id: &UserId,
    ) -> anyhow::Result<Vec<Booking>> {
        let response = self
            .client
            .get(format!(
                "{}/api/provider/{}/bookings",
                self.url, provider_id
            ))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to list provider bookings {}", error)
        }
    }

    /// Calls GET /api/provider/{provider_id}/dashboard endpoint
    pub async fn provider_dashboard(
        &self,
        provider_id: &UserId,
    ) -> anyhow::Result<DashboardStats> {
        let response = self
            .client
            .get(format!(
                "{}/api/provider/{}/dashboard",
                self.url, provider_id
            ))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to get provider dashboard {}", error)
        }
    }

    /// Calls GET /api/quote endpoint
    pub async fn quote(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> anyhow::Result<Quote> {
        let response = self
            .client
            .get(format!("{}/api/quote", self.url))
            .query(&[
                ("listing_id", listing_id.as_str()),
                ("vehicle_type", vehicle_type.as_str()),
                (
                    "start_time",
                    &start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                (
                    "end_time",
                    &end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
            ])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.json().await.unwrap_or_default();
            bail!("Failed to get quote {}", error)
        }
    }
}
