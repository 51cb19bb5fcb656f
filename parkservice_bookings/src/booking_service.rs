use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::admission_locks::AdmissionLocks;
use crate::api::{
    Booking, BookingId, BookingRequest, BookingStatus, DashboardStats, ListingId, ListingStatus,
    PaymentRecord, Quote, UserId, VehicleType,
};
use crate::bookings_repository::{BookingsRepository, BookingsRepositoryError};
use crate::listing_directory::{ListingDirectory, ListingDirectoryError};
use crate::identity_directory::IdentityDirectory;
use crate::pricing;

const BOOKING_CODE_ATTEMPTS: usize = 5;
const ADMISSION_RETRY_ATTEMPTS: usize = 3;
const ADMISSION_RETRY_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum BookingServiceError {
    #[error("Listing {0} not found")]
    ListingNotFound(ListingId),

    #[error("Listing {0} is not open for booking")]
    ListingNotApproved(ListingId),

    #[error("Requester {0} not found")]
    RequesterNotFound(UserId),

    #[error("Booking {0} not found")]
    BookingNotFound(String),

    #[error("Invalid time window: start must be before end")]
    InvalidWindow,

    #[error("Invalid amount: must not be negative")]
    InvalidAmount,

    #[error("No free {} slot in listing {listing_id} for the requested window", vehicle_type.as_str())]
    CapacityExceeded {
        listing_id: ListingId,
        vehicle_type: VehicleType,
    },

    #[error(transparent)]
    Repository(#[from] BookingsRepositoryError),

    #[error("Listing directory failure: {0}")]
    Directory(ListingDirectoryError),

    #[error(transparent)]
    Identity(#[from] anyhow::Error),
}

fn map_listing_error(err: ListingDirectoryError) -> BookingServiceError {
    match err {
        ListingDirectoryError::ListingNotFound(id) => BookingServiceError::ListingNotFound(id),
        other => BookingServiceError::Directory(other),
    }
}

fn map_booking_not_found(err: BookingsRepositoryError) -> BookingServiceError {
    match err {
        BookingsRepositoryError::BookingNotFound(id) => BookingServiceError::BookingNotFound(id),
        other => BookingServiceError::Repository(other),
    }
}

fn generate_booking_code() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("PK-{}", uuid[..8].to_uppercase())
}

fn generate_payment_reference() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("TXN-{}", uuid[..10].to_uppercase())
}

fn ceil_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    ((end - start).num_seconds() as f64 / 3600.0).ceil()
}

/// Admission checks and the reservation lifecycle over a shared bookings
/// store. Capacity and listing/requester existence come from the external
/// directories; this service owns everything between "may this booking be
/// admitted" and "the booking and its payment are stored".
pub struct BookingService {
    bookings: Arc<dyn BookingsRepository>,
    listings: Arc<dyn ListingDirectory>,
    identities: Arc<dyn IdentityDirectory>,
    admission_locks: AdmissionLocks,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingsRepository>,
        listings: Arc<dyn ListingDirectory>,
        identities: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            bookings,
            listings,
            identities,
            admission_locks: AdmissionLocks::default(),
        }
    }

    /// Admits a new booking if the (listing, vehicle type) pair has a free
    /// slot for the whole window, and stores it together with its payment
    /// record. The overlap check and the insert run under the pair's
    /// admission lock, so concurrent requests cannot oversubscribe a slot.
    pub async fn reserve(&self, request: BookingRequest) -> Result<Booking, BookingServiceError> {
        if request.start_time >= request.end_time {
            return Err(BookingServiceError::InvalidWindow);
        }
        if request.total_amount < 0.0 {
            return Err(BookingServiceError::InvalidAmount);
        }

        let status = self
            .listings
            .listing_status(&request.listing_id)
            .await
            .map_err(map_listing_error)?;
        if status != ListingStatus::Approved {
            return Err(BookingServiceError::ListingNotApproved(
                request.listing_id.clone(),
            ));
        }
        if !self.identities.identity_exists(&request.requester_id).await? {
            return Err(BookingServiceError::RequesterNotFound(
                request.requester_id.clone(),
            ));
        }
        let capacity = self
            .listings
            .capacity_for(&request.listing_id, request.vehicle_type)
            .await
            .map_err(map_listing_error)?;

        let pair_lock = self
            .admission_locks
            .lock_for(&request.listing_id, request.vehicle_type);
        let _admission = pair_lock.lock().await;

        let mut backoff = ADMISSION_RETRY_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.try_admit(&request, capacity).await {
                Err(BookingServiceError::Repository(BookingsRepositoryError::Conflict))
                    if attempt < ADMISSION_RETRY_ATTEMPTS =>
                {
                    tracing::warn!(
                        "Admission write conflict for listing {}, attempt {}",
                        request.listing_id,
                        attempt
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_admit(
        &self,
        request: &BookingRequest,
        capacity: u32,
    ) -> Result<Booking, BookingServiceError> {
        let overlapping = self
            .bookings
            .find_overlapping(
                &request.listing_id,
                request.vehicle_type,
                request.start_time,
                request.end_time,
            )
            .await?;
        if overlapping.len() as u32 >= capacity {
            return Err(BookingServiceError::CapacityExceeded {
                listing_id: request.listing_id.clone(),
                vehicle_type: request.vehicle_type,
            });
        }

        let now = Utc::now();
        for _ in 0..BOOKING_CODE_ATTEMPTS {
            let booking = Booking {
                id: Uuid::new_v4().to_string(),
                code: generate_booking_code(),
                requester_id: request.requester_id.clone(),
                listing_id: request.listing_id.clone(),
                vehicle_type: request.vehicle_type,
                start_time: request.start_time,
                end_time: request.end_time,
                total_hours: ceil_hours(request.start_time, request.end_time),
                total_amount: request.total_amount,
                status: BookingStatus::Booked,
                created_at: now,
                updated_at: now,
            };
            // Payment is simulated: the record settles as a success without
            // ever contacting a processor
            let payment = PaymentRecord {
                id: Uuid::new_v4().to_string(),
                booking_id: booking.id.clone(),
                user_id: request.requester_id.clone(),
                amount: request.total_amount,
                payment_method: "CARD".to_string(),
                status: "SUCCESS".to_string(),
                reference: generate_payment_reference(),
                created_at: now,
            };

            match self
                .bookings
                .insert_booking_and_payment(booking.clone(), payment)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        "Admitted booking {} ({}) for listing {}",
                        booking.id,
                        booking.code,
                        booking.listing_id
                    );
                    return Ok(booking);
                }
                Err(BookingsRepositoryError::CodeTaken) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(BookingsRepositoryError::Other(
            "Failed to generate a unique booking code".to_string(),
        )
        .into())
    }

    pub async fn get_booking(&self, id: &BookingId) -> Result<Booking, BookingServiceError> {
        self.bookings
            .get_booking(id)
            .await
            .map_err(map_booking_not_found)
    }

    pub async fn get_booking_by_code(&self, code: &str) -> Result<Booking, BookingServiceError> {
        self.bookings
            .get_booking_by_code(code)
            .await?
            .ok_or_else(|| BookingServiceError::BookingNotFound(code.to_string()))
    }

    /// On-site verification lookup: tries the short code first, then the
    /// primary id.
    pub async fn scan(&self, code_or_id: &str) -> Result<Booking, BookingServiceError> {
        if let Some(booking) = self.bookings.get_booking_by_code(code_or_id).await? {
            return Ok(booking);
        }
        self.bookings
            .get_booking(&code_or_id.to_string())
            .await
            .map_err(map_booking_not_found)
    }

    pub async fn list_for_requester(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Booking>, BookingServiceError> {
        Ok(self.bookings.list_bookings_by_requester(user_id).await?)
    }

    /// All bookings across the owner's listings.
    pub async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<Booking>, BookingServiceError> {
        let listings = self
            .listings
            .listings_owned_by(owner_id)
            .await
            .map_err(map_listing_error)?;
        Ok(self.bookings.list_bookings_for_listings(&listings).await?)
    }

    /// Overwrites the status. Callers are trusted to respect the lifecycle
    /// (BOOKED may move to CANCELLED, COMPLETED or EXPIRED; the rest are
    /// terminal); nothing is enforced here.
    pub async fn set_status(
        &self,
        id: &BookingId,
        status: BookingStatus,
    ) -> Result<Booking, BookingServiceError> {
        self.bookings
            .update_status(id, status, Utc::now())
            .await
            .map_err(map_booking_not_found)
    }

    pub async fn payment_for_booking(
        &self,
        id: &BookingId,
    ) -> Result<PaymentRecord, BookingServiceError> {
        let booking = self.get_booking(id).await?;
        self.bookings.get_payment(&booking.id).await?.ok_or_else(|| {
            BookingsRepositoryError::Other(format!("Booking {} has no payment record", id)).into()
        })
    }

    /// Owner-facing aggregate, recomputed on every call.
    pub async fn dashboard_stats(
        &self,
        owner_id: &UserId,
    ) -> Result<DashboardStats, BookingServiceError> {
        let listings = self
            .listings
            .listings_owned_by(owner_id)
            .await
            .map_err(map_listing_error)?;
        let bookings = self.bookings.list_bookings_for_listings(&listings).await?;

        Ok(DashboardStats {
            listing_count: listings.len() as u64,
            active_booking_count: bookings
                .iter()
                .filter(|booking| booking.status == BookingStatus::Booked)
                .count() as u64,
            total_earnings: bookings.iter().map(|booking| booking.total_amount).sum(),
        })
    }

    /// Advisory price for a window, from the listing's hourly rate and the
    /// surge multiplier at the window's current occupancy. The quoted amount
    /// is what callers are expected to pass back into `reserve`.
    pub async fn quote(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Quote, BookingServiceError> {
        if start >= end {
            return Err(BookingServiceError::InvalidWindow);
        }

        let capacity = self
            .listings
            .capacity_for(listing_id, vehicle_type)
            .await
            .map_err(map_listing_error)?;
        let hourly_rate = self
            .listings
            .hourly_rate(listing_id)
            .await
            .map_err(map_listing_error)?;
        let occupied = self
            .bookings
            .find_overlapping(listing_id, vehicle_type, start, end)
            .await?
            .len() as u32;

        let total_hours = ceil_hours(start, end);
        let surge_multiplier = pricing::surge_multiplier(occupied, capacity);
        Ok(Quote {
            total_hours,
            hourly_rate,
            surge_multiplier,
            total_amount: total_hours * hourly_rate * surge_multiplier,
        })
    }
}
