pub use in_memory_bookings_repository::InMemoryBookingsRepository;
pub use postgres_bookings_repository::{
    PostgresBookingsRepository, PostgresBookingsRepositoryConfig,
};

use chrono::{DateTime, Utc};

use crate::api::{Booking, BookingId, BookingStatus, ListingId, PaymentRecord, UserId, VehicleType};

mod in_memory_bookings_repository;
mod postgres_bookings_repository;

#[derive(Debug, thiserror::Error)]
pub enum BookingsRepositoryError {
    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("Booking code or payment reference already taken")]
    CodeTaken,

    #[error("Conflicting concurrent write, safe to retry")]
    Conflict,

    #[error("Database failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait BookingsRepository: Send + Sync {
    /// Persists the booking and its payment record as one atomic unit:
    /// either both become visible or neither does.
    /// Fails with `CodeTaken` if the booking code or payment reference
    /// collides with an existing one.
    async fn insert_booking_and_payment(
        &self,
        booking: Booking,
        payment: PaymentRecord,
    ) -> Result<(), BookingsRepositoryError>;

    /// All non-cancelled bookings of the (listing, vehicle type) pair whose
    /// half-open window intersects `[start, end)`.
    async fn find_overlapping(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingsRepositoryError>;

    async fn get_booking(&self, id: &BookingId) -> Result<Booking, BookingsRepositoryError>;

    async fn get_booking_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Booking>, BookingsRepositoryError>;

    async fn list_bookings_by_requester(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Booking>, BookingsRepositoryError>;

    async fn list_bookings_for_listings(
        &self,
        listing_ids: &[ListingId],
    ) -> Result<Vec<Booking>, BookingsRepositoryError>;

    /// Overwrites the status unconditionally and bumps `updated_at`.
    async fn update_status(
        &self,
        id: &BookingId,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingsRepositoryError>;

    /// BOOKED bookings whose end has passed.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, BookingsRepositoryError>;

    /// Flips the booking to EXPIRED only if it is still BOOKED.
    /// Returns whether a row actually changed.
    async fn expire_if_booked(
        &self,
        id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, BookingsRepositoryError>;

    async fn get_payment(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<PaymentRecord>, BookingsRepositoryError>;
}
