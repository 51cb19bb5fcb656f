use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::api::{Booking, BookingId, BookingStatus, ListingId, PaymentRecord, UserId, VehicleType};
use crate::bookings_repository::{BookingsRepository, BookingsRepositoryError};

#[derive(Default)]
struct InMemoryState {
    bookings: HashMap<BookingId, Booking>,
    payments: HashMap<BookingId, PaymentRecord>,
    codes: HashSet<String>,
    references: HashSet<String>,
}

/// Keeps the whole store behind a single lock so the booking/payment pair
/// insert is atomic.
#[derive(Default)]
pub struct InMemoryBookingsRepository {
    state: parking_lot::RwLock<InMemoryState>,
}

#[async_trait::async_trait]
impl BookingsRepository for InMemoryBookingsRepository {
    async fn insert_booking_and_payment(
        &self,
        booking: Booking,
        payment: PaymentRecord,
    ) -> Result<(), BookingsRepositoryError> {
        let mut state = self.state.write();

        if state.codes.contains(&booking.code) || state.references.contains(&payment.reference) {
            return Err(BookingsRepositoryError::CodeTaken);
        }

        state.codes.insert(booking.code.clone());
        state.references.insert(payment.reference.clone());
        state.payments.insert(booking.id.clone(), payment);
        state.bookings.insert(booking.id.clone(), booking);
        Ok(())
    }

    async fn find_overlapping(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingsRepositoryError> {
        Ok(self
            .state
            .read()
            .bookings
            .values()
            .filter(|booking| {
                booking.listing_id == *listing_id
                    && booking.vehicle_type == vehicle_type
                    && booking.status != BookingStatus::Cancelled
                    && booking.start_time < end
                    && booking.end_time > start
            })
            .cloned()
            .collect())
    }

    async fn get_booking(&self, id: &BookingId) -> Result<Booking, BookingsRepositoryError> {
        self.state
            .read()
            .bookings
            .get(id)
            .cloned()
            .ok_or_else(|| BookingsRepositoryError::BookingNotFound(id.clone()))
    }

    async fn get_booking_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Booking>, BookingsRepositoryError> {
        Ok(self
            .state
            .read()
            .bookings
            .values()
            .find(|booking| booking.code == code)
            .cloned())
    }

    async fn list_bookings_by_requester(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Booking>, BookingsRepositoryError> {
        Ok(self
            .state
            .read()
            .bookings
            .values()
            .filter(|booking| booking.requester_id == *user_id)
            .cloned()
            .collect())
    }

    async fn list_bookings_for_listings(
        &self,
        listing_ids: &[ListingId],
    ) -> Result<Vec<Booking>, BookingsRepositoryError> {
        Ok(self
            .state
            .read()
            .bookings
            .values()
            .filter(|booking| listing_ids.contains(&booking.listing_id))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &BookingId,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingsRepositoryError> {
        let mut state = self.state.write();

        let booking = state
            .bookings
            .get_mut(id)
            .ok_or_else(|| BookingsRepositoryError::BookingNotFound(id.clone()))?;
        booking.status = status;
        booking.updated_at = now;
        Ok(booking.clone())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, BookingsRepositoryError> {
        Ok(self
            .state
            .read()
            .bookings
            .values()
            .filter(|booking| booking.status == BookingStatus::Booked && booking.end_time <= now)
            .cloned()
            .collect())
    }

    async fn expire_if_booked(
        &self,
        id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, BookingsRepositoryError> {
        let mut state = self.state.write();

        Ok(match state.bookings.get_mut(id) {
            Some(booking) if booking.status == BookingStatus::Booked => {
                booking.status = BookingStatus::Expired;
                booking.updated_at = now;
                true
            }
            _ => false,
        })
    }

    async fn get_payment(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<PaymentRecord>, BookingsRepositoryError> {
        Ok(self.state.read().payments.get(booking_id).cloned())
    }
}
