use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::bookings_repository::BookingsRepository;

const SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Periodic sweep that moves overdue BOOKED bookings to EXPIRED. Runs
/// independently of request handling and shares nothing with it but the
/// store; every run is a fresh scan, so restarts and overlapping runs are
/// harmless.
pub struct BookingExpiryTask {
    bookings: Arc<dyn BookingsRepository>,
    period: Duration,
}

impl BookingExpiryTask {
    pub fn new(bookings: Arc<dyn BookingsRepository>) -> Self {
        Self {
            bookings,
            period: Duration::from_secs(SWEEP_INTERVAL_SECONDS),
        }
    }

    pub fn with_period(bookings: Arc<dyn BookingsRepository>, period: Duration) -> Self {
        Self { bookings, period }
    }

    pub async fn start(self) {
        tracing::info!(
            "Booking expiry sweep started, period {}s",
            self.period.as_secs()
        );
        let mut ticker = tokio::time::interval(self.period);
        loop {
            ticker.tick().await;
            self.run_once(Utc::now()).await;
        }
    }

    /// One idempotent sweep. Row failures are logged and skipped; the sweep
    /// itself never fails.
    pub async fn run_once(&self, now: DateTime<Utc>) {
        let due = match self.bookings.find_due(now).await {
            Ok(due) => due,
            Err(err) => {
                tracing::error!("Expiry sweep failed to list due bookings: {}", err);
                return;
            }
        };

        let mut expired = 0;
        for booking in due {
            match self.bookings.expire_if_booked(&booking.id, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!("Failed to expire booking {}: {}", booking.id, err);
                }
            }
        }
        if expired > 0 {
            tracing::info!("Expired {} overdue bookings", expired);
        }
    }
}

#[cfg(test)]
mod expiry_tests {
    use chrono::TimeZone;

    use crate::api::{Booking, BookingStatus, PaymentRecord, VehicleType};
    use crate::bookings_repository::InMemoryBookingsRepository;

    use super::*;

    fn booking_fixture(id: &str, end: DateTime<Utc>, status: BookingStatus) -> Booking {
        Booking {
            id: id.to_string(),
            code: format!("PK-{}", id.to_uppercase()),
            requester_id: "user-1".to_string(),
            listing_id: "listing-1".to_string(),
            vehicle_type: VehicleType::FourSeater,
            start_time: end - chrono::Duration::hours(2),
            end_time: end,
            total_hours: 2.0,
            total_amount: 80.0,
            status,
            created_at: end - chrono::Duration::days(1),
            updated_at: end - chrono::Duration::days(1),
        }
    }

    fn payment_fixture(booking: &Booking) -> PaymentRecord {
        PaymentRecord {
            id: format!("pay-{}", booking.id),
            booking_id: booking.id.clone(),
            user_id: booking.requester_id.clone(),
            amount: booking.total_amount,
            payment_method: "CARD".to_string(),
            status: "SUCCESS".to_string(),
            reference: format!("TXN-{}", booking.id.to_uppercase()),
            created_at: booking.created_at,
        }
    }

    async fn insert(repository: &InMemoryBookingsRepository, booking: Booking) {
        repository
            .insert_booking_and_payment(booking.clone(), payment_fixture(&booking))
            .await
            .unwrap();
    }

    #[tokio::test]
    /// A booking that ended yesterday expires; a cancelled one with the same
    /// end time and a booking still running are left alone
    async fn test_sweep_expires_only_overdue_booked() {
        let repository = Arc::new(InMemoryBookingsRepository::default());
        let yesterday_end = Utc.with_ymd_and_hms(2024, 5, 9, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 1, 0).unwrap();

        insert(
            &repository,
            booking_fixture("overdue", yesterday_end, BookingStatus::Booked),
        )
        .await;
        insert(
            &repository,
            booking_fixture("cancelled", yesterday_end, BookingStatus::Cancelled),
        )
        .await;
        insert(
            &repository,
            booking_fixture("completed", yesterday_end, BookingStatus::Completed),
        )
        .await;
        insert(
            &repository,
            booking_fixture(
                "running",
                now + chrono::Duration::hours(1),
                BookingStatus::Booked,
            ),
        )
        .await;

        let task = BookingExpiryTask::new(repository.clone());
        task.run_once(now).await;

        assert_eq!(
            repository
                .get_booking(&"overdue".to_string())
                .await
                .unwrap()
                .status,
            BookingStatus::Expired
        );
        assert_eq!(
            repository
                .get_booking(&"cancelled".to_string())
                .await
                .unwrap()
                .status,
            BookingStatus::Cancelled
        );
        assert_eq!(
            repository
                .get_booking(&"completed".to_string())
                .await
                .unwrap()
                .status,
            BookingStatus::Completed
        );
        assert_eq!(
            repository
                .get_booking(&"running".to_string())
                .await
                .unwrap()
                .status,
            BookingStatus::Booked
        );
    }

    #[tokio::test]
    /// Running the sweep twice with the same clock changes nothing the
    /// second time
    async fn test_sweep_is_idempotent() {
        let repository = Arc::new(InMemoryBookingsRepository::default());
        let end = Utc.with_ymd_and_hms(2024, 5, 9, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 1, 0).unwrap();

        insert(
            &repository,
            booking_fixture("overdue", end, BookingStatus::Booked),
        )
        .await;

        let task = BookingExpiryTask::new(repository.clone());
        task.run_once(now).await;
        let after_first = repository.get_booking(&"overdue".to_string()).await.unwrap();
        assert_eq!(after_first.status, BookingStatus::Expired);

        task.run_once(now).await;
        let after_second = repository.get_booking(&"overdue".to_string()).await.unwrap();
        assert_eq!(after_second, after_first);
    }
}
