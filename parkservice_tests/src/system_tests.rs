use chrono::{Duration, Utc};
use rand::{thread_rng, Rng};

use parkservice_bookings::api::{BookingRequest, BookingStatus, VehicleType};
use parkservice_bookings::client::ParkServiceBookingsClient;

const DEMO_LISTING: &str = "lst-demo-basement";
const DEMO_DRIVER: &str = "usr-demo-driver";
const DEMO_PROVIDER: &str = "usr-demo-provider";

/// A far-future window nothing else in the store overlaps with, so the test
/// can be re-run against the same instance.
fn fresh_window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    let start = Utc::now() + Duration::days(thread_rng().gen_range(30..100_000));
    (start, start + Duration::hours(2))
}

#[tokio::test]
#[ignore = "requires a running parkservice_bookings instance with demo seed data"]
/// Full booking flow against a live service
/// 1. Quotes a price for a window
/// 2. Creates a booking for the quoted window
/// 3. Gets the booking by id and scans it by short code
/// 4. Confirms the payment record was written with it
/// 5. Sees it in the driver's and the provider's booking lists
/// 6. Reads the provider dashboard
/// 7. Cancels the booking and books the freed window again
async fn parkservice_bookings_e2e_test() {
    let parkservice_bookings_url = "http://127.0.0.1:8080";
    let client =
        ParkServiceBookingsClient::new(parkservice_bookings_url).expect("Failed to create client");

    let (start_time, end_time) = fresh_window();

    // QUOTE
    let quote = client
        .quote(
            &DEMO_LISTING.to_string(),
            VehicleType::FourSeater,
            start_time,
            end_time,
        )
        .await
        .expect("Failed to get quote");
    assert_eq!(quote.total_hours, 2.0);
    assert!(quote.total_amount > 0.0);

    // CREATE BOOKING
    let request = BookingRequest {
        listing_id: DEMO_LISTING.to_string(),
        requester_id: DEMO_DRIVER.to_string(),
        vehicle_type: VehicleType::FourSeater,
        start_time,
        end_time,
        total_amount: quote.total_amount,
    };
    let booking = client
        .create_booking(&request)
        .await
        .expect("Failed to create booking")
        .expect("No slot free for a fresh window");
    assert_eq!(booking.status, BookingStatus::Booked);
    assert!(booking.code.starts_with("PK-"));

    // GET BY ID
    let fetched = client
        .get_booking(&booking.id)
        .await
        .expect("Failed to get booking")
        .expect("Booking not found");
    assert_eq!(fetched, booking);

    // SCAN BY SHORT CODE
    let scanned = client
        .scan_booking(&booking.code)
        .await
        .expect("Failed to scan booking")
        .expect("Booking not found by code");
    assert_eq!(scanned.id, booking.id);

    // PAYMENT RECORD
    let payment = client
        .get_booking_payment(&booking.id)
        .await
        .expect("Failed to get payment")
        .expect("Payment record missing");
    assert_eq!(payment.booking_id, booking.id);
    assert_eq!(payment.status, "SUCCESS");

    // DRIVER AND PROVIDER LISTS
    let driver_bookings = client
        .list_user_bookings(&DEMO_DRIVER.to_string())
        .await
        .expect("Failed to list driver bookings");
    assert!(driver_bookings.iter().any(|b| b.id == booking.id));

    let provider_bookings = client
        .list_provider_bookings(&DEMO_PROVIDER.to_string())
        .await
        .expect("Failed to list provider bookings");
    assert!(provider_bookings.iter().any(|b| b.id == booking.id));

    // DASHBOARD
    let stats = client
        .provider_dashboard(&DEMO_PROVIDER.to_string())
        .await
        .expect("Failed to get dashboard");
    assert!(stats.listing_count >= 1);
    assert!(stats.active_booking_count >= 1);
    assert!(stats.total_earnings >= booking.total_amount);

    // CANCEL, THEN THE WINDOW IS FREE AGAIN
    let cancelled = client
        .set_booking_status(&booking.id, BookingStatus::Cancelled)
        .await
        .expect("Failed to cancel booking")
        .expect("Booking not found for cancel");
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let rebooked = client
        .create_booking(&request)
        .await
        .expect("Failed to rebook")
        .expect("Cancelled booking should free its slot");
    assert_ne!(rebooked.id, booking.id);
}

#[tokio::test]
#[ignore = "requires a running parkservice_bookings instance with demo seed data"]
/// Unknown ids surface as not-found, not as errors
async fn parkservice_bookings_not_found_test() {
    let parkservice_bookings_url = "http://127.0.0.1:8080";
    let client =
        ParkServiceBookingsClient::new(parkservice_bookings_url).expect("Failed to create client");

    assert!(client
        .get_booking(&"no-such-booking".to_string())
        .await
        .expect("Failed to get booking")
        .is_none());
    assert!(client
        .scan_booking("PK-NOSUCH")
        .await
        .expect("Failed to scan booking")
        .is_none());
    assert!(client
        .set_booking_status(&"no-such-booking".to_string(), BookingStatus::Cancelled)
        .await
        .expect("Failed to call set status")
        .is_none());
}
