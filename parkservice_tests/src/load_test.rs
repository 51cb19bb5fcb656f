use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{thread_rng, Rng};

use parkservice_bookings::api::{BookingRequest, VehicleType};
use parkservice_bookings::client::ParkServiceBookingsClient;

// Matches the four-seater bucket of the seeded lst-demo-basement listing
const SEEDED_FOUR_SEATER_CAPACITY: usize = 3;
const NO_OF_CONCURRENT_REQUESTS: usize = 10;
const NO_OF_ROUNDS: usize = 5;

#[tokio::test]
#[ignore = "requires a running parkservice_bookings instance with demo seed data"]
/// Fires batches of concurrent reservations for one window at the seeded
/// listing and checks that exactly the declared capacity is admitted in
/// every round
async fn concurrent_reservations_admit_exactly_the_capacity() {
    let parkservice_bookings_url = "http://127.0.0.1:8080";
    let client = Arc::new(
        ParkServiceBookingsClient::new(parkservice_bookings_url).expect("Failed to create client"),
    );

    for round in 0..NO_OF_ROUNDS {
        // A distinct far-future window per round so rounds do not interfere
        let start_time =
            Utc::now() + Duration::days(thread_rng().gen_range(30..100_000)) + Duration::hours(12);
        let end_time = start_time + Duration::hours(1);

        let mut handles = Vec::new();
        for _ in 0..NO_OF_CONCURRENT_REQUESTS {
            let client = client.clone();
            let request = BookingRequest {
                listing_id: "lst-demo-basement".to_string(),
                requester_id: "usr-demo-driver".to_string(),
                vehicle_type: VehicleType::FourSeater,
                start_time,
                end_time,
                total_amount: 80.0,
            };
            handles.push(tokio::spawn(async move {
                client
                    .create_booking(&request)
                    .await
                    .expect("Failed to create booking")
            }));
        }

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.expect("Reservation task panicked") {
                Some(_) => admitted += 1,
                None => rejected += 1,
            }
        }

        println!(
            "Round {}: admitted {} rejected {}",
            round, admitted, rejected
        );
        assert_eq!(admitted, SEEDED_FOUR_SEATER_CAPACITY);
        assert_eq!(
            rejected,
            NO_OF_CONCURRENT_REQUESTS - SEEDED_FOUR_SEATER_CAPACITY
        );
    }
}
