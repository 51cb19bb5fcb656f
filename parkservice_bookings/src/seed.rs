use crate::api::{ListingStatus, VehicleCapacity};
use crate::identity_directory::InMemoryIdentityDirectory;
use crate::listing_directory::{InMemoryListingDirectory, ListingRecord};

/// Demo identities and listings for the standalone in-memory mode. Ids are
/// stable so clients and the e2e tests can refer to them.
pub fn seed_demo_data(
    listings: &InMemoryListingDirectory,
    identities: &InMemoryIdentityDirectory,
) {
    for user_id in ["usr-demo-driver", "usr-demo-provider"] {
        identities.register(user_id.to_string());
    }

    listings.insert_listing(ListingRecord {
        id: "lst-demo-basement".to_string(),
        owner_id: "usr-demo-provider".to_string(),
        status: ListingStatus::Approved,
        approx_total_cars: 10,
        vehicle_capacity: VehicleCapacity {
            two_wheeler: Some(4),
            four_seater: Some(3),
            six_seater: Some(2),
            suv: Some(1),
        },
        hourly_rate: 40.0,
    });
    listings.insert_listing(ListingRecord {
        id: "lst-demo-open-yard".to_string(),
        owner_id: "usr-demo-provider".to_string(),
        status: ListingStatus::Approved,
        approx_total_cars: 6,
        vehicle_capacity: VehicleCapacity::default(),
        hourly_rate: 25.0,
    });

    tracing::info!(
        "Seeded demo data: users usr-demo-driver, usr-demo-provider; \
         listings lst-demo-basement, lst-demo-open-yard"
    );
}
