use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{ListingId, VehicleType};

/// One mutex per (listing, vehicle type) pair. An admission decision holds
/// its pair's mutex across the overlap read and the booking insert, so two
/// requests for the same pair can never both pass the capacity check.
/// Different pairs run in parallel.
#[derive(Default)]
pub struct AdmissionLocks {
    locks: parking_lot::Mutex<HashMap<(ListingId, VehicleType), Arc<tokio::sync::Mutex<()>>>>,
}

impl AdmissionLocks {
    pub fn lock_for(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
    ) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry((listing_id.clone(), vehicle_type))
            .or_default()
            .clone()
    }
}
