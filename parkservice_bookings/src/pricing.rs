/// Surge multiplier for a slot bucket at the given occupancy.
/// Above 90% occupancy the rate doubles, above 70% it goes up by half.
pub fn surge_multiplier(occupied: u32, total: u32) -> f64 {
    if total == 0 {
        return 1.0;
    }

    let occupancy_rate = occupied as f64 / total as f64;

    if occupancy_rate > 0.9 {
        2.0
    } else if occupancy_rate > 0.7 {
        1.5
    } else {
        1.0
    }
}

/// Flat high-demand markup on a base hourly rate.
pub fn dynamic_price(base_rate: f64, high_demand: bool) -> f64 {
    if high_demand {
        base_rate * 1.5
    } else {
        base_rate
    }
}
