use chrono::{DateTime, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type ListingId = String;
pub type BookingId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    TwoWheeler,
    FourSeater,
    SixSeater,
    Suv,
    Other,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::TwoWheeler => "TWO_WHEELER",
            VehicleType::FourSeater => "FOUR_SEATER",
            VehicleType::SixSeater => "SIX_SEATER",
            VehicleType::Suv => "SUV",
            VehicleType::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TWO_WHEELER" => Some(VehicleType::TwoWheeler),
            "FOUR_SEATER" => Some(VehicleType::FourSeater),
            "SIX_SEATER" => Some(VehicleType::SixSeater),
            "SUV" => Some(VehicleType::Suv),
            "OTHER" => Some(VehicleType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Cancelled,
    Completed,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "BOOKED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BOOKED" => Some(BookingStatus::Booked),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            "EXPIRED" => Some(BookingStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

/// Per-vehicle-type slot counts of a listing. A missing bucket falls back to
/// the listing's approximate total car count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Apiv2Schema)]
pub struct VehicleCapacity {
    pub two_wheeler: Option<u32>,
    pub four_seater: Option<u32>,
    pub six_seater: Option<u32>,
    pub suv: Option<u32>,
}

impl VehicleCapacity {
    pub fn bucket(&self, vehicle_type: VehicleType) -> Option<u32> {
        match vehicle_type {
            VehicleType::TwoWheeler => self.two_wheeler,
            VehicleType::FourSeater => self.four_seater,
            VehicleType::SixSeater => self.six_seater,
            VehicleType::Suv => self.suv,
            VehicleType::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct Booking {
    pub id: BookingId,
    /// Short human-presentable code, unique across the whole store.
    pub code: String,
    pub requester_id: UserId,
    pub listing_id: ListingId,
    pub vehicle_type: VehicleType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_hours: f64,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of the simulated payment taken when a booking is
/// admitted. Written atomically with its booking, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct PaymentRecord {
    pub id: String,
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub amount: f64,
    pub payment_method: String,
    pub status: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct BookingRequest {
    pub listing_id: ListingId,
    pub requester_id: UserId,
    pub vehicle_type: VehicleType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Amount charged for the booking, as quoted by the caller.
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct QuoteRequest {
    pub listing_id: ListingId,
    pub vehicle_type: VehicleType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct Quote {
    pub total_hours: f64,
    pub hourly_rate: f64,
    pub surge_multiplier: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct DashboardStats {
    pub listing_count: u64,
    pub active_booking_count: u64,
    pub total_earnings: f64,
}
