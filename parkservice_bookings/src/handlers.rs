use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{Error, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{BookingRequest, QuoteRequest, StatusUpdateRequest, UserId};
use crate::booking_service::{BookingService, BookingServiceError};

fn error_response(operation: &str, err: BookingServiceError) -> HttpResponse {
    match err {
        BookingServiceError::ListingNotFound(_)
        | BookingServiceError::RequesterNotFound(_)
        | BookingServiceError::BookingNotFound(_) => {
            HttpResponse::NotFound().json(err.to_string())
        }
        BookingServiceError::ListingNotApproved(_) => {
            HttpResponse::Forbidden().json(err.to_string())
        }
        BookingServiceError::InvalidWindow | BookingServiceError::InvalidAmount => {
            HttpResponse::BadRequest().json(err.to_string())
        }
        BookingServiceError::CapacityExceeded { .. } => {
            HttpResponse::Conflict().json(err.to_string())
        }
        other => {
            tracing::error!("{} failed {}", operation, other);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn create_booking(
    booking_service: Data<Arc<BookingService>>,
    request: web::Json<BookingRequest>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service.reserve(request.into_inner()).await {
            Ok(booking) => HttpResponse::Created().json(booking),
            Err(err) => error_response("Create booking", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_booking(
    booking_service: Data<Arc<BookingService>>,
    booking_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service.get_booking(&booking_id.into_inner()).await {
            Ok(booking) => HttpResponse::Ok().json(booking),
            Err(err) => error_response("Get booking", err),
        },
    )
}

#[api_v2_operation]
pub async fn scan_booking(
    booking_service: Data<Arc<BookingService>>,
    code_or_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service.scan(&code_or_id.into_inner()).await {
            Ok(booking) => HttpResponse::Ok().json(booking),
            Err(err) => error_response("Scan booking", err),
        },
    )
}

#[api_v2_operation]
pub async fn update_booking_status(
    booking_service: Data<Arc<BookingService>>,
    booking_id: web::Path<String>,
    request: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service
            .set_status(&booking_id.into_inner(), request.into_inner().status)
            .await
        {
            Ok(booking) => HttpResponse::Ok().json(booking),
            Err(err) => error_response("Update booking status", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_booking_payment(
    booking_service: Data<Arc<BookingService>>,
    booking_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service
            .payment_for_booking(&booking_id.into_inner())
            .await
        {
            Ok(payment) => HttpResponse::Ok().json(payment),
            Err(err) => error_response("Get booking payment", err),
        },
    )
}

#[api_v2_operation]
pub async fn list_user_bookings(
    booking_service: Data<Arc<BookingService>>,
    user_id: web::Path<UserId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service
            .list_for_requester(&user_id.into_inner())
            .await
        {
            Ok(bookings) => HttpResponse::Ok().json(bookings),
            Err(err) => error_response("List user bookings", err),
        },
    )
}

#[api_v2_operation]
pub async fn list_provider_bookings(
    booking_service: Data<Arc<BookingService>>,
    provider_id: web::Path<UserId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service.list_for_owner(&provider_id.into_inner()).await {
            Ok(bookings) => HttpResponse::Ok().json(bookings),
            Err(err) => error_response("List provider bookings", err),
        },
    )
}

#[api_v2_operation]
pub async fn provider_dashboard(
    booking_service: Data<Arc<BookingService>>,
    provider_id: web::Path<UserId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match booking_service
            .dashboard_stats(&provider_id.into_inner())
            .await
        {
            Ok(stats) => HttpResponse::Ok().json(stats),
            Err(err) => error_response("Provider dashboard", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_quote(
    booking_service: Data<Arc<BookingService>>,
    request: web::Query<QuoteRequest>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();
    Ok(
        match booking_service
            .quote(
                &request.listing_id,
                request.vehicle_type,
                request.start_time,
                request.end_time,
            )
            .await
        {
            Ok(quote) => HttpResponse::Ok().json(quote),
            Err(err) => error_response("Get quote", err),
        },
    )
}
