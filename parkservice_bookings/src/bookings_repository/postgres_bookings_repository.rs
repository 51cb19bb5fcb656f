use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{Booking, BookingId, BookingStatus, ListingId, PaymentRecord, UserId, VehicleType};
use crate::bookings_repository::{BookingsRepository, BookingsRepositoryError};

pub struct PostgresBookingsRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

/// The client is kept behind an async mutex: reads share one connection, and
/// the booking/payment pair insert needs exclusive access for its transaction.
pub struct PostgresBookingsRepository {
    client: tokio::sync::Mutex<Client>,
}

impl PostgresBookingsRepository {
    pub async fn init(config: PostgresBookingsRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Postgres connection_str: {}", connection_str);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS bookings (
            id              TEXT PRIMARY KEY,
            code            TEXT NOT NULL UNIQUE,
            requester_id    TEXT NOT NULL,
            listing_id      TEXT NOT NULL,
            vehicle_type    TEXT NOT NULL,
            start_time      TIMESTAMPTZ NOT NULL,
            end_time        TIMESTAMPTZ NOT NULL,
            total_hours     DOUBLE PRECISION NOT NULL,
            total_amount    DOUBLE PRECISION NOT NULL,
            status          TEXT NOT NULL,
            created_at      TIMESTAMPTZ NOT NULL,
            updated_at      TIMESTAMPTZ NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup bookings table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS payments (
            id              TEXT PRIMARY KEY,
            booking_id      TEXT NOT NULL UNIQUE,
            user_id         TEXT NOT NULL,
            amount          DOUBLE PRECISION NOT NULL,
            payment_method  TEXT NOT NULL,
            status          TEXT NOT NULL,
            reference       TEXT NOT NULL UNIQUE,
            created_at      TIMESTAMPTZ NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup payments table")?;

        client
            .batch_execute(
                "
        CREATE INDEX IF NOT EXISTS bookings_by_listing_window
            ON bookings (listing_id, vehicle_type, start_time, end_time)
        ",
            )
            .await
            .context("Failed to setup bookings index")?;

        Ok(Self {
            client: tokio::sync::Mutex::new(client),
        })
    }
}

fn is_sql_state(err: &tokio_postgres::Error, code: &str) -> bool {
    err.as_db_error()
        .map(|db_err| db_err.code() == &SqlState::from_code(code))
        .unwrap_or_default()
}

fn map_write_error(err: tokio_postgres::Error) -> BookingsRepositoryError {
    // 23505 is the unique constraint violation, 40001/40P01 are transient
    // serialization/deadlock conflicts
    if is_sql_state(&err, "23505") {
        BookingsRepositoryError::CodeTaken
    } else if is_sql_state(&err, "40001") || is_sql_state(&err, "40P01") {
        BookingsRepositoryError::Conflict
    } else {
        BookingsRepositoryError::DatabaseFailure(err)
    }
}

fn row_to_booking(row: &Row) -> Result<Booking, BookingsRepositoryError> {
    let vehicle_type: String = row.try_get("vehicle_type")?;
    let status: String = row.try_get("status")?;

    Ok(Booking {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        requester_id: row.try_get("requester_id")?,
        listing_id: row.try_get("listing_id")?,
        vehicle_type: VehicleType::parse(&vehicle_type).ok_or_else(|| {
            BookingsRepositoryError::Other(format!("Unknown vehicle type {}", vehicle_type))
        })?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        total_hours: row.try_get("total_hours")?,
        total_amount: row.try_get("total_amount")?,
        status: BookingStatus::parse(&status).ok_or_else(|| {
            BookingsRepositoryError::Other(format!("Unknown booking status {}", status))
        })?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_payment(row: &Row) -> Result<PaymentRecord, BookingsRepositoryError> {
    Ok(PaymentRecord {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        payment_method: row.try_get("payment_method")?,
        status: row.try_get("status")?,
        reference: row.try_get("reference")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait::async_trait]
impl BookingsRepository for PostgresBookingsRepository {
    async fn insert_booking_and_payment(
        &self,
        booking: Booking,
        payment: PaymentRecord,
    ) -> Result<(), BookingsRepositoryError> {
        let mut client = self.client.lock().await;
        let transaction = client.transaction().await?;

        transaction
            .execute(
                "INSERT INTO bookings (id, code, requester_id, listing_id, vehicle_type, \
                 start_time, end_time, total_hours, total_amount, status, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
                &[
                    &booking.id,
                    &booking.code,
                    &booking.requester_id,
                    &booking.listing_id,
                    &booking.vehicle_type.as_str(),
                    &booking.start_time,
                    &booking.end_time,
                    &booking.total_hours,
                    &booking.total_amount,
                    &booking.status.as_str(),
                    &booking.created_at,
                    &booking.updated_at,
                ],
            )
            .await
            .map_err(map_write_error)?;

        transaction
            .execute(
                "INSERT INTO payments (id, booking_id, user_id, amount, payment_method, \
                 status, reference, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &payment.id,
                    &payment.booking_id,
                    &payment.user_id,
                    &payment.amount,
                    &payment.payment_method,
                    &payment.status,
                    &payment.reference,
                    &payment.created_at,
                ],
            )
            .await
            .map_err(map_write_error)?;

        transaction.commit().await.map_err(map_write_error)
    }

    async fn find_overlapping(
        &self,
        listing_id: &ListingId,
        vehicle_type: VehicleType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare(
                "SELECT * FROM bookings \
                 WHERE listing_id = $1 AND vehicle_type = $2 \
                 AND start_time < $4 AND end_time > $3 \
                 AND status <> 'CANCELLED'",
            )
            .await?;

        let rows = client
            .query(&stmt, &[listing_id, &vehicle_type.as_str(), &start, &end])
            .await?;
        rows.iter().map(row_to_booking).collect()
    }

    async fn get_booking(&self, id: &BookingId) -> Result<Booking, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client.prepare("SELECT * FROM bookings WHERE id = $1").await?;

        let rows = client.query(&stmt, &[id]).await?;
        rows.first()
            .ok_or_else(|| BookingsRepositoryError::BookingNotFound(id.clone()))
            .and_then(row_to_booking)
    }

    async fn get_booking_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Booking>, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare("SELECT * FROM bookings WHERE code = $1")
            .await?;

        let rows = client.query(&stmt, &[&code]).await?;
        rows.first().map(row_to_booking).transpose()
    }

    async fn list_bookings_by_requester(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Booking>, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare("SELECT * FROM bookings WHERE requester_id = $1")
            .await?;

        let rows = client.query(&stmt, &[user_id]).await?;
        rows.iter().map(row_to_booking).collect()
    }

    async fn list_bookings_for_listings(
        &self,
        listing_ids: &[ListingId],
    ) -> Result<Vec<Booking>, BookingsRepositoryError> {
        let ids: Vec<String> = listing_ids.to_vec();
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare("SELECT * FROM bookings WHERE listing_id = ANY($1)")
            .await?;

        let rows = client.query(&stmt, &[&ids]).await?;
        rows.iter().map(row_to_booking).collect()
    }

    async fn update_status(
        &self,
        id: &BookingId,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *")
            .await?;

        let rows = client.query(&stmt, &[id, &status.as_str(), &now]).await?;
        rows.first()
            .ok_or_else(|| BookingsRepositoryError::BookingNotFound(id.clone()))
            .and_then(row_to_booking)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare("SELECT * FROM bookings WHERE status = 'BOOKED' AND end_time <= $1")
            .await?;

        let rows = client.query(&stmt, &[&now]).await?;
        rows.iter().map(row_to_booking).collect()
    }

    async fn expire_if_booked(
        &self,
        id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare(
                "UPDATE bookings SET status = 'EXPIRED', updated_at = $2 \
                 WHERE id = $1 AND status = 'BOOKED'",
            )
            .await?;

        let updated = client.execute(&stmt, &[id, &now]).await?;
        Ok(updated > 0)
    }

    async fn get_payment(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<PaymentRecord>, BookingsRepositoryError> {
        let client = self.client.lock().await;
        let stmt: Statement = client
            .prepare("SELECT * FROM payments WHERE booking_id = $1")
            .await?;

        let rows = client.query(&stmt, &[booking_id]).await?;
        rows.first().map(row_to_payment).transpose()
    }
}

#[cfg(test)]
mod tests_postgres_bookings_repository {
    use chrono::TimeZone;
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};
    use uuid::Uuid;

    use super::*;

    async fn start_postgres_container_and_init_repo(
    ) -> (ContainerAsync<GenericImage>, PostgresBookingsRepository) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = PostgresBookingsRepository::init(PostgresBookingsRepositoryConfig {
                hostname: "127.0.0.1".to_string(),
                username: "postgres".to_string(),
                password: "postgres".to_string(),
            })
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn booking_fixture(listing_id: &str, start_hour: u32, end_hour: u32) -> Booking {
        let start_time = Utc
            .with_ymd_and_hms(2024, 5, 10, start_hour, 0, 0)
            .unwrap();
        let end_time = Utc.with_ymd_and_hms(2024, 5, 10, end_hour, 0, 0).unwrap();
        let id = Uuid::new_v4().to_string();
        Booking {
            code: format!("PK-{}", &id[..8].to_uppercase()),
            id,
            requester_id: "user-1".to_string(),
            listing_id: listing_id.to_string(),
            vehicle_type: VehicleType::FourSeater,
            start_time,
            end_time,
            total_hours: (end_hour - start_hour) as f64,
            total_amount: 40.0 * (end_hour - start_hour) as f64,
            status: BookingStatus::Booked,
            created_at: start_time,
            updated_at: start_time,
        }
    }

    fn payment_fixture(booking: &Booking) -> PaymentRecord {
        PaymentRecord {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            user_id: booking.requester_id.clone(),
            amount: booking.total_amount,
            payment_method: "CARD".to_string(),
            status: "SUCCESS".to_string(),
            reference: format!("TXN-{}", &booking.id[..10].to_uppercase()),
            created_at: booking.created_at,
        }
    }

    #[tokio::test]
    #[ignore = "needs a local docker daemon"]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers the write path against a real postgres
    /// 1. Inserts a booking with its payment and reads both back
    /// 2. Rejects a second booking with the same code, leaving no partial rows
    /// 3. Overwrites the status and reads the update back
    async fn test_insert_and_status_roundtrip() {
        let (_container, repository) = start_postgres_container_and_init_repo().await;

        let booking = booking_fixture("listing-pg-1", 10, 12);
        repository
            .insert_booking_and_payment(booking.clone(), payment_fixture(&booking))
            .await
            .unwrap();

        assert_eq!(repository.get_booking(&booking.id).await.unwrap(), booking);
        assert_eq!(
            repository.get_booking_by_code(&booking.code).await.unwrap(),
            Some(booking.clone())
        );
        let payment = repository
            .get_payment(&booking.id)
            .await
            .unwrap()
            .expect("Payment record missing");
        assert_eq!(payment.booking_id, booking.id);

        let mut same_code = booking_fixture("listing-pg-1", 14, 16);
        same_code.code = booking.code.clone();
        let result = repository
            .insert_booking_and_payment(same_code.clone(), payment_fixture(&same_code))
            .await;
        assert!(matches!(result, Err(BookingsRepositoryError::CodeTaken)));
        assert!(matches!(
            repository.get_booking(&same_code.id).await,
            Err(BookingsRepositoryError::BookingNotFound(..))
        ));
        assert_eq!(repository.get_payment(&same_code.id).await.unwrap(), None);

        let updated = repository
            .update_status(&booking.id, BookingStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Completed);
    }

    #[tokio::test]
    #[ignore = "needs a local docker daemon"]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers the overlap query and the expiry compare-and-set
    /// 1. Touching windows do not count as overlap
    /// 2. Cancelled bookings are excluded from the overlap count
    /// 3. expire_if_booked flips only BOOKED rows, and only once
    async fn test_overlap_and_expiry() {
        let (_container, repository) = start_postgres_container_and_init_repo().await;
        let listing = Uuid::new_v4().to_string();

        let booking = booking_fixture(&listing, 10, 12);
        repository
            .insert_booking_and_payment(booking.clone(), payment_fixture(&booking))
            .await
            .unwrap();

        let overlapping = repository
            .find_overlapping(
                &listing,
                VehicleType::FourSeater,
                Utc.with_ymd_and_hms(2024, 5, 10, 11, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 10, 13, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(overlapping.len(), 1);

        let touching = repository
            .find_overlapping(
                &listing,
                VehicleType::FourSeater,
                Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 10, 13, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        assert!(touching.is_empty());

        assert!(repository
            .expire_if_booked(&booking.id, Utc::now())
            .await
            .unwrap());
        assert!(!repository
            .expire_if_booked(&booking.id, Utc::now())
            .await
            .unwrap());
        assert_eq!(
            repository.get_booking(&booking.id).await.unwrap().status,
            BookingStatus::Expired
        );

        repository
            .update_status(&booking.id, BookingStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        let after_cancel = repository
            .find_overlapping(
                &listing,
                VehicleType::FourSeater,
                Utc.with_ymd_and_hms(2024, 5, 10, 11, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 10, 13, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        assert!(after_cancel.is_empty());
    }
}
