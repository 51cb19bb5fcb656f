// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
#[cfg(feature = "server")]
fn init_telemetry() {
    use opentelemetry::global;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::runtime::TokioCurrentThread;
    use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::{EnvFilter, Registry};

    let app_name = "parkservice_bookings";

    // Start a new Jaeger trace pipeline.
    // Spans are exported in batch - recommended setup for a production application.
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(app_name)
        .install_batch(TokioCurrentThread)
        .expect("Failed to install OpenTelemetry tracer.");

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Create a `tracing` layer using the Jaeger tracer
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    // Create a `tracing` layer to emit spans as structured logs to stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    // Combined them all together in a `tracing` subscriber
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

#[cfg(feature = "server")]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    use std::env;
    use std::sync::Arc;

    use actix_web::{App, HttpServer};
    use paperclip::actix::{web, OpenApiExt};
    use tracing_actix_web::TracingLogger;

    use parkservice_bookings::app_config::config_app;
    use parkservice_bookings::booking_service::BookingService;
    use parkservice_bookings::bookings_repository::{
        BookingsRepository, InMemoryBookingsRepository, PostgresBookingsRepository,
        PostgresBookingsRepositoryConfig,
    };
    use parkservice_bookings::expiry::BookingExpiryTask;
    use parkservice_bookings::identity_directory::{
        HttpIdentityDirectory, IdentityDirectory, InMemoryIdentityDirectory,
    };
    use parkservice_bookings::listing_directory::{
        HttpListingDirectory, InMemoryListingDirectory, ListingDirectory,
    };
    use parkservice_bookings::seed::seed_demo_data;

    init_telemetry();

    let http_port: u16 = env::var("HTTP_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8080);
    println!("starting HTTP server at http://localhost:{}", http_port);

    let use_in_memory_db = env::var("USE_IN_MEMORY_DB")
        .map(|value| value.to_lowercase() == "true")
        .unwrap_or_default();
    let pg_hostname = env::var("DB_HOST").unwrap_or("127.0.0.1".to_string());
    let pg_username = env::var("DB_USERNAME").unwrap_or("postgres".to_string());
    let pg_password = env::var("DB_PASSWORD").unwrap_or("postgres".to_string());

    let bookings_repository: Arc<dyn BookingsRepository> = if use_in_memory_db {
        Arc::new(InMemoryBookingsRepository::default())
    } else {
        Arc::new(
            PostgresBookingsRepository::init(PostgresBookingsRepositoryConfig {
                hostname: pg_hostname,
                username: pg_username,
                password: pg_password,
            })
            .await
            .expect("Failed to init postgres"),
        )
    };

    let listings_service_url = env::var("LISTINGS_SERVICE_URL").ok();
    let identity_service_url = env::var("IDENTITY_SERVICE_URL").ok();
    let (listings, identities): (Arc<dyn ListingDirectory>, Arc<dyn IdentityDirectory>) =
        match (listings_service_url, identity_service_url) {
            (Some(listings_url), Some(identity_url)) => (
                Arc::new(
                    HttpListingDirectory::new(&listings_url)
                        .expect("Failed to create listing directory client"),
                ),
                Arc::new(
                    HttpIdentityDirectory::new(&identity_url)
                        .expect("Failed to create identity directory client"),
                ),
            ),
            _ => {
                let listing_directory = Arc::new(InMemoryListingDirectory::default());
                let identity_directory = Arc::new(InMemoryIdentityDirectory::default());
                let seed = env::var("SEED_DEMO_DATA")
                    .map(|value| value.to_lowercase() != "false")
                    .unwrap_or(true);
                if seed {
                    seed_demo_data(&listing_directory, &identity_directory);
                }
                (listing_directory, identity_directory)
            }
        };

    let booking_service = Arc::new(BookingService::new(
        bookings_repository.clone(),
        listings,
        identities,
    ));

    tokio::spawn(BookingExpiryTask::new(bookings_repository.clone()).start());

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(booking_service.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind(("0.0.0.0", http_port))?
    .run()
    .await
}

#[cfg(not(feature = "server"))]
fn main() {
    println!("parkservice_bookings was built without the server feature");
}
