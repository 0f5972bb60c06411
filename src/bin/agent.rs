use fleetwatch::{
    Metrics,
    agent::sample_local_metrics,
    util::{get_addr, get_port, get_secret, get_top_processes},
};
use rocket::{
    figment::Figment,
    get,
    http::Status,
    launch,
    request::{FromRequest, Outcome},
    routes,
    serde::json::Json,
};
use tracing::{error, instrument, level_filters::LevelFilter};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[get("/metrics")]
#[instrument(skip_all)]
async fn metrics(_secret: SecretKey) -> Result<Json<Metrics>, Status> {
    let top_n = get_top_processes();

    // sampling sleeps between two CPU refreshes
    match rocket::tokio::task::spawn_blocking(move || sample_local_metrics(top_n)).await {
        Ok(metrics) => Ok(Json(metrics)),
        Err(e) => {
            error!("sampling task failed: {e}");
            Err(Status::InternalServerError)
        }
    }
}

#[get("/health")]
fn health() -> &'static str {
    "ok"
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("fleetwatch", LevelFilter::DEBUG),
        ("fleetwatch_agent", LevelFilter::DEBUG),
        ("rocket", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(true),
        )
        .with(filter)
        .init();
}

fn get_config() -> Figment {
    rocket::Config::figment()
        .merge(("port", get_port()))
        .merge(("address", get_addr()))
        .merge(("workers", 1))
}

#[launch]
fn rocket() -> _ {
    init();
    let figment = get_config();

    rocket::custom(figment).mount("/", routes![metrics, health])
}

/// Guard for the optional `X-MONITORING-SECRET` header.
#[derive(Debug)]
struct SecretKey;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SecretKey {
    type Error = ();

    async fn from_request(request: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(secret) = get_secret() else {
            return Outcome::Success(SecretKey);
        };

        match request.headers().get_one("X-MONITORING-SECRET") {
            Some(passed) if passed == secret => Outcome::Success(SecretKey),
            _ => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
