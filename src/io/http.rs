//! Visitor count HTTP API
//!
//! Routes:
//! - `GET /?store_name=&year=&month=&day=&hour=&sensor_id=` - visitor count
//! - `GET /health` - liveness
//! - `GET /metrics` - Prometheus metrics
//!
//! Counts are returned as a bare JSON number; rejections as a JSON string
//! with status 404 (422 for parameters that are not integers).

use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::query::{TrafficQuery, TrafficService};
use crate::services::registry::StoreRegistry;
use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Shared state of the API server
pub struct AppState {
    registry: StoreRegistry,
    metrics: Arc<Metrics>,
    site_id: String,
    min_year: i32,
    default_store: String,
    default_date: (i32, u32, u32),
    default_hour: u32,
}

impl AppState {
    pub fn new(config: &Config, registry: StoreRegistry, metrics: Arc<Metrics>) -> Self {
        metrics.set_stores(&registry.names());
        Self {
            registry,
            metrics,
            site_id: config.site_id().to_string(),
            min_year: config.min_year(),
            default_store: config.default_store().to_string(),
            default_date: config.default_date(),
            default_hour: config.default_hour(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Build a query from URL parameters, filling in the defaults.
    /// Returns the offending parameter name when one is not an integer.
    pub fn parse_query(&self, raw: Option<&str>) -> Result<TrafficQuery, String> {
        let (year, month, day) = self.default_date;
        let mut query = TrafficQuery {
            store: self.default_store.clone(),
            year: i64::from(year),
            month: i64::from(month),
            day: i64::from(day),
            hour: i64::from(self.default_hour),
            sensor_id: None,
        };

        for pair in raw.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode(value);
            let int = || value.trim().parse::<i64>().map_err(|_| key.to_string());
            match key {
                "store_name" => query.store = value.clone(),
                "year" => query.year = int()?,
                "month" => query.month = int()?,
                "day" => query.day = int()?,
                "hour" => query.hour = int()?,
                "sensor_id" => query.sensor_id = Some(int()?),
                _ => {}
            }
        }
        Ok(query)
    }

    /// Answer a visitor count request
    pub fn visitor_response(&self, raw_query: Option<&str>, today: NaiveDate) -> Response<Full<Bytes>> {
        let query = match self.parse_query(raw_query) {
            Ok(query) => query,
            Err(param) => {
                self.metrics.record_rejection("bad_request");
                return json_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &format!("Parameter {param} must be an integer"),
                );
            }
        };

        let service = TrafficService::new(&self.registry, self.min_year);
        match service.answer(&query, today) {
            Ok(count) => {
                self.metrics.record_answer(&query.store, query.sensor_id.is_some());
                debug!(
                    store = %query.store,
                    sensor_id = ?query.sensor_id,
                    hour = %query.hour,
                    count = %count,
                    "visitor_count_served"
                );
                json_response(StatusCode::OK, &count)
            }
            Err(e) => {
                self.metrics.record_rejection(e.reason());
                debug!(store = %query.store, reason = %e.reason(), "visitor_count_rejected");
                json_response(StatusCode::NOT_FOUND, &e.to_string())
            }
        }
    }

    /// Route a request; generic over the body since no route reads it
    pub fn route<B>(&self, req: &Request<B>, today: NaiveDate) -> Response<Full<Bytes>> {
        match (req.method(), req.uri().path()) {
            (&Method::GET, "/") => self.visitor_response(req.uri().query(), today),
            (&Method::GET, "/health") => text_response(StatusCode::OK, "text/plain", "ok".to_string()),
            (&Method::GET, "/metrics") => text_response(
                StatusCode::OK,
                "text/plain; version=0.0.4; charset=utf-8",
                format_prometheus_metrics(&self.metrics, &self.site_id),
            ),
            _ => text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string()),
        }
    }
}

fn json_response<T: serde::Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(body).unwrap_or_else(|_| "null".to_string());
    text_response(status, "application/json", body)
}

fn text_response(status: StatusCode, content_type: &str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    if let Ok(value) = content_type.parse() {
        response.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
    }
    response
}

/// Decode `+` and `%XX` escapes of a query string value
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Handle one HTTP request
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let start = Instant::now();
    let today = chrono::Local::now().date_naive();
    let response = state.route(&req, today);
    if req.uri().path() == "/" {
        state.metrics.record_request(start.elapsed().as_micros() as u64);
    }
    Ok(response)
}

/// Start the API server; returns when the shutdown signal fires
pub async fn start_api_server(
    addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, site = %state.site_id, stores = %state.registry.len(), "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::StoreConfig;
    use http_body_util::BodyExt;

    fn test_state() -> AppState {
        let config = Config::default().with_stores(vec![StoreConfig {
            name: "Test".into(),
            avg_visit: 1200.0,
            std_visit: 300.0,
            perc_malfunction: 0.0,
            perc_break: 0.0,
        }]);
        let registry = StoreRegistry::from_config(&config).unwrap();
        AppState::new(&config, registry, Arc::new(Metrics::new()))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder().method(Method::GET).uri(uri).body(()).unwrap()
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_store_count() {
        let state = test_state();
        let response = state.route(&get("/?store_name=Test&year=2023&month=12&day=21&hour=18"), today());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "111");
        assert_eq!(state.metrics().answered_total(), 1);
    }

    #[tokio::test]
    async fn test_sensor_count() {
        let state = test_state();
        let uri = "/?store_name=Test&year=2023&month=12&day=21&hour=18&sensor_id=3";
        let response = state.route(&get(uri), today());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "35");
    }

    #[tokio::test]
    async fn test_rejections_are_json_strings() {
        let state = test_state();
        let response = state.route(&get("/?store_name=Test&year=2019"), today());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "\"No data before 2020\"");

        let uri = "/?store_name=Test&year=2024&month=1&day=7&hour=18";
        let response = state.route(&get(uri), today());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "\"The store was closed try another date or hour.\"");

        assert_eq!(state.metrics().rejections("too_early"), 1);
        assert_eq!(state.metrics().rejections("closed"), 1);
    }

    #[tokio::test]
    async fn test_non_integer_parameter() {
        let state = test_state();
        let response = state.route(&get("/?year=soon"), today());
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_string(response).await, "\"Parameter year must be an integer\"");
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let state = test_state();
        let response = state.route(&get("/health"), today());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");

        let response = state.route(&get("/nope"), today());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let state = test_state();
        state.route(&get("/?store_name=Test&year=2023&month=12&day=21&hour=18"), today());
        let response = state.route(&get("/metrics"), today());
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("traffic_store_answered_total{site=\"traffic-sim\",store=\"Test\"} 1"));
    }

    #[test]
    fn test_parse_query_defaults() {
        let state = test_state();
        let query = state.parse_query(None).unwrap();
        assert_eq!(query.store, "Nancy");
        assert_eq!((query.year, query.month, query.day, query.hour), (2021, 1, 25, 21));
        assert_eq!(query.sensor_id, None);
    }

    #[test]
    fn test_parse_query_configured_defaults() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let toml = "[api]\ndefault_store = \"Lille\"\ndefault_year = 2022\ndefault_month = 3\ndefault_day = 9\ndefault_hour = 10\n";
        file.write_all(toml.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = Config::from_file(file.path()).unwrap();
        let registry = StoreRegistry::from_config(&config).unwrap();
        let state = AppState::new(&config, registry, Arc::new(Metrics::new()));

        let query = state.parse_query(Some("hour=12")).unwrap();
        assert_eq!(query.store, "Lille");
        assert_eq!((query.year, query.month, query.day, query.hour), (2022, 3, 9, 12));
    }

    #[test]
    fn test_parse_query_values() {
        let state = test_state();
        let query = state.parse_query(Some("store_name=Saint+Malo&sensor_id=2&hour=-1&x=y")).unwrap();
        assert_eq!(query.store, "Saint Malo");
        assert_eq!(query.sensor_id, Some(2));
        assert_eq!(query.hour, -1);
        assert_eq!(state.parse_query(Some("sensor_id=")).unwrap_err(), "sensor_id");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Cabourg"), "Cabourg");
        assert_eq!(percent_decode("Saint%20Malo"), "Saint Malo");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
