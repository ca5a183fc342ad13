//! Health checks
//!
//! `/health/live` only proves the process answers. `/health` and
//! `/health/ready` check the record store and report the delivery channels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use so_db::{ChangeFeed, Database, RecordStore};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    /// The worse of two statuses
    fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health checker configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Timeout for individual health checks
    pub check_timeout: Duration,
    /// Cache duration for health results
    pub cache_duration: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(10),
        }
    }
}

/// Delivery channels wired at startup
#[derive(Debug, Clone, Copy, Default)]
pub struct Channels {
    pub smtp: bool,
    pub whatsapp: bool,
}

struct CachedHealth {
    report: HealthReport,
    cached_at: Instant,
}

/// Health checker service
pub struct HealthChecker {
    config: HealthConfig,
    start_time: Instant,
    cache: RwLock<Option<CachedHealth>>,
    store: Arc<dyn RecordStore>,
    database: Option<Database>,
    feed: ChangeFeed,
    channels: Channels,
}

impl HealthChecker {
    pub fn new(config: HealthConfig, store: Arc<dyn RecordStore>, feed: ChangeFeed) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            cache: RwLock::new(None),
            store,
            database: None,
            feed,
            channels: Channels::default(),
        }
    }

    /// Report pool statistics next to the store check
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    /// Get cached health or perform checks
    pub async fn check(&self) -> HealthReport {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.cached_at.elapsed() < self.config.cache_duration {
                    debug!("Returning cached health report");
                    return cached.report.clone();
                }
            }
        }

        let report = self.perform_checks().await;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedHealth {
                report: report.clone(),
                cached_at: Instant::now(),
            });
        }

        report
    }

    async fn perform_checks(&self) -> HealthReport {
        let components = vec![
            self.check_store().await,
            self.check_feed(),
            self.check_delivery(),
        ];
        let status = components
            .iter()
            .fold(HealthStatus::Healthy, |status, c| status.worst(c.status));
        if !status.is_healthy() {
            warn!("health check failed");
        }

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_store(&self) -> ComponentHealth {
        let start = Instant::now();

        let (status, message) =
            match tokio::time::timeout(self.config.check_timeout, self.store.ping()).await {
                Ok(Ok(())) => (HealthStatus::Healthy, "Connected".to_string()),
                Ok(Err(e)) => (HealthStatus::Unhealthy, e.to_string()),
                Err(_) => (
                    HealthStatus::Unhealthy,
                    format!("no answer within {}s", self.config.check_timeout.as_secs()),
                ),
            };

        let details = match &self.database {
            Some(db) => {
                let stats = db.stats();
                serde_json::json!({ "type": "postgresql", "pool_size": stats.size, "idle_connections": stats.idle })
            }
            None => serde_json::json!({ "type": "memory" }),
        };

        ComponentHealth {
            name: "store".to_string(),
            status,
            message: Some(message),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(details),
        }
    }

    fn check_feed(&self) -> ComponentHealth {
        ComponentHealth {
            name: "change_feed".to_string(),
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: 0,
            details: Some(serde_json::json!({ "subscribers": self.feed.subscriber_count() })),
        }
    }

    /// Without SMTP, email reports are refused
    fn check_delivery(&self) -> ComponentHealth {
        let (status, message) = if self.channels.smtp {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Degraded,
                Some("SMTP not configured; email reports are refused".to_string()),
            )
        };

        ComponentHealth {
            name: "delivery".to_string(),
            status,
            message,
            response_time_ms: 0,
            details: Some(serde_json::json!({
                "email": self.channels.smtp,
                "whatsapp": self.channels.whatsapp,
            })),
        }
    }
}

/// Liveness check
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness check: the store must answer
pub async fn readiness(
    State(checker): State<Arc<HealthChecker>>,
) -> (StatusCode, Json<HealthReport>) {
    let report = checker.check().await;
    let status = report.http_status();
    (status, Json(report))
}

/// Full health check
pub async fn health(State(checker): State<Arc<HealthChecker>>) -> (StatusCode, Json<HealthReport>) {
    let report = checker.check().await;
    let status = report.http_status();
    (status, Json(report))
}
