use crate::application::MetricsService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub metrics_service: Arc<MetricsService>,
    /// Renders the process-wide Prometheus recorder for `/metrics`
    pub prometheus: PrometheusHandle,
    /// `redis` or `memory`, reported by `/health`
    pub cache_backend: &'static str,
}
