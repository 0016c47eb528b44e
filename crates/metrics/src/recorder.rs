//! Metrics recorder initialization.

use {std::net::SocketAddr, tracing::info};

use crate::error::Result;

/// Configuration for the metrics system.
#[derive(Debug, Clone)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Address the scrape endpoint listens on
    pub listen: SocketAddr,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup, from within a tokio runtime. When disabled, no
/// recorder is installed and every metric call is a no-op.
///
/// # Errors
///
/// Fails when the exporter cannot be installed, or when collection is enabled
/// in a build without the `prometheus` feature.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<()> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;

        let mut builder = PrometheusBuilder::new().with_http_listener(config.listen);
        for (key, value) in config.global_labels {
            builder = builder.add_global_label(key, value);
        }
        builder.install()?;
        info!(listen = %config.listen, "prometheus metrics exporter listening");
        Ok(())
    }

    #[cfg(not(feature = "prometheus"))]
    {
        Err(crate::error::Error::ExporterUnavailable)
    }
}
