#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[cfg(feature = "prometheus")]
    #[error(transparent)]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),

    #[error("metrics export requested but the prometheus feature is not compiled in")]
    ExporterUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
