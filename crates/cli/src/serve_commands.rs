use std::{path::Path, sync::Arc};

use {
    anyhow::{Result, anyhow, bail},
    herald_config::{HeraldConfig, Severity, ValidationResult},
    herald_irc::IrcConnector,
    herald_listener::Listener,
    herald_metrics::{MetricsRecorderConfig, init_metrics},
    herald_publisher::{Publisher, PublisherConfig},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// Run the relay until a shutdown signal, or until the publisher stops on its
/// own, which is reported as an error so the process exits non-zero.
pub async fn serve(config_path: Option<&Path>) -> Result<()> {
    let (config, path) = herald_config::load(config_path)?;
    let diagnostics = match &path {
        Some(path) => {
            info!(path = %path.display(), "loaded config");
            herald_config::validate(Some(path))
        },
        None => {
            info!("no config file found, using defaults");
            herald_config::validate_config(&config)
        },
    };
    log_diagnostics(&diagnostics)?;

    init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen: config.metrics.listen,
        global_labels: vec![("service".into(), "herald".into())],
    })?;

    run(&config).await
}

async fn run(config: &HeraldConfig) -> Result<()> {
    let (publisher, handle) = Publisher::new(
        PublisherConfig::from(&config.irc),
        Arc::new(IrcConnector::new()),
    );
    let listener = Listener::bind(&config.listener, Arc::new(handle.clone())).await?;
    let shutdown = CancellationToken::new();

    let mut engine = tokio::spawn(publisher.run());
    let mut front = tokio::spawn(listener.serve(shutdown.clone()));

    let outcome = tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown requested");
            handle.stop();
            (&mut engine).await?.map_err(Into::into)
        },
        joined = &mut engine => match joined? {
            // Never relaunched: the same config would fail the same way.
            Ok(()) => Err(anyhow!("publisher stopped unexpectedly")),
            Err(e) => {
                error!(error = %e, "publisher stopped");
                Err(e.into())
            },
        },
        joined = &mut front => {
            handle.stop();
            let _ = (&mut engine).await;
            match joined? {
                Ok(()) => Err(anyhow!("listener stopped unexpectedly")),
                Err(e) => Err(e.into()),
            }
        },
    };

    shutdown.cancel();
    if !front.is_finished() {
        let _ = front.await;
    }
    info!("herald stopped");
    outcome
}

fn log_diagnostics(result: &ValidationResult) -> Result<()> {
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "config: {}", d.message),
            Severity::Warning => warn!(path = %d.path, "config: {}", d.message),
            Severity::Info => info!(path = %d.path, "config: {}", d.message),
        }
    }
    if result.has_errors() {
        bail!(
            "invalid configuration: {} error(s), run `herald check-config` for details",
            result.count(Severity::Error)
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
