use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use pagesmith_core::{RunMode, Settings};
use pagesmith_generator::TemplateGenerator;
use pagesmith_pipeline::{GitHubHosting, Pipeline, PipelineConfig, ReqwestTransport};

use crate::error::DaemonError;
use crate::server::{build_router, AppState};

/// Per-request timeout for hosting API calls.
const HOSTING_TIMEOUT: Duration = Duration::from_secs(30);

/// Install the global tracing subscriber. `RUST_LOG` picks the filter
/// (default `info`); `json` switches to one JSON object per line.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Assemble the production pipeline: Tera templates, GitHub hosting and a
/// `reqwest` callback client, all configured from `settings`.
pub fn build_pipeline(settings: &Settings) -> Result<Pipeline, DaemonError> {
    let holder = settings
        .generator
        .license_holder
        .clone()
        .unwrap_or_else(|| settings.github.owner.clone());
    let generator = TemplateGenerator::new(settings.generator.template_dir.as_deref(), holder)?;
    let hosting = GitHubHosting::new(
        &settings.github.api_base,
        settings.github.owner.clone(),
        &settings.github.token,
        HOSTING_TIMEOUT,
    )?;
    let transport = ReqwestTransport::new(settings.notifier.timeout())
        .map_err(|e| DaemonError::Callback(e.to_string()))?;

    Ok(Pipeline::new(
        Arc::new(generator),
        Arc::new(hosting),
        Arc::new(transport),
        PipelineConfig::from_settings(settings),
    ))
}

/// Start the intake server and block the current thread until it exits.
pub fn start_blocking(settings: Settings, json_logs: bool) -> Result<(), DaemonError> {
    init_tracing(json_logs);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(DaemonError::Runtime)?;
    runtime.block_on(run(settings))
}

/// Validate settings, bind, and serve until ctrl-c.
pub async fn run(settings: Settings) -> Result<(), DaemonError> {
    settings.validate(RunMode::Serve)?;
    let pipeline = Arc::new(build_pipeline(&settings)?);
    let app = build_router(AppState::new(settings.secret.clone(), pipeline));

    let addr = settings.server.bind.clone();
    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| DaemonError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(
        addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or(addr),
        owner = %settings.github.owner,
        readiness_delay_secs = settings.pipeline.readiness_delay_secs,
        "intake listening",
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(DaemonError::Serve)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c, shutting down"),
        Err(err) => tracing::error!(error = %err, "ctrl-c handler failed; shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_pipeline_uses_settings() {
        let mut settings = Settings::default();
        settings.github.owner = "octo".to_string();
        settings.github.token = "t0ken".to_string();
        settings.pipeline.readiness_delay_secs = 30;
        let pipeline = build_pipeline(&settings).unwrap();
        assert_eq!(pipeline.config().readiness_delay, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn run_refuses_to_start_without_secret() {
        let mut settings = Settings::default();
        settings.github.owner = "octo".to_string();
        settings.github.token = "t0ken".to_string();
        let err = run(settings).await.unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[tokio::test]
    async fn run_reports_unusable_bind_address() {
        let mut settings = Settings::default();
        settings.secret = "s3cret".to_string();
        settings.github.owner = "octo".to_string();
        settings.github.token = "t0ken".to_string();
        settings.server.bind = "not-an-address".to_string();
        let err = run(settings).await.unwrap_err();
        assert!(matches!(err, DaemonError::Bind { ref addr, .. } if addr == "not-an-address"));
    }
}
