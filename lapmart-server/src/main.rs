//! lapmart-server

use anyhow::{anyhow, Result};
use axum::{headers::HeaderName, routing::get, Router};
use axum_server::Handle;
use clap::Parser;
use lapmart_server::{
    app_state::{AppState, AppStateBuilder},
    db::{self, PgStore},
    docs::ApiDoc,
    identity::session::SessionKeys,
    metrics::setup_metrics_recorder,
    middleware::{self, request_ulid::MakeRequestUlid, runtime},
    router,
    routes::fallback::notfound_404,
    settings::{AppEnvironment, Settings},
    setups::{
        local::{LocalSetup, LogNotificationSender},
        prod::{EmailNotificationSender, ProdSetup},
        ServerSetup,
    },
};
use http::header;
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;
use retry_policies::policies::ExponentialBackoffBuilder;
use std::{
    future::ready,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    process::exit,
    time::Duration,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, sensitive_headers::SetSensitiveHeadersLayer,
    timeout::TimeoutLayer, trace::TraceLayer, ServiceBuilderExt,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Request identifier field.
const REQUEST_ID: &str = "x-request-id";

/// Identity and verification backend of the lapmart marketplace
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a settings.toml, defaults to the bundled config/settings.toml
    #[arg(long)]
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (stdout_writer, _stdout_guard) = tracing_appender::non_blocking(io::stdout());

    let settings = Settings::load(cli.config_path)?;

    setup_tracing(stdout_writer, settings.server.environment);

    info!(
        subject = "app_settings",
        category = "init",
        "starting with settings: {:?}",
        settings,
    );

    db::run_migrations(&settings.database.url).await?;

    let db_pool = db::pool(&settings.database.url, settings.database.connect_timeout).await?;
    let store = PgStore::new(db_pool);
    let session_keys = SessionKeys::new(&settings.session);

    let recorder_handle = setup_metrics_recorder()?;
    let cancellation_token = CancellationToken::new();

    let metrics_server = tokio::spawn(serve_metrics(
        recorder_handle,
        settings.clone(),
        cancellation_token.clone(),
    ));

    let app_server = match settings.server.environment {
        AppEnvironment::Local => {
            let app_state = AppStateBuilder::<LocalSetup>::default()
                .with_store(store)
                .with_notification_sender(LogNotificationSender)
                .with_session_keys(session_keys)
                .with_verification(settings.verification.clone())
                .finalize()?;

            tokio::spawn(serve_app(
                settings.clone(),
                app_state,
                cancellation_token.clone(),
            ))
        }
        _ => {
            let app_state = AppStateBuilder::<ProdSetup>::default()
                .with_store(store)
                .with_notification_sender(EmailNotificationSender::new(settings.mailgun.clone()))
                .with_session_keys(session_keys)
                .with_verification(settings.verification.clone())
                .finalize()?;

            tokio::spawn(serve_app(
                settings.clone(),
                app_state,
                cancellation_token.clone(),
            ))
        }
    };

    tokio::spawn(async move {
        capture_sigterm().await;

        cancellation_token.cancel();
        info!("Shutdown signal received, shutting down. Signal again to force shutdown.");

        capture_sigterm().await;

        exit(130)
    });

    let (metrics, app) = tokio::try_join!(metrics_server, app_server)?;

    if let Err(e) = metrics {
        tracing::error!(error = %e, "metrics server crashed");
    }

    if let Err(e) = app {
        tracing::error!(error = %e, "app server crashed");
    }

    Ok(())
}

async fn serve_metrics(
    recorder_handle: PrometheusHandle,
    settings: Settings,
    token: CancellationToken,
) -> Result<()> {
    let metrics_router = Router::new()
        .route("/metrics", get(move || ready(recorder_handle.render())))
        .fallback(notfound_404);

    let router = metrics_router.layer(CatchPanicLayer::custom(runtime::catch_panic));

    let (server, _) = serve("Metrics", router, settings.server.metrics_port).await?;

    token.cancelled().await;
    server.graceful_shutdown(None);

    Ok(())
}

async fn serve_app<S: ServerSetup>(
    settings: Settings,
    app_state: AppState<S>,
    token: CancellationToken,
) -> Result<()> {
    let req_id = HeaderName::from_static(REQUEST_ID);

    let router = router::setup_app_router(app_state)
        .route_layer(axum::middleware::from_fn(middleware::metrics::track))
        .layer(TraceLayer::new_for_http())
        // Set and propagate the request id (as a ulid) per request.
        .layer(
            ServiceBuilder::new()
                .set_request_id(req_id.clone(), MakeRequestUlid)
                .propagate_request_id(req_id),
        )
        .layer(TimeoutLayer::new(Duration::from_millis(
            settings.server.timeout_ms,
        )))
        .layer(CatchPanicLayer::custom(runtime::catch_panic))
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION]))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let (server, addr) = serve("Application", router, settings.server.port).await?;

    if settings.healthcheck.is_enabled {
        tokio::spawn({
            let cancellation_token = token.clone();
            let settings = settings.healthcheck.clone();

            async move {
                let mut interval =
                    tokio::time::interval(Duration::from_millis(settings.interval_ms));

                let client = ClientBuilder::new(reqwest::Client::new())
                    .with(RetryTransientMiddleware::new_with_policy(
                        ExponentialBackoffBuilder::default()
                            .build_with_max_retries(settings.max_retries),
                    ))
                    .build();

                loop {
                    interval.tick().await;

                    match client
                        .get(&format!("http://{}/healthcheck", addr))
                        .send()
                        .await
                    {
                        Ok(response) if response.status().is_success() => {}
                        _ => break,
                    }
                }

                cancellation_token.cancel();

                tracing::error!("Healthcheck failed, shutting down");
            }
        });
    }

    token.cancelled().await;
    server.graceful_shutdown(None);

    Ok(())
}

async fn serve(name: &str, app: Router, port: u16) -> Result<(Handle, SocketAddr)> {
    let bind_addr: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    info!(
        subject = "app_start",
        category = "init",
        "{} server listening on {}",
        name,
        bind_addr
    );

    let handle = Handle::new();

    tokio::spawn({
        let handle = handle.clone();
        async move {
            axum_server::bind(bind_addr)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
    });

    let addr = handle
        .listening()
        .await
        .ok_or_else(|| anyhow!("{name} server failed to bind {bind_addr}"))?;

    Ok((handle, addr))
}

/// Captures and waits for system signals.
async fn capture_sigterm() {
    #[cfg(unix)]
    let term = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = term => {}
    };
}

/// Structured logs to stdout, JSON everywhere but local development.
fn setup_tracing(
    writer: tracing_appender::non_blocking::NonBlocking,
    environment: AppEnvironment,
) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lapmart_server=info,tower_http=info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true);

    let fmt_layer = if environment == AppEnvironment::Local {
        fmt_layer.boxed()
    } else {
        fmt_layer.json().boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
}
