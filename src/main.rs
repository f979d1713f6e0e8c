#![allow(unused_imports)]

#[macro_use]
extern crate log;

use std::env;
use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use failure::format_err;
use prometheus::{Encoder, Registry, TextEncoder};

use dashcat::{
    config::Settings, model::DeclaredApplication, spawn_fake_probe_server, ClusterInfoProvider,
    DemoClusterInfoProvider, LiveClusterInfoProvider, StatusFetcher,
};

/// The three applications the demo fixture describes (§9),
/// mirroring the original's `demoDeployments` / `demoIngresses` naming.
fn demo_declared_apps() -> Vec<DeclaredApplication> {
    let checked = |name: &str| {
        let mut properties = std::collections::HashMap::new();
        properties.insert("deployment".to_string(), "kubernetes".to_string());
        properties.insert("healthCheckPath".to_string(), "/health".to_string());
        DeclaredApplication { name: name.to_string(), team: "platform".to_string(), properties }
    };
    vec![checked("flamingo"), checked("akeneo"), checked("keycloak")]
}

/// Loads the declared-applications document for live mode. The full
/// architectural project loader is out of scope (§1 Non-goals); this reads
/// a flat YAML list of the shape status fetching actually needs.
fn load_declared_apps(path: &str) -> dashcat::Result<Vec<DeclaredApplication>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format_err!("could not read declared applications file {}: {}", path, e))?;
    let apps: Vec<DeclaredApplication> = serde_yaml::from_str(&contents)
        .map_err(|e| format_err!("could not parse declared applications file {}: {}", path, e))?;
    Ok(apps)
}

struct AppState {
    fetcher: Arc<StatusFetcher>,
    registry: Registry,
}

async fn health(_: web::Data<Arc<AppState>>) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

async fn results(state: web::Data<Arc<AppState>>) -> impl Responder {
    let results = state.fetcher.get_current_result().await;
    HttpResponse::Ok().json(results)
}

async fn metrics_endpoint(state: web::Data<Arc<AppState>>) -> impl Responder {
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok().content_type(encoder.format_type()).body(buffer)
}

#[actix_rt::main]
async fn main() -> dashcat::Result<()> {
    env::set_var("RUST_LOG", "actix_web=info,dashcat=info,kube=info");
    if let Ok(level) = env::var("LOG_LEVEL") {
        if level.to_lowercase() == "debug" {
            env::set_var("RUST_LOG", "actix_web=info,dashcat=debug,kube=debug");
        }
    }
    env_logger::init();

    let settings = Settings::from_env_and_args();

    let (provider, declared_apps): (Box<dyn ClusterInfoProvider>, Vec<DeclaredApplication>) =
        if settings.demo_mode {
            info!("Starting in demo mode on fake probe port {}", settings.fake_probe_port);
            spawn_fake_probe_server(settings.fake_probe_port)
                .await
                .expect("Failed to start fake probe responder");
            (Box::new(DemoClusterInfoProvider::new(settings.fake_probe_port)), demo_declared_apps())
        } else {
            info!("Connecting to namespace {}", settings.namespace);
            let provider = LiveClusterInfoProvider::from_env(settings.namespace.clone())
                .await
                .expect("Failed to initialise live cluster client");
            let apps_path = settings
                .declared_apps_path
                .as_ref()
                .expect("DECLARED_APPS_PATH (or --declared-apps) is required outside demo mode");
            let apps = load_declared_apps(apps_path).expect("Failed to load declared applications");
            (Box::new(provider), apps)
        };

    let registry = Registry::new();
    dashcat::metrics::register(&registry).expect("Failed to register metrics");

    let fetcher = StatusFetcher::new(provider, settings.ignored_services.clone(), declared_apps)
        .expect("Failed to build probe client");

    let background = fetcher.clone();
    tokio::spawn(async move {
        background.run().await;
    });

    let state = Arc::new(AppState { fetcher, registry });

    info!("Starting listening on {}", settings.listen);
    HttpServer::new(move || {
        App::new()
            .data(state.clone())
            .wrap(actix_web::middleware::Logger::default().exclude("/health"))
            .route("/health", web::get().to(health))
            .route("/results", web::get().to(results))
            .route("/metrics", web::get().to(metrics_endpoint))
    })
    .bind(&settings.listen)
    .expect("Can not bind to configured listen address")
    .shutdown_timeout(0)
    .run()
    .await?;

    Ok(())
}
