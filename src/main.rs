//! Quiz Rush Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod config;
mod dao;
mod dto;
mod error;
mod rank;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::{models::QuestionEntity, quiz_store::QuizStore, quiz_store::memory::MemoryStore};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = Arc::new(MemoryStore::new());
    seed_question_bank(store.as_ref(), &config).await;

    let app_state = AppState::new(config, store);
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Load the configured question bank into the store, skipping entries whose
/// correct answer is not one of the options.
async fn seed_question_bank(store: &dyn QuizStore, config: &AppConfig) {
    let mut seeded = 0usize;
    for entry in config.question_bank() {
        if !entry.options.contains(&entry.correct_answer) {
            warn!(
                question = %entry.question,
                "skipping question whose correct answer is not an option"
            );
            continue;
        }

        let question = QuestionEntity {
            id: Uuid::new_v4(),
            question: entry.question.clone(),
            options: entry.options.clone(),
            correct_answer: entry.correct_answer.clone(),
            category: entry.category.clone(),
            difficulty: entry.difficulty.clone(),
        };
        if let Err(err) = store.insert_question(question).await {
            warn!(error = %err, "failed to seed question");
            continue;
        }
        seeded += 1;
    }

    info!(count = seeded, "seeded question bank");
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
