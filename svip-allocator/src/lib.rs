//! SVIP Allocator Library
//!
//! Turns per-security factor scores into a constrained portfolio allocation:
//! target weights, cash reserve, pool membership and a trading action per
//! security.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  svip-allocator (Rust Service)                      │
//! │                           :4450                                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Pools / Cash   │  │  Weights / Caps │  │  Rotation /     │      │
//! │  │  Policy         │  │  Projection     │  │  Actions        │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Cap hierarchy
//! - **Single security**: market-specific, iterative clip and redistribute
//! - **Theme bucket**: market-specific, proportional scaling
//! - **Sector**: global, proportional scaling, applied last
//!
//! ## Turnover control
//! - New positions open at `initial_position_ratio` of their computed size
//! - Existing positions grow only while accelerating
//! - Expensive names are never bought

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod allocation;
pub mod report;
pub mod routes;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use svip_common::config::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub use routes::{build_router, AppState};

/// Largest accepted request body.
const MAX_REQUEST_BYTES: usize = 4 * 1024 * 1024;

/// Per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Main allocation service
pub struct AllocatorService {
    state: AppState,
}

impl AllocatorService {
    /// Create a new allocation service; the configuration must validate.
    pub fn new(config: Config) -> Result<Self> {
        let state = AppState::new(config).context("Invalid allocation configuration")?;
        Ok(Self { state })
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<()> {
        let server = &self.state.config.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = build_router(self.state.clone())
            .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(cors);

        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down");
    }
}
