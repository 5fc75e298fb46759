// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Roster user directory synchronization server binary.

use clap::{Parser, Subcommand};
use roster_server::{create_app_state, create_router, DirectoryRepository};
use roster_server_config::LogFormat;
use roster_server_db::{create_pool, run_migrations};
use std::sync::Arc;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod version;

/// Roster server - webhook-driven user directory synchronization.
#[derive(Parser, Debug)]
#[command(
	name = "roster-server",
	about = "Webhook-driven user directory synchronization server",
	version
)]
struct Args {
	/// Path to a TOML configuration file
	#[arg(long)]
	config: Option<std::path::PathBuf>,

	/// Override the HTTP listen port
	#[arg(long)]
	port: Option<u16>,

	/// Override the database URL
	#[arg(long)]
	database_url: Option<String>,

	/// Subcommands for roster-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Parse CLI arguments
	let args = Args::parse();

	// Handle subcommands that should not start the server
	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	// Load configuration, then apply CLI overrides
	let mut config = match &args.config {
		Some(path) => roster_server_config::load_config_with_file(path)?,
		None => roster_server_config::load_config()?,
	};
	if let Some(port) = args.port {
		config.http.port = port;
	}
	if let Some(database_url) = args.database_url {
		config.database.url = database_url;
	}

	// Setup tracing
	let registry = tracing_subscriber::registry().with(
		tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| config.logging.level.clone().into()),
	);
	match config.logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting roster-server"
	);

	// Create database pool and run migrations
	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;

	let store = Arc::new(DirectoryRepository::new(pool));
	let state = create_app_state(store, &config);

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	// Start server
	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
