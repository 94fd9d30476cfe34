//! Serves the relay from environment configuration and sweeps expired state in the background.
//!
//! ```sh
//! RELAY_BASE_URL=http://127.0.0.1:8080 \
//! UPSTREAM_AUTHORIZE_URL=https://accounts.google.com/o/oauth2/v2/auth \
//! UPSTREAM_TOKEN_URL=https://oauth2.googleapis.com/token \
//! UPSTREAM_CLIENT_ID=... UPSTREAM_CLIENT_SECRET=... \
//! UPSTREAM_SCOPES=https://www.googleapis.com/auth/tagmanager.readonly \
//! cargo run --example relay_server
//! ```

// std
use std::sync::Arc;
// crates.io
use axum::{Json, Router, routing::get};
use color_eyre::Result;
use serde_json::{Value, json};
use tokio::net::TcpListener;
// self
use oauth2_relay::{
	broker::ReqwestBroker,
	config::BrokerConfig,
	server::{self, Authenticated},
};

async fn upstream_expiry(Authenticated(credential): Authenticated) -> Json<Value> {
	Json(json!({
		"client_id": credential.client_id,
		"upstream_expires_at": credential.expires_at.unix_timestamp(),
	}))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let listen = std::env::var("RELAY_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());
	let broker = Arc::new(ReqwestBroker::new(BrokerConfig::from_env()?)?);
	let sweeper = broker.spawn_sweeper();
	let app = server::router(broker.clone()).merge(
		Router::new().route("/api/upstream-expiry", get(upstream_expiry)).with_state(broker.clone()),
	);
	let listener = TcpListener::bind(&listen).await?;

	println!("Relay issuer {} listening on {listen}.", broker.config().issuer());

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
	sweeper.stop().await;

	Ok(())
}

async fn shutdown_signal() {
	if tokio::signal::ctrl_c().await.is_err() {
		eprintln!("Failed to listen for Ctrl-C; shutting down.");
	}
}
