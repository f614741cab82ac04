//! Serves the fake auth and account services on their usual ports, for
//! dry runs of the e2e runner without a deployed stack.
//!
//! `FAKE_AUTH_ADDR` and `FAKE_ACCOUNT_ADDR` override the bind addresses and
//! `FAKE_AUTH_HEADER` the header the bearer token is read from.
use std::net::TcpListener;

use anyhow::Context;
use horusec_e2e::config::DEFAULT_AUTH_HEADER;
use horusec_e2e::fake::{self, AppState};
use tracing::info;

fn listener(var: &str, default: &str) -> anyhow::Result<TcpListener> {
    let addr = std::env::var(var).unwrap_or_else(|_| default.to_owned());

    TcpListener::bind(&addr).with_context(|| format!("failed to bind {addr}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fake_horusec=debug,horusec_e2e=debug".into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global default subscriber")?;

    let auth = listener("FAKE_AUTH_ADDR", "127.0.0.1:8006")?;
    let account = listener("FAKE_ACCOUNT_ADDR", "127.0.0.1:8003")?;

    info!("auth service listening on {}", auth.local_addr()?);
    info!("account service listening on {}", account.local_addr()?);

    let auth_header =
        std::env::var("FAKE_AUTH_HEADER").unwrap_or_else(|_| DEFAULT_AUTH_HEADER.to_owned());
    let state = AppState::with_auth_header(&auth_header).into_shared();

    fake::serve(auth, account, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
