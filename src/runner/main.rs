//! Runs the application-admin scenario against the services named in the
//! settings. Settings come from `$XDG_CONFIG_HOME/horusec-e2e/config.toml`
//! (or the path given as the first argument) and `HORUSEC_E2E_*`
//! environment variables.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use horusec_e2e::{scenario, Client, Settings};
use tracing::{debug, error, info};

fn load_settings() -> anyhow::Result<Settings> {
    let settings = match std::env::args_os().nth(1) {
        Some(path) => Settings::load_from(&PathBuf::from(path), true),
        None => Settings::load(),
    };

    settings.context("failed to load settings")
}

fn run() -> anyhow::Result<()> {
    let settings = load_settings()?;

    debug!("auth service: {:?}", settings.auth_url);
    debug!("account service: {:?}", settings.account_url);

    // use the same http client for all requests
    let client = Client::new(settings.clone()).context("failed to build the http client")?;
    let report = scenario::run_application_admin(&client, &settings.fixture)?;

    info!(
        "scenario passed in {} steps using company {}",
        report.steps, report.company_id
    );

    Ok(())
}

fn main() -> ExitCode {
    // setup logging
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "e2e=debug,horusec_e2e=info".into()),
        )
        .with_writer(writer)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to set global default subscriber");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
