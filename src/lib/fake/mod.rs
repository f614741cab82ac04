//! An in-memory stand-in for the Horusec auth and account services.
//!
//! It answers the same endpoints with the same `content` envelope so the
//! actions can be exercised without a deployed stack. Records live in
//! memory, tokens are short lived HS256 JWTs, and any known, unexpired
//! token may touch any company. The bearer token is read from the header
//! named in [`AppState::auth_header`], so a fake started with
//! [`FakeHorusec::spawn_with_header`] accepts only that header.
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::thread::JoinHandle;

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{patch, post},
    Extension, Json, RequestPartsExt, Router,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, warn};

use crate::config::{Settings, DEFAULT_AUTH_HEADER};

pub mod routes;
pub mod state;

pub use state::{AppState, SharedState};

const DEFAULT_SECRET: &str = "horusec-e2e-fake-secret";

/// The encoding and decoding keys used for signing JWTs.
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    /// Creates the encoding and decoding keys from an HS256 secret.
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// A lazy evaluated static for loading the JWT keys from the
/// FAKE_JWT_SECRET environment variable.
static KEYS: Lazy<Keys> = Lazy::new(|| {
    let secret = std::env::var("FAKE_JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_owned());

    Keys::new(secret.as_bytes())
});

/// An error type for everything the fake services can reject.
#[derive(Error, Debug)]
pub enum FakeError {
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Email already in use")]
    AccountExists,
    #[error("Missing access token")]
    MissingToken,
    #[error("Invalid access token")]
    InvalidToken,
    #[error("Company name is required")]
    MissingCompanyName,
    #[error("Company not found")]
    CompanyNotFound,
    #[error("Operation could not be completed")]
    OperationFailed,
}

impl IntoResponse for FakeError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingCredentials => StatusCode::BAD_REQUEST,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::FORBIDDEN,
            Self::AccountExists => StatusCode::BAD_REQUEST,
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::MissingCompanyName => StatusCode::BAD_REQUEST,
            Self::CompanyNotFound => StatusCode::NOT_FOUND,
            Self::OperationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };

        envelope(status, format!("{self}"))
    }
}

/// Wraps `content` the way the real services do.
pub fn envelope<T: Serialize>(status: StatusCode, content: T) -> Response {
    let body = Json(json!({
        "code": status.as_u16(),
        "status": status.canonical_reason().unwrap_or_default(),
        "content": content,
    }));

    (status, body).into_response()
}

/// The claims to store in the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account e-mail.
    pub sub: String,
    pub exp: usize,
    /// Serial that keeps tokens issued within the same second apart.
    pub jti: u64,
}

/// Creates a new JWT for `subject`. The token will expire in one hour.
pub fn create_token(
    subject: &str,
    serial: u64,
    creation_time: chrono::DateTime<chrono::Utc>,
) -> Result<(String, usize), FakeError> {
    let exp = (creation_time.timestamp() + (60 * 60)) as usize;
    let claims = Claims {
        sub: subject.to_owned(),
        exp,
        jti: serial,
    };

    match jsonwebtoken::encode(&Header::default(), &claims, &KEYS.encoding) {
        Ok(token) => Ok((token, exp)),
        Err(err) => {
            error!("failed to sign token: {:?}", err);
            Err(FakeError::OperationFailed)
        }
    }
}

/// The authenticated caller of a protected route.
#[derive(Debug)]
pub struct Caller {
    pub email: String,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = FakeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state) = parts
            .extract::<Extension<SharedState>>()
            .await
            .map_err(|_| FakeError::OperationFailed)?;
        let state = state.read().map_err(|_| FakeError::OperationFailed)?;
        let token = parts
            .headers
            .get(state.auth_header.as_str())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(FakeError::MissingToken)?
            .to_owned();
        let token_data = jsonwebtoken::decode::<Claims>(
            &token,
            &KEYS.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| FakeError::InvalidToken)?;

        if !state.sessions.contains(&token) {
            warn!("token for {:?} was already logged out", token_data.claims.sub);
            return Err(FakeError::InvalidToken);
        }

        Ok(Caller {
            email: token_data.claims.sub,
            token,
        })
    }
}

/// Unwraps a JSON body, turning axum's rejection into an enveloped 400.
pub fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, FakeError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!("rejected request body: {}", rejection.body_text());
            Err(FakeError::InvalidPayload(rejection.body_text()))
        }
    }
}

/// Routes of the auth service.
pub fn auth_router(state: SharedState) -> Router {
    Router::new()
        .route("/auth/account/create-account", post(routes::create_account))
        .route("/auth/auth/authenticate", post(routes::authenticate))
        .route("/auth/account/logout", post(routes::logout))
        .layer(Extension(state))
}

/// Routes of the account service.
pub fn account_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/account/companies",
            post(routes::create_company).get(routes::list_companies),
        )
        .route(
            "/account/companies/:company_id",
            patch(routes::update_company).delete(routes::delete_company),
        )
        .layer(Extension(state))
}

/// Serves both services on the given listeners until `shutdown` resolves.
pub async fn serve<F>(
    auth: TcpListener,
    account: TcpListener,
    state: SharedState,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop, stopped) = watch::channel(false);

    tokio::spawn(async move {
        shutdown.await;
        let _ = stop.send(true);
    });

    let auth = axum::Server::from_tcp(auth)?
        .serve(auth_router(state.clone()).into_make_service())
        .with_graceful_shutdown(wait_for_stop(stopped.clone()));
    let account = axum::Server::from_tcp(account)?
        .serve(account_router(state).into_make_service())
        .with_graceful_shutdown(wait_for_stop(stopped));

    tokio::try_join!(auth, account)?;

    Ok(())
}

async fn wait_for_stop(mut stopped: watch::Receiver<bool>) {
    while !*stopped.borrow() {
        if stopped.changed().await.is_err() {
            break;
        }
    }
}

/// Both fake services running on a background thread. Dropping the handle
/// stops them.
#[derive(Debug)]
pub struct FakeHorusec {
    auth_addr: SocketAddr,
    account_addr: SocketAddr,
    state: SharedState,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeHorusec {
    /// Starts both services on ephemeral loopback ports.
    pub fn spawn() -> std::io::Result<Self> {
        Self::spawn_with_header(DEFAULT_AUTH_HEADER)
    }

    /// Like [`spawn`](Self::spawn), reading the bearer token from
    /// `auth_header`.
    pub fn spawn_with_header(auth_header: &str) -> std::io::Result<Self> {
        Self::bind(
            SocketAddr::from(([127, 0, 0, 1], 0)),
            SocketAddr::from(([127, 0, 0, 1], 0)),
            AppState::with_auth_header(auth_header).into_shared(),
        )
    }

    pub fn bind(
        auth_addr: SocketAddr,
        account_addr: SocketAddr,
        state: SharedState,
    ) -> std::io::Result<Self> {
        let auth = TcpListener::bind(auth_addr)?;
        let account = TcpListener::bind(account_addr)?;
        let auth_addr = auth.local_addr()?;
        let account_addr = account.local_addr()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (shutdown, signal) = oneshot::channel::<()>();
        let served = state.clone();

        let thread = std::thread::Builder::new()
            .name("fake-horusec".to_owned())
            .spawn(move || {
                let result = runtime.block_on(serve(auth, account, served, async move {
                    let _ = signal.await;
                }));

                if let Err(err) = result {
                    error!("fake services stopped: {:?}", err);
                }
            })?;

        debug!(%auth_addr, %account_addr, "fake services started");

        Ok(Self {
            auth_addr,
            account_addr,
            state,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    /// Settings that point a client at these services, bearer header
    /// included.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::local(
            format!("http://{}", self.auth_addr),
            format!("http://{}", self.account_addr),
        );

        if let Ok(state) = self.state.read() {
            settings.auth_header = state.auth_header.clone();
        }

        settings
    }

    /// The records behind the services, for inspection.
    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

impl Drop for FakeHorusec {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("fake services thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_decode_with_the_same_keys() {
        let now = chrono::Utc::now();
        let (token, exp) = create_token("e2e@horusec.io", 7, now).unwrap();
        let decoded = jsonwebtoken::decode::<Claims>(
            &token,
            &KEYS.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, "e2e@horusec.io");
        assert_eq!(decoded.claims.jti, 7);
        assert_eq!(exp as i64, now.timestamp() + 3600);
    }

    #[test]
    fn tokens_with_different_serials_differ() {
        let now = chrono::Utc::now();
        let (first, _) = create_token("e2e@horusec.io", 1, now).unwrap();
        let (second, _) = create_token("e2e@horusec.io", 2, now).unwrap();

        assert_ne!(first, second);
    }
}
