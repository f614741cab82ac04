//! This module includes all routes served by the fake services.
use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    response::Response,
    Extension, Json,
};
use serde_json::json;
use tracing::{debug, error, instrument, warn};

use super::{create_token, envelope, payload, Caller, FakeError, SharedState};
use crate::request::{Account, Company, Credentials};

/// Registers an account.
#[instrument(skip(state, body))]
pub async fn create_account(
    Extension(state): Extension<SharedState>,
    body: Result<Json<Account>, JsonRejection>,
) -> Result<Response, FakeError> {
    let account = payload(body)?;

    debug!("creating account {:?}", account.email);

    if account.email.is_empty() || account.password.is_empty() {
        warn!("account payload is missing its email or password");
        return Err(FakeError::MissingCredentials);
    }

    let mut state = state.write().map_err(|err| {
        error!("error acquiring the lock for app state: {:?}", err);
        FakeError::OperationFailed
    })?;

    if state.accounts.contains_key(&account.email) {
        warn!("account {:?} already exists", account.email);
        return Err(FakeError::AccountExists);
    }

    state.accounts.insert(account.email.clone(), account);

    Ok(envelope(StatusCode::CREATED, "account created"))
}

/// Checks the credentials and issues a bearer token.
#[instrument(skip(state, body))]
pub async fn authenticate(
    Extension(state): Extension<SharedState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, FakeError> {
    let credentials = payload(body)?;

    debug!("authenticating user {:?}", credentials.username);

    if credentials.username.is_empty() || credentials.password.is_empty() {
        warn!("user attempted to authenticate with empty credentials");
        return Err(FakeError::MissingCredentials);
    }

    let mut state = state.write().map_err(|err| {
        error!("error acquiring the lock for app state: {:?}", err);
        FakeError::OperationFailed
    })?;

    let account = state
        .find_account(&credentials.username)
        .filter(|account| account.password == credentials.password)
        .cloned()
        .ok_or_else(|| {
            warn!("user {:?} failed to authenticate", credentials.username);
            FakeError::InvalidCredentials
        })?;
    let serial = state.next_serial();
    let (token, exp) = create_token(&account.email, serial, chrono::Utc::now())?;

    state.sessions.insert(token.clone());

    Ok(envelope(
        StatusCode::OK,
        json!({
            "accessToken": token,
            "username": account.username,
            "email": account.email,
            "expiresAt": exp,
            "isApplicationAdmin": true,
        }),
    ))
}

/// Revokes the caller's token.
#[instrument(skip(state, caller), fields(email = %caller.email))]
pub async fn logout(
    caller: Caller,
    Extension(state): Extension<SharedState>,
) -> Result<StatusCode, FakeError> {
    debug!("logging out");

    let mut state = state.write().map_err(|_| FakeError::OperationFailed)?;

    state.sessions.remove(&caller.token);

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, caller, body), fields(email = %caller.email))]
pub async fn create_company(
    caller: Caller,
    Extension(state): Extension<SharedState>,
    body: Result<Json<Company>, JsonRejection>,
) -> Result<Response, FakeError> {
    let company = payload(body)?;

    debug!("creating company {:?}", company.name);

    if company.name.is_empty() {
        return Err(FakeError::MissingCompanyName);
    }

    let mut state = state.write().map_err(|_| FakeError::OperationFailed)?;
    let company_id = state.insert_company(company);
    let record = state
        .company_record(&company_id)
        .ok_or(FakeError::OperationFailed)?;

    Ok(envelope(StatusCode::CREATED, record))
}

/// Applies the set fields of the payload to an existing company.
#[instrument(skip(state, caller, body), fields(email = %caller.email))]
pub async fn update_company(
    caller: Caller,
    Path(company_id): Path<String>,
    Extension(state): Extension<SharedState>,
    body: Result<Json<Company>, JsonRejection>,
) -> Result<Response, FakeError> {
    let update = payload(body)?;

    debug!("updating company {:?}", company_id);

    let mut state = state.write().map_err(|_| FakeError::OperationFailed)?;
    let company = state
        .companies
        .get_mut(&company_id)
        .ok_or(FakeError::CompanyNotFound)?;

    if !update.name.is_empty() {
        company.name = update.name;
    }
    if update.description.is_some() {
        company.description = update.description;
    }
    if update.admin_email.is_some() {
        company.admin_email = update.admin_email;
    }
    if update.authz_member.is_some() {
        company.authz_member = update.authz_member;
    }
    if update.authz_admin.is_some() {
        company.authz_admin = update.authz_admin;
    }

    let record = state
        .company_record(&company_id)
        .ok_or(FakeError::OperationFailed)?;

    Ok(envelope(StatusCode::OK, record))
}

#[instrument(skip(state, caller), fields(email = %caller.email))]
pub async fn list_companies(
    caller: Caller,
    Extension(state): Extension<SharedState>,
) -> Result<Response, FakeError> {
    let state = state.read().map_err(|_| FakeError::OperationFailed)?;

    Ok(envelope(StatusCode::OK, state.company_records()))
}

#[instrument(skip(state, caller), fields(email = %caller.email))]
pub async fn delete_company(
    caller: Caller,
    Path(company_id): Path<String>,
    Extension(state): Extension<SharedState>,
) -> Result<StatusCode, FakeError> {
    debug!("deleting company {:?}", company_id);

    let mut state = state.write().map_err(|_| FakeError::OperationFailed)?;

    match state.companies.remove(&company_id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(FakeError::CompanyNotFound),
    }
}
