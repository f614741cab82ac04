//! Actions against the auth service.
use std::collections::HashMap;

use reqwest::StatusCode;
use tracing::{info, instrument};

use super::{decode, require_content, Client, Operation};
use crate::error::ActionError;
use crate::request::{Account, Credentials};
use crate::response::{into_string_map, ACCESS_TOKEN};

const CREATE_ACCOUNT_PATH: &str = "/auth/account/create-account";
const AUTHENTICATE_PATH: &str = "/auth/auth/authenticate";
const LOGOUT_PATH: &str = "/auth/account/logout";

impl Client {
    /// Registers a new account. Expects `201 Created` and a non-empty
    /// content.
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub fn create_account(&self, account: &Account) -> Result<(), ActionError> {
        let operation = Operation::CreateAccount;
        info!("running {operation}");

        let builder = self.http.post(self.auth_url(CREATE_ACCOUNT_PATH)).json(account);
        let body = self.send(operation, builder, StatusCode::CREATED)?;

        require_content(operation, &body)?;

        Ok(())
    }

    /// Logs in and returns the login content, which carries the bearer token
    /// under [`ACCESS_TOKEN`].
    ///
    /// A body without content yields an empty map. A body that is not an
    /// envelope, or whose content is not an object, is a decode error.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub fn login(&self, credentials: &Credentials) -> Result<HashMap<String, String>, ActionError> {
        let operation = Operation::Login;
        info!("running {operation}");

        let builder = self.http.post(self.auth_url(AUTHENTICATE_PATH)).json(credentials);
        let body = self.send(operation, builder, StatusCode::OK)?;

        match decode(operation, &body)? {
            Some(content) => into_string_map(content)
                .map_err(|source| ActionError::Decode { operation, source }),
            None => Ok(HashMap::new()),
        }
    }

    /// Ends the session of `bearer_token`. Expects `204 No Content`.
    #[instrument(skip_all)]
    pub fn logout(&self, bearer_token: &str) -> Result<(), ActionError> {
        let operation = Operation::Logout;
        info!("running {operation}");

        let builder = self.authorized(self.http.post(self.auth_url(LOGOUT_PATH)), bearer_token);

        self.send(operation, builder, StatusCode::NO_CONTENT)?;

        Ok(())
    }
}

/// Picks the bearer token out of a login content.
pub fn access_token(login: &HashMap<String, String>) -> Result<&str, ActionError> {
    let token = login.get(ACCESS_TOKEN).ok_or(ActionError::MissingField {
        operation: Operation::Login,
        field: ACCESS_TOKEN,
    })?;

    if token.is_empty() {
        return Err(ActionError::EmptyField {
            operation: Operation::Login,
            field: ACCESS_TOKEN,
        });
    }

    Ok(token)
}
