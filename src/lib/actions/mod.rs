//! The end-to-end actions, one blocking round trip each.
//!
//! Account actions talk to the auth service and company actions to the
//! account service. Both share the request/check/decode plumbing below.
use std::fmt;

use reqwest::blocking::RequestBuilder;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::Settings;
use crate::error::ActionError;
use crate::response::{decode_content, is_empty_value};

pub mod account;
pub mod company;

pub use account::access_token;

/// The operations an [`ActionError`] can be raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    Login,
    Logout,
    CreateCompany,
    UpdateCompany,
    ReadAllCompanies,
    DeleteCompany,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateAccount => "create account",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::CreateCompany => "create company",
            Self::UpdateCompany => "update company",
            Self::ReadAllCompanies => "read all companies",
            Self::DeleteCompany => "delete company",
        };

        f.write_str(name)
    }
}

/// Runs the actions against the services named in its [`Settings`].
///
/// The underlying HTTP client, and so its connection pool, is shared by
/// every call.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::blocking::Client,
    settings: Settings,
}

impl Client {
    pub fn new(settings: Settings) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::blocking::Client::builder();

        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.auth_url.trim_end_matches('/'), path)
    }

    fn account_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.account_url.trim_end_matches('/'), path)
    }

    /// Attaches the bearer token under the configured header.
    fn authorized(&self, builder: RequestBuilder, bearer_token: &str) -> RequestBuilder {
        builder.header(self.settings.auth_header.as_str(), bearer_token)
    }

    /// Builds and sends the request, then reads the whole body. The body is
    /// returned only if the status is the expected one.
    fn send(
        &self,
        operation: Operation,
        builder: RequestBuilder,
        expected: StatusCode,
    ) -> Result<String, ActionError> {
        let request = builder
            .build()
            .map_err(|source| ActionError::Mount { operation, source })?;

        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self
            .http
            .execute(request)
            .map_err(|source| ActionError::Send { operation, source })?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|source| ActionError::Send { operation, source })?;

        debug!(%status, "received response");
        trace!(%body);

        if status != expected {
            return Err(ActionError::UnexpectedStatus {
                operation,
                expected,
                actual: status,
                body,
            });
        }

        Ok(body)
    }
}

fn decode(operation: Operation, body: &str) -> Result<Option<Value>, ActionError> {
    decode_content(body).map_err(|source| ActionError::Decode { operation, source })
}

/// Decodes the envelope and checks its content is present and non-empty.
fn require_content(operation: Operation, body: &str) -> Result<Value, ActionError> {
    let content = decode(operation, body)?.ok_or(ActionError::MissingField {
        operation,
        field: "content",
    })?;

    if is_empty_value(&content) {
        return Err(ActionError::EmptyField {
            operation,
            field: "content",
        });
    }

    Ok(content)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Client;
    use crate::config::Settings;

    /// A client whose both services are the given mock server.
    pub fn client_for(server: &mockito::Server) -> Client {
        Client::new(Settings::local(server.url(), server.url())).unwrap()
    }
}
