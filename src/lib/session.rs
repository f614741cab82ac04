//! A logged-in session that owns its bearer token and the companies
//! created through it.
//!
//! Closing the session, or dropping it, deletes every company it still
//! tracks and then logs out. Cleanup therefore also runs when a test bails
//! out early with `?` or panics halfway through a chain of actions.
//!
//! [`Session::close`] is the only supported way to log a session out.
//! Logging its token out directly through [`Client::logout`] leaves the
//! session unaware, and its release then fails to log out a second time.
use tracing::{debug, instrument, warn};

use crate::actions::{access_token, Client};
use crate::error::ActionError;
use crate::request::{Company, Credentials};

#[derive(Debug)]
pub struct Session<'a> {
    client: &'a Client,
    token: String,
    companies: Vec<String>,
    released: bool,
}

impl<'a> Session<'a> {
    /// Logs in and takes ownership of the issued token.
    pub fn login(client: &'a Client, credentials: &Credentials) -> Result<Self, ActionError> {
        let login = client.login(credentials)?;
        let token = access_token(&login)?.to_owned();

        Ok(Self::from_token(client, token))
    }

    /// Wraps a token obtained elsewhere. It is logged out on release.
    pub fn from_token(client: &'a Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            companies: Vec::new(),
            released: false,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Ids of the companies created through this session and not yet
    /// deleted.
    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    pub fn create_company(&mut self, company: &Company) -> Result<String, ActionError> {
        let company_id = self.client.create_company(&self.token, company)?;

        self.companies.push(company_id.clone());

        Ok(company_id)
    }

    pub fn update_company(&self, company_id: &str, company: &Company) -> Result<(), ActionError> {
        self.client.update_company(&self.token, company_id, company)
    }

    pub fn read_all_companies(&self, check_non_empty: bool) -> Result<String, ActionError> {
        self.client.read_all_companies(&self.token, check_non_empty)
    }

    /// Deletes the company and stops tracking it.
    pub fn delete_company(&mut self, company_id: &str) -> Result<(), ActionError> {
        self.client.delete_company(&self.token, company_id)?;

        self.companies.retain(|id| id != company_id);

        Ok(())
    }

    /// Deletes the tracked companies, logs out, and reports the first
    /// cleanup failure. Dropping the session afterwards does nothing.
    pub fn close(mut self) -> Result<(), ActionError> {
        self.release()
    }

    #[instrument(skip(self), fields(companies = self.companies.len()))]
    fn release(&mut self) -> Result<(), ActionError> {
        self.released = true;

        let mut first_error = None;

        for company_id in std::mem::take(&mut self.companies) {
            debug!(%company_id, "deleting leftover company");

            if let Err(err) = self.client.delete_company(&self.token, &company_id) {
                warn!(%company_id, "failed to delete leftover company: {err}");
                first_error.get_or_insert(err);
            }
        }

        if let Err(err) = self.client.logout(&self.token) {
            warn!("failed to log out: {err}");
            first_error.get_or_insert(err);
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if !self.released {
            // failures were already logged by release
            let _ = self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::client_for;
    use crate::actions::Operation;
    use mockito::Matcher;

    const TOKEN: &str = "token-123";

    fn mock_login(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("POST", "/auth/auth/authenticate")
            .with_status(200)
            .with_body(r#"{"content": {"accessToken": "token-123"}}"#)
            .create()
    }

    fn mock_logout(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("POST", "/auth/account/logout")
            .match_header("X-Horusec-Authorization", TOKEN)
            .with_status(204)
            .expect(1)
            .create()
    }

    #[test]
    fn drop_deletes_tracked_companies_then_logs_out() {
        let mut server = mockito::Server::new();
        mock_login(&mut server);
        server
            .mock("POST", "/account/companies")
            .with_status(201)
            .with_body(r#"{"content": {"companyID": "c-1"}}"#)
            .create();
        let delete = server
            .mock("DELETE", "/account/companies/c-1")
            .match_header("X-Horusec-Authorization", TOKEN)
            .with_status(204)
            .expect(1)
            .create();
        let logout = mock_logout(&mut server);
        let client = client_for(&server);

        {
            let mut session = Session::login(&client, &Credentials::new("a@b.io", "pw")).unwrap();
            session.create_company(&Company::named("acme")).unwrap();
            assert_eq!(session.companies(), ["c-1".to_owned()]);
        }

        delete.assert();
        logout.assert();
    }

    #[test]
    fn deleted_companies_are_not_deleted_again() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/account/companies")
            .with_status(201)
            .with_body(r#"{"content": {"companyID": "c-1"}}"#)
            .create();
        let delete = server
            .mock("DELETE", "/account/companies/c-1")
            .with_status(204)
            .expect(1)
            .create();
        let logout = mock_logout(&mut server);
        let client = client_for(&server);

        let mut session = Session::from_token(&client, TOKEN);
        let id = session.create_company(&Company::named("acme")).unwrap();
        session.delete_company(&id).unwrap();
        assert!(session.companies().is_empty());
        session.close().unwrap();

        delete.assert();
        logout.assert();
    }

    #[test]
    fn close_reports_the_first_failure_and_still_logs_out() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/account/companies")
            .with_status(201)
            .with_body(r#"{"content": {"companyID": "c-1"}}"#)
            .create();
        server
            .mock("DELETE", Matcher::Any)
            .with_status(500)
            .create();
        let logout = mock_logout(&mut server);
        let client = client_for(&server);

        let mut session = Session::from_token(&client, TOKEN);
        session.create_company(&Company::named("acme")).unwrap();
        let err = session.close().unwrap_err();

        assert_eq!(err.operation(), Operation::DeleteCompany);
        logout.assert();
    }

    #[test]
    fn close_logs_out_exactly_once() {
        let mut server = mockito::Server::new();
        mock_login(&mut server);
        let logout = mock_logout(&mut server);
        let client = client_for(&server);

        let session = Session::login(&client, &Credentials::new("a@b.io", "pw")).unwrap();
        assert_eq!(session.token(), TOKEN);
        session.close().unwrap();

        logout.assert();
    }

    #[test]
    fn login_without_token_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/auth/auth/authenticate")
            .with_status(200)
            .with_body(r#"{"content": {"username": "e2e"}}"#)
            .create();
        let client = client_for(&server);

        let err = Session::login(&client, &Credentials::new("a@b.io", "pw")).unwrap_err();

        assert!(matches!(err, ActionError::MissingField { field: "accessToken", .. }));
    }
}
