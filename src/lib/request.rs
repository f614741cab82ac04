//! This module declares all types that may be used as request payloads.
use serde::{Deserialize, Serialize};

/// Registration payload for a new account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl Account {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// The credentials that log in as this account.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

/// Login payload. The username is the account e-mail.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Payload for creating or updating a company.
///
/// Unset optional fields are left out of the body, so an update only
/// touches what is set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authz_member: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authz_admin: Option<Vec<String>>,
}

impl Company {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn company_skips_unset_fields() {
        let company = Company::named("acme").with_admin_email("admin@acme.io");

        assert_eq!(
            serde_json::to_value(&company).unwrap(),
            json!({ "name": "acme", "adminEmail": "admin@acme.io" })
        );
    }

    #[test]
    fn account_credentials_use_email() {
        let account = Account::new("e2e@horusec.io", "e2e", "Ch@ng3m3");

        assert_eq!(
            account.credentials(),
            Credentials::new("e2e@horusec.io", "Ch@ng3m3")
        );
    }
}
