//! This module stores the in-memory records shared by both fake services.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::config::DEFAULT_AUTH_HEADER;
use crate::request::{Account, Company};
use crate::response::CompanyRecord;

pub type SharedState = Arc<RwLock<AppState>>;

/// The shared state for the fake services.
#[derive(Debug)]
pub struct AppState {
    /// Header the bearer token is read from.
    pub auth_header: String,
    /// Registered accounts by e-mail.
    pub accounts: HashMap<String, Account>,
    /// Tokens that were issued and not logged out.
    pub sessions: HashSet<String>,
    /// Companies by id.
    pub companies: BTreeMap<String, Company>,
    issued: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_auth_header(DEFAULT_AUTH_HEADER)
    }
}

impl AppState {
    /// Creates a new [`AppState`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new [`AppState`] whose services expect the bearer token in
    /// `auth_header`.
    pub fn with_auth_header(auth_header: &str) -> Self {
        Self {
            auth_header: auth_header.to_owned(),
            accounts: HashMap::new(),
            sessions: HashSet::new(),
            companies: BTreeMap::new(),
            issued: 0,
        }
    }

    pub fn shared() -> SharedState {
        Self::new().into_shared()
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Looks an account up by e-mail or username.
    pub fn find_account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username).or_else(|| {
            self.accounts
                .values()
                .find(|account| account.username == username)
        })
    }

    /// A number never handed out before, used for token and company ids.
    pub fn next_serial(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn insert_company(&mut self, company: Company) -> String {
        let company_id = format!("company-{:04}", self.next_serial());

        self.companies.insert(company_id.clone(), company);

        company_id
    }

    pub fn company_record(&self, company_id: &str) -> Option<CompanyRecord> {
        self.companies
            .get(company_id)
            .map(|company| record(company_id, company))
    }

    pub fn company_records(&self) -> Vec<CompanyRecord> {
        self.companies
            .iter()
            .map(|(company_id, company)| record(company_id, company))
            .collect()
    }
}

fn record(company_id: &str, company: &Company) -> CompanyRecord {
    CompanyRecord {
        company_id: company_id.to_owned(),
        name: company.name.clone(),
        description: company.description.clone(),
        role: Some("admin".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_accounts_by_email_or_username() {
        let mut state = AppState::new();
        let account = Account::new("e2e@horusec.io", "e2e", "pw");
        state.accounts.insert(account.email.clone(), account.clone());

        assert_eq!(state.find_account("e2e@horusec.io"), Some(&account));
        assert_eq!(state.find_account("e2e"), Some(&account));
        assert_eq!(state.find_account("other"), None);
    }

    #[test]
    fn company_ids_are_unique() {
        let mut state = AppState::new();
        let first = state.insert_company(Company::named("a"));
        let second = state.insert_company(Company::named("a"));

        assert_ne!(first, second);
        assert_eq!(state.company_records().len(), 2);
        assert_eq!(state.company_record(&first).unwrap().name, "a");
    }
}
