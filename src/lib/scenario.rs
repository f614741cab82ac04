//! The application-admin flow: an admin account manages the whole
//! lifecycle of a company and cleans up after itself.
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::actions::Client;
use crate::request::{Account, Company};
use crate::response::{parse_companies, CompanyRecord};
use crate::session::Session;

/// The account and company the scenario works with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Fixture {
    pub email: String,
    pub username: String,
    pub password: String,
    pub company_name: String,
    /// Skip this when the account already exists in the target
    /// environment, e.g. a seeded application admin.
    pub create_account: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            email: "e2e@horusec.io".to_owned(),
            username: "e2e_user".to_owned(),
            password: "Ch@ng3m3".to_owned(),
            company_name: "zup".to_owned(),
            create_account: true,
        }
    }
}

impl Fixture {
    pub fn account(&self) -> Account {
        Account::new(&self.email, &self.username, &self.password)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub company_id: String,
    pub steps: usize,
}

/// Runs the whole flow. The session is released even when a step fails.
#[instrument(skip_all, fields(email = %fixture.email))]
pub fn run_application_admin(client: &Client, fixture: &Fixture) -> anyhow::Result<Report> {
    let mut steps = 0;
    let account = fixture.account();

    if fixture.create_account {
        client
            .create_account(&account)
            .context("failed to create the admin account")?;
        steps += 1;
    }

    let mut session =
        Session::login(client, &account.credentials()).context("failed to log in")?;
    steps += 1;

    let company = Company::named(&fixture.company_name)
        .with_description("created by the e2e suite")
        .with_admin_email(&fixture.email);
    let company_id = session
        .create_company(&company)
        .context("failed to create the company")?;
    steps += 1;

    let listed = list(&session)?;
    steps += 1;
    if !listed.iter().any(|c| c.company_id == company_id) {
        bail!("created company {company_id} is not listed");
    }

    let renamed = format!("{} updated", fixture.company_name);
    session
        .update_company(&company_id, &Company::named(&renamed))
        .context("failed to update the company")?;
    steps += 1;

    let listed = list(&session)?;
    steps += 1;
    match listed.iter().find(|c| c.company_id == company_id) {
        Some(c) if c.name == renamed => {}
        Some(c) => bail!("company {company_id} kept the name {:?} after update", c.name),
        None => bail!("updated company {company_id} is not listed"),
    }

    session
        .delete_company(&company_id)
        .context("failed to delete the company")?;
    steps += 1;

    let content = session
        .read_all_companies(false)
        .context("failed to list companies")?;
    steps += 1;
    if parse_companies(&content)
        .context("failed to parse the company listing")?
        .iter()
        .any(|c| c.company_id == company_id)
    {
        bail!("deleted company {company_id} is still listed");
    }

    session.close().context("failed to log out")?;
    steps += 1;

    info!(%company_id, steps, "application admin scenario passed");

    Ok(Report { company_id, steps })
}

fn list(session: &Session<'_>) -> anyhow::Result<Vec<CompanyRecord>> {
    let content = session
        .read_all_companies(true)
        .context("failed to list companies")?;

    parse_companies(&content).context("failed to parse the company listing")
}
