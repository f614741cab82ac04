//! Actions against the account service.
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{decode, require_content, Client, Operation};
use crate::error::ActionError;
use crate::request::Company;
use crate::response::{is_empty_value, COMPANY_ID};

const COMPANIES_PATH: &str = "/account/companies";

fn company_path(company_id: &str) -> String {
    format!("{COMPANIES_PATH}/{company_id}")
}

impl Client {
    /// Creates a company and returns its identifier. Expects `201 Created`
    /// and a non-empty `companyID` in the content.
    #[instrument(skip(self, bearer_token, company), fields(name = %company.name))]
    pub fn create_company(
        &self,
        bearer_token: &str,
        company: &Company,
    ) -> Result<String, ActionError> {
        let operation = Operation::CreateCompany;
        info!("running {operation}");

        let builder = self.authorized(
            self.http.post(self.account_url(COMPANIES_PATH)).json(company),
            bearer_token,
        );
        let body = self.send(operation, builder, StatusCode::CREATED)?;
        let content = require_content(operation, &body)?;

        let company_id = match content.get(COMPANY_ID) {
            None | Some(Value::Null) => {
                return Err(ActionError::MissingField {
                    operation,
                    field: COMPANY_ID,
                })
            }
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
        };

        if company_id.is_empty() {
            return Err(ActionError::EmptyField {
                operation,
                field: COMPANY_ID,
            });
        }

        debug!(%company_id, "company created");

        Ok(company_id)
    }

    /// Updates the company. Expects `200 OK` and a non-empty content.
    #[instrument(skip(self, bearer_token, company))]
    pub fn update_company(
        &self,
        bearer_token: &str,
        company_id: &str,
        company: &Company,
    ) -> Result<(), ActionError> {
        let operation = Operation::UpdateCompany;
        info!("running {operation}");

        let builder = self.authorized(
            self.http.patch(self.account_url(&company_path(company_id))).json(company),
            bearer_token,
        );
        let body = self.send(operation, builder, StatusCode::OK)?;

        require_content(operation, &body)?;

        Ok(())
    }

    /// Lists the companies visible to the token and returns the content
    /// re-encoded as JSON (`null` when there is none). With
    /// `check_non_empty` an empty listing is an error.
    #[instrument(skip(self, bearer_token))]
    pub fn read_all_companies(
        &self,
        bearer_token: &str,
        check_non_empty: bool,
    ) -> Result<String, ActionError> {
        let operation = Operation::ReadAllCompanies;
        info!("running {operation}");

        let builder =
            self.authorized(self.http.get(self.account_url(COMPANIES_PATH)), bearer_token);
        let body = self.send(operation, builder, StatusCode::OK)?;
        let content = decode(operation, &body)?.unwrap_or(Value::Null);

        if check_non_empty && is_empty_value(&content) {
            return Err(ActionError::EmptyField {
                operation,
                field: "content",
            });
        }

        serde_json::to_string(&content).map_err(|source| ActionError::Decode { operation, source })
    }

    /// Deletes the company. Expects `204 No Content`; any body is ignored.
    #[instrument(skip(self, bearer_token))]
    pub fn delete_company(&self, bearer_token: &str, company_id: &str) -> Result<(), ActionError> {
        let operation = Operation::DeleteCompany;
        info!("running {operation}");

        let builder = self.authorized(
            self.http.delete(self.account_url(&company_path(company_id))),
            bearer_token,
        );

        self.send(operation, builder, StatusCode::NO_CONTENT)?;

        Ok(())
    }
}
