use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::guard::money_amount;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    /// Rate billed per guard per month.
    pub contract_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Name copied onto duty assignments: the company when known, else the client name.
    pub fn display_name(&self) -> &str {
        self.company_name
            .as_deref()
            .filter(|company| !company.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_new_client_rate"))]
pub struct CreateClient {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    #[serde(default)]
    pub contract_rate: Decimal,
}

fn validate_new_client_rate(input: &CreateClient) -> Result<(), ValidationError> {
    money_amount(Some(input.contract_rate), "contract_rate")
}

impl CreateClient {
    pub fn build(self, id: i64, now: DateTime<Utc>) -> Client {
        Client {
            id,
            name: self.name,
            contact_person: self.contact_person,
            contact_number: self.contact_number,
            address: self.address,
            company_name: self.company_name,
            contract_rate: self.contract_rate,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_client_update_rate"))]
pub struct UpdateClient {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    pub contract_rate: Option<Decimal>,
}

fn validate_client_update_rate(input: &UpdateClient) -> Result<(), ValidationError> {
    money_amount(input.contract_rate, "contract_rate")
}

impl UpdateClient {
    pub fn apply(self, client: &mut Client, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            client.name = name;
        }
        if let Some(contact_person) = self.contact_person {
            client.contact_person = Some(contact_person);
        }
        if let Some(contact_number) = self.contact_number {
            client.contact_number = Some(contact_number);
        }
        if let Some(address) = self.address {
            client.address = Some(address);
        }
        if let Some(company_name) = self.company_name {
            client.company_name = Some(company_name);
        }
        if let Some(rate) = self.contract_rate {
            client.contract_rate = rate;
        }
        client.updated_at = now;
    }
}
