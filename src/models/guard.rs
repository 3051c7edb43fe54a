use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "guard_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GuardStatus {
    #[default]
    Active,
    Inactive,
    OnLeave,
}

const MONEY_SCALE: u32 = 2;
// 10_000_000_000 = 2 * 2^32 + 1_410_065_408 (const-constructible form)
const MAX_MONEY: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

pub fn default_uniform_cost() -> Decimal {
    Decimal::new(4000, 0)
}

pub fn default_monthly_deduction() -> Decimal {
    Decimal::new(500, 0)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Guard {
    pub id: i64,
    pub name: String,
    pub contact_number: String,
    pub address: Option<String>,
    pub cnic: Option<String>,
    pub join_date: DateTime<Utc>,
    pub status: GuardStatus,
    pub current_salary: Decimal,
    pub uniform_cost: Decimal,
    pub uniform_deducted_amount: Decimal,
    pub monthly_deduction: Decimal,
    pub photo_url: Option<String>,
    pub document_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guard {
    /// Part of the uniform cost that has not yet been recovered from salary.
    pub fn outstanding_uniform_balance(&self) -> Decimal {
        (self.uniform_cost - self.uniform_deducted_amount).max(Decimal::ZERO)
    }

    /// Amount the next salary record should withhold towards the uniform.
    ///
    /// Capped by the per-month deduction and by what is still owed, so the
    /// running total can never pass `uniform_cost`.
    pub fn next_uniform_installment(&self) -> Decimal {
        self.monthly_deduction
            .min(self.outstanding_uniform_balance())
            .max(Decimal::ZERO)
    }

    /// Reverses an installment previously applied by a salary record.
    pub fn refund_uniform_installment(&mut self, amount: Decimal, now: DateTime<Utc>) {
        self.uniform_deducted_amount = (self.uniform_deducted_amount - amount).max(Decimal::ZERO);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_new_guard_amounts"))]
pub struct CreateGuard {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "contact number must not be empty"))]
    pub contact_number: String,
    pub address: Option<String>,
    pub cnic: Option<String>,
    pub join_date: Option<DateTime<Utc>>,
    pub status: Option<GuardStatus>,
    #[serde(default)]
    pub current_salary: Decimal,
    pub uniform_cost: Option<Decimal>,
    pub monthly_deduction: Option<Decimal>,
    pub photo_url: Option<String>,
    pub document_url: Option<String>,
}

fn validate_new_guard_amounts(input: &CreateGuard) -> Result<(), ValidationError> {
    money_amount(Some(input.current_salary), "current_salary")?;
    money_amount(input.uniform_cost, "uniform_cost")?;
    money_amount(input.monthly_deduction, "monthly_deduction")
}

/// Money columns are `NUMERIC(12, 2)`: non-negative, at most two decimal places.
pub(crate) fn money_amount(value: Option<Decimal>, field: &'static str) -> Result<(), ValidationError> {
    let Some(amount) = value else {
        return Ok(());
    };
    let (code, message) = if amount < Decimal::ZERO {
        ("negative_amount", format!("{field} must not be negative"))
    } else if amount.normalize().scale() > MONEY_SCALE {
        ("amount_precision", format!("{field} must have at most {MONEY_SCALE} decimal places"))
    } else if amount >= MAX_MONEY {
        ("amount_too_large", format!("{field} must be below {MAX_MONEY}"))
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    Err(err)
}

impl CreateGuard {
    /// Builds the stored row, filling defaults for everything the caller left out.
    pub fn build(self, id: i64, now: DateTime<Utc>) -> Guard {
        Guard {
            id,
            name: self.name,
            contact_number: self.contact_number,
            address: self.address,
            cnic: self.cnic,
            join_date: self.join_date.unwrap_or(now),
            status: self.status.unwrap_or_default(),
            current_salary: self.current_salary,
            uniform_cost: self.uniform_cost.unwrap_or_else(default_uniform_cost),
            uniform_deducted_amount: Decimal::ZERO,
            monthly_deduction: self
                .monthly_deduction
                .unwrap_or_else(default_monthly_deduction),
            photo_url: self.photo_url,
            document_url: self.document_url,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_guard_update_amounts"))]
pub struct UpdateGuard {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "contact number must not be empty"))]
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub cnic: Option<String>,
    pub join_date: Option<DateTime<Utc>>,
    pub status: Option<GuardStatus>,
    pub current_salary: Option<Decimal>,
    pub uniform_cost: Option<Decimal>,
    pub monthly_deduction: Option<Decimal>,
    pub photo_url: Option<String>,
    pub document_url: Option<String>,
}

fn validate_guard_update_amounts(input: &UpdateGuard) -> Result<(), ValidationError> {
    money_amount(input.current_salary, "current_salary")?;
    money_amount(input.uniform_cost, "uniform_cost")?;
    money_amount(input.monthly_deduction, "monthly_deduction")
}

impl UpdateGuard {
    /// Returns the new contact number when it differs from the current one.
    pub fn changed_contact<'a>(&'a self, guard: &Guard) -> Option<&'a str> {
        self.contact_number
            .as_deref()
            .filter(|contact| *contact != guard.contact_number)
    }

    pub fn apply(self, guard: &mut Guard, now: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(cost) = self.uniform_cost {
            if cost < guard.uniform_deducted_amount {
                return Err(AppError::InvalidState(format!(
                    "uniform cost {cost} is below the {} already deducted",
                    guard.uniform_deducted_amount
                )));
            }
            guard.uniform_cost = cost;
        }
        if let Some(name) = self.name {
            guard.name = name;
        }
        if let Some(contact_number) = self.contact_number {
            guard.contact_number = contact_number;
        }
        if let Some(address) = self.address {
            guard.address = Some(address);
        }
        if let Some(cnic) = self.cnic {
            guard.cnic = Some(cnic);
        }
        if let Some(join_date) = self.join_date {
            guard.join_date = join_date;
        }
        if let Some(status) = self.status {
            guard.status = status;
        }
        if let Some(salary) = self.current_salary {
            guard.current_salary = salary;
        }
        if let Some(deduction) = self.monthly_deduction {
            guard.monthly_deduction = deduction;
        }
        if let Some(photo_url) = self.photo_url {
            guard.photo_url = Some(photo_url);
        }
        if let Some(document_url) = self.document_url {
            guard.document_url = Some(document_url);
        }
        guard.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn guard() -> Guard {
        CreateGuard {
            name: "Imran".to_string(),
            contact_number: "0300".to_string(),
            address: None,
            cnic: None,
            join_date: None,
            status: None,
            current_salary: dec!(30000),
            uniform_cost: None,
            monthly_deduction: None,
            photo_url: None,
            document_url: None,
        }
        .build(1, Utc::now())
    }

    #[test]
    fn build_applies_defaults() {
        let guard = guard();
        assert_eq!(guard.status, GuardStatus::Active);
        assert_eq!(guard.uniform_cost, dec!(4000));
        assert_eq!(guard.monthly_deduction, dec!(500));
        assert_eq!(guard.uniform_deducted_amount, Decimal::ZERO);
    }

    #[test]
    fn installment_is_capped_by_outstanding_balance() {
        let mut guard = guard();
        assert_eq!(guard.next_uniform_installment(), dec!(500));

        guard.uniform_deducted_amount = dec!(3800);
        assert_eq!(guard.next_uniform_installment(), dec!(200));

        guard.uniform_deducted_amount = dec!(4000);
        assert_eq!(guard.next_uniform_installment(), Decimal::ZERO);
    }

    #[test]
    fn refund_never_goes_below_zero() {
        let mut guard = guard();
        guard.uniform_deducted_amount = dec!(300);
        guard.refund_uniform_installment(dec!(500), Utc::now());
        assert_eq!(guard.uniform_deducted_amount, Decimal::ZERO);
    }

    #[test]
    fn update_only_touches_supplied_fields() {
        let mut guard = guard();
        let update = UpdateGuard {
            status: Some(GuardStatus::OnLeave),
            ..Default::default()
        };
        update.apply(&mut guard, Utc::now()).unwrap();
        assert_eq!(guard.status, GuardStatus::OnLeave);
        assert_eq!(guard.name, "Imran");
        assert_eq!(guard.contact_number, "0300");
    }

    #[test]
    fn update_rejects_uniform_cost_below_deducted() {
        let mut guard = guard();
        guard.uniform_deducted_amount = dec!(1500);
        let update = UpdateGuard {
            uniform_cost: Some(dec!(1000)),
            ..Default::default()
        };
        let err = update.apply(&mut guard, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(guard.uniform_cost, dec!(4000));
    }

    #[test]
    fn negative_salary_fails_validation() {
        let input = CreateGuard {
            name: "Imran".to_string(),
            contact_number: "0300".to_string(),
            address: None,
            cnic: None,
            join_date: None,
            status: None,
            current_salary: dec!(-1),
            uniform_cost: None,
            monthly_deduction: None,
            photo_url: None,
            document_url: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn amounts_beyond_two_decimals_fail_validation() {
        assert!(money_amount(Some(dec!(333.33)), "monthly_deduction").is_ok());
        assert!(money_amount(Some(dec!(333.330)), "monthly_deduction").is_ok());
        assert!(money_amount(Some(dec!(333.333)), "monthly_deduction").is_err());
        assert!(money_amount(Some(dec!(10000000000)), "current_salary").is_err());

        let update = UpdateGuard {
            monthly_deduction: Some(dec!(333.333)),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
