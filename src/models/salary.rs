use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::guard::{money_amount, Guard};

pub const FIRST_PAYROLL_YEAR: i32 = 2020;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalaryRecord {
    pub id: i64,
    pub guard_id: i64,
    pub month: i32,
    pub year: i32,
    /// Guard salary the record was last computed against.
    pub base_salary: Decimal,
    pub deductions: Decimal,
    pub uniform_deduction: Decimal,
    pub bonus: Decimal,
    pub final_salary: Decimal,
    pub is_paid: bool,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `base - deductions - uniform + bonus`
pub fn final_salary(base: Decimal, deductions: Decimal, uniform: Decimal, bonus: Decimal) -> Decimal {
    base - deductions - uniform + bonus
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_new_salary_amounts"))]
pub struct CreateSalaryRecord {
    pub guard_id: i64,
    #[validate(range(min = 1, max = 12, message = "month must be between 1 and 12"))]
    pub month: i32,
    #[validate(range(min = 2020, message = "year must be 2020 or later"))]
    pub year: i32,
    #[serde(default)]
    pub deductions: Decimal,
    #[serde(default)]
    pub bonus: Decimal,
    pub notes: Option<String>,
}

fn validate_new_salary_amounts(input: &CreateSalaryRecord) -> Result<(), ValidationError> {
    money_amount(Some(input.deductions), "deductions")?;
    money_amount(Some(input.bonus), "bonus")
}

impl CreateSalaryRecord {
    /// Computes the record for `guard`, withholding the next uniform installment.
    ///
    /// The caller is responsible for adding `uniform_deduction` to the guard's
    /// running total in the same transaction as the insert.
    pub fn compute(self, id: i64, guard: &Guard, now: DateTime<Utc>) -> SalaryRecord {
        let uniform_deduction = guard.next_uniform_installment();
        SalaryRecord {
            id,
            guard_id: guard.id,
            month: self.month,
            year: self.year,
            base_salary: guard.current_salary,
            deductions: self.deductions,
            uniform_deduction,
            bonus: self.bonus,
            final_salary: final_salary(guard.current_salary, self.deductions, uniform_deduction, self.bonus),
            is_paid: false,
            payment_date: None,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_salary_update_amounts"))]
pub struct UpdateSalaryRecord {
    pub deductions: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub is_paid: Option<bool>,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

fn validate_salary_update_amounts(input: &UpdateSalaryRecord) -> Result<(), ValidationError> {
    money_amount(input.deductions, "deductions")?;
    money_amount(input.bonus, "bonus")
}

impl UpdateSalaryRecord {
    /// Applies the supplied fields and recomputes `final_salary` against the
    /// guard's current salary. The uniform installment is kept as recorded.
    pub fn apply(self, record: &mut SalaryRecord, guard: &Guard, now: DateTime<Utc>) {
        if let Some(deductions) = self.deductions {
            record.deductions = deductions;
        }
        if let Some(bonus) = self.bonus {
            record.bonus = bonus;
        }
        if let Some(payment_date) = self.payment_date {
            record.payment_date = Some(payment_date);
        }
        if let Some(is_paid) = self.is_paid {
            record.is_paid = is_paid;
            if is_paid && record.payment_date.is_none() {
                record.payment_date = Some(now);
            }
        }
        if let Some(notes) = self.notes {
            record.notes = Some(notes);
        }
        record.base_salary = guard.current_salary;
        record.final_salary = final_salary(
            record.base_salary,
            record.deductions,
            record.uniform_deduction,
            record.bonus,
        );
        record.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::guard::CreateGuard;
    use rust_decimal_macros::dec;

    fn guard() -> Guard {
        CreateGuard {
            name: "Asif".to_string(),
            contact_number: "0300".to_string(),
            address: None,
            cnic: None,
            join_date: None,
            status: None,
            current_salary: dec!(30000),
            uniform_cost: Some(dec!(4000)),
            monthly_deduction: Some(dec!(500)),
            photo_url: None,
            document_url: None,
        }
        .build(1, Utc::now())
    }

    fn input(month: i32) -> CreateSalaryRecord {
        CreateSalaryRecord {
            guard_id: 1,
            month,
            year: 2025,
            deductions: Decimal::ZERO,
            bonus: Decimal::ZERO,
            notes: None,
        }
    }

    #[test]
    fn first_month_withholds_full_installment() {
        let record = input(1).compute(1, &guard(), Utc::now());
        assert_eq!(record.uniform_deduction, dec!(500));
        assert_eq!(record.final_salary, dec!(29500));
        assert!(!record.is_paid);
    }

    #[test]
    fn fully_recovered_uniform_withholds_nothing() {
        let mut guard = guard();
        guard.uniform_deducted_amount = dec!(4000);
        let record = input(9).compute(1, &guard, Utc::now());
        assert_eq!(record.uniform_deduction, Decimal::ZERO);
        assert_eq!(record.final_salary, dec!(30000));
    }

    #[test]
    fn update_recomputes_against_current_salary() {
        let mut guard = guard();
        let mut record = input(1).compute(1, &guard, Utc::now());

        guard.current_salary = dec!(32000);
        let update = UpdateSalaryRecord {
            deductions: Some(dec!(1000)),
            bonus: Some(dec!(250)),
            ..Default::default()
        };
        update.apply(&mut record, &guard, Utc::now());

        assert_eq!(record.base_salary, dec!(32000));
        assert_eq!(record.uniform_deduction, dec!(500));
        assert_eq!(record.final_salary, dec!(30750));
    }

    #[test]
    fn marking_paid_stamps_payment_date() {
        let guard = guard();
        let mut record = input(1).compute(1, &guard, Utc::now());
        let update = UpdateSalaryRecord {
            is_paid: Some(true),
            ..Default::default()
        };
        update.apply(&mut record, &guard, Utc::now());
        assert!(record.is_paid);
        assert!(record.payment_date.is_some());
    }

    #[test]
    fn month_out_of_range_fails_validation() {
        assert!(input(13).validate().is_err());
        assert!(input(0).validate().is_err());
        assert!(input(12).validate().is_ok());
    }
}
