use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::guard::money_amount;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "inventory_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    #[default]
    Issued,
    Returned,
    Lost,
}

impl InventoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InventoryStatus::Issued => "issued",
            InventoryStatus::Returned => "returned",
            InventoryStatus::Lost => "lost",
        }
    }

    /// Issued items may become returned or lost; both of those are terminal.
    pub fn can_become(self, next: InventoryStatus) -> bool {
        matches!(
            (self, next),
            (InventoryStatus::Issued, InventoryStatus::Returned)
                | (InventoryStatus::Issued, InventoryStatus::Lost)
        )
    }
}

pub const DEFAULT_CONDITION: &str = "good";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryRecord {
    pub id: i64,
    pub guard_id: i64,
    pub item_name: String,
    pub item_type: String,
    pub quantity: i32,
    pub issue_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: InventoryStatus,
    pub condition_on_issue: String,
    pub condition_on_return: Option<String>,
    pub cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    fn transition(&mut self, next: InventoryStatus) -> Result<(), AppError> {
        if !self.status.can_become(next) {
            return Err(AppError::InvalidState(format!(
                "item is {}, cannot mark it {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    fn append_notes(&mut self, notes: Option<String>) {
        let Some(extra) = notes.filter(|n| !n.trim().is_empty()) else {
            return;
        };
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{extra}"),
            _ => extra,
        });
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_issue_cost"))]
pub struct IssueInventory {
    pub guard_id: i64,
    #[validate(length(min = 1, message = "item name must not be empty"))]
    pub item_name: String,
    #[validate(length(min = 1, message = "item type must not be empty"))]
    pub item_type: String,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: Option<i32>,
    pub issue_date: Option<DateTime<Utc>>,
    pub condition_on_issue: Option<String>,
    #[serde(default)]
    pub cost: Decimal,
    pub notes: Option<String>,
}

fn validate_issue_cost(input: &IssueInventory) -> Result<(), ValidationError> {
    money_amount(Some(input.cost), "cost")
}

impl IssueInventory {
    pub fn build(self, id: i64, now: DateTime<Utc>) -> InventoryRecord {
        InventoryRecord {
            id,
            guard_id: self.guard_id,
            item_name: self.item_name,
            item_type: self.item_type,
            quantity: self.quantity.unwrap_or(1),
            issue_date: self.issue_date.unwrap_or(now),
            return_date: None,
            status: InventoryStatus::Issued,
            condition_on_issue: self
                .condition_on_issue
                .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
            condition_on_return: None,
            cost: self.cost,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnInventory {
    pub condition: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkInventoryLost {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInventory {
    pub status: Option<InventoryStatus>,
    pub return_date: Option<DateTime<Utc>>,
    pub condition_on_return: Option<String>,
    pub notes: Option<String>,
}

/// A mutation of a single inventory record, applied under the record's lock.
#[derive(Debug, Clone)]
pub enum InventoryChange {
    Update(UpdateInventory),
    Return(ReturnInventory),
    Lost(MarkInventoryLost),
}

impl InventoryChange {
    pub fn apply(self, record: &mut InventoryRecord, now: DateTime<Utc>) -> Result<(), AppError> {
        match self {
            InventoryChange::Return(input) => {
                record.transition(InventoryStatus::Returned)?;
                record.return_date = Some(now);
                record.condition_on_return =
                    Some(input.condition.unwrap_or_else(|| DEFAULT_CONDITION.to_string()));
                record.append_notes(input.notes);
            }
            InventoryChange::Lost(input) => {
                record.transition(InventoryStatus::Lost)?;
                record.append_notes(input.notes);
            }
            InventoryChange::Update(input) => {
                if let Some(status) = input.status.filter(|s| *s != record.status) {
                    record.transition(status)?;
                    if status == InventoryStatus::Returned && input.return_date.is_none() {
                        record.return_date = Some(now);
                    }
                }
                if record.status == InventoryStatus::Issued
                    && (input.return_date.is_some() || input.condition_on_return.is_some())
                {
                    return Err(AppError::InvalidState(
                        "return details require the item to be returned or lost".to_string(),
                    ));
                }
                if let Some(return_date) = input.return_date {
                    record.return_date = Some(return_date);
                }
                if let Some(condition) = input.condition_on_return {
                    record.condition_on_return = Some(condition);
                }
                if let Some(notes) = input.notes {
                    record.notes = Some(notes);
                }
            }
        }
        record.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued() -> InventoryRecord {
        IssueInventory {
            guard_id: 1,
            item_name: "Winter jacket".to_string(),
            item_type: "uniform".to_string(),
            quantity: None,
            issue_date: None,
            condition_on_issue: None,
            cost: Decimal::ZERO,
            notes: Some("size L".to_string()),
        }
        .build(1, Utc::now())
    }

    #[test]
    fn issue_defaults() {
        let record = issued();
        assert_eq!(record.status, InventoryStatus::Issued);
        assert_eq!(record.quantity, 1);
        assert_eq!(record.condition_on_issue, "good");
        assert!(record.return_date.is_none());
    }

    #[test]
    fn return_stamps_date_and_appends_notes() {
        let mut record = issued();
        let change = InventoryChange::Return(ReturnInventory {
            condition: Some("worn".to_string()),
            notes: Some("zip broken".to_string()),
        });
        change.apply(&mut record, Utc::now()).unwrap();
        assert_eq!(record.status, InventoryStatus::Returned);
        assert!(record.return_date.is_some());
        assert_eq!(record.condition_on_return.as_deref(), Some("worn"));
        assert_eq!(record.notes.as_deref(), Some("size L\nzip broken"));
    }

    #[test]
    fn terminal_states_cannot_change() {
        let mut record = issued();
        InventoryChange::Lost(MarkInventoryLost::default())
            .apply(&mut record, Utc::now())
            .unwrap();

        let err = InventoryChange::Return(ReturnInventory::default())
            .apply(&mut record, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let back = InventoryChange::Update(UpdateInventory {
            status: Some(InventoryStatus::Issued),
            ..Default::default()
        })
        .apply(&mut record, Utc::now())
        .unwrap_err();
        assert!(matches!(back, AppError::InvalidState(_)));
    }

    #[test]
    fn return_details_on_issued_item_are_rejected() {
        let mut record = issued();
        let err = InventoryChange::Update(UpdateInventory {
            condition_on_return: Some("fine".to_string()),
            ..Default::default()
        })
        .apply(&mut record, Utc::now())
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
