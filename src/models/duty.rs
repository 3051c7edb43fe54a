use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{client::Client, guard::Guard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "duty_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    #[default]
    OnDuty,
    OffDuty,
    Available,
}

pub const DEFAULT_SHIFT: &str = "day";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DutyAssignment {
    pub id: i64,
    pub guard_id: i64,
    pub client_id: i64,
    /// Guard name at the time the assignment was opened.
    pub guard_name: String,
    /// Client display name at the time the assignment was opened.
    pub client_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub duty_status: DutyStatus,
    pub shift_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DutyAssignment {
    /// Closes an open assignment. Already closed rows are left untouched.
    pub fn close(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            self.is_active = false;
            self.end_date = Some(now);
            self.updated_at = now;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDutyAssignment {
    pub guard_id: i64,
    pub client_id: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub duty_status: Option<DutyStatus>,
    #[validate(length(min = 1, message = "shift type must not be empty"))]
    pub shift_type: Option<String>,
}

impl CreateDutyAssignment {
    /// Opens a new active assignment, copying the current guard and client names.
    pub fn open(self, id: i64, guard: &Guard, client: &Client, now: DateTime<Utc>) -> DutyAssignment {
        DutyAssignment {
            id,
            guard_id: guard.id,
            client_id: client.id,
            guard_name: guard.name.clone(),
            client_name: client.display_name().to_string(),
            start_date: self.start_date.unwrap_or(now),
            end_date: None,
            duty_status: self.duty_status.unwrap_or_default(),
            shift_type: self.shift_type.unwrap_or_else(|| DEFAULT_SHIFT.to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Moves a guard to a new client, starting now.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReassignGuard {
    pub client_id: i64,
    #[validate(length(min = 1, message = "shift type must not be empty"))]
    pub shift_type: Option<String>,
}

impl ReassignGuard {
    pub fn into_assignment(self, guard_id: i64) -> CreateDutyAssignment {
        CreateDutyAssignment {
            guard_id,
            client_id: self.client_id,
            start_date: None,
            duty_status: Some(DutyStatus::OnDuty),
            shift_type: self.shift_type,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDutyAssignment {
    pub client_id: Option<i64>,
    pub end_date: Option<DateTime<Utc>>,
    pub duty_status: Option<DutyStatus>,
    #[validate(length(min = 1, message = "shift type must not be empty"))]
    pub shift_type: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateDutyAssignment {
    /// Returns the requested client when it differs from the current one.
    pub fn changed_client(&self, assignment: &DutyAssignment) -> Option<i64> {
        self.client_id.filter(|id| *id != assignment.client_id)
    }

    /// Whether applying this update leaves a previously closed row active.
    pub fn reopens(&self, assignment: &DutyAssignment) -> bool {
        !assignment.is_active && self.is_active == Some(true)
    }

    /// Applies the supplied fields. `new_client` must be the row for
    /// [`changed_client`](Self::changed_client) when that returned `Some`.
    pub fn apply(self, assignment: &mut DutyAssignment, new_client: Option<&Client>, now: DateTime<Utc>) {
        if let Some(client) = new_client {
            assignment.client_id = client.id;
            assignment.client_name = client.display_name().to_string();
        }
        if let Some(end_date) = self.end_date {
            assignment.end_date = Some(end_date);
        }
        if let Some(duty_status) = self.duty_status {
            assignment.duty_status = duty_status;
        }
        if let Some(shift_type) = self.shift_type {
            assignment.shift_type = shift_type;
        }
        // A caller supplied end date wins over the one stamped on close. Reopening
        // clears the old end date unless the caller sets a new one.
        match self.is_active {
            Some(false) if assignment.is_active => {
                assignment.is_active = false;
                if self.end_date.is_none() {
                    assignment.end_date = Some(now);
                }
            }
            Some(true) if !assignment.is_active => {
                assignment.is_active = true;
                if self.end_date.is_none() {
                    assignment.end_date = None;
                }
            }
            _ => {}
        }
        assignment.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{client::CreateClient, guard::CreateGuard};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn fixtures() -> (Guard, Client) {
        let now = Utc::now();
        let guard = CreateGuard {
            name: "Bilal".to_string(),
            contact_number: "0311".to_string(),
            address: None,
            cnic: None,
            join_date: None,
            status: None,
            current_salary: Decimal::ZERO,
            uniform_cost: None,
            monthly_deduction: None,
            photo_url: None,
            document_url: None,
        }
        .build(7, now);
        let client = CreateClient {
            name: "Bank Branch".to_string(),
            contact_person: None,
            contact_number: None,
            address: None,
            company_name: None,
            contract_rate: Decimal::ZERO,
        }
        .build(3, now);
        (guard, client)
    }

    #[test]
    fn open_defaults_to_active_day_shift_on_duty() {
        let (guard, client) = fixtures();
        let input = CreateDutyAssignment {
            guard_id: guard.id,
            client_id: client.id,
            start_date: None,
            duty_status: None,
            shift_type: None,
        };
        let assignment = input.open(1, &guard, &client, Utc::now());
        assert!(assignment.is_active);
        assert_eq!(assignment.duty_status, DutyStatus::OnDuty);
        assert_eq!(assignment.shift_type, DEFAULT_SHIFT);
        assert_eq!(assignment.guard_name, "Bilal");
        assert_eq!(assignment.client_name, "Bank Branch");
        assert!(assignment.end_date.is_none());
    }

    #[test]
    fn deactivating_stamps_end_date() {
        let (guard, client) = fixtures();
        let mut assignment = CreateDutyAssignment {
            guard_id: guard.id,
            client_id: client.id,
            start_date: None,
            duty_status: None,
            shift_type: Some("night".to_string()),
        }
        .open(1, &guard, &client, Utc::now());

        let update = UpdateDutyAssignment {
            is_active: Some(false),
            ..Default::default()
        };
        update.apply(&mut assignment, None, Utc::now());
        assert!(!assignment.is_active);
        assert!(assignment.end_date.is_some());
        assert_eq!(assignment.shift_type, "night");
    }

    #[test]
    fn closing_keeps_a_supplied_end_date() {
        let (guard, client) = fixtures();
        let mut assignment = CreateDutyAssignment {
            guard_id: guard.id,
            client_id: client.id,
            start_date: None,
            duty_status: None,
            shift_type: None,
        }
        .open(1, &guard, &client, Utc::now());
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 18, 0, 0).unwrap();

        let update = UpdateDutyAssignment {
            is_active: Some(false),
            end_date: Some(end),
            ..Default::default()
        };
        update.apply(&mut assignment, None, Utc::now());
        assert!(!assignment.is_active);
        assert_eq!(assignment.end_date, Some(end));

        let reopen = UpdateDutyAssignment {
            is_active: Some(true),
            ..Default::default()
        };
        reopen.apply(&mut assignment, None, Utc::now());
        assert!(assignment.is_active);
        assert!(assignment.end_date.is_none());
    }
}
