//! Entity store: the persistence boundary for every record the service keeps.
//!
//! Each method is one logical transaction. Compound operations (opening a duty
//! assignment, creating or deleting a salary record, deleting a guard) either
//! apply completely or not at all.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{
        Client, CreateClient, CreateDutyAssignment, CreateGuard, CreateSalaryRecord,
        DutyAssignment, DutyStatus, Guard, GuardStatus, InventoryChange, InventoryRecord,
        InventoryStatus, IssueInventory, ReassignGuard, SalaryRecord, UpdateClient,
        UpdateDutyAssignment, UpdateGuard, UpdateSalaryRecord, User,
    },
};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Clamps a caller supplied page size; `None` means the default page.
pub fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardFilter {
    pub status: Option<GuardStatus>,
    /// Case-insensitive substring of the name or the contact number.
    pub search: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    /// Case-insensitive substring of the client or company name.
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentFilter {
    pub guard_id: Option<i64>,
    pub client_id: Option<i64>,
    pub is_active: Option<bool>,
    pub duty_status: Option<DutyStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalaryFilter {
    pub guard_id: Option<i64>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub is_paid: Option<bool>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryFilter {
    pub guard_id: Option<i64>,
    pub item_type: Option<String>,
    pub status: Option<InventoryStatus>,
    /// Inclusive lower bound on `issue_date`.
    pub issued_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `issue_date`.
    pub issued_before: Option<DateTime<Utc>>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    async fn create_guard(&self, input: CreateGuard) -> Result<Guard, AppError>;
    async fn get_guard(&self, id: i64) -> Result<Guard, AppError>;
    async fn get_guard_by_contact(&self, contact_number: &str) -> Result<Guard, AppError>;
    async fn list_guards(&self, filter: &GuardFilter) -> Result<Vec<Guard>, AppError>;
    async fn update_guard(&self, id: i64, update: UpdateGuard) -> Result<Guard, AppError>;
    /// Refused with `Conflict` while any duty assignment references the guard.
    async fn delete_guard(&self, id: i64) -> Result<(), AppError>;

    async fn create_client(&self, input: CreateClient) -> Result<Client, AppError>;
    async fn get_client(&self, id: i64) -> Result<Client, AppError>;
    async fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>, AppError>;
    async fn update_client(&self, id: i64, update: UpdateClient) -> Result<Client, AppError>;
    async fn delete_client(&self, id: i64) -> Result<(), AppError>;

    /// Closes every active assignment of the guard and opens the new one.
    async fn assign_duty(&self, input: CreateDutyAssignment) -> Result<DutyAssignment, AppError>;
    async fn get_assignment(&self, id: i64) -> Result<DutyAssignment, AppError>;
    async fn list_assignments(&self, filter: &AssignmentFilter) -> Result<Vec<DutyAssignment>, AppError>;
    async fn update_assignment(
        &self,
        id: i64,
        update: UpdateDutyAssignment,
    ) -> Result<DutyAssignment, AppError>;
    async fn delete_assignment(&self, id: i64) -> Result<(), AppError>;

    /// Moves the guard to another client, starting now.
    async fn reassign_guard(&self, guard_id: i64, input: ReassignGuard) -> Result<DutyAssignment, AppError> {
        self.assign_duty(input.into_assignment(guard_id)).await
    }

    /// Inserts the record and adds its uniform installment to the guard.
    async fn create_salary_record(&self, input: CreateSalaryRecord) -> Result<SalaryRecord, AppError>;
    async fn get_salary_record(&self, id: i64) -> Result<SalaryRecord, AppError>;
    async fn list_salary_records(&self, filter: &SalaryFilter) -> Result<Vec<SalaryRecord>, AppError>;
    async fn update_salary_record(
        &self,
        id: i64,
        update: UpdateSalaryRecord,
    ) -> Result<SalaryRecord, AppError>;
    /// Deletes the record and gives its uniform installment back to the guard.
    async fn delete_salary_record(&self, id: i64) -> Result<(), AppError>;

    async fn issue_inventory(&self, input: IssueInventory) -> Result<InventoryRecord, AppError>;
    async fn get_inventory(&self, id: i64) -> Result<InventoryRecord, AppError>;
    async fn list_inventory(&self, filter: &InventoryFilter) -> Result<Vec<InventoryRecord>, AppError>;
    async fn change_inventory(&self, id: i64, change: InventoryChange) -> Result<InventoryRecord, AppError>;
    async fn delete_inventory(&self, id: i64) -> Result<(), AppError>;

    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User, AppError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
