use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    contains_ignore_case, AssignmentFilter, ClientFilter, GuardFilter, InventoryFilter, SalaryFilter, Store,
};
use crate::{
    errors::AppError,
    models::{
        Client, CreateClient, CreateDutyAssignment, CreateGuard, CreateSalaryRecord, DutyAssignment, Guard,
        InventoryChange, InventoryRecord, IssueInventory, SalaryRecord, UpdateClient, UpdateDutyAssignment,
        UpdateGuard, UpdateSalaryRecord, User,
    },
};

struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T: Clone> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn get(&self, id: i64, entity: &'static str) -> Result<T, AppError> {
        self.rows.get(&id).cloned().ok_or(AppError::NotFound(entity))
    }
}

#[derive(Default)]
struct Tables {
    guards: Table<Guard>,
    clients: Table<Client>,
    assignments: Table<DutyAssignment>,
    salaries: Table<SalaryRecord>,
    inventory: Table<InventoryRecord>,
    users: Vec<User>,
}

/// In-process store with the same semantics as [`PgStore`](super::PgStore).
///
/// Every operation holds the single lock for its whole duration and validates
/// before it mutates, which gives each call the isolation of a transaction.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn window<T>(rows: impl Iterator<Item = T>, skip: Option<i64>, limit: Option<i64>) -> Vec<T> {
    let skip = usize::try_from(skip.unwrap_or(0).max(0)).unwrap_or(0);
    let rows = rows.skip(skip);
    match limit {
        Some(limit) => rows.take(usize::try_from(limit.max(0)).unwrap_or(0)).collect(),
        None => rows.collect(),
    }
}

fn guard_matches(guard: &Guard, filter: &GuardFilter) -> bool {
    filter.status.map_or(true, |status| guard.status == status)
        && filter.search.as_deref().map_or(true, |term| {
            contains_ignore_case(&guard.name, term) || contains_ignore_case(&guard.contact_number, term)
        })
        && filter
            .name
            .as_deref()
            .map_or(true, |term| contains_ignore_case(&guard.name, term))
        && filter
            .contact
            .as_deref()
            .map_or(true, |term| contains_ignore_case(&guard.contact_number, term))
}

fn client_matches(client: &Client, filter: &ClientFilter) -> bool {
    filter.search.as_deref().map_or(true, |term| {
        contains_ignore_case(&client.name, term)
            || client
                .company_name
                .as_deref()
                .is_some_and(|company| contains_ignore_case(company, term))
    })
}

fn assignment_matches(assignment: &DutyAssignment, filter: &AssignmentFilter) -> bool {
    filter.guard_id.map_or(true, |id| assignment.guard_id == id)
        && filter.client_id.map_or(true, |id| assignment.client_id == id)
        && filter.is_active.map_or(true, |active| assignment.is_active == active)
        && filter.duty_status.map_or(true, |status| assignment.duty_status == status)
}

fn salary_matches(record: &SalaryRecord, filter: &SalaryFilter) -> bool {
    filter.guard_id.map_or(true, |id| record.guard_id == id)
        && filter.month.map_or(true, |month| record.month == month)
        && filter.year.map_or(true, |year| record.year == year)
        && filter.is_paid.map_or(true, |paid| record.is_paid == paid)
}

fn inventory_matches(record: &InventoryRecord, filter: &InventoryFilter) -> bool {
    filter.guard_id.map_or(true, |id| record.guard_id == id)
        && filter
            .item_type
            .as_deref()
            .map_or(true, |item_type| record.item_type == item_type)
        && filter.status.map_or(true, |status| record.status == status)
        && filter.issued_from.map_or(true, |from| record.issue_date >= from)
        && filter.issued_before.map_or(true, |before| record.issue_date < before)
}

impl Tables {
    fn contact_taken(&self, contact_number: &str, except: Option<i64>) -> bool {
        self.guards
            .rows
            .values()
            .any(|g| g.contact_number == contact_number && Some(g.id) != except)
    }

    fn active_assignment_of(&self, guard_id: i64, except: i64) -> bool {
        self.assignments
            .rows
            .values()
            .any(|a| a.guard_id == guard_id && a.is_active && a.id != except)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_guard(&self, input: CreateGuard) -> Result<Guard, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.contact_taken(&input.contact_number, None) {
            return Err(AppError::DuplicateKey("contact number already registered".to_string()));
        }
        let id = tables.guards.next_id();
        let guard = input.build(id, Utc::now());
        tables.guards.rows.insert(id, guard.clone());
        Ok(guard)
    }

    async fn get_guard(&self, id: i64) -> Result<Guard, AppError> {
        self.tables.lock().await.guards.get(id, "Guard")
    }

    async fn get_guard_by_contact(&self, contact_number: &str) -> Result<Guard, AppError> {
        let tables = self.tables.lock().await;
        tables
            .guards
            .rows
            .values()
            .find(|g| g.contact_number == contact_number)
            .cloned()
            .ok_or(AppError::NotFound("Guard"))
    }

    async fn list_guards(&self, filter: &GuardFilter) -> Result<Vec<Guard>, AppError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .guards
            .rows
            .values()
            .filter(|g| guard_matches(g, filter))
            .cloned();
        Ok(window(rows, filter.skip, filter.limit))
    }

    async fn update_guard(&self, id: i64, update: UpdateGuard) -> Result<Guard, AppError> {
        let mut tables = self.tables.lock().await;
        let mut guard = tables.guards.get(id, "Guard")?;
        if let Some(contact) = update.changed_contact(&guard) {
            if tables.contact_taken(contact, Some(id)) {
                return Err(AppError::DuplicateKey("contact number already exists".to_string()));
            }
        }
        update.apply(&mut guard, Utc::now())?;
        tables.guards.rows.insert(id, guard.clone());
        Ok(guard)
    }

    async fn delete_guard(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        tables.guards.get(id, "Guard")?;
        if tables.assignments.rows.values().any(|a| a.guard_id == id) {
            return Err(AppError::Conflict(
                "guard has duty assignments and cannot be deleted".to_string(),
            ));
        }
        tables.salaries.rows.retain(|_, r| r.guard_id != id);
        tables.inventory.rows.retain(|_, r| r.guard_id != id);
        tables.guards.rows.remove(&id);
        Ok(())
    }

    async fn create_client(&self, input: CreateClient) -> Result<Client, AppError> {
        let mut tables = self.tables.lock().await;
        let id = tables.clients.next_id();
        let client = input.build(id, Utc::now());
        tables.clients.rows.insert(id, client.clone());
        Ok(client)
    }

    async fn get_client(&self, id: i64) -> Result<Client, AppError> {
        self.tables.lock().await.clients.get(id, "Client")
    }

    async fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>, AppError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .clients
            .rows
            .values()
            .filter(|c| client_matches(c, filter))
            .cloned();
        Ok(window(rows, filter.skip, filter.limit))
    }

    async fn update_client(&self, id: i64, update: UpdateClient) -> Result<Client, AppError> {
        let mut tables = self.tables.lock().await;
        let mut client = tables.clients.get(id, "Client")?;
        update.apply(&mut client, Utc::now());
        tables.clients.rows.insert(id, client.clone());
        Ok(client)
    }

    async fn delete_client(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        tables.clients.get(id, "Client")?;
        if tables.assignments.rows.values().any(|a| a.client_id == id) {
            return Err(AppError::Conflict(
                "client has duty assignments and cannot be deleted".to_string(),
            ));
        }
        tables.clients.rows.remove(&id);
        Ok(())
    }

    async fn assign_duty(&self, input: CreateDutyAssignment) -> Result<DutyAssignment, AppError> {
        let mut tables = self.tables.lock().await;
        let guard = tables.guards.get(input.guard_id, "Guard")?;
        let client = tables.clients.get(input.client_id, "Client")?;

        let now = Utc::now();
        for assignment in tables.assignments.rows.values_mut() {
            if assignment.guard_id == guard.id {
                assignment.close(now);
            }
        }
        let id = tables.assignments.next_id();
        let assignment = input.open(id, &guard, &client, now);
        tables.assignments.rows.insert(id, assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(&self, id: i64) -> Result<DutyAssignment, AppError> {
        self.tables.lock().await.assignments.get(id, "Duty assignment")
    }

    async fn list_assignments(&self, filter: &AssignmentFilter) -> Result<Vec<DutyAssignment>, AppError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .assignments
            .rows
            .values()
            .filter(|a| assignment_matches(a, filter))
            .cloned();
        Ok(window(rows, filter.skip, filter.limit))
    }

    async fn update_assignment(
        &self,
        id: i64,
        update: UpdateDutyAssignment,
    ) -> Result<DutyAssignment, AppError> {
        let mut tables = self.tables.lock().await;
        let mut assignment = tables.assignments.get(id, "Duty assignment")?;
        let new_client = match update.changed_client(&assignment) {
            Some(client_id) => Some(tables.clients.get(client_id, "Client")?),
            None => None,
        };
        if update.reopens(&assignment) && tables.active_assignment_of(assignment.guard_id, id) {
            return Err(AppError::Conflict(
                "guard already has an active duty assignment".to_string(),
            ));
        }
        update.apply(&mut assignment, new_client.as_ref(), Utc::now());
        tables.assignments.rows.insert(id, assignment.clone());
        Ok(assignment)
    }

    async fn delete_assignment(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        tables
            .assignments
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound("Duty assignment"))
    }

    async fn create_salary_record(&self, input: CreateSalaryRecord) -> Result<SalaryRecord, AppError> {
        let mut tables = self.tables.lock().await;
        let mut guard = tables.guards.get(input.guard_id, "Guard")?;
        let exists = tables
            .salaries
            .rows
            .values()
            .any(|r| r.guard_id == input.guard_id && r.month == input.month && r.year == input.year);
        if exists {
            return Err(AppError::DuplicateKey(
                "salary record already exists for this month".to_string(),
            ));
        }

        let now = Utc::now();
        let id = tables.salaries.next_id();
        let record = input.compute(id, &guard, now);
        guard.uniform_deducted_amount += record.uniform_deduction;
        guard.updated_at = now;
        tables.guards.rows.insert(guard.id, guard);
        tables.salaries.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn get_salary_record(&self, id: i64) -> Result<SalaryRecord, AppError> {
        self.tables.lock().await.salaries.get(id, "Salary record")
    }

    async fn list_salary_records(&self, filter: &SalaryFilter) -> Result<Vec<SalaryRecord>, AppError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .salaries
            .rows
            .values()
            .filter(|r| salary_matches(r, filter))
            .cloned();
        Ok(window(rows, filter.skip, filter.limit))
    }

    async fn update_salary_record(
        &self,
        id: i64,
        update: UpdateSalaryRecord,
    ) -> Result<SalaryRecord, AppError> {
        let mut tables = self.tables.lock().await;
        let mut record = tables.salaries.get(id, "Salary record")?;
        let guard = tables.guards.get(record.guard_id, "Guard")?;
        update.apply(&mut record, &guard, Utc::now());
        tables.salaries.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_salary_record(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let record = tables.salaries.get(id, "Salary record")?;
        if let Some(guard) = tables.guards.rows.get_mut(&record.guard_id) {
            guard.refund_uniform_installment(record.uniform_deduction, Utc::now());
        }
        tables.salaries.rows.remove(&id);
        Ok(())
    }

    async fn issue_inventory(&self, input: IssueInventory) -> Result<InventoryRecord, AppError> {
        let mut tables = self.tables.lock().await;
        tables.guards.get(input.guard_id, "Guard")?;
        let id = tables.inventory.next_id();
        let record = input.build(id, Utc::now());
        tables.inventory.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn get_inventory(&self, id: i64) -> Result<InventoryRecord, AppError> {
        self.tables.lock().await.inventory.get(id, "Inventory record")
    }

    async fn list_inventory(&self, filter: &InventoryFilter) -> Result<Vec<InventoryRecord>, AppError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .inventory
            .rows
            .values()
            .filter(|r| inventory_matches(r, filter))
            .cloned();
        Ok(window(rows, filter.skip, filter.limit))
    }

    async fn change_inventory(&self, id: i64, change: InventoryChange) -> Result<InventoryRecord, AppError> {
        let mut tables = self.tables.lock().await;
        let mut record = tables.inventory.get(id, "Inventory record")?;
        change.apply(&mut record, Utc::now())?;
        tables.inventory.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_inventory(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        tables
            .inventory
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound("Inventory record"))
    }

    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.username == username) {
            return Err(AppError::DuplicateKey("username already registered".to_string()));
        }
        if tables.users.iter().any(|u| u.email == email) {
            return Err(AppError::DuplicateKey("email already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}
