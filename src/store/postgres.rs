use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{AssignmentFilter, ClientFilter, GuardFilter, InventoryFilter, SalaryFilter, Store};
use crate::{
    database::Database,
    errors::AppError,
    models::{
        Client, CreateClient, CreateDutyAssignment, CreateGuard, CreateSalaryRecord, DutyAssignment, Guard,
        InventoryChange, InventoryRecord, IssueInventory, SalaryRecord, UpdateClient, UpdateDutyAssignment,
        UpdateGuard, UpdateSalaryRecord, User,
    },
};

/// Postgres-backed store. Every compound operation runs in one transaction and
/// locks the rows it reads before writing them back.
#[derive(Clone)]
pub struct PgStore {
    pool: Database,
}

impl PgStore {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }
}

/// `%term%` for ILIKE, with the pattern metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, skip: Option<i64>, limit: Option<i64>) {
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(limit.max(0));
    }
    if let Some(skip) = skip.filter(|s| *s > 0) {
        qb.push(" OFFSET ").push_bind(skip);
    }
}

async fn lock_guard(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<Guard, AppError> {
    sqlx::query_as::<_, Guard>("SELECT * FROM guards WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("Guard"))
}

async fn fetch_client(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<Client, AppError> {
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("Client"))
}

async fn write_guard_deducted(tx: &mut Transaction<'_, Postgres>, guard: &Guard) -> Result<(), AppError> {
    sqlx::query("UPDATE guards SET uniform_deducted_amount = $2, updated_at = $3 WHERE id = $1")
        .bind(guard.id)
        .bind(guard.uniform_deducted_amount)
        .bind(guard.updated_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_guard(&self, input: CreateGuard) -> Result<Guard, AppError> {
        let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM guards WHERE contact_number = $1)")
            .bind(&input.contact_number)
            .fetch_one(&self.pool)
            .await?;
        if taken {
            return Err(AppError::DuplicateKey("contact number already registered".to_string()));
        }

        let guard = input.build(0, Utc::now());
        // The unique constraint still decides when two requests race past the check.
        let guard = sqlx::query_as::<_, Guard>(
            r#"
            INSERT INTO guards (
                name, contact_number, address, cnic, join_date, status, current_salary,
                uniform_cost, uniform_deducted_amount, monthly_deduction, photo_url, document_url,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(&guard.name)
        .bind(&guard.contact_number)
        .bind(&guard.address)
        .bind(&guard.cnic)
        .bind(guard.join_date)
        .bind(guard.status)
        .bind(guard.current_salary)
        .bind(guard.uniform_cost)
        .bind(guard.uniform_deducted_amount)
        .bind(guard.monthly_deduction)
        .bind(&guard.photo_url)
        .bind(&guard.document_url)
        .bind(guard.created_at)
        .bind(guard.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(guard)
    }

    async fn get_guard(&self, id: i64) -> Result<Guard, AppError> {
        sqlx::query_as::<_, Guard>("SELECT * FROM guards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Guard"))
    }

    async fn get_guard_by_contact(&self, contact_number: &str) -> Result<Guard, AppError> {
        sqlx::query_as::<_, Guard>("SELECT * FROM guards WHERE contact_number = $1")
            .bind(contact_number)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Guard"))
    }

    async fn list_guards(&self, filter: &GuardFilter) -> Result<Vec<Guard>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM guards WHERE TRUE");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(term) = filter.search.as_deref() {
            let pattern = like_pattern(term);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR contact_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(term) = filter.name.as_deref() {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(term));
        }
        if let Some(term) = filter.contact.as_deref() {
            qb.push(" AND contact_number ILIKE ").push_bind(like_pattern(term));
        }
        qb.push(" ORDER BY id");
        push_window(&mut qb, filter.skip, filter.limit);

        Ok(qb.build_query_as::<Guard>().fetch_all(&self.pool).await?)
    }

    async fn update_guard(&self, id: i64, update: UpdateGuard) -> Result<Guard, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut guard = lock_guard(&mut tx, id).await?;

        if let Some(contact) = update.changed_contact(&guard) {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM guards WHERE contact_number = $1 AND id <> $2)",
            )
            .bind(contact)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if taken {
                return Err(AppError::DuplicateKey("contact number already exists".to_string()));
            }
        }

        update.apply(&mut guard, Utc::now())?;

        let guard = sqlx::query_as::<_, Guard>(
            r#"
            UPDATE guards SET
                name = $2, contact_number = $3, address = $4, cnic = $5, join_date = $6,
                status = $7, current_salary = $8, uniform_cost = $9, monthly_deduction = $10,
                photo_url = $11, document_url = $12, updated_at = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&guard.name)
        .bind(&guard.contact_number)
        .bind(&guard.address)
        .bind(&guard.cnic)
        .bind(guard.join_date)
        .bind(guard.status)
        .bind(guard.current_salary)
        .bind(guard.uniform_cost)
        .bind(guard.monthly_deduction)
        .bind(&guard.photo_url)
        .bind(&guard.document_url)
        .bind(guard.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(guard)
    }

    async fn delete_guard(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        lock_guard(&mut tx, id).await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM duty_assignments WHERE guard_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(AppError::Conflict(
                "guard has duty assignments and cannot be deleted".to_string(),
            ));
        }

        // Salary and inventory rows go with the guard (ON DELETE CASCADE).
        sqlx::query("DELETE FROM guards WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_client(&self, input: CreateClient) -> Result<Client, AppError> {
        let client = input.build(0, Utc::now());
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                name, contact_person, contact_number, address, company_name, contract_rate,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&client.name)
        .bind(&client.contact_person)
        .bind(&client.contact_number)
        .bind(&client.address)
        .bind(&client.company_name)
        .bind(client.contract_rate)
        .bind(client.created_at)
        .bind(client.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    async fn get_client(&self, id: i64) -> Result<Client, AppError> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Client"))
    }

    async fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM clients WHERE TRUE");
        if let Some(term) = filter.search.as_deref() {
            let pattern = like_pattern(term);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR company_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY id");
        push_window(&mut qb, filter.skip, filter.limit);

        Ok(qb.build_query_as::<Client>().fetch_all(&self.pool).await?)
    }

    async fn update_client(&self, id: i64, update: UpdateClient) -> Result<Client, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Client"))?;

        update.apply(&mut client, Utc::now());

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                name = $2, contact_person = $3, contact_number = $4, address = $5,
                company_name = $6, contract_rate = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&client.name)
        .bind(&client.contact_person)
        .bind(&client.contact_number)
        .bind(&client.address)
        .bind(&client.company_name)
        .bind(client.contract_rate)
        .bind(client.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(client)
    }

    async fn delete_client(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        fetch_client(&mut tx, id).await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM duty_assignments WHERE client_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(AppError::Conflict(
                "client has duty assignments and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn assign_duty(&self, input: CreateDutyAssignment) -> Result<DutyAssignment, AppError> {
        let mut tx = self.pool.begin().await?;
        // Locking the guard serialises concurrent assignments for the same guard.
        let guard = lock_guard(&mut tx, input.guard_id).await?;
        let client = fetch_client(&mut tx, input.client_id).await?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE duty_assignments SET is_active = FALSE, end_date = $2, updated_at = $2 \
             WHERE guard_id = $1 AND is_active",
        )
        .bind(guard.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let assignment = input.open(0, &guard, &client, now);
        let assignment = sqlx::query_as::<_, DutyAssignment>(
            r#"
            INSERT INTO duty_assignments (
                guard_id, client_id, guard_name, client_name, start_date, end_date,
                duty_status, shift_type, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(assignment.guard_id)
        .bind(assignment.client_id)
        .bind(&assignment.guard_name)
        .bind(&assignment.client_name)
        .bind(assignment.start_date)
        .bind(assignment.end_date)
        .bind(assignment.duty_status)
        .bind(&assignment.shift_type)
        .bind(assignment.is_active)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(assignment)
    }

    async fn get_assignment(&self, id: i64) -> Result<DutyAssignment, AppError> {
        sqlx::query_as::<_, DutyAssignment>("SELECT * FROM duty_assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Duty assignment"))
    }

    async fn list_assignments(&self, filter: &AssignmentFilter) -> Result<Vec<DutyAssignment>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM duty_assignments WHERE TRUE");
        if let Some(guard_id) = filter.guard_id {
            qb.push(" AND guard_id = ").push_bind(guard_id);
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(is_active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(duty_status) = filter.duty_status {
            qb.push(" AND duty_status = ").push_bind(duty_status);
        }
        qb.push(" ORDER BY id");
        push_window(&mut qb, filter.skip, filter.limit);

        Ok(qb.build_query_as::<DutyAssignment>().fetch_all(&self.pool).await?)
    }

    async fn update_assignment(
        &self,
        id: i64,
        update: UpdateDutyAssignment,
    ) -> Result<DutyAssignment, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut assignment =
            sqlx::query_as::<_, DutyAssignment>("SELECT * FROM duty_assignments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Duty assignment"))?;

        let new_client = match update.changed_client(&assignment) {
            Some(client_id) => Some(fetch_client(&mut tx, client_id).await?),
            None => None,
        };

        // The partial unique index rejects a second active row; reported as a conflict.
        update.apply(&mut assignment, new_client.as_ref(), Utc::now());

        let assignment = sqlx::query_as::<_, DutyAssignment>(
            r#"
            UPDATE duty_assignments SET
                client_id = $2, client_name = $3, end_date = $4, duty_status = $5,
                shift_type = $6, is_active = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(assignment.client_id)
        .bind(&assignment.client_name)
        .bind(assignment.end_date)
        .bind(assignment.duty_status)
        .bind(&assignment.shift_type)
        .bind(assignment.is_active)
        .bind(assignment.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(assignment)
    }

    async fn delete_assignment(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM duty_assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Duty assignment"));
        }
        Ok(())
    }

    async fn create_salary_record(&self, input: CreateSalaryRecord) -> Result<SalaryRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut guard = lock_guard(&mut tx, input.guard_id).await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM salary_records WHERE guard_id = $1 AND month = $2 AND year = $3)",
        )
        .bind(input.guard_id)
        .bind(input.month)
        .bind(input.year)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(AppError::DuplicateKey(
                "salary record already exists for this month".to_string(),
            ));
        }

        let now = Utc::now();
        let record = input.compute(0, &guard, now);
        guard.uniform_deducted_amount += record.uniform_deduction;
        guard.updated_at = now;
        write_guard_deducted(&mut tx, &guard).await?;

        let record = sqlx::query_as::<_, SalaryRecord>(
            r#"
            INSERT INTO salary_records (
                guard_id, month, year, base_salary, deductions, uniform_deduction, bonus,
                final_salary, is_paid, payment_date, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(record.guard_id)
        .bind(record.month)
        .bind(record.year)
        .bind(record.base_salary)
        .bind(record.deductions)
        .bind(record.uniform_deduction)
        .bind(record.bonus)
        .bind(record.final_salary)
        .bind(record.is_paid)
        .bind(record.payment_date)
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn get_salary_record(&self, id: i64) -> Result<SalaryRecord, AppError> {
        sqlx::query_as::<_, SalaryRecord>("SELECT * FROM salary_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Salary record"))
    }

    async fn list_salary_records(&self, filter: &SalaryFilter) -> Result<Vec<SalaryRecord>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM salary_records WHERE TRUE");
        if let Some(guard_id) = filter.guard_id {
            qb.push(" AND guard_id = ").push_bind(guard_id);
        }
        if let Some(month) = filter.month {
            qb.push(" AND month = ").push_bind(month);
        }
        if let Some(year) = filter.year {
            qb.push(" AND year = ").push_bind(year);
        }
        if let Some(is_paid) = filter.is_paid {
            qb.push(" AND is_paid = ").push_bind(is_paid);
        }
        qb.push(" ORDER BY id");
        push_window(&mut qb, filter.skip, filter.limit);

        Ok(qb.build_query_as::<SalaryRecord>().fetch_all(&self.pool).await?)
    }

    async fn update_salary_record(
        &self,
        id: i64,
        update: UpdateSalaryRecord,
    ) -> Result<SalaryRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut record =
            sqlx::query_as::<_, SalaryRecord>("SELECT * FROM salary_records WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Salary record"))?;
        let guard = sqlx::query_as::<_, Guard>("SELECT * FROM guards WHERE id = $1")
            .bind(record.guard_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Guard"))?;

        update.apply(&mut record, &guard, Utc::now());

        let record = sqlx::query_as::<_, SalaryRecord>(
            r#"
            UPDATE salary_records SET
                base_salary = $2, deductions = $3, bonus = $4, final_salary = $5,
                is_paid = $6, payment_date = $7, notes = $8, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(record.base_salary)
        .bind(record.deductions)
        .bind(record.bonus)
        .bind(record.final_salary)
        .bind(record.is_paid)
        .bind(record.payment_date)
        .bind(&record.notes)
        .bind(record.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn delete_salary_record(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let guard_id = sqlx::query_scalar::<_, i64>("SELECT guard_id FROM salary_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Salary record"))?;

        // Guard before record, the same order salary creation takes its locks in.
        let mut guard = lock_guard(&mut tx, guard_id).await?;
        let record =
            sqlx::query_as::<_, SalaryRecord>("SELECT * FROM salary_records WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Salary record"))?;

        guard.refund_uniform_installment(record.uniform_deduction, Utc::now());
        write_guard_deducted(&mut tx, &guard).await?;

        sqlx::query("DELETE FROM salary_records WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn issue_inventory(&self, input: IssueInventory) -> Result<InventoryRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM guards WHERE id = $1)")
            .bind(input.guard_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Guard"));
        }

        let record = input.build(0, Utc::now());
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            INSERT INTO inventory_records (
                guard_id, item_name, item_type, quantity, issue_date, return_date, status,
                condition_on_issue, condition_on_return, cost, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(record.guard_id)
        .bind(&record.item_name)
        .bind(&record.item_type)
        .bind(record.quantity)
        .bind(record.issue_date)
        .bind(record.return_date)
        .bind(record.status)
        .bind(&record.condition_on_issue)
        .bind(&record.condition_on_return)
        .bind(record.cost)
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn get_inventory(&self, id: i64) -> Result<InventoryRecord, AppError> {
        sqlx::query_as::<_, InventoryRecord>("SELECT * FROM inventory_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Inventory record"))
    }

    async fn list_inventory(&self, filter: &InventoryFilter) -> Result<Vec<InventoryRecord>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM inventory_records WHERE TRUE");
        if let Some(guard_id) = filter.guard_id {
            qb.push(" AND guard_id = ").push_bind(guard_id);
        }
        if let Some(item_type) = filter.item_type.as_deref() {
            qb.push(" AND item_type = ").push_bind(item_type.to_string());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.issued_from {
            qb.push(" AND issue_date >= ").push_bind(from);
        }
        if let Some(before) = filter.issued_before {
            qb.push(" AND issue_date < ").push_bind(before);
        }
        qb.push(" ORDER BY id");
        push_window(&mut qb, filter.skip, filter.limit);

        Ok(qb.build_query_as::<InventoryRecord>().fetch_all(&self.pool).await?)
    }

    async fn change_inventory(&self, id: i64, change: InventoryChange) -> Result<InventoryRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut record =
            sqlx::query_as::<_, InventoryRecord>("SELECT * FROM inventory_records WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Inventory record"))?;

        change.apply(&mut record, Utc::now())?;

        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            UPDATE inventory_records SET
                status = $2, return_date = $3, condition_on_return = $4, notes = $5, updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(record.status)
        .bind(record.return_date)
        .bind(&record.condition_on_return)
        .bind(&record.notes)
        .bind(record.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn delete_inventory(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM inventory_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Inventory record"));
        }
        Ok(())
    }

    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User, AppError> {
        let username_taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        if username_taken {
            return Err(AppError::DuplicateKey("username already registered".to_string()));
        }
        let email_taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        if email_taken {
            return Err(AppError::DuplicateKey("email already registered".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }
}
