//! Read-only aggregates over the store: the dashboard overview, the monthly
//! payroll summary, a client's roster cost and a guard's full history.
//!
//! Each report is split into a pure `*_from` function over already fetched rows
//! and an async wrapper that fetches those rows from a [`Store`].

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    errors::AppError,
    models::{
        Client, DutyAssignment, DutyStatus, Guard, GuardStatus, InventoryRecord, InventoryStatus, SalaryRecord,
    },
    store::{AssignmentFilter, ClientFilter, GuardFilter, InventoryFilter, SalaryFilter, Store, MAX_PAGE_SIZE},
};

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardCounts {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub on_leave: usize,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentCounts {
    pub total: usize,
    pub active: usize,
    pub on_duty: usize,
    pub off_duty: usize,
    pub available: usize,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientCounts {
    pub total: usize,
    pub with_active_guards: usize,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SalaryTotals {
    pub records: usize,
    pub paid_count: usize,
    pub pending_count: usize,
    pub paid_total: Decimal,
    pub pending_total: Decimal,
}

impl SalaryTotals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a SalaryRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut totals, record| {
            totals.records += 1;
            if record.is_paid {
                totals.paid_count += 1;
                totals.paid_total += record.final_salary;
            } else {
                totals.pending_count += 1;
                totals.pending_total += record.final_salary;
            }
            totals
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryCounts {
    pub total: usize,
    pub issued: usize,
    pub returned: usize,
    pub lost: usize,
}

impl InventoryCounts {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a InventoryRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut counts, record| {
            counts.total += 1;
            match record.status {
                InventoryStatus::Issued => counts.issued += 1,
                InventoryStatus::Returned => counts.returned += 1,
                InventoryStatus::Lost => counts.lost += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemOverview {
    pub guards: GuardCounts,
    pub assignments: AssignmentCounts,
    pub clients: ClientCounts,
    pub month: u32,
    pub year: i32,
    pub salaries: SalaryTotals,
    pub inventory: InventoryCounts,
    pub generated_at: DateTime<Utc>,
}

/// `salaries` must already be restricted to the month being reported.
pub fn overview_from(
    guards: &[Guard],
    clients: &[Client],
    assignments: &[DutyAssignment],
    salaries: &[SalaryRecord],
    inventory: &[InventoryRecord],
    now: DateTime<Utc>,
) -> SystemOverview {
    let mut guard_counts = GuardCounts {
        total: guards.len(),
        ..Default::default()
    };
    for guard in guards {
        match guard.status {
            GuardStatus::Active => guard_counts.active += 1,
            GuardStatus::Inactive => guard_counts.inactive += 1,
            GuardStatus::OnLeave => guard_counts.on_leave += 1,
        }
    }

    let mut assignment_counts = AssignmentCounts {
        total: assignments.len(),
        ..Default::default()
    };
    let mut staffed_clients: Vec<i64> = Vec::new();
    for assignment in assignments.iter().filter(|a| a.is_active) {
        assignment_counts.active += 1;
        match assignment.duty_status {
            DutyStatus::OnDuty => assignment_counts.on_duty += 1,
            DutyStatus::OffDuty => assignment_counts.off_duty += 1,
            DutyStatus::Available => assignment_counts.available += 1,
        }
        if !staffed_clients.contains(&assignment.client_id) {
            staffed_clients.push(assignment.client_id);
        }
    }

    SystemOverview {
        guards: guard_counts,
        assignments: assignment_counts,
        clients: ClientCounts {
            total: clients.len(),
            with_active_guards: staffed_clients.len(),
        },
        month: now.month(),
        year: now.year(),
        salaries: SalaryTotals::from_records(salaries),
        inventory: InventoryCounts::from_records(inventory),
        generated_at: now,
    }
}

pub async fn system_overview(store: &dyn Store, now: DateTime<Utc>) -> Result<SystemOverview, AppError> {
    let guards = store.list_guards(&GuardFilter::default()).await?;
    let clients = store.list_clients(&ClientFilter::default()).await?;
    let assignments = store.list_assignments(&AssignmentFilter::default()).await?;
    let salaries = store
        .list_salary_records(&SalaryFilter {
            month: Some(now.month() as i32),
            year: Some(now.year()),
            ..Default::default()
        })
        .await?;
    let inventory = store.list_inventory(&InventoryFilter::default()).await?;

    Ok(overview_from(&guards, &clients, &assignments, &salaries, &inventory, now))
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct MonthlyQuery {
    #[validate(range(min = 1, max = 12, message = "month must be between 1 and 12"))]
    pub month: i32,
    #[validate(range(min = 2020, message = "year must be 2020 or later"))]
    pub year: i32,
}

impl MonthlyQuery {
    /// `[first of month, first of next month)` in UTC.
    pub fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        let start = month_start(self.year, self.month)?;
        let end = month_start(next_year, next_month)?;
        Ok((start, end))
    }
}

fn month_start(year: i32, month: i32) -> Result<DateTime<Utc>, AppError> {
    let month = u32::try_from(month).map_err(|_| AppError::Validation(format!("invalid month {month}")))?;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::Validation(format!("invalid period {year}-{month:02}")))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: i32,
    pub year: i32,
    pub active_guards: usize,
    pub active_assignments: usize,
    pub salaries: SalaryTotals,
    pub inventory_issued: usize,
}

/// `salaries` and `issued` must already be restricted to the period.
pub fn monthly_summary_from(
    query: MonthlyQuery,
    guards: &[Guard],
    assignments: &[DutyAssignment],
    salaries: &[SalaryRecord],
    issued: &[InventoryRecord],
) -> MonthlySummary {
    MonthlySummary {
        month: query.month,
        year: query.year,
        active_guards: guards.iter().filter(|g| g.status == GuardStatus::Active).count(),
        active_assignments: assignments.iter().filter(|a| a.is_active).count(),
        salaries: SalaryTotals::from_records(salaries),
        inventory_issued: issued.len(),
    }
}

pub async fn monthly_summary(store: &dyn Store, query: MonthlyQuery) -> Result<MonthlySummary, AppError> {
    query.validate()?;
    let (from, before) = query.bounds()?;

    let guards = store
        .list_guards(&GuardFilter {
            status: Some(GuardStatus::Active),
            ..Default::default()
        })
        .await?;
    let assignments = store
        .list_assignments(&AssignmentFilter {
            is_active: Some(true),
            ..Default::default()
        })
        .await?;
    let salaries = store
        .list_salary_records(&SalaryFilter {
            month: Some(query.month),
            year: Some(query.year),
            ..Default::default()
        })
        .await?;
    let issued = store
        .list_inventory(&InventoryFilter {
            issued_from: Some(from),
            issued_before: Some(before),
            ..Default::default()
        })
        .await?;

    Ok(monthly_summary_from(query, &guards, &assignments, &salaries, &issued))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RosterEntry {
    pub assignment_id: i64,
    pub guard_id: i64,
    pub guard_name: String,
    pub contact_number: Option<String>,
    pub duty_status: DutyStatus,
    pub shift_type: String,
    pub start_date: DateTime<Utc>,
    pub days_on_duty: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientSummary {
    pub client: Client,
    pub active_guard_count: usize,
    pub total_historical_assignments: usize,
    pub monthly_cost: Decimal,
    pub guards: Vec<RosterEntry>,
}

/// `assignments` holds the client's assignments, open and closed; `guards` is
/// used to fill in contact numbers.
pub fn client_summary_from(
    client: Client,
    assignments: &[DutyAssignment],
    guards: &[Guard],
    now: DateTime<Utc>,
) -> ClientSummary {
    let total_historical_assignments = assignments.iter().filter(|a| a.client_id == client.id).count();
    let roster: Vec<RosterEntry> = assignments
        .iter()
        .filter(|a| a.is_active && a.client_id == client.id)
        .map(|a| RosterEntry {
            assignment_id: a.id,
            guard_id: a.guard_id,
            guard_name: a.guard_name.clone(),
            contact_number: guards
                .iter()
                .find(|g| g.id == a.guard_id)
                .map(|g| g.contact_number.clone()),
            duty_status: a.duty_status,
            shift_type: a.shift_type.clone(),
            start_date: a.start_date,
            days_on_duty: (now - a.start_date).num_days().max(0),
        })
        .collect();

    ClientSummary {
        monthly_cost: client.contract_rate * Decimal::from(roster.len()),
        active_guard_count: roster.len(),
        total_historical_assignments,
        guards: roster,
        client,
    }
}

pub async fn client_summary(store: &dyn Store, client_id: i64, now: DateTime<Utc>) -> Result<ClientSummary, AppError> {
    let client = store.get_client(client_id).await?;
    let assignments = store
        .list_assignments(&AssignmentFilter {
            client_id: Some(client_id),
            limit: Some(MAX_PAGE_SIZE),
            ..Default::default()
        })
        .await?;
    let guards = store.list_guards(&GuardFilter::default()).await?;

    Ok(client_summary_from(client, &assignments, &guards, now))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuardHistory {
    pub guard: Guard,
    pub current_assignment: Option<DutyAssignment>,
    pub assignments: Vec<DutyAssignment>,
    pub salaries: Vec<SalaryRecord>,
    pub salary_totals: SalaryTotals,
    pub inventory: Vec<InventoryRecord>,
    pub inventory_counts: InventoryCounts,
}

/// Orders every history newest first.
pub fn guard_history_from(
    guard: Guard,
    mut assignments: Vec<DutyAssignment>,
    mut salaries: Vec<SalaryRecord>,
    mut inventory: Vec<InventoryRecord>,
) -> GuardHistory {
    assignments.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
    salaries.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
    inventory.sort_by(|a, b| b.issue_date.cmp(&a.issue_date).then(b.id.cmp(&a.id)));

    GuardHistory {
        current_assignment: assignments.iter().find(|a| a.is_active).cloned(),
        salary_totals: SalaryTotals::from_records(&salaries),
        inventory_counts: InventoryCounts::from_records(&inventory),
        guard,
        assignments,
        salaries,
        inventory,
    }
}

pub async fn guard_history(store: &dyn Store, guard_id: i64) -> Result<GuardHistory, AppError> {
    let guard = store.get_guard(guard_id).await?;
    let assignments = store
        .list_assignments(&AssignmentFilter {
            guard_id: Some(guard_id),
            ..Default::default()
        })
        .await?;
    let salaries = store
        .list_salary_records(&SalaryFilter {
            guard_id: Some(guard_id),
            ..Default::default()
        })
        .await?;
    let inventory = store
        .list_inventory(&InventoryFilter {
            guard_id: Some(guard_id),
            ..Default::default()
        })
        .await?;

    Ok(guard_history_from(guard, assignments, salaries, inventory))
}
