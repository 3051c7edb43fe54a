use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    models::{Client, DutyAssignment, DutyStatus, Guard, InventoryRecord, InventoryStatus},
    store::{AssignmentFilter, GuardFilter, InventoryFilter, Store},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct PostedGuard {
    pub assignment_id: i64,
    pub guard_id: i64,
    pub guard_name: String,
    pub contact_number: Option<String>,
    pub duty_status: DutyStatus,
    pub shift_type: String,
    pub start_date: DateTime<Utc>,
}

fn posted(assignment: &DutyAssignment, guards: &[Guard]) -> PostedGuard {
    PostedGuard {
        assignment_id: assignment.id,
        guard_id: assignment.guard_id,
        guard_name: assignment.guard_name.clone(),
        contact_number: guards
            .iter()
            .find(|g| g.id == assignment.guard_id)
            .map(|g| g.contact_number.clone()),
        duty_status: assignment.duty_status,
        shift_type: assignment.shift_type.clone(),
        start_date: assignment.start_date,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientRoster {
    pub client_id: i64,
    pub client_name: String,
    pub guard_count: usize,
    pub guards: Vec<PostedGuard>,
}

/// Groups active assignments by client, ordered by client id.
pub fn group_by_client(active: &[DutyAssignment], guards: &[Guard]) -> Vec<ClientRoster> {
    let mut rosters: BTreeMap<i64, ClientRoster> = BTreeMap::new();
    for assignment in active.iter().filter(|a| a.is_active) {
        let roster = rosters.entry(assignment.client_id).or_insert_with(|| ClientRoster {
            client_id: assignment.client_id,
            client_name: assignment.client_name.clone(),
            guard_count: 0,
            guards: Vec::new(),
        });
        roster.guards.push(posted(assignment, guards));
        roster.guard_count += 1;
    }
    rosters.into_values().collect()
}

pub async fn assignments_by_client(store: &dyn Store) -> Result<Vec<ClientRoster>, AppError> {
    let active = store
        .list_assignments(&AssignmentFilter {
            is_active: Some(true),
            ..Default::default()
        })
        .await?;
    let guards = store.list_guards(&GuardFilter::default()).await?;
    Ok(group_by_client(&active, &guards))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientGuards {
    pub client: Client,
    pub guard_count: usize,
    pub guards: Vec<PostedGuard>,
}

pub async fn client_guards(store: &dyn Store, client_id: i64) -> Result<ClientGuards, AppError> {
    let client = store.get_client(client_id).await?;
    let active = store
        .list_assignments(&AssignmentFilter {
            client_id: Some(client_id),
            is_active: Some(true),
            ..Default::default()
        })
        .await?;
    let all_guards = store.list_guards(&GuardFilter::default()).await?;

    let guards: Vec<PostedGuard> = active.iter().map(|a| posted(a, &all_guards)).collect();
    Ok(ClientGuards {
        client,
        guard_count: guards.len(),
        guards,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuardInventory {
    pub guard_id: i64,
    pub issued_count: usize,
    pub returned_count: usize,
    pub lost_count: usize,
    pub issued: Vec<InventoryRecord>,
    pub returned: Vec<InventoryRecord>,
    pub lost: Vec<InventoryRecord>,
}

pub fn partition_inventory(guard_id: i64, records: Vec<InventoryRecord>) -> GuardInventory {
    let mut view = GuardInventory {
        guard_id,
        issued_count: 0,
        returned_count: 0,
        lost_count: 0,
        issued: Vec::new(),
        returned: Vec::new(),
        lost: Vec::new(),
    };
    for record in records {
        match record.status {
            InventoryStatus::Issued => view.issued.push(record),
            InventoryStatus::Returned => view.returned.push(record),
            InventoryStatus::Lost => view.lost.push(record),
        }
    }
    view.issued_count = view.issued.len();
    view.returned_count = view.returned.len();
    view.lost_count = view.lost.len();
    view
}

pub async fn guard_inventory(store: &dyn Store, guard_id: i64) -> Result<GuardInventory, AppError> {
    store.get_guard(guard_id).await?;
    let records = store
        .list_inventory(&InventoryFilter {
            guard_id: Some(guard_id),
            ..Default::default()
        })
        .await?;
    Ok(partition_inventory(guard_id, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateClient, CreateDutyAssignment, CreateGuard, IssueInventory};
    use rust_decimal::Decimal;

    fn guard(id: i64) -> Guard {
        CreateGuard {
            name: format!("Guard {id}"),
            contact_number: format!("03{id:02}"),
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
        .build(id, Utc::now())
    }

    fn client(id: i64) -> Client {
        CreateClient {
            name: format!("Site {id}"),
            contact_person: None,
            contact_number: None,
            address: None,
            company_name: None,
            contract_rate: Decimal::ZERO,
        }
        .build(id, Utc::now())
    }

    #[test]
    fn active_assignments_fan_out_per_client() {
        let guards: Vec<Guard> = (1..=3).map(guard).collect();
        let (a, b) = (client(1), client(2));
        let open = |id: i64, g: &Guard, c: &Client| {
            CreateDutyAssignment {
                guard_id: g.id,
                client_id: c.id,
                start_date: None,
                duty_status: None,
                shift_type: None,
            }
            .open(id, g, c, Utc::now())
        };
        let mut closed = open(4, &guards[2], &b);
        closed.close(Utc::now());
        let rows = vec![open(1, &guards[0], &a), open(2, &guards[1], &a), open(3, &guards[2], &b), closed];

        let rosters = group_by_client(&rows, &guards);
        assert_eq!(rosters.len(), 2);
        assert_eq!(rosters[0].client_id, 1);
        assert_eq!(rosters[0].guard_count, 2);
        assert_eq!(rosters[1].guard_count, 1);
        assert_eq!(rosters[1].guards[0].contact_number.as_deref(), Some("0303"));
    }

    #[test]
    fn inventory_is_partitioned_by_status() {
        let issue = |id: i64| {
            IssueInventory {
                guard_id: 1,
                item_name: "Baton".to_string(),
                item_type: "equipment".to_string(),
                quantity: None,
                issue_date: None,
                condition_on_issue: None,
                cost: Decimal::ZERO,
                notes: None,
            }
            .build(id, Utc::now())
        };
        let mut returned = issue(2);
        returned.status = InventoryStatus::Returned;

        let view = partition_inventory(1, vec![issue(1), returned, issue(3)]);
        assert_eq!(view.issued_count, 2);
        assert_eq!(view.returned_count, 1);
        assert_eq!(view.lost_count, 0);
    }
}
