//! Advanced search: the basic list filters combined with filters that look
//! across relations (a guard's current client, an assignment's guard name).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    models::{Client, DutyAssignment, DutyStatus, Guard, GuardStatus},
    store::{contains_ignore_case, page_size, AssignmentFilter, ClientFilter, GuardFilter, Store, MAX_PAGE_SIZE},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardSearch {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub status: Option<GuardStatus>,
    /// Only guards with no active duty assignment.
    #[serde(default)]
    pub available_only: bool,
    /// Substring of the client the guard is currently posted at.
    pub client_name: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientSearch {
    pub name: Option<String>,
    pub company: Option<String>,
    pub has_active_guards: Option<bool>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentSearch {
    pub guard_name: Option<String>,
    pub client_name: Option<String>,
    pub shift_type: Option<String>,
    pub is_active: Option<bool>,
    pub duty_status: Option<DutyStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

fn paginate<T>(rows: Vec<T>, skip: Option<i64>, limit: Option<i64>) -> Vec<T> {
    let skip = usize::try_from(skip.unwrap_or(0)).unwrap_or(0);
    let limit = usize::try_from(page_size(limit)).unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(limit).collect()
}

fn matches_term(value: Option<&str>, term: Option<&str>) -> bool {
    match term {
        Some(term) => value.is_some_and(|v| contains_ignore_case(v, term)),
        None => true,
    }
}

fn lookup_clients() -> ClientFilter {
    ClientFilter {
        limit: Some(MAX_PAGE_SIZE),
        ..Default::default()
    }
}

/// Matches the client's current name or company name.
fn client_named(client: &Client, term: &str) -> bool {
    contains_ignore_case(&client.name, term)
        || client
            .company_name
            .as_deref()
            .is_some_and(|company| contains_ignore_case(company, term))
}

/// The active posting of a guard, as the client record currently reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentPosting {
    pub assignment_id: i64,
    pub client_id: i64,
    pub client_name: String,
    pub duty_status: DutyStatus,
    pub shift_type: String,
    pub start_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuardSearchHit {
    #[serde(flatten)]
    pub guard: Guard,
    pub current_assignment: Option<CurrentPosting>,
}

/// `guards` already satisfy the name/contact/status filters; `active` holds every active assignment.
pub fn filter_guards(
    guards: Vec<Guard>,
    active: &[DutyAssignment],
    clients: &[Client],
    search: &GuardSearch,
) -> Vec<GuardSearchHit> {
    let hits = guards
        .into_iter()
        .filter_map(|guard| {
            let posting = active.iter().find(|a| a.guard_id == guard.id);
            let client = posting.and_then(|a| clients.iter().find(|c| c.id == a.client_id));
            if search.available_only && posting.is_some() {
                return None;
            }
            if let Some(term) = search.client_name.as_deref() {
                if !client.is_some_and(|c| client_named(c, term)) {
                    return None;
                }
            }
            let current_assignment = posting.map(|a| CurrentPosting {
                assignment_id: a.id,
                client_id: a.client_id,
                client_name: client
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_else(|| a.client_name.clone()),
                duty_status: a.duty_status,
                shift_type: a.shift_type.clone(),
                start_date: a.start_date,
            });
            Some(GuardSearchHit {
                guard,
                current_assignment,
            })
        })
        .collect();
    paginate(hits, search.skip, search.limit)
}

pub async fn search_guards(store: &dyn Store, search: &GuardSearch) -> Result<Vec<GuardSearchHit>, AppError> {
    let guards = store
        .list_guards(&GuardFilter {
            status: search.status,
            name: search.name.clone(),
            contact: search.contact.clone(),
            ..Default::default()
        })
        .await?;
    let active = store
        .list_assignments(&AssignmentFilter {
            is_active: Some(true),
            ..Default::default()
        })
        .await?;
    let clients = store.list_clients(&lookup_clients()).await?;

    Ok(filter_guards(guards, &active, &clients, search))
}

pub fn filter_clients(clients: Vec<Client>, active: &[DutyAssignment], search: &ClientSearch) -> Vec<Client> {
    let filtered = clients
        .into_iter()
        .filter(|client| {
            matches_term(Some(&client.name), search.name.as_deref())
                && matches_term(client.company_name.as_deref(), search.company.as_deref())
                && search
                    .has_active_guards
                    .map_or(true, |wanted| active.iter().any(|a| a.client_id == client.id) == wanted)
        })
        .collect();
    paginate(filtered, search.skip, search.limit)
}

pub async fn search_clients(store: &dyn Store, search: &ClientSearch) -> Result<Vec<Client>, AppError> {
    let clients = store.list_clients(&ClientFilter::default()).await?;
    let active = store
        .list_assignments(&AssignmentFilter {
            is_active: Some(true),
            ..Default::default()
        })
        .await?;

    Ok(filter_clients(clients, &active, search))
}

/// Name filters look at the guard and client rows as they are now, not the
/// names copied onto the assignment when it was opened.
pub fn filter_assignments(
    assignments: Vec<DutyAssignment>,
    guards: &[Guard],
    clients: &[Client],
    search: &AssignmentSearch,
) -> Vec<DutyAssignment> {
    let filtered = assignments
        .into_iter()
        .filter(|a| {
            let guard_ok = search.guard_name.as_deref().map_or(true, |term| {
                match guards.iter().find(|g| g.id == a.guard_id) {
                    Some(guard) => contains_ignore_case(&guard.name, term),
                    None => contains_ignore_case(&a.guard_name, term),
                }
            });
            let client_ok = search.client_name.as_deref().map_or(true, |term| {
                match clients.iter().find(|c| c.id == a.client_id) {
                    Some(client) => client_named(client, term),
                    None => contains_ignore_case(&a.client_name, term),
                }
            });
            guard_ok
                && client_ok
                && search
                    .shift_type
                    .as_deref()
                    .map_or(true, |shift| a.shift_type.eq_ignore_ascii_case(shift))
        })
        .collect();
    paginate(filtered, search.skip, search.limit)
}

pub async fn search_assignments(
    store: &dyn Store,
    search: &AssignmentSearch,
) -> Result<Vec<DutyAssignment>, AppError> {
    let assignments = store
        .list_assignments(&AssignmentFilter {
            is_active: search.is_active,
            duty_status: search.duty_status,
            ..Default::default()
        })
        .await?;
    let guards = store
        .list_guards(&GuardFilter {
            limit: Some(MAX_PAGE_SIZE),
            ..Default::default()
        })
        .await?;
    let clients = store.list_clients(&lookup_clients()).await?;

    Ok(filter_assignments(assignments, &guards, &clients, search))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateClient, CreateDutyAssignment, CreateGuard};
    use rust_decimal::Decimal;

    fn guard(id: i64, name: &str) -> Guard {
        CreateGuard {
            name: name.to_string(),
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

    fn client(id: i64, name: &str, company: Option<&str>) -> Client {
        CreateClient {
            name: name.to_string(),
            contact_person: None,
            contact_number: None,
            address: None,
            company_name: company.map(str::to_string),
            contract_rate: Decimal::ZERO,
        }
        .build(id, Utc::now())
    }

    fn post(id: i64, guard: &Guard, client: &Client, shift: &str) -> DutyAssignment {
        CreateDutyAssignment {
            guard_id: guard.id,
            client_id: client.id,
            start_date: None,
            duty_status: None,
            shift_type: Some(shift.to_string()),
        }
        .open(id, guard, client, Utc::now())
    }

    #[test]
    fn available_only_excludes_posted_guards() {
        let posted = guard(1, "Asif");
        let free = guard(2, "Kamran");
        let bank = client(1, "Bank", None);
        let active = vec![post(1, &posted, &bank, "day")];

        let search = GuardSearch {
            available_only: true,
            ..Default::default()
        };
        let found = filter_guards(vec![posted, free], &active, &[bank], &search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].guard.name, "Kamran");
        assert!(found[0].current_assignment.is_none());
    }

    #[test]
    fn guards_can_be_found_by_current_client() {
        let a = guard(1, "Asif");
        let b = guard(2, "Kamran");
        let bank = client(1, "Ahmed", Some("Habib Bank"));
        let mall = client(2, "Mall", None);
        let active = vec![post(1, &a, &bank, "day"), post(2, &b, &mall, "night")];

        let search = GuardSearch {
            client_name: Some("habib".to_string()),
            ..Default::default()
        };
        let found = filter_guards(vec![a, b], &active, &[bank, mall], &search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].guard.id, 1);
        let posting = found[0].current_assignment.as_ref().unwrap();
        assert_eq!(posting.client_name, "Habib Bank");
        assert_eq!(posting.shift_type, "day");
    }

    #[test]
    fn clients_filter_on_company_and_staffing() {
        let g = guard(1, "Asif");
        let staffed = client(1, "Ahmed", Some("Habib Bank"));
        let idle = client(2, "Bilal", Some("Habib Foods"));
        let active = vec![post(1, &g, &staffed, "day")];

        let search = ClientSearch {
            company: Some("HABIB".to_string()),
            has_active_guards: Some(false),
            ..Default::default()
        };
        let found = filter_clients(vec![staffed, idle], &active, &search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[test]
    fn assignments_filter_on_names_and_shift() {
        let a = guard(1, "Asif");
        let b = guard(2, "Kamran");
        let bank = client(1, "Bank", None);
        let rows = vec![post(1, &a, &bank, "night"), post(2, &b, &bank, "day")];

        let search = AssignmentSearch {
            guard_name: Some("as".to_string()),
            shift_type: Some("NIGHT".to_string()),
            ..Default::default()
        };
        let found = filter_assignments(rows, &[a, b], &[bank], &search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].guard_id, 1);
    }

    #[test]
    fn pagination_applies_after_filtering() {
        let guards: Vec<Guard> = (1..=5).map(|id| guard(id, "Guard")).collect();
        let search = GuardSearch {
            skip: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let found = filter_guards(guards, &[], &[], &search);
        assert_eq!(found.iter().map(|hit| hit.guard.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn client_filter_uses_current_client_record() {
        let g = guard(1, "Asif");
        let mut site = client(1, "Ahmed Traders", Some("Habib Bank"));
        let active = vec![post(1, &g, &site, "day")];

        let by_name = GuardSearch {
            client_name: Some("ahmed".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_guards(vec![g.clone()], &active, &[site.clone()], &by_name).len(), 1);

        site.company_name = Some("Meezan Bank".to_string());
        let by_new_company = GuardSearch {
            client_name: Some("meezan".to_string()),
            ..Default::default()
        };
        let found = filter_guards(vec![g], &active, &[site], &by_new_company);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].current_assignment.as_ref().unwrap().client_name, "Meezan Bank");
    }

    #[test]
    fn assignment_filters_use_current_guard_and_client_names() {
        let mut g = guard(1, "Asif");
        let site = client(1, "Ahmed Traders", Some("Habib Bank"));
        let rows = vec![post(1, &g, &site, "day")];
        g.name = "Kamran".to_string();

        let by_guard = AssignmentSearch {
            guard_name: Some("kamran".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_assignments(rows.clone(), &[g.clone()], &[site.clone()], &by_guard).len(), 1);

        let by_client = AssignmentSearch {
            client_name: Some("traders".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_assignments(rows, &[g], &[site], &by_client).len(), 1);
    }
}
