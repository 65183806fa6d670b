use crate::core::models::Employee;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantFilter {
    All,
    Fund,
    Direct,
    #[default]
    Active,
}

impl ParticipantFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        match self {
            ParticipantFilter::All => true,
            ParticipantFilter::Fund => employee.participates_in_fund,
            ParticipantFilter::Direct => !employee.participates_in_fund,
            ParticipantFilter::Active => employee.is_active_member(),
        }
    }
}

pub fn filter_employees(employees: &[Employee], filter: ParticipantFilter) -> Vec<Employee> {
    employees.iter().filter(|e| filter.matches(e)).cloned().collect()
}

/// Everyone still working here is preselected for a new sharing.
pub fn default_participants(employees: &[Employee]) -> BTreeSet<String> {
    employees
        .iter()
        .filter(|e| e.is_active_member())
        .map(|e| e.id.clone())
        .collect()
}
