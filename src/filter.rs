//! Narrowing of the loaded page. Nothing here touches the store.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::{Employee, Role};

/// Transient listing filter. The default lets every record through.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub roles: BTreeSet<Role>,
    /// Upper bound on years of experience; `0` means no limit.
    pub max_experience: u32,
    /// Exclusive lower bound on the join date.
    pub joined_after: Option<NaiveDate>,
    /// Exclusive upper bound on the join date.
    pub joined_before: Option<NaiveDate>,
    pub name: String,
}

impl FilterCriteria {
    pub fn matches(&self, employee: &Employee) -> bool {
        self.role_matches(employee)
            && self.experience_matches(employee)
            && self.date_matches(employee)
            && self.name_matches(employee)
    }

    /// Records of `loaded` passing every predicate, in page order.
    pub fn apply<'a>(&self, loaded: &'a [Employee]) -> Vec<&'a Employee> {
        loaded.iter().filter(|employee| self.matches(employee)).collect()
    }

    fn role_matches(&self, employee: &Employee) -> bool {
        self.roles.is_empty() || self.roles.contains(&employee.fields.role)
    }

    fn experience_matches(&self, employee: &Employee) -> bool {
        if self.max_experience == 0 {
            return true;
        }
        parse_experience(&employee.fields.experience)
            .is_some_and(|years| years <= i64::from(self.max_experience))
    }

    fn date_matches(&self, employee: &Employee) -> bool {
        let joined = employee.fields.join_date;
        self.joined_after.is_none_or(|start| joined > start)
            && self.joined_before.is_none_or(|end| joined < end)
    }

    fn name_matches(&self, employee: &Employee) -> bool {
        employee
            .fields
            .name
            .to_lowercase()
            .contains(&self.name.to_lowercase())
    }
}

/// Leading integer of free-text experience: `"3 years"` is 3, `"x"` is none.
pub fn parse_experience(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}
