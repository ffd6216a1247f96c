//! Aggregate statistics over the whole user set

use std::collections::BTreeMap;

use serde::Serialize;

use super::entity::User;

/// Counts per city and state plus age statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserSummary {
    pub count_by_city: BTreeMap<String, u64>,
    pub count_by_state: BTreeMap<String, u64>,
    /// Rounded to two decimals; `None` when there are no users
    pub avg_age: Option<f64>,
    pub max_age: Option<u32>,
    pub min_age: Option<u32>,
}

impl UserSummary {
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut summary = Self::default();
        let mut age_total: u64 = 0;
        let mut count: u64 = 0;

        for user in users {
            *summary
                .count_by_city
                .entry(user.city().to_string())
                .or_insert(0) += 1;
            *summary
                .count_by_state
                .entry(user.state().to_string())
                .or_insert(0) += 1;

            let age = user.age();
            summary.max_age = Some(summary.max_age.map_or(age, |m| m.max(age)));
            summary.min_age = Some(summary.min_age.map_or(age, |m| m.min(age)));
            age_total += u64::from(age);
            count += 1;
        }

        if count > 0 {
            summary.avg_age = Some(round_two_decimals(age_total as f64 / count as f64));
        }

        summary
    }
}

/// Round to two decimal places
pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
