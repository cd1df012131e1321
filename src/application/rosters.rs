// Roster use cases - the group, vehicle and rule lists behind the selectors
use crate::application::host_api::{GetParams, HostApi, HostApiError, get_entities};
use crate::domain::fleet::{Group, Rule, Vehicle, sort_by_name};
use crate::domain::selection::format_api_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub const DEVICE_RESULTS_LIMIT: usize = 50_000;
pub const RULE_PLACEHOLDER: &str = "Select a rule";

/// One `<option>` of a selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: Option<String>,
    pub label: String,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            label: label.into(),
            disabled: false,
        }
    }

    pub fn placeholder(label: impl Into<String>) -> Self {
        Self {
            value: None,
            label: label.into(),
            disabled: true,
        }
    }
}

#[derive(Clone)]
pub struct GroupRoster {
    api: Arc<dyn HostApi>,
}

impl GroupRoster {
    pub fn new(api: Arc<dyn HostApi>) -> Self {
        Self { api }
    }

    /// All groups sorted by name; `None` when the host returned nothing.
    pub async fn populate(&self) -> Result<Option<Vec<Group>>, HostApiError> {
        let groups = get_entities::<Group>(self.api.as_ref(), GetParams::new("Group")).await?;
        Ok(groups.map(|mut groups| {
            sort_by_name(&mut groups);
            tracing::debug!("Loaded {} groups", groups.len());
            groups
        }))
    }
}

#[derive(Clone)]
pub struct VehicleRoster {
    api: Arc<dyn HostApi>,
}

impl VehicleRoster {
    pub fn new(api: Arc<dyn HostApi>) -> Self {
        Self { api }
    }

    /// Active vehicles, restricted to `group_ids` unless it is empty.
    pub async fn populate(&self, group_ids: &[String]) -> Result<Option<Vec<Vehicle>>, HostApiError> {
        let params = device_query(group_ids, Utc::now());
        let vehicles = get_entities::<Vehicle>(self.api.as_ref(), params).await?;
        Ok(vehicles.map(|mut vehicles| {
            sort_by_name(&mut vehicles);
            tracing::debug!(
                "Loaded {} vehicles for {} groups",
                vehicles.len(),
                group_ids.len()
            );
            vehicles
        }))
    }
}

/// Devices whose active window includes `now`.
pub fn device_query(group_ids: &[String], now: DateTime<Utc>) -> GetParams {
    let mut search = json!({ "fromDate": format_api_timestamp(now) });
    if !group_ids.is_empty() {
        search["groups"] = group_ids.iter().map(|id| json!({ "id": id })).collect();
    }
    GetParams::new("Device")
        .with_results_limit(DEVICE_RESULTS_LIMIT)
        .with_search(search)
}

#[derive(Clone)]
pub struct RuleRoster {
    api: Arc<dyn HostApi>,
}

impl RuleRoster {
    pub fn new(api: Arc<dyn HostApi>) -> Self {
        Self { api }
    }

    pub async fn populate(&self) -> Result<Option<Vec<Rule>>, HostApiError> {
        let rules = get_entities::<Rule>(self.api.as_ref(), GetParams::new("Rule")).await?;
        Ok(rules.map(|mut rules| {
            sort_by_name(&mut rules);
            tracing::debug!("Loaded {} rules", rules.len());
            rules
        }))
    }
}

/// Rule selector contents: a disabled placeholder, then the rules.
pub fn rule_options(rules: &[Rule]) -> Vec<SelectOption> {
    std::iter::once(SelectOption::placeholder(RULE_PLACEHOLDER))
        .chain(rules.iter().map(|r| SelectOption::new(&r.id, &r.name)))
        .collect()
}

pub fn vehicle_options(vehicles: &[Vehicle]) -> Vec<SelectOption> {
    vehicles
        .iter()
        .map(|v| SelectOption::new(&v.id, &v.name))
        .collect()
}

pub fn group_options(groups: &[Group]) -> Vec<SelectOption> {
    groups
        .iter()
        .map(|g| SelectOption::new(&g.id, g.label()))
        .collect()
}
