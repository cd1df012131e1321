// Selection state - the user's current filters
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationMode {
    #[default]
    LocationHistory,
    ExceptionHistory,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SelectionError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Unknown rule: {0}")]
    UnknownRule(String),
    #[error("The rule selector is only available when visualizing exception history")]
    RuleSelectorDisabled,
}

/// Raw date inputs as typed into the form (`datetime-local` values).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl DateRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The whole of `day`, as the form pre-fills it.
    pub fn whole_day(day: NaiveDate) -> Self {
        let day = day.format("%Y-%m-%d");
        Self::new(format!("{day}T00:00"), format!("{day}T23:59"))
    }

    /// Both bounds as host API timestamps, or `None` while either is blank.
    /// No check that `from <= to`.
    pub fn resolve(&self) -> Result<Option<(String, String)>, SelectionError> {
        if self.from.trim().is_empty() || self.to.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some((to_api_timestamp(&self.from)?, to_api_timestamp(&self.to)?)))
    }
}

/// Convert a form value to the host's ISO-8601 UTC form
/// (`2026-10-17T00:00:00.000Z`). Values without an offset are taken as UTC.
pub fn to_api_timestamp(value: &str) -> Result<String, SelectionError> {
    let value = value.trim();
    let parsed = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|naive| naive.and_utc())
            .ok_or_else(|| SelectionError::InvalidDate(value.to_string()))?,
    };
    Ok(format_api_timestamp(parsed))
}

pub fn format_api_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    pub group_ids: Vec<String>,
    pub vehicle_ids: Vec<String>,
    pub date_range: DateRange,
    pub mode: VisualizationMode,
    /// Selected rule option. Kept when switching back to location history;
    /// only read in exception mode.
    pub rule_id: Option<String>,
}

impl SelectionState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            date_range: DateRange::whole_day(today),
            ..Self::default()
        }
    }

    pub fn rule_selector_enabled(&self) -> bool {
        self.mode == VisualizationMode::ExceptionHistory
    }

    /// The rule the aggregator should use, if the mode reads one at all.
    pub fn active_rule_id(&self) -> Option<&str> {
        if self.rule_selector_enabled() {
            self.rule_id.as_deref().filter(|id| !id.is_empty())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_day_defaults() {
        let state = SelectionState::new(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert_eq!(state.date_range.from, "2026-10-17T00:00");
        assert_eq!(state.date_range.to, "2026-10-17T23:59");
        assert_eq!(state.mode, VisualizationMode::LocationHistory);
        assert!(!state.rule_selector_enabled());
    }

    #[test]
    fn test_resolve_converts_form_values() {
        let range = DateRange::new("2026-10-17T00:00", "2026-10-17T23:59:30");
        let (from, to) = range.resolve().unwrap().unwrap();
        assert_eq!(from, "2026-10-17T00:00:00.000Z");
        assert_eq!(to, "2026-10-17T23:59:30.000Z");
    }

    #[test]
    fn test_resolve_normalizes_offsets_to_utc() {
        let range = DateRange::new("2026-10-17T00:00:00-04:00", "2026-10-18");
        let (from, to) = range.resolve().unwrap().unwrap();
        assert_eq!(from, "2026-10-17T04:00:00.000Z");
        assert_eq!(to, "2026-10-18T00:00:00.000Z");
    }

    #[test]
    fn test_resolve_blank_bound_is_absent() {
        assert_eq!(DateRange::new("", "2026-10-17T23:59").resolve(), Ok(None));
        assert_eq!(DateRange::new("2026-10-17T00:00", "  ").resolve(), Ok(None));
    }

    #[test]
    fn test_resolve_does_not_order_bounds() {
        let range = DateRange::new("2026-10-18T00:00", "2026-10-17T00:00");
        assert!(range.resolve().unwrap().is_some());
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        let range = DateRange::new("yesterday", "2026-10-17T00:00");
        assert_eq!(
            range.resolve(),
            Err(SelectionError::InvalidDate("yesterday".to_string()))
        );
    }

    #[test]
    fn test_stale_rule_ignored_in_location_mode() {
        let mut state = SelectionState::default();
        state.mode = VisualizationMode::ExceptionHistory;
        state.rule_id = Some("RuleSpeedingId".to_string());
        assert_eq!(state.active_rule_id(), Some("RuleSpeedingId"));

        state.mode = VisualizationMode::LocationHistory;
        assert!(!state.rule_selector_enabled());
        assert_eq!(state.active_rule_id(), None);
    }
}
