// Heat data aggregation - turns a selection into map coordinates
use crate::application::host_api::{ApiCall, GetParams, HostApi, HostApiError, get_batch};
use crate::domain::fleet::Rule;
use crate::domain::selection::{SelectionError, SelectionState, VisualizationMode};
use crate::domain::telemetry::{
    ExceptionEvent, ExceptionHeatmap, HeatmapData, LocationHeatmap, LogRecord, TelemetryPoint,
};
use serde_json::json;
use std::time::Instant;

pub const DEFAULT_RESULTS_LIMIT: usize = 50_000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AggregationError {
    #[error("Please select at least one vehicle from the list and try again.")]
    NoVehicleSelected,
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    HostApi(#[from] HostApiError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    Rendered(HeatmapData),
    NoData,
    /// A date bound or the rule is missing; nothing was requested.
    Skipped,
}

/// A validated request, ready to hit the host.
#[derive(Debug, Clone)]
pub enum HeatPlan {
    Location {
        vehicle_ids: Vec<String>,
        from: String,
        to: String,
        started: Instant,
    },
    Exception {
        vehicle_ids: Vec<String>,
        rule_id: String,
        rule_name: String,
        from: String,
        to: String,
    },
}

#[derive(Debug, Clone)]
pub struct HeatDataAggregator {
    results_limit: usize,
}

impl Default for HeatDataAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_RESULTS_LIMIT)
    }
}

impl HeatDataAggregator {
    pub fn new(results_limit: usize) -> Self {
        Self { results_limit }
    }

    pub async fn run(
        &self,
        api: &dyn HostApi,
        selection: &SelectionState,
        rules: &[Rule],
    ) -> Result<AggregationOutcome, AggregationError> {
        match self.plan(selection, rules)? {
            Some(plan) => self.execute(api, plan).await,
            None => Ok(AggregationOutcome::Skipped),
        }
    }

    /// Check the selection. `Ok(None)` means a date bound or the rule is
    /// missing; that case is silent, unlike a missing vehicle.
    pub fn plan(
        &self,
        selection: &SelectionState,
        rules: &[Rule],
    ) -> Result<Option<HeatPlan>, AggregationError> {
        if selection.vehicle_ids.is_empty() {
            return Err(AggregationError::NoVehicleSelected);
        }
        let started = Instant::now();
        let vehicle_ids = selection.vehicle_ids.clone();

        match selection.mode {
            VisualizationMode::LocationHistory => {
                let Some((from, to)) = selection.date_range.resolve()? else {
                    return Ok(None);
                };
                Ok(Some(HeatPlan::Location {
                    vehicle_ids,
                    from,
                    to,
                    started,
                }))
            }
            VisualizationMode::ExceptionHistory => {
                let Some(rule_id) = selection.active_rule_id() else {
                    return Ok(None);
                };
                let Some((from, to)) = selection.date_range.resolve()? else {
                    return Ok(None);
                };
                let rule_name = rules
                    .iter()
                    .find(|r| r.id == rule_id)
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| rule_id.to_string());
                Ok(Some(HeatPlan::Exception {
                    vehicle_ids,
                    rule_id: rule_id.to_string(),
                    rule_name,
                    from,
                    to,
                }))
            }
        }
    }

    pub async fn execute(
        &self,
        api: &dyn HostApi,
        plan: HeatPlan,
    ) -> Result<AggregationOutcome, AggregationError> {
        match plan {
            HeatPlan::Location {
                vehicle_ids,
                from,
                to,
                started,
            } => self.location_history(api, &vehicle_ids, &from, &to, started).await,
            HeatPlan::Exception {
                vehicle_ids,
                rule_id,
                rule_name,
                from,
                to,
            } => {
                self.exception_history(api, &vehicle_ids, &rule_id, rule_name, &from, &to)
                    .await
            }
        }
    }

    async fn location_history(
        &self,
        api: &dyn HostApi,
        vehicle_ids: &[String],
        from: &str,
        to: &str,
        started: Instant,
    ) -> Result<AggregationOutcome, AggregationError> {
        let calls = vehicle_ids
            .iter()
            .map(|id| ApiCall::get(log_record_query(id, from, to, Some(self.results_limit))))
            .collect();
        let results: Vec<Vec<LogRecord>> = get_batch(api, calls).await?;

        if results_empty(&results) {
            return Ok(AggregationOutcome::NoData);
        }

        let mut points = Vec::new();
        let mut exceeded_limit_count = 0;
        for records in &results {
            points.extend(records.iter().map(LogRecord::point).filter(TelemetryPoint::is_nonzero));
            if records.len() >= self.results_limit {
                exceeded_limit_count += 1;
            }
        }

        if points.is_empty() {
            return Ok(AggregationOutcome::NoData);
        }
        if exceeded_limit_count > 0 {
            tracing::warn!(
                "{} of {} vehicles reached the {} record limit",
                exceeded_limit_count,
                vehicle_ids.len(),
                self.results_limit
            );
        }

        let elapsed_seconds = (started.elapsed().as_secs_f64()).round() as u64;
        tracing::info!(
            "Location heatmap: {} points for {} vehicles in {}s",
            points.len(),
            vehicle_ids.len(),
            elapsed_seconds
        );
        Ok(AggregationOutcome::Rendered(HeatmapData::Location(LocationHeatmap {
            record_count: points.len(),
            points,
            vehicle_count: vehicle_ids.len(),
            elapsed_seconds,
            exceeded_limit_count,
        })))
    }

    async fn exception_history(
        &self,
        api: &dyn HostApi,
        vehicle_ids: &[String],
        rule_id: &str,
        rule_name: String,
        from: &str,
        to: &str,
    ) -> Result<AggregationOutcome, AggregationError> {
        let calls = vehicle_ids
            .iter()
            .map(|id| ApiCall::get(exception_event_query(id, rule_id, from, to)))
            .collect();
        let events: Vec<Vec<ExceptionEvent>> = get_batch(api, calls).await?;

        if results_empty(&events) {
            return Ok(AggregationOutcome::NoData);
        }

        // One LogRecord query per event, whichever vehicle it belongs to.
        // These carry no results limit.
        let log_calls: Vec<ApiCall> = events
            .iter()
            .flatten()
            .map(|event| {
                ApiCall::get(log_record_query(
                    &event.device.id,
                    &event.active_from,
                    &event.active_to,
                    None,
                ))
            })
            .collect();
        tracing::debug!(
            "Fetching log records for {} exception events of rule {}",
            log_calls.len(),
            rule_id
        );
        let log_results: Vec<Vec<LogRecord>> = get_batch(api, log_calls).await?;

        // No zero-coordinate filter on this path.
        let points: Vec<TelemetryPoint> = log_results
            .iter()
            .flatten()
            .map(LogRecord::point)
            .collect();

        if points.is_empty() {
            return Ok(AggregationOutcome::NoData);
        }
        tracing::info!("Exception heatmap for {}: {} points", rule_name, points.len());
        Ok(AggregationOutcome::Rendered(HeatmapData::Exception(ExceptionHeatmap {
            points,
            rule_name,
        })))
    }
}

pub fn log_record_query(device_id: &str, from: &str, to: &str, limit: Option<usize>) -> GetParams {
    let params = GetParams::new("LogRecord").with_search(json!({
        "deviceSearch": { "id": device_id },
        "fromDate": from,
        "toDate": to,
    }));
    match limit {
        Some(limit) => params.with_results_limit(limit),
        None => params,
    }
}

pub fn exception_event_query(device_id: &str, rule_id: &str, from: &str, to: &str) -> GetParams {
    GetParams::new("ExceptionEvent").with_search(json!({
        "deviceSearch": { "id": device_id },
        "ruleSearch": { "id": rule_id },
        "fromDate": from,
        "toDate": to,
    }))
}

/// True when there are no lists or every list is empty.
fn results_empty<T>(results: &[Vec<T>]) -> bool {
    results.iter().all(|list| list.is_empty())
}
