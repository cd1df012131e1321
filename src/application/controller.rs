// Add-in controller - host lifecycle hooks and the UI state they drive
use crate::application::heat_aggregator::{AggregationError, AggregationOutcome, HeatDataAggregator};
use crate::application::host_api::HostApi;
use crate::application::map_renderer::{Coordinates, Geolocator, MapRenderer, TileLayer};
use crate::application::rosters::{
    GroupRoster, RuleRoster, SelectOption, VehicleRoster, group_options, rule_options,
    vehicle_options,
};
use crate::domain::fleet::{Group, Rule, Vehicle};
use crate::domain::selection::{DateRange, SelectionError, SelectionState, VisualizationMode};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

pub const NO_DATA_MESSAGE: &str = "No data to display";

/// Page state the host hands over on activation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostState {
    /// The host's global group filter. Not applied; vehicles load unfiltered
    /// until groups are picked in the add-in.
    #[serde(default)]
    pub group_filter: Vec<String>,
}

/// Lifecycle the host drives.
#[async_trait]
pub trait AddIn {
    /// One-time setup. `callback` runs exactly once, when the map and view
    /// are ready.
    async fn initialize(
        &self,
        api: Arc<dyn HostApi>,
        state: &HostState,
        callback: Box<dyn FnOnce() + Send>,
    );

    /// The add-in became visible: reload groups, rules and vehicles.
    async fn focus(&self, api: Arc<dyn HostApi>, state: &HostState);

    fn blur(&self);
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub tile_layer: TileLayer,
    pub fallback_center: Coordinates,
    pub zoom: u8,
    pub results_limit: usize,
    pub loading_hide_delay: Duration,
    pub invalidate_size_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tile_layer: TileLayer::default(),
            fallback_center: Coordinates::new(43.434497, -79.709441),
            zoom: 13,
            results_limit: 50_000,
            loading_hide_delay: Duration::from_millis(600),
            invalidate_size_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    groups: Vec<Group>,
    vehicles: Vec<Vehicle>,
    rules: Vec<Rule>,
    selection: SelectionState,
    show_heatmap_enabled: bool,
    busy: bool,
    message: String,
    error: String,
    alert: Option<String>,
}

/// What the browser shell renders.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub groups: Vec<SelectOption>,
    pub vehicles: Vec<SelectOption>,
    pub rules: Vec<SelectOption>,
    pub selection: SelectionState,
    pub rule_selector_enabled: bool,
    pub show_heatmap_enabled: bool,
    pub busy: bool,
    pub message: String,
    pub error: String,
    /// Blocking notification; stays until dismissed.
    pub alert: Option<String>,
}

struct AddInContext<M> {
    api: RwLock<Arc<dyn HostApi>>,
    view: Mutex<ViewState>,
    map: Mutex<M>,
    geolocator: Arc<dyn Geolocator>,
    settings: ControllerSettings,
    aggregator: HeatDataAggregator,
}

/// Single owner of the add-in state. Cheap to clone; clones share state.
///
/// Overlapping `show_heatmap` calls are not serialized: each runs to
/// completion and the last one to finish owns the map.
pub struct HeatmapController<M> {
    ctx: Arc<AddInContext<M>>,
}

impl<M> Clone for HeatmapController<M> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<M: MapRenderer + 'static> HeatmapController<M> {
    pub fn new(
        api: Arc<dyn HostApi>,
        map: M,
        geolocator: Arc<dyn Geolocator>,
        settings: ControllerSettings,
    ) -> Self {
        let aggregator = HeatDataAggregator::new(settings.results_limit);
        Self {
            ctx: Arc::new(AddInContext {
                api: RwLock::new(api),
                view: Mutex::new(ViewState::default()),
                map: Mutex::new(map),
                geolocator,
                settings,
                aggregator,
            }),
        }
    }

    fn api(&self) -> Arc<dyn HostApi> {
        self.ctx
            .api
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_api(&self, api: Arc<dyn HostApi>) {
        *self.ctx.api.write().unwrap_or_else(PoisonError::into_inner) = api;
    }

    fn lock_view(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.ctx.view)
    }

    fn lock_map(&self) -> MutexGuard<'_, M> {
        lock(&self.ctx.map)
    }

    fn show_error(&self, message: String) {
        tracing::warn!("{}", message);
        self.lock_view().error = message;
    }

    pub fn view(&self) -> ViewSnapshot {
        let view = self.lock_view();
        ViewSnapshot {
            groups: group_options(&view.groups),
            vehicles: vehicle_options(&view.vehicles),
            rules: rule_options(&view.rules),
            selection: view.selection.clone(),
            rule_selector_enabled: view.selection.rule_selector_enabled(),
            show_heatmap_enabled: view.show_heatmap_enabled,
            busy: view.busy,
            message: view.message.clone(),
            error: view.error.clone(),
            alert: view.alert.clone(),
        }
    }

    pub fn map_snapshot(&self) -> M
    where
        M: Clone,
    {
        self.lock_map().clone()
    }

    async fn load_groups(&self) {
        match GroupRoster::new(self.api()).populate().await {
            Ok(Some(groups)) => {
                {
                    let mut view = self.lock_view();
                    view.groups = groups;
                    view.selection.group_ids.clear();
                }
                self.populate_vehicles(&[]).await;
            }
            Ok(None) => {}
            Err(e) => self.show_error(e.to_string()),
        }
    }

    async fn load_rules(&self) {
        match RuleRoster::new(self.api()).populate().await {
            Ok(Some(rules)) => {
                let mut view = self.lock_view();
                // A rebuilt single select lands on its first enabled option.
                view.selection.rule_id = rules.first().map(|r| r.id.clone());
                view.rules = rules;
            }
            Ok(None) => {}
            Err(e) => self.show_error(e.to_string()),
        }
    }

    /// Rebuild the vehicle list for `group_ids`. Failures and null results
    /// leave the current list and selection alone.
    async fn populate_vehicles(&self, group_ids: &[String]) {
        match VehicleRoster::new(self.api()).populate(group_ids).await {
            Ok(Some(vehicles)) => {
                let mut view = self.lock_view();
                view.vehicles = vehicles;
                view.selection.vehicle_ids.clear();
            }
            Ok(None) => {}
            Err(e) => self.show_error(e.to_string()),
        }
    }

    pub async fn select_groups(&self, group_ids: Vec<String>) {
        let group_ids: Vec<String> = {
            let mut view = self.lock_view();
            let selected: Vec<String> = view
                .groups
                .iter()
                .filter(|g| group_ids.contains(&g.id))
                .map(|g| g.id.clone())
                .collect();
            view.selection.group_ids = selected.clone();
            selected
        };
        self.populate_vehicles(&group_ids).await;
    }

    /// Select vehicles by id. Ids not in the current list are ignored; the
    /// selection keeps list order.
    pub fn select_vehicles(&self, vehicle_ids: Vec<String>) {
        let mut view = self.lock_view();
        let selected: Vec<String> = view
            .vehicles
            .iter()
            .filter(|v| vehicle_ids.contains(&v.id))
            .map(|v| v.id.clone())
            .collect();
        if selected.len() < vehicle_ids.len() {
            tracing::debug!(
                "Ignoring {} unknown vehicle ids",
                vehicle_ids.len() - selected.len()
            );
        }
        view.selection.vehicle_ids = selected;
    }

    pub fn set_dates(&self, date_range: DateRange) {
        self.lock_view().selection.date_range = date_range;
    }

    pub fn set_mode(&self, mode: VisualizationMode) {
        self.lock_view().selection.mode = mode;
    }

    pub fn select_rule(&self, rule_id: String) -> Result<(), SelectionError> {
        let mut view = self.lock_view();
        if !view.selection.rule_selector_enabled() {
            return Err(SelectionError::RuleSelectorDisabled);
        }
        if !view.rules.iter().any(|r| r.id == rule_id) {
            return Err(SelectionError::UnknownRule(rule_id));
        }
        view.selection.rule_id = Some(rule_id);
        Ok(())
    }

    pub fn dismiss_alert(&self) {
        self.lock_view().alert = None;
    }

    /// Build the heatmap for the current selection and put it on the map.
    pub async fn show_heatmap(&self) {
        let plan = {
            let mut view = self.lock_view();
            let planned = self.ctx.aggregator.plan(&view.selection, &view.rules);
            if let Err(AggregationError::NoVehicleSelected) = planned {
                view.error = AggregationError::NoVehicleSelected.to_string();
                return;
            }

            view.error.clear();
            view.message.clear();
            view.alert = None;
            match planned {
                Ok(Some(plan)) => {
                    view.busy = true;
                    view.show_heatmap_enabled = false;
                    plan
                }
                Ok(None) => return,
                Err(e) => {
                    view.error = e.to_string();
                    return;
                }
            }
        };

        let api = self.api();
        let outcome = self.ctx.aggregator.execute(api.as_ref(), plan).await;
        self.apply_outcome(outcome);
        self.finish_loading();
    }

    fn apply_outcome(&self, outcome: Result<AggregationOutcome, AggregationError>) {
        match outcome {
            Ok(AggregationOutcome::Rendered(data)) => {
                let message = data.status_message();
                let points = data.into_points();
                {
                    let mut map = self.lock_map();
                    map.reset_heat_layer();
                    if !points.is_empty() {
                        map.fit_bounds(&points);
                    }
                    map.set_points(points);
                }
                self.lock_view().message = message;
            }
            Ok(AggregationOutcome::NoData) => {
                self.lock_map().reset_heat_layer();
                self.lock_view().error = NO_DATA_MESSAGE.to_string();
            }
            Ok(AggregationOutcome::Skipped) => {}
            Err(e) => {
                tracing::error!("Heatmap request failed: {}", e);
                self.lock_view().alert = Some(e.to_string());
            }
        }
    }

    /// Re-enable the trigger now; hide the indicator after a short delay so
    /// fast requests still show it.
    fn finish_loading(&self) {
        self.lock_view().show_heatmap_enabled = true;
        let ctx = self.ctx.clone();
        let delay = self.ctx.settings.loading_hide_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            lock(&ctx.view).busy = false;
        });
    }
}

#[async_trait]
impl<M: MapRenderer + 'static> AddIn for HeatmapController<M> {
    async fn initialize(
        &self,
        api: Arc<dyn HostApi>,
        state: &HostState,
        callback: Box<dyn FnOnce() + Send>,
    ) {
        self.set_api(api);
        tracing::debug!("Host group filter has {} groups", state.group_filter.len());

        let settings = &self.ctx.settings;
        let center = self.ctx.geolocator.current_position().unwrap_or_else(|| {
            tracing::info!("Geolocation unavailable, centering on fallback position");
            settings.fallback_center
        });
        {
            let mut map = self.lock_map();
            map.set_view(center, settings.zoom);
            map.add_tile_layer(settings.tile_layer.clone());
        }
        {
            let mut view = self.lock_view();
            view.selection = SelectionState::new(Utc::now().date_naive());
            view.show_heatmap_enabled = true;
        }

        tracing::info!("Heatmap add-in initialized");
        callback();
    }

    async fn focus(&self, api: Arc<dyn HostApi>, state: &HostState) {
        self.set_api(api);
        tracing::debug!("Focus with host group filter of {} groups", state.group_filter.len());

        futures::join!(self.load_groups(), self.load_rules());

        let ctx = self.ctx.clone();
        let delay = self.ctx.settings.invalidate_size_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            lock(&ctx.map).invalidate_size();
        });
    }

    fn blur(&self) {
        tracing::debug!("Heatmap add-in hidden");
    }
}
