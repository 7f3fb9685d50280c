//! In-memory native engine used by the end-to-end suites.
//!
//! Implements every transport trait over shared state with inspectable
//! counters, and emits events synchronously the way the real engine reports
//! initialization and simulated guidance.

#![allow(dead_code)]

use async_trait::async_trait;
use navsdk_bridge::{
    ArrivalEvent, AudioGuidance, CameraPosition, Circle, CircleOptions, CommandDispatcher,
    CommandId, EventSink, GroundOverlay, GroundOverlayOptions, LatLng, Location,
    LocationSimulationOptions, MapViewController, Marker, MarkerOptions, ModuleHost,
    ModuleProvider, NativeAutoModule, NativeError, NativeEventSource, NativeMapModule,
    NativeModuleSet, NativeNavModule, Polygon, PolygonOptions, Polyline, PolylineOptions,
    RouteSegment, RoutingOptions, SpeedAlertOptions, TaskRemovedBehavior,
    TermsAndConditionsDialogOptions, TimeAndDistance, UiSettings, ViewCommandHost, ViewHandle,
    Waypoint, NAV_VIEW_MANAGER,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Command names the mock view manager registers, ids assigned by position.
const VIEW_COMMANDS: &[&str] = &[
    "moveCamera",
    "setZoomLevel",
    "setCompassEnabled",
    "setRotateGesturesEnabled",
    "setScrollGesturesEnabled",
    "setScrollGesturesEnabledDuringRotateOrZoom",
    "setTiltGesturesEnabled",
    "setZoomGesturesEnabled",
    "setZoomControlsEnabled",
    "setMapToolbarEnabled",
    "setMyLocationEnabled",
    "setMyLocationButtonEnabled",
    "setTrafficEnabled",
    "setMapType",
    "setMapStyle",
    "setPadding",
    "clearMapView",
    "removeMarker",
    "removePolyline",
    "removePolygon",
    "removeCircle",
    "removeGroundOverlay",
    "setNavigationUIEnabled",
    "showRouteOverview",
    "setSpeedometerEnabled",
    "setSpeedLimitIconEnabled",
    "setTripProgressBarEnabled",
    "setTrafficIncidentCardsEnabled",
    "setRecenterButtonEnabled",
    "setNightMode",
];

/// One attachable raw event source.
pub struct MockEventSource {
    sink: Mutex<Option<Arc<dyn EventSink>>>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self {
            sink: Mutex::new(None),
        }
    }

    pub fn emit(&self, name: &str, payload: Value) {
        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink.emit(name, payload);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

impl NativeEventSource for MockEventSource {
    fn attach(&self, sink: Arc<dyn EventSink>) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn detach(&self) {
        self.sink.lock().unwrap().take();
    }
}

struct EngineInner {
    legacy_registry_only: AtomicBool,
    nav_module_present: AtomicBool,
    commands_registered: AtomicBool,
    terms_accepted: AtomicBool,
    decline_terms: AtomicBool,
    terms_gate: Mutex<Option<Arc<Notify>>>,
    fail_terms_check: AtomicBool,
    defer_ready: AtomicBool,
    fail_init_code: Mutex<Option<i64>>,

    init_calls: AtomicUsize,
    config_queries: AtomicUsize,

    nav_source: Arc<MockEventSource>,
    auto_source: Arc<MockEventSource>,

    dispatched: Mutex<Vec<(ViewHandle, String, Vec<Value>)>>,
    camera: Mutex<CameraPosition>,
    ui_settings: Mutex<UiSettings>,
    destinations: Mutex<Vec<Waypoint>>,
    guidance_running: AtomicBool,
    current_location: Mutex<Option<LatLng>>,
    marker_seq: AtomicUsize,
    auto_camera: Mutex<CameraPosition>,
}

#[derive(Clone)]
pub struct MockNavEngine {
    inner: Arc<EngineInner>,
}

impl MockNavEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                legacy_registry_only: AtomicBool::new(false),
                nav_module_present: AtomicBool::new(true),
                commands_registered: AtomicBool::new(true),
                terms_accepted: AtomicBool::new(true),
                decline_terms: AtomicBool::new(false),
                terms_gate: Mutex::new(None),
                fail_terms_check: AtomicBool::new(false),
                defer_ready: AtomicBool::new(false),
                fail_init_code: Mutex::new(None),
                init_calls: AtomicUsize::new(0),
                config_queries: AtomicUsize::new(0),
                nav_source: Arc::new(MockEventSource::new()),
                auto_source: Arc::new(MockEventSource::new()),
                dispatched: Mutex::new(Vec::new()),
                camera: Mutex::new(CameraPosition::default()),
                ui_settings: Mutex::new(UiSettings {
                    is_compass_enabled: true,
                    is_map_toolbar_enabled: true,
                    is_rotate_gestures_enabled: true,
                    is_scroll_gestures_enabled: true,
                    is_scroll_gestures_enabled_during_rotate_or_zoom: true,
                    is_tilt_gestures_enabled: true,
                    is_zoom_controls_enabled: true,
                    is_zoom_gestures_enabled: true,
                }),
                destinations: Mutex::new(Vec::new()),
                guidance_running: AtomicBool::new(false),
                current_location: Mutex::new(None),
                marker_seq: AtomicUsize::new(0),
                auto_camera: Mutex::new(CameraPosition::default()),
            }),
        }
    }

    /// Simulate an older native build with no declared module interface.
    pub fn legacy_registry_only(self) -> Self {
        self.inner.legacy_registry_only.store(true, Ordering::SeqCst);
        self
    }

    /// Simulate the view manager not having registered its commands yet.
    pub fn without_registered_commands(self) -> Self {
        self.inner.commands_registered.store(false, Ordering::SeqCst);
        self
    }

    pub fn register_commands(&self) {
        self.inner.commands_registered.store(true, Ordering::SeqCst);
    }

    /// Make navigator initialization report the given error code.
    pub fn fail_init_with(self, code: i64) -> Self {
        *self.inner.fail_init_code.lock().unwrap() = Some(code);
        self
    }

    /// Keep initialization pending; the test emits the ready event itself.
    pub fn defer_ready(self) -> Self {
        self.inner.defer_ready.store(true, Ordering::SeqCst);
        self
    }

    pub fn terms_not_yet_accepted(self) -> Self {
        self.inner.terms_accepted.store(false, Ordering::SeqCst);
        self
    }

    pub fn decline_terms(self) -> Self {
        self.inner.terms_accepted.store(false, Ordering::SeqCst);
        self.inner.decline_terms.store(true, Ordering::SeqCst);
        self
    }

    /// Flip a previously declining engine back to accepting terms.
    pub fn accept_terms(&self) {
        self.inner.terms_accepted.store(true, Ordering::SeqCst);
        self.inner.decline_terms.store(false, Ordering::SeqCst);
    }

    pub fn clear_init_failure(&self) {
        self.inner.fail_init_code.lock().unwrap().take();
    }

    /// Build without a nav module in either transport generation.
    pub fn without_nav_module(self) -> Self {
        self.inner.nav_module_present.store(false, Ordering::SeqCst);
        self
    }

    /// Hold `are_terms_accepted` suspended until `release_terms_check`.
    pub fn gate_terms_check(self) -> Self {
        *self.inner.terms_gate.lock().unwrap() = Some(Arc::new(Notify::new()));
        self
    }

    pub fn release_terms_check(&self) {
        if let Some(gate) = self.inner.terms_gate.lock().unwrap().as_ref() {
            gate.notify_one();
        }
    }

    /// Make the terms check fail at the transport level.
    pub fn fail_terms_check(self) -> Self {
        self.inner.fail_terms_check.store(true, Ordering::SeqCst);
        self
    }

    pub fn init_calls(&self) -> usize {
        self.inner.init_calls.load(Ordering::SeqCst)
    }

    pub fn config_queries(&self) -> usize {
        self.inner.config_queries.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> Vec<(ViewHandle, String, Vec<Value>)> {
        self.inner.dispatched.lock().unwrap().clone()
    }

    pub fn nav_source_attached(&self) -> bool {
        self.inner.nav_source.is_attached()
    }

    /// Emit a raw navigation event, as the native engine would.
    pub fn emit_nav(&self, name: &str, payload: Value) {
        self.inner.nav_source.emit(name, payload);
    }

    pub fn emit_auto(&self, name: &str, payload: Value) {
        self.inner.auto_source.emit(name, payload);
    }

    fn module_set(&self) -> NativeModuleSet {
        let nav: Option<Arc<dyn NativeNavModule>> = self
            .inner
            .nav_module_present
            .load(Ordering::SeqCst)
            .then(|| Arc::new(self.clone()) as Arc<dyn NativeNavModule>);
        NativeModuleSet {
            nav,
            map: Some(Arc::new(self.clone())),
            auto: Some(Arc::new(self.clone())),
            nav_events: Some(self.inner.nav_source.clone()),
            auto_events: Some(self.inner.auto_source.clone()),
        }
    }

    fn command_name(&self, id: CommandId) -> Option<&'static str> {
        usize::try_from(id - 1).ok().and_then(|i| VIEW_COMMANDS.get(i).copied())
    }

    fn apply_command(&self, name: &str, args: &[Value]) {
        let mut settings = self.inner.ui_settings.lock().unwrap();
        let flag = args.first().and_then(Value::as_bool).unwrap_or(false);
        match name {
            "moveCamera" => {
                drop(settings);
                if let Some(update) = args
                    .first()
                    .cloned()
                    .and_then(|v| serde_json::from_value::<CameraPosition>(v).ok())
                {
                    let mut camera = self.inner.camera.lock().unwrap();
                    if update.target.is_some() {
                        camera.target = update.target;
                    }
                    if update.zoom.is_some() {
                        camera.zoom = update.zoom;
                    }
                    if update.tilt.is_some() {
                        camera.tilt = update.tilt;
                    }
                    if update.bearing.is_some() {
                        camera.bearing = update.bearing;
                    }
                }
            }
            "setZoomLevel" => {
                drop(settings);
                self.inner.camera.lock().unwrap().zoom = args.first().and_then(Value::as_f64);
            }
            "setCompassEnabled" => settings.is_compass_enabled = flag,
            "setMapToolbarEnabled" => settings.is_map_toolbar_enabled = flag,
            "setRotateGesturesEnabled" => settings.is_rotate_gestures_enabled = flag,
            "setScrollGesturesEnabled" => settings.is_scroll_gestures_enabled = flag,
            "setScrollGesturesEnabledDuringRotateOrZoom" => {
                settings.is_scroll_gestures_enabled_during_rotate_or_zoom = flag
            }
            "setTiltGesturesEnabled" => settings.is_tilt_gestures_enabled = flag,
            "setZoomControlsEnabled" => settings.is_zoom_controls_enabled = flag,
            "setZoomGesturesEnabled" => settings.is_zoom_gestures_enabled = flag,
            _ => {}
        }
    }
}

impl ModuleHost for MockNavEngine {
    fn declared_modules(&self) -> Option<NativeModuleSet> {
        if self.inner.legacy_registry_only.load(Ordering::SeqCst) {
            None
        } else {
            Some(self.module_set())
        }
    }

    fn registry_modules(&self) -> NativeModuleSet {
        self.module_set()
    }
}

impl ViewCommandHost for MockNavEngine {
    fn view_manager_config(&self, _view_manager: &str) -> Option<HashMap<String, CommandId>> {
        self.inner.config_queries.fetch_add(1, Ordering::SeqCst);
        if !self.inner.commands_registered.load(Ordering::SeqCst) {
            return None;
        }
        Some(
            VIEW_COMMANDS
                .iter()
                .enumerate()
                .map(|(i, name)| (name.to_string(), (i + 1) as CommandId))
                .collect(),
        )
    }

    fn dispatch_command(
        &self,
        view: ViewHandle,
        command: CommandId,
        args: &[Value],
    ) -> Result<(), NativeError> {
        let name = self
            .command_name(command)
            .ok_or_else(|| NativeError::new("dispatchCommand", "unknown command id"))?;
        self.inner
            .dispatched
            .lock()
            .unwrap()
            .push((view, name.to_string(), args.to_vec()));
        self.apply_command(name, args);
        Ok(())
    }
}

#[async_trait]
impl NativeNavModule for MockNavEngine {
    async fn are_terms_accepted(&self) -> Result<bool, NativeError> {
        let gate = self.inner.terms_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.inner.fail_terms_check.load(Ordering::SeqCst) {
            return Err(NativeError::new(
                "areTermsAccepted",
                "terms service unreachable",
            ));
        }
        Ok(self.inner.terms_accepted.load(Ordering::SeqCst))
    }

    async fn show_terms_and_conditions_dialog(
        &self,
        _options: &TermsAndConditionsDialogOptions,
    ) -> Result<bool, NativeError> {
        if self.inner.decline_terms.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.terms_accepted.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn reset_terms_accepted(&self) -> Result<(), NativeError> {
        self.inner.terms_accepted.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn initialize_navigator(
        &self,
        _task_removed_behavior: TaskRemovedBehavior,
    ) -> Result<(), NativeError> {
        self.inner.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = *self.inner.fail_init_code.lock().unwrap() {
            self.emit_nav("onNavigationInitError", json!(code));
            return Ok(());
        }
        if !self.inner.defer_ready.load(Ordering::SeqCst) {
            self.emit_nav("onNavigationReady", Value::Null);
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), NativeError> {
        self.inner.guidance_running.store(false, Ordering::SeqCst);
        self.inner.destinations.lock().unwrap().clear();
        Ok(())
    }

    async fn set_destinations(
        &self,
        waypoints: &[Waypoint],
        _options: &RoutingOptions,
    ) -> Result<(), NativeError> {
        *self.inner.destinations.lock().unwrap() = waypoints.to_vec();
        Ok(())
    }

    async fn clear_destinations(&self) -> Result<(), NativeError> {
        self.inner.destinations.lock().unwrap().clear();
        Ok(())
    }

    async fn continue_to_next_destination(&self) -> Result<bool, NativeError> {
        let mut destinations = self.inner.destinations.lock().unwrap();
        if destinations.is_empty() {
            return Ok(false);
        }
        destinations.remove(0);
        Ok(!destinations.is_empty())
    }

    async fn display_route(&self) -> Result<(), NativeError> {
        Ok(())
    }

    async fn start_guidance(&self) -> Result<(), NativeError> {
        self.inner.guidance_running.store(true, Ordering::SeqCst);
        self.emit_nav("onStartGuidance", Value::Null);
        Ok(())
    }

    async fn stop_guidance(&self) -> Result<(), NativeError> {
        self.inner.guidance_running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_guidance_running(&self) -> Result<bool, NativeError> {
        Ok(self.inner.guidance_running.load(Ordering::SeqCst))
    }

    async fn enable_road_snapped_location_updates(
        &self,
        _interval_ms: u64,
    ) -> Result<(), NativeError> {
        Ok(())
    }

    async fn disable_road_snapped_location_updates(&self) -> Result<(), NativeError> {
        Ok(())
    }

    async fn allow_background_location_updates(&self, _allow: bool) -> Result<(), NativeError> {
        Ok(())
    }

    async fn simulate_location(&self, location: LatLng) -> Result<(), NativeError> {
        *self.inner.current_location.lock().unwrap() = Some(location);
        Ok(())
    }

    /// Walks the simulated route: a location fix at the start, one remaining
    /// time/distance update, a fix at the destination, then arrival.
    async fn simulate_locations_along_existing_route(
        &self,
        _options: &LocationSimulationOptions,
    ) -> Result<(), NativeError> {
        let destination = self.inner.destinations.lock().unwrap().first().cloned();
        let Some(destination) = destination else {
            return Err(NativeError::new(
                "simulateLocationsAlongExistingRoute",
                "no route built",
            ));
        };
        if let Some(start) = *self.inner.current_location.lock().unwrap() {
            self.emit_nav("onLocationChanged", json!({ "lat": start.lat, "lng": start.lng }));
        }
        self.emit_nav(
            "onRemainingTimeOrDistanceChanged",
            json!({ "seconds": 30.0, "meters": 250.0 }),
        );
        let target = destination.position;
        *self.inner.current_location.lock().unwrap() = Some(target);
        self.emit_nav("onLocationChanged", json!({ "lat": target.lat, "lng": target.lng }));
        let arrival = ArrivalEvent {
            waypoint: Some(destination),
            is_final_destination: Some(self.inner.destinations.lock().unwrap().len() <= 1),
        };
        self.emit_nav(
            "onArrival",
            serde_json::to_value(arrival).unwrap_or(Value::Null),
        );
        Ok(())
    }

    async fn pause_location_simulation(&self) -> Result<(), NativeError> {
        Ok(())
    }

    async fn resume_location_simulation(&self) -> Result<(), NativeError> {
        Ok(())
    }

    async fn stop_location_simulation(&self) -> Result<(), NativeError> {
        Ok(())
    }

    async fn set_audio_guidance(&self, _guidance: AudioGuidance) -> Result<(), NativeError> {
        Ok(())
    }

    async fn get_audio_guidance(&self) -> Result<AudioGuidance, NativeError> {
        Ok(AudioGuidance::default())
    }

    async fn set_speed_alert_options(
        &self,
        _options: &SpeedAlertOptions,
    ) -> Result<(), NativeError> {
        Ok(())
    }

    async fn get_speed_alert_options(&self) -> Result<SpeedAlertOptions, NativeError> {
        Ok(SpeedAlertOptions {
            minor_speed_alert_percent_threshold: 5.0,
            major_speed_alert_percent_threshold: 10.0,
            severity_upgrade_duration_seconds: 10.0,
        })
    }

    async fn get_current_time_and_distance(
        &self,
    ) -> Result<Option<TimeAndDistance>, NativeError> {
        if self.inner.destinations.lock().unwrap().is_empty() {
            return Ok(None);
        }
        Ok(Some(TimeAndDistance {
            seconds: 30.0,
            meters: 250.0,
        }))
    }

    async fn get_route_segments(&self) -> Result<Vec<RouteSegment>, NativeError> {
        Ok(self
            .inner
            .destinations
            .lock()
            .unwrap()
            .iter()
            .map(|waypoint| RouteSegment {
                destination_lat_lng: waypoint.position,
                segment_lat_lng_list: vec![waypoint.position],
                destination_waypoint: Some(waypoint.clone()),
            })
            .collect())
    }

    async fn get_current_route_segment(&self) -> Result<Option<RouteSegment>, NativeError> {
        Ok(self.get_route_segments().await?.into_iter().next())
    }

    async fn get_traveled_path(&self) -> Result<Vec<LatLng>, NativeError> {
        Ok(self.inner.current_location.lock().unwrap().iter().copied().collect())
    }

    async fn enable_turn_by_turn_events(&self, _num_next_steps: u32) -> Result<(), NativeError> {
        Ok(())
    }

    async fn disable_turn_by_turn_events(&self) -> Result<(), NativeError> {
        Ok(())
    }
}

#[async_trait]
impl NativeMapModule for MockNavEngine {
    async fn get_camera_position(&self, _view: ViewHandle) -> Result<CameraPosition, NativeError> {
        Ok(*self.inner.camera.lock().unwrap())
    }

    async fn get_my_location(&self, _view: ViewHandle) -> Result<Location, NativeError> {
        let current = self
            .inner
            .current_location
            .lock()
            .unwrap()
            .ok_or_else(|| NativeError::new("getMyLocation", "no location fix"))?;
        Ok(Location {
            lat: current.lat,
            lng: current.lng,
            bearing: None,
            speed: None,
            time: None,
        })
    }

    async fn get_ui_settings(&self, _view: ViewHandle) -> Result<UiSettings, NativeError> {
        Ok(*self.inner.ui_settings.lock().unwrap())
    }

    async fn is_my_location_enabled(&self, _view: ViewHandle) -> Result<bool, NativeError> {
        Ok(false)
    }

    async fn add_marker(
        &self,
        _view: ViewHandle,
        options: &MarkerOptions,
    ) -> Result<Marker, NativeError> {
        let position = options
            .position
            .ok_or_else(|| NativeError::new("addMarker", "marker options missing position"))?;
        let seq = self.inner.marker_seq.fetch_add(1, Ordering::SeqCst);
        Ok(Marker {
            id: format!("marker_{}", seq),
            position,
            title: options.title.clone(),
            snippet: options.snippet.clone(),
        })
    }

    async fn add_polyline(
        &self,
        _view: ViewHandle,
        options: &PolylineOptions,
    ) -> Result<Polyline, NativeError> {
        Ok(Polyline {
            id: "polyline_0".to_string(),
            points: options.points.clone(),
        })
    }

    async fn add_polygon(
        &self,
        _view: ViewHandle,
        options: &PolygonOptions,
    ) -> Result<Polygon, NativeError> {
        Ok(Polygon {
            id: "polygon_0".to_string(),
            points: options.points.clone(),
        })
    }

    async fn add_circle(
        &self,
        _view: ViewHandle,
        options: &CircleOptions,
    ) -> Result<Circle, NativeError> {
        Ok(Circle {
            id: "circle_0".to_string(),
            center: options.center.unwrap_or(LatLng::new(0.0, 0.0)),
            radius: options.radius.unwrap_or(0.0),
        })
    }

    async fn add_ground_overlay(
        &self,
        _view: ViewHandle,
        options: &GroundOverlayOptions,
    ) -> Result<GroundOverlay, NativeError> {
        Ok(GroundOverlay {
            id: "overlay_0".to_string(),
            position: options.position.unwrap_or(LatLng::new(0.0, 0.0)),
            width: options.width.unwrap_or(0.0),
            height: options.height.unwrap_or(0.0),
        })
    }
}

#[async_trait]
impl NativeAutoModule for MockNavEngine {
    async fn is_auto_screen_available(&self) -> Result<bool, NativeError> {
        Ok(true)
    }

    async fn move_camera(&self, position: &CameraPosition) -> Result<(), NativeError> {
        *self.inner.auto_camera.lock().unwrap() = *position;
        Ok(())
    }

    async fn set_zoom_level(&self, zoom: f64) -> Result<(), NativeError> {
        self.inner.auto_camera.lock().unwrap().zoom = Some(zoom);
        Ok(())
    }
}

/// Silence-tolerant logger init for test binaries.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn provider(engine: &MockNavEngine) -> Arc<ModuleProvider> {
    Arc::new(ModuleProvider::new(Arc::new(engine.clone())))
}

pub fn map_controller(engine: &MockNavEngine) -> MapViewController {
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::new(engine.clone()),
        NAV_VIEW_MANAGER,
    ));
    MapViewController::new(provider(engine), dispatcher)
}
