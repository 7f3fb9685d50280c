//! The native transport boundary and the module facade over it.
//!
//! The embedding host supplies the native engine as implementations of the
//! traits in this module. Two generations of host exist: newer builds declare
//! their modules statically, older builds only expose a dynamic registry. The
//! [`ModuleProvider`] probes for the declared interface once, falls back to
//! the registry, and freezes the choice so behavior cannot change mid-session.

use crate::error::{BridgeError, BridgeResult, NativeError};
use crate::events::EventSink;
use crate::types::{
    AudioGuidance, CameraPosition, Circle, CircleOptions, GroundOverlay, GroundOverlayOptions,
    LatLng, Location, LocationSimulationOptions, Marker, MarkerOptions, Polygon, PolygonOptions,
    Polyline, PolylineOptions, RouteSegment, RoutingOptions, SpeedAlertOptions,
    TaskRemovedBehavior, TermsAndConditionsDialogOptions, TimeAndDistance, UiSettings, ViewHandle,
    Waypoint,
};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Native-runtime-assigned numeric command identifier.
pub type CommandId = i64;

/// View-manager command registry and dispatch transport.
///
/// `view_manager_config` may return `None` or an empty map while the native
/// view manager is still registering; the resolver retries until a non-empty
/// table appears.
pub trait ViewCommandHost: Send + Sync {
    fn view_manager_config(&self, view_manager: &str) -> Option<HashMap<String, CommandId>>;

    /// Forward a resolved command to the view. Failures here are the
    /// dispatcher's to absorb; they never reach the original caller.
    fn dispatch_command(
        &self,
        view: ViewHandle,
        command: CommandId,
        args: &[Value],
    ) -> Result<(), NativeError>;
}

/// Raw native event emission, attachable to one sink at a time.
///
/// Lifecycle is owned by the session facade: attached during `init()`,
/// detached at `cleanup()`.
pub trait NativeEventSource: Send + Sync {
    fn attach(&self, sink: Arc<dyn EventSink>);
    fn detach(&self);
}

/// Session-scoped navigation entry points of the native engine.
///
/// Initialization completion is reported through the event source
/// (`onNavigationReady` / `onNavigationInitError`), not the return value;
/// `Err` from any method is a transport-level failure for that one call.
#[async_trait]
pub trait NativeNavModule: Send + Sync {
    async fn are_terms_accepted(&self) -> Result<bool, NativeError>;
    async fn show_terms_and_conditions_dialog(
        &self,
        options: &TermsAndConditionsDialogOptions,
    ) -> Result<bool, NativeError>;
    async fn reset_terms_accepted(&self) -> Result<(), NativeError>;

    async fn initialize_navigator(
        &self,
        task_removed_behavior: TaskRemovedBehavior,
    ) -> Result<(), NativeError>;
    async fn cleanup(&self) -> Result<(), NativeError>;

    async fn set_destinations(
        &self,
        waypoints: &[Waypoint],
        options: &RoutingOptions,
    ) -> Result<(), NativeError>;
    async fn clear_destinations(&self) -> Result<(), NativeError>;
    async fn continue_to_next_destination(&self) -> Result<bool, NativeError>;
    async fn display_route(&self) -> Result<(), NativeError>;

    async fn start_guidance(&self) -> Result<(), NativeError>;
    async fn stop_guidance(&self) -> Result<(), NativeError>;
    async fn is_guidance_running(&self) -> Result<bool, NativeError>;

    async fn enable_road_snapped_location_updates(
        &self,
        interval_ms: u64,
    ) -> Result<(), NativeError>;
    async fn disable_road_snapped_location_updates(&self) -> Result<(), NativeError>;
    async fn allow_background_location_updates(&self, allow: bool) -> Result<(), NativeError>;

    async fn simulate_location(&self, location: LatLng) -> Result<(), NativeError>;
    async fn simulate_locations_along_existing_route(
        &self,
        options: &LocationSimulationOptions,
    ) -> Result<(), NativeError>;
    async fn pause_location_simulation(&self) -> Result<(), NativeError>;
    async fn resume_location_simulation(&self) -> Result<(), NativeError>;
    async fn stop_location_simulation(&self) -> Result<(), NativeError>;

    async fn set_audio_guidance(&self, guidance: AudioGuidance) -> Result<(), NativeError>;
    async fn get_audio_guidance(&self) -> Result<AudioGuidance, NativeError>;
    async fn set_speed_alert_options(
        &self,
        options: &SpeedAlertOptions,
    ) -> Result<(), NativeError>;
    async fn get_speed_alert_options(&self) -> Result<SpeedAlertOptions, NativeError>;

    async fn get_current_time_and_distance(&self)
        -> Result<Option<TimeAndDistance>, NativeError>;
    async fn get_route_segments(&self) -> Result<Vec<RouteSegment>, NativeError>;
    async fn get_current_route_segment(&self) -> Result<Option<RouteSegment>, NativeError>;
    async fn get_traveled_path(&self) -> Result<Vec<LatLng>, NativeError>;

    async fn enable_turn_by_turn_events(&self, num_next_steps: u32) -> Result<(), NativeError>;
    async fn disable_turn_by_turn_events(&self) -> Result<(), NativeError>;
}

/// Per-view map entry points of the native engine.
#[async_trait]
pub trait NativeMapModule: Send + Sync {
    async fn get_camera_position(&self, view: ViewHandle) -> Result<CameraPosition, NativeError>;
    async fn get_my_location(&self, view: ViewHandle) -> Result<Location, NativeError>;
    async fn get_ui_settings(&self, view: ViewHandle) -> Result<UiSettings, NativeError>;
    async fn is_my_location_enabled(&self, view: ViewHandle) -> Result<bool, NativeError>;

    async fn add_marker(
        &self,
        view: ViewHandle,
        options: &MarkerOptions,
    ) -> Result<Marker, NativeError>;
    async fn add_polyline(
        &self,
        view: ViewHandle,
        options: &PolylineOptions,
    ) -> Result<Polyline, NativeError>;
    async fn add_polygon(
        &self,
        view: ViewHandle,
        options: &PolygonOptions,
    ) -> Result<Polygon, NativeError>;
    async fn add_circle(
        &self,
        view: ViewHandle,
        options: &CircleOptions,
    ) -> Result<Circle, NativeError>;
    async fn add_ground_overlay(
        &self,
        view: ViewHandle,
        options: &GroundOverlayOptions,
    ) -> Result<GroundOverlay, NativeError>;
}

/// Auto/secondary-display entry points of the native engine.
#[async_trait]
pub trait NativeAutoModule: Send + Sync {
    async fn is_auto_screen_available(&self) -> Result<bool, NativeError>;
    async fn move_camera(&self, position: &CameraPosition) -> Result<(), NativeError>;
    async fn set_zoom_level(&self, zoom: f64) -> Result<(), NativeError>;
}

/// Everything one transport generation exposes. Entries are `None` when that
/// build does not carry the module.
#[derive(Clone, Default)]
pub struct NativeModuleSet {
    pub nav: Option<Arc<dyn NativeNavModule>>,
    pub map: Option<Arc<dyn NativeMapModule>>,
    pub auto: Option<Arc<dyn NativeAutoModule>>,
    pub nav_events: Option<Arc<dyn NativeEventSource>>,
    pub auto_events: Option<Arc<dyn NativeEventSource>>,
}

/// How the embedding host exposes its native modules.
pub trait ModuleHost: Send + Sync {
    /// Statically declared module interface. `None` when the host build
    /// does not carry it (older native builds).
    fn declared_modules(&self) -> Option<NativeModuleSet>;

    /// Legacy dynamic registry lookup by well-known module names.
    fn registry_modules(&self) -> NativeModuleSet;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Declared,
    Registry,
}

/// Uniform accessor over the two possible transports.
///
/// The probe runs once, on first use, and the result is frozen for the
/// provider's lifetime. A module missing from the selected transport fails
/// lazily with [`BridgeError::ModuleUnavailable`] on first use, so code paths
/// that never touch it keep working.
pub struct ModuleProvider {
    host: Arc<dyn ModuleHost>,
    selected: OnceCell<(TransportKind, NativeModuleSet)>,
}

impl ModuleProvider {
    pub fn new(host: Arc<dyn ModuleHost>) -> Self {
        Self {
            host,
            selected: OnceCell::new(),
        }
    }

    fn select(&self) -> &(TransportKind, NativeModuleSet) {
        self.selected.get_or_init(|| match self.host.declared_modules() {
            Some(set) => {
                log::debug!("native transport: declared module interface");
                (TransportKind::Declared, set)
            }
            None => {
                log::debug!("declared interface missing, falling back to legacy module registry");
                (TransportKind::Registry, self.host.registry_modules())
            }
        })
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.select().0
    }

    pub fn nav(&self) -> BridgeResult<Arc<dyn NativeNavModule>> {
        self.select()
            .1
            .nav
            .clone()
            .ok_or(BridgeError::ModuleUnavailable("NavModule"))
    }

    pub fn map(&self) -> BridgeResult<Arc<dyn NativeMapModule>> {
        self.select()
            .1
            .map
            .clone()
            .ok_or(BridgeError::ModuleUnavailable("NavViewModule"))
    }

    pub fn auto(&self) -> BridgeResult<Arc<dyn NativeAutoModule>> {
        self.select()
            .1
            .auto
            .clone()
            .ok_or(BridgeError::ModuleUnavailable("NavAutoModule"))
    }

    pub fn nav_events(&self) -> BridgeResult<Arc<dyn NativeEventSource>> {
        self.select()
            .1
            .nav_events
            .clone()
            .ok_or(BridgeError::ModuleUnavailable("NavEventDispatcher"))
    }

    pub fn auto_events(&self) -> BridgeResult<Arc<dyn NativeEventSource>> {
        self.select()
            .1
            .auto_events
            .clone()
            .ok_or(BridgeError::ModuleUnavailable("NavAutoEventDispatcher"))
    }
}
