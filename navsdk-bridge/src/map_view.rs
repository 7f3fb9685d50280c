//! Per-view controllers over the command dispatcher and the map module.
//!
//! A `MapViewController` pairs one native view with the symbolic command
//! surface (fire-and-forget UI-state commands) and the typed map-module
//! reads. The UI host attaches the native view handle when the view mounts
//! and feeds raw view events into `handle_view_event`.

use crate::commands::CommandDispatcher;
use crate::error::{BridgeError, BridgeResult};
use crate::events::{EventMultiplexer, MapViewCallbacks, MapViewEvent};
use crate::transport::ModuleProvider;
use crate::types::{
    CameraPosition, Circle, CircleOptions, GroundOverlay, GroundOverlayOptions, Location,
    MapType, Marker, MarkerOptions, NightMode, Polygon, PolygonOptions, Polyline,
    PolylineOptions, UiSettings, ViewHandle,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

fn arg<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub struct MapViewController {
    view: Mutex<Option<ViewHandle>>,
    dispatcher: Arc<CommandDispatcher>,
    modules: Arc<ModuleProvider>,
    events: EventMultiplexer<MapViewCallbacks>,
}

impl MapViewController {
    pub fn new(modules: Arc<ModuleProvider>, dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            view: Mutex::new(None),
            dispatcher,
            modules,
            events: EventMultiplexer::new(),
        }
    }

    /// Called by the UI host once the native view has mounted.
    pub fn attach_view(&self, view: ViewHandle) {
        log::debug!("map view {} attached", view);
        *self.view.lock().unwrap() = Some(view);
    }

    /// Called by the UI host when the native view unmounts. Commands issued
    /// afterwards fail with `InvalidTarget` instead of reaching a dead view.
    pub fn detach_view(&self) {
        *self.view.lock().unwrap() = None;
    }

    pub fn view(&self) -> Option<ViewHandle> {
        *self.view.lock().unwrap()
    }

    pub fn add_listeners(&self, set: Arc<MapViewCallbacks>) {
        self.events.add_listeners(set);
    }

    pub fn remove_listeners(&self, set: &Arc<MapViewCallbacks>) {
        self.events.remove_listeners(set);
    }

    /// Raw view event entry point for the UI host.
    pub fn handle_view_event(&self, name: &str, payload: Value) {
        match MapViewEvent::decode(name, payload) {
            Ok(event) => self.events.dispatch(&event),
            Err(err) => log::warn!("dropping map view event: {}", err),
        }
    }

    fn command(&self, name: &str, args: Vec<Value>) -> BridgeResult<()> {
        self.dispatcher.dispatch(self.view(), name, args)
    }

    // --- fire-and-forget view commands ---------------------------------------

    pub fn move_camera(&self, position: CameraPosition) -> BridgeResult<()> {
        self.command("moveCamera", vec![arg(position)])
    }

    pub fn set_zoom_level(&self, zoom: f64) -> BridgeResult<()> {
        self.command("setZoomLevel", vec![arg(zoom)])
    }

    pub fn set_compass_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setCompassEnabled", vec![arg(enabled)])
    }

    pub fn set_rotate_gestures_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setRotateGesturesEnabled", vec![arg(enabled)])
    }

    pub fn set_scroll_gestures_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setScrollGesturesEnabled", vec![arg(enabled)])
    }

    pub fn set_scroll_gestures_enabled_during_rotate_or_zoom(
        &self,
        enabled: bool,
    ) -> BridgeResult<()> {
        self.command(
            "setScrollGesturesEnabledDuringRotateOrZoom",
            vec![arg(enabled)],
        )
    }

    pub fn set_tilt_gestures_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setTiltGesturesEnabled", vec![arg(enabled)])
    }

    pub fn set_zoom_gestures_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setZoomGesturesEnabled", vec![arg(enabled)])
    }

    pub fn set_zoom_controls_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setZoomControlsEnabled", vec![arg(enabled)])
    }

    pub fn set_map_toolbar_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setMapToolbarEnabled", vec![arg(enabled)])
    }

    pub fn set_my_location_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setMyLocationEnabled", vec![arg(enabled)])
    }

    pub fn set_my_location_button_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setMyLocationButtonEnabled", vec![arg(enabled)])
    }

    pub fn set_traffic_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setTrafficEnabled", vec![arg(enabled)])
    }

    pub fn set_map_type(&self, map_type: MapType) -> BridgeResult<()> {
        self.command("setMapType", vec![arg(map_type)])
    }

    /// `style` is a JSON map-style definition, passed through opaquely.
    pub fn set_map_style(&self, style: String) -> BridgeResult<()> {
        self.command("setMapStyle", vec![Value::String(style)])
    }

    pub fn set_padding(&self, left: f64, top: f64, right: f64, bottom: f64) -> BridgeResult<()> {
        self.command(
            "setPadding",
            vec![arg(left), arg(top), arg(right), arg(bottom)],
        )
    }

    pub fn clear_map_view(&self) -> BridgeResult<()> {
        self.command("clearMapView", Vec::new())
    }

    pub fn remove_marker(&self, id: &str) -> BridgeResult<()> {
        self.command("removeMarker", vec![Value::String(id.to_string())])
    }

    pub fn remove_polyline(&self, id: &str) -> BridgeResult<()> {
        self.command("removePolyline", vec![Value::String(id.to_string())])
    }

    pub fn remove_polygon(&self, id: &str) -> BridgeResult<()> {
        self.command("removePolygon", vec![Value::String(id.to_string())])
    }

    pub fn remove_circle(&self, id: &str) -> BridgeResult<()> {
        self.command("removeCircle", vec![Value::String(id.to_string())])
    }

    pub fn remove_ground_overlay(&self, id: &str) -> BridgeResult<()> {
        self.command("removeGroundOverlay", vec![Value::String(id.to_string())])
    }

    // --- typed map module calls ----------------------------------------------

    fn require_view(&self) -> BridgeResult<ViewHandle> {
        self.view().ok_or(BridgeError::InvalidTarget)
    }

    pub async fn get_camera_position(&self) -> BridgeResult<CameraPosition> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.get_camera_position(view).await?)
    }

    pub async fn get_my_location(&self) -> BridgeResult<Location> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.get_my_location(view).await?)
    }

    pub async fn get_ui_settings(&self) -> BridgeResult<UiSettings> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.get_ui_settings(view).await?)
    }

    pub async fn is_my_location_enabled(&self) -> BridgeResult<bool> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.is_my_location_enabled(view).await?)
    }

    pub async fn add_marker(&self, options: MarkerOptions) -> BridgeResult<Marker> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.add_marker(view, &options).await?)
    }

    pub async fn add_polyline(&self, options: PolylineOptions) -> BridgeResult<Polyline> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.add_polyline(view, &options).await?)
    }

    pub async fn add_polygon(&self, options: PolygonOptions) -> BridgeResult<Polygon> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.add_polygon(view, &options).await?)
    }

    pub async fn add_circle(&self, options: CircleOptions) -> BridgeResult<Circle> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.add_circle(view, &options).await?)
    }

    pub async fn add_ground_overlay(
        &self,
        options: GroundOverlayOptions,
    ) -> BridgeResult<GroundOverlay> {
        let view = self.require_view()?;
        Ok(self.modules.map()?.add_ground_overlay(view, &options).await?)
    }
}

/// Navigation-UI toggles for one view. All commands are fire-and-forget.
pub struct NavigationViewController {
    view: Mutex<Option<ViewHandle>>,
    dispatcher: Arc<CommandDispatcher>,
}

impl NavigationViewController {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            view: Mutex::new(None),
            dispatcher,
        }
    }

    pub fn attach_view(&self, view: ViewHandle) {
        *self.view.lock().unwrap() = Some(view);
    }

    pub fn detach_view(&self) {
        *self.view.lock().unwrap() = None;
    }

    pub fn view(&self) -> Option<ViewHandle> {
        *self.view.lock().unwrap()
    }

    fn command(&self, name: &str, args: Vec<Value>) -> BridgeResult<()> {
        self.dispatcher.dispatch(self.view(), name, args)
    }

    pub fn set_navigation_ui_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setNavigationUIEnabled", vec![arg(enabled)])
    }

    pub fn show_route_overview(&self) -> BridgeResult<()> {
        self.command("showRouteOverview", Vec::new())
    }

    pub fn set_speedometer_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setSpeedometerEnabled", vec![arg(enabled)])
    }

    pub fn set_speed_limit_icon_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setSpeedLimitIconEnabled", vec![arg(enabled)])
    }

    pub fn set_trip_progress_bar_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setTripProgressBarEnabled", vec![arg(enabled)])
    }

    pub fn set_traffic_incident_cards_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setTrafficIncidentCardsEnabled", vec![arg(enabled)])
    }

    pub fn set_recenter_button_enabled(&self, enabled: bool) -> BridgeResult<()> {
        self.command("setRecenterButtonEnabled", vec![arg(enabled)])
    }

    pub fn set_night_mode(&self, mode: NightMode) -> BridgeResult<()> {
        self.command("setNightMode", vec![arg(mode)])
    }
}
