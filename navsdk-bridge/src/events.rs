//! Native event decoding and listener fan-out.
//!
//! The native layer emits raw `(event name, JSON payload)` pairs through an
//! [`EventSink`]. Payloads are decoded into typed events at the boundary;
//! anything with an unknown name or a malformed payload is dropped with a
//! warning instead of reaching listeners.
//!
//! Listener registration is additive: every `add_listeners` call creates an
//! independent subscription, and overlapping callback slots across
//! subscriptions all fire, in registration order. Removal is keyed on the
//! identity of the supplied set and is idempotent.

use crate::types::{
    ArrivalEvent, Circle, GroundOverlay, LatLng, Location, Marker, NavigationInitErrorCode,
    Polygon, Polyline, TimeAndDistance,
};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Callback slot with no payload.
pub type Callback = Box<dyn Fn() + Send + Sync>;
/// Callback slot receiving a decoded payload.
pub type PayloadCallback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A raw emission entry point handed to the native event source.
pub trait EventSink: Send + Sync {
    fn emit(&self, name: &str, payload: Value);
}

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("bad payload for `{name}`: {source}")]
    BadPayload {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    name: &'static str,
    payload: Value,
) -> Result<T, EventDecodeError> {
    serde_json::from_value(payload).map_err(|source| EventDecodeError::BadPayload { name, source })
}

/// Events originating from the navigation session.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
    NavigationReady,
    NavigationInitError(NavigationInitErrorCode),
    Arrival(ArrivalEvent),
    RouteChanged,
    RemainingTimeOrDistanceChanged(TimeAndDistance),
    LocationChanged(Location),
    StartGuidance,
    TurnByTurn(Vec<Value>),
}

impl NavigationEvent {
    /// Decode a raw native emission into a typed event.
    pub fn decode(name: &str, payload: Value) -> Result<Self, EventDecodeError> {
        match name {
            "onNavigationReady" => Ok(Self::NavigationReady),
            "onNavigationInitError" => {
                let code: i64 = decode_payload("onNavigationInitError", payload)?;
                Ok(Self::NavigationInitError(NavigationInitErrorCode::from_code(code)))
            }
            "onArrival" => Ok(Self::Arrival(decode_payload("onArrival", payload)?)),
            "onRouteChanged" => Ok(Self::RouteChanged),
            "onRemainingTimeOrDistanceChanged" => Ok(Self::RemainingTimeOrDistanceChanged(
                decode_payload("onRemainingTimeOrDistanceChanged", payload)?,
            )),
            "onLocationChanged" => {
                Ok(Self::LocationChanged(decode_payload("onLocationChanged", payload)?))
            }
            "onStartGuidance" => Ok(Self::StartGuidance),
            "onTurnByTurn" => Ok(Self::TurnByTurn(decode_payload("onTurnByTurn", payload)?)),
            other => Err(EventDecodeError::UnknownEvent(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NavigationReady => "onNavigationReady",
            Self::NavigationInitError(_) => "onNavigationInitError",
            Self::Arrival(_) => "onArrival",
            Self::RouteChanged => "onRouteChanged",
            Self::RemainingTimeOrDistanceChanged(_) => "onRemainingTimeOrDistanceChanged",
            Self::LocationChanged(_) => "onLocationChanged",
            Self::StartGuidance => "onStartGuidance",
            Self::TurnByTurn(_) => "onTurnByTurn",
        }
    }
}

/// Events originating from one map view.
#[derive(Debug, Clone, PartialEq)]
pub enum MapViewEvent {
    MapReady,
    MapClick(LatLng),
    MarkerClick(Marker),
    PolylineClick(Polyline),
    PolygonClick(Polygon),
    CircleClick(Circle),
    GroundOverlayClick(GroundOverlay),
    MarkerInfoWindowTapped(Marker),
    RecenterButtonClick,
}

impl MapViewEvent {
    pub fn decode(name: &str, payload: Value) -> Result<Self, EventDecodeError> {
        match name {
            "onMapReady" => Ok(Self::MapReady),
            "onMapClick" => Ok(Self::MapClick(decode_payload("onMapClick", payload)?)),
            "onMarkerClick" => Ok(Self::MarkerClick(decode_payload("onMarkerClick", payload)?)),
            "onPolylineClick" => {
                Ok(Self::PolylineClick(decode_payload("onPolylineClick", payload)?))
            }
            "onPolygonClick" => Ok(Self::PolygonClick(decode_payload("onPolygonClick", payload)?)),
            "onCircleClick" => Ok(Self::CircleClick(decode_payload("onCircleClick", payload)?)),
            "onGroundOverlayClick" => Ok(Self::GroundOverlayClick(decode_payload(
                "onGroundOverlayClick",
                payload,
            )?)),
            "onMarkerInfoWindowTapped" => Ok(Self::MarkerInfoWindowTapped(decode_payload(
                "onMarkerInfoWindowTapped",
                payload,
            )?)),
            "onRecenterButtonClick" => Ok(Self::RecenterButtonClick),
            other => Err(EventDecodeError::UnknownEvent(other.to_string())),
        }
    }
}

/// Events originating from the auto/secondary display.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoEvent {
    AutoScreenAvailabilityChanged(bool),
    CustomNavigationAutoEvent(Value),
}

impl AutoEvent {
    pub fn decode(name: &str, payload: Value) -> Result<Self, EventDecodeError> {
        match name {
            "onAutoScreenAvailabilityChanged" => Ok(Self::AutoScreenAvailabilityChanged(
                decode_payload("onAutoScreenAvailabilityChanged", payload)?,
            )),
            "onCustomNavigationAutoEvent" => Ok(Self::CustomNavigationAutoEvent(payload)),
            other => Err(EventDecodeError::UnknownEvent(other.to_string())),
        }
    }
}

/// One family of listener callbacks, invoked with its decoded event type.
pub trait ListenerSet: Send + Sync + 'static {
    type Event;

    /// Invoke the matching callback slot for `event`, if this set has one.
    fn invoke(&self, event: &Self::Event);
}

/// Partial set of navigation session callbacks. Every slot is optional; build
/// only the ones you care about.
#[derive(Default)]
pub struct NavigationCallbacks {
    pub(crate) on_navigation_ready: Option<Callback>,
    pub(crate) on_navigation_init_error: Option<PayloadCallback<NavigationInitErrorCode>>,
    pub(crate) on_arrival: Option<PayloadCallback<ArrivalEvent>>,
    pub(crate) on_route_changed: Option<Callback>,
    pub(crate) on_remaining_time_or_distance_changed: Option<PayloadCallback<TimeAndDistance>>,
    pub(crate) on_location_changed: Option<PayloadCallback<Location>>,
    pub(crate) on_start_guidance: Option<Callback>,
    pub(crate) on_turn_by_turn: Option<PayloadCallback<Vec<Value>>>,
}

impl NavigationCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_navigation_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_navigation_ready = Some(Box::new(f));
        self
    }

    pub fn on_navigation_init_error(
        mut self,
        f: impl Fn(&NavigationInitErrorCode) + Send + Sync + 'static,
    ) -> Self {
        self.on_navigation_init_error = Some(Box::new(f));
        self
    }

    pub fn on_arrival(mut self, f: impl Fn(&ArrivalEvent) + Send + Sync + 'static) -> Self {
        self.on_arrival = Some(Box::new(f));
        self
    }

    pub fn on_route_changed(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_route_changed = Some(Box::new(f));
        self
    }

    pub fn on_remaining_time_or_distance_changed(
        mut self,
        f: impl Fn(&TimeAndDistance) + Send + Sync + 'static,
    ) -> Self {
        self.on_remaining_time_or_distance_changed = Some(Box::new(f));
        self
    }

    pub fn on_location_changed(mut self, f: impl Fn(&Location) + Send + Sync + 'static) -> Self {
        self.on_location_changed = Some(Box::new(f));
        self
    }

    pub fn on_start_guidance(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start_guidance = Some(Box::new(f));
        self
    }

    pub fn on_turn_by_turn(mut self, f: impl Fn(&Vec<Value>) + Send + Sync + 'static) -> Self {
        self.on_turn_by_turn = Some(Box::new(f));
        self
    }
}

impl ListenerSet for NavigationCallbacks {
    type Event = NavigationEvent;

    fn invoke(&self, event: &NavigationEvent) {
        match event {
            NavigationEvent::NavigationReady => {
                if let Some(cb) = &self.on_navigation_ready {
                    cb();
                }
            }
            NavigationEvent::NavigationInitError(code) => {
                if let Some(cb) = &self.on_navigation_init_error {
                    cb(code);
                }
            }
            NavigationEvent::Arrival(arrival) => {
                if let Some(cb) = &self.on_arrival {
                    cb(arrival);
                }
            }
            NavigationEvent::RouteChanged => {
                if let Some(cb) = &self.on_route_changed {
                    cb();
                }
            }
            NavigationEvent::RemainingTimeOrDistanceChanged(remaining) => {
                if let Some(cb) = &self.on_remaining_time_or_distance_changed {
                    cb(remaining);
                }
            }
            NavigationEvent::LocationChanged(location) => {
                if let Some(cb) = &self.on_location_changed {
                    cb(location);
                }
            }
            NavigationEvent::StartGuidance => {
                if let Some(cb) = &self.on_start_guidance {
                    cb();
                }
            }
            NavigationEvent::TurnByTurn(steps) => {
                if let Some(cb) = &self.on_turn_by_turn {
                    cb(steps);
                }
            }
        }
    }
}

/// Partial set of per-view map callbacks.
#[derive(Default)]
pub struct MapViewCallbacks {
    pub(crate) on_map_ready: Option<Callback>,
    pub(crate) on_map_click: Option<PayloadCallback<LatLng>>,
    pub(crate) on_marker_click: Option<PayloadCallback<Marker>>,
    pub(crate) on_polyline_click: Option<PayloadCallback<Polyline>>,
    pub(crate) on_polygon_click: Option<PayloadCallback<Polygon>>,
    pub(crate) on_circle_click: Option<PayloadCallback<Circle>>,
    pub(crate) on_ground_overlay_click: Option<PayloadCallback<GroundOverlay>>,
    pub(crate) on_marker_info_window_tapped: Option<PayloadCallback<Marker>>,
    pub(crate) on_recenter_button_click: Option<Callback>,
}

impl MapViewCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_map_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_map_ready = Some(Box::new(f));
        self
    }

    pub fn on_map_click(mut self, f: impl Fn(&LatLng) + Send + Sync + 'static) -> Self {
        self.on_map_click = Some(Box::new(f));
        self
    }

    pub fn on_marker_click(mut self, f: impl Fn(&Marker) + Send + Sync + 'static) -> Self {
        self.on_marker_click = Some(Box::new(f));
        self
    }

    pub fn on_polyline_click(mut self, f: impl Fn(&Polyline) + Send + Sync + 'static) -> Self {
        self.on_polyline_click = Some(Box::new(f));
        self
    }

    pub fn on_polygon_click(mut self, f: impl Fn(&Polygon) + Send + Sync + 'static) -> Self {
        self.on_polygon_click = Some(Box::new(f));
        self
    }

    pub fn on_circle_click(mut self, f: impl Fn(&Circle) + Send + Sync + 'static) -> Self {
        self.on_circle_click = Some(Box::new(f));
        self
    }

    pub fn on_ground_overlay_click(
        mut self,
        f: impl Fn(&GroundOverlay) + Send + Sync + 'static,
    ) -> Self {
        self.on_ground_overlay_click = Some(Box::new(f));
        self
    }

    pub fn on_marker_info_window_tapped(
        mut self,
        f: impl Fn(&Marker) + Send + Sync + 'static,
    ) -> Self {
        self.on_marker_info_window_tapped = Some(Box::new(f));
        self
    }

    pub fn on_recenter_button_click(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_recenter_button_click = Some(Box::new(f));
        self
    }
}

impl ListenerSet for MapViewCallbacks {
    type Event = MapViewEvent;

    fn invoke(&self, event: &MapViewEvent) {
        match event {
            MapViewEvent::MapReady => {
                if let Some(cb) = &self.on_map_ready {
                    cb();
                }
            }
            MapViewEvent::MapClick(latlng) => {
                if let Some(cb) = &self.on_map_click {
                    cb(latlng);
                }
            }
            MapViewEvent::MarkerClick(marker) => {
                if let Some(cb) = &self.on_marker_click {
                    cb(marker);
                }
            }
            MapViewEvent::PolylineClick(polyline) => {
                if let Some(cb) = &self.on_polyline_click {
                    cb(polyline);
                }
            }
            MapViewEvent::PolygonClick(polygon) => {
                if let Some(cb) = &self.on_polygon_click {
                    cb(polygon);
                }
            }
            MapViewEvent::CircleClick(circle) => {
                if let Some(cb) = &self.on_circle_click {
                    cb(circle);
                }
            }
            MapViewEvent::GroundOverlayClick(overlay) => {
                if let Some(cb) = &self.on_ground_overlay_click {
                    cb(overlay);
                }
            }
            MapViewEvent::MarkerInfoWindowTapped(marker) => {
                if let Some(cb) = &self.on_marker_info_window_tapped {
                    cb(marker);
                }
            }
            MapViewEvent::RecenterButtonClick => {
                if let Some(cb) = &self.on_recenter_button_click {
                    cb();
                }
            }
        }
    }
}

/// Partial set of auto/secondary-display callbacks.
#[derive(Default)]
pub struct AutoCallbacks {
    pub(crate) on_auto_screen_availability_changed: Option<PayloadCallback<bool>>,
    pub(crate) on_custom_navigation_auto_event: Option<PayloadCallback<Value>>,
}

impl AutoCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_auto_screen_availability_changed(
        mut self,
        f: impl Fn(&bool) + Send + Sync + 'static,
    ) -> Self {
        self.on_auto_screen_availability_changed = Some(Box::new(f));
        self
    }

    pub fn on_custom_navigation_auto_event(
        mut self,
        f: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Self {
        self.on_custom_navigation_auto_event = Some(Box::new(f));
        self
    }
}

impl ListenerSet for AutoCallbacks {
    type Event = AutoEvent;

    fn invoke(&self, event: &AutoEvent) {
        match event {
            AutoEvent::AutoScreenAvailabilityChanged(available) => {
                if let Some(cb) = &self.on_auto_screen_availability_changed {
                    cb(available);
                }
            }
            AutoEvent::CustomNavigationAutoEvent(data) => {
                if let Some(cb) = &self.on_custom_navigation_auto_event {
                    cb(data);
                }
            }
        }
    }
}

/// Fans native events out to every currently-registered listener set.
///
/// Subscriptions live here from the moment `add_listeners` is called, whether
/// or not the native event source has attached yet, so registrations placed
/// before session init are delivered from the first native event onward.
pub struct EventMultiplexer<L: ListenerSet> {
    subscriptions: Mutex<Vec<Arc<L>>>,
}

impl<L: ListenerSet> Default for EventMultiplexer<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ListenerSet> EventMultiplexer<L> {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Register `set` as a new, independent subscription. Previously
    /// registered sets are untouched; overlapping slots all fire.
    pub fn add_listeners(&self, set: Arc<L>) {
        self.subscriptions.lock().unwrap().push(set);
    }

    /// Remove every subscription holding exactly this set instance.
    /// Removing an unknown or already-removed set is a no-op.
    pub fn remove_listeners(&self, set: &Arc<L>) {
        self.subscriptions
            .lock()
            .unwrap()
            .retain(|sub| !Arc::ptr_eq(sub, set));
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Deliver one event to every live subscription, in registration order.
    ///
    /// The subscription list is snapshotted before any callback runs, so a
    /// callback that adds or removes listeners cannot corrupt the in-progress
    /// fan-out. A panicking callback is isolated and does not stop delivery
    /// to the remaining sets.
    pub fn dispatch(&self, event: &L::Event) {
        let snapshot: Vec<Arc<L>> = self.subscriptions.lock().unwrap().clone();
        for set in snapshot {
            if catch_unwind(AssertUnwindSafe(|| set.invoke(event))).is_err() {
                log::error!("listener callback panicked; continuing fan-out");
            }
        }
    }
}
