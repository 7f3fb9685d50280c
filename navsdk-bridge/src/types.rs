//! Payload types crossing the native boundary.
//!
//! Everything here serializes to the camelCase JSON shapes the native layer
//! speaks. The bridge treats these as plain structured data; semantics belong
//! to the native engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a mounted native view instance.
///
/// Owned by the UI host; the bridge only references it when dispatching view
/// commands or per-view module calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewHandle(i64);

impl ViewHandle {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Camera state of a map view. Partial on the way in (only the supplied
/// fields are applied), complete on the way back from `get_camera_position`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
}

/// A routing destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub position: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

impl Waypoint {
    pub fn at(position: LatLng) -> Self {
        Self {
            position,
            title: None,
            place_id: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TravelMode {
    #[default]
    Driving,
    Cycling,
    Walking,
    TwoWheeler,
    Taxi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutingStrategy {
    #[default]
    DefaultBest,
    Shorter,
    DeltaToTargetDistance,
}

/// Options applied when building a route to one or more destinations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<TravelMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_strategy: Option<RoutingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_tolls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_ferries: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_highways: Option<bool>,
}

/// Remaining time and distance to the current destination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAndDistance {
    /// Remaining travel time in seconds.
    pub seconds: f64,
    /// Remaining travel distance in meters.
    pub meters: f64,
}

/// A (possibly road-snapped) device location reported during guidance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

/// Payload of the arrival event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoint: Option<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_final_destination: Option<bool>,
}

/// One leg of the current route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub destination_lat_lng: LatLng,
    #[serde(default)]
    pub segment_lat_lng_list: Vec<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_waypoint: Option<Waypoint>,
}

/// Error code delivered with the navigation init-error event.
///
/// Codes are native-assigned; anything outside the known set is carried
/// through as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationInitErrorCode {
    NotAuthorized,
    TermsNotAccepted,
    NetworkError,
    LocationPermissionMissing,
    Unknown(i64),
}

impl NavigationInitErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::NotAuthorized,
            2 => Self::TermsNotAccepted,
            3 => Self::NetworkError,
            4 => Self::LocationPermissionMissing,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::NotAuthorized => 1,
            Self::TermsNotAccepted => 2,
            Self::NetworkError => 3,
            Self::LocationPermissionMissing => 4,
            Self::Unknown(code) => *code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioGuidance {
    Silent,
    AlertsOnly,
    #[default]
    AlertsAndGuidance,
}

/// Thresholds for speeding alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedAlertOptions {
    pub minor_speed_alert_percent_threshold: f64,
    pub major_speed_alert_percent_threshold: f64,
    pub severity_upgrade_duration_seconds: f64,
}

/// Options for simulating travel along the currently built route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSimulationOptions {
    pub speed_multiplier: f64,
}

impl Default for LocationSimulationOptions {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
        }
    }
}

/// What the native service does when the hosting task is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskRemovedBehavior {
    #[default]
    ContinueService,
    QuitService,
}

/// Options for the terms-and-conditions dialog shown before initialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsAndConditionsDialogOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub show_only_disclaimer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MapType {
    None,
    #[default]
    Normal,
    Satellite,
    Terrain,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NightMode {
    #[default]
    Auto,
    ForceDay,
    ForceNight,
}

/// Snapshot of the map UI toggles, as reported by the native view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    pub is_compass_enabled: bool,
    pub is_map_toolbar_enabled: bool,
    pub is_rotate_gestures_enabled: bool,
    pub is_scroll_gestures_enabled: bool,
    pub is_scroll_gestures_enabled_during_rotate_or_zoom: bool,
    pub is_tilt_gestures_enabled: bool,
    pub is_zoom_controls_enabled: bool,
    pub is_zoom_gestures_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerOptions {
    pub position: Option<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

/// A marker the native map has materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub position: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolylineOptions {
    #[serde(default)]
    pub points: Vec<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polyline {
    pub id: String,
    #[serde(default)]
    pub points: Vec<LatLng>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonOptions {
    #[serde(default)]
    pub points: Vec<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polygon {
    pub id: String,
    #[serde(default)]
    pub points: Vec<LatLng>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleOptions {
    pub center: Option<LatLng>,
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub id: String,
    pub center: LatLng,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundOverlayOptions {
    pub position: Option<LatLng>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundOverlay {
    pub id: String,
    pub position: LatLng,
    pub width: f64,
    pub height: f64,
}
