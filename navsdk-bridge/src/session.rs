//! The navigation session facade.
//!
//! One `NavigationSession` owns the module selection, the session event
//! multiplexer and the session state machine:
//!
//! ```text
//! Uninitialized -> Initializing -> { Ready | Failed } -> CleanedUp
//! ```
//!
//! Operation categories and their pre-Ready policy:
//! - control operations (routing, guidance, location, simulation, voice-set,
//!   turn-by-turn) forward unconditionally; the native layer rejects what it
//!   cannot do yet;
//! - read-back getters require `Ready` and fail with `NotReady` before it;
//! - terms-and-conditions calls are sequenced inside `init()` (and remain
//!   callable standalone before it);
//! - everything fails with `SessionClosed` after `cleanup()`.

use crate::error::{BridgeError, BridgeResult};
use crate::events::{EventMultiplexer, EventSink, NavigationCallbacks, NavigationEvent};
use crate::transport::{ModuleHost, ModuleProvider};
use crate::types::{
    AudioGuidance, LatLng, LocationSimulationOptions, NavigationInitErrorCode, RouteSegment,
    RoutingOptions, SpeedAlertOptions, TaskRemovedBehavior, TermsAndConditionsDialogOptions,
    TimeAndDistance, Waypoint,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    CleanedUp,
}

/// Options applied when initializing the navigator.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub terms: TermsAndConditionsDialogOptions,
    pub task_removed_behavior: TaskRemovedBehavior,
}

/// Public contract over the native navigation session.
///
/// Construct one per session; all shared state hangs off this object, so
/// isolated sessions (e.g. in tests) never interfere with each other.
pub struct NavigationSession {
    modules: Arc<ModuleProvider>,
    events: EventMultiplexer<NavigationCallbacks>,
    state: Mutex<SessionState>,
}

impl NavigationSession {
    pub fn new(host: Arc<dyn ModuleHost>) -> Arc<Self> {
        Arc::new(Self {
            modules: Arc::new(ModuleProvider::new(host)),
            events: EventMultiplexer::new(),
            state: Mutex::new(SessionState::Uninitialized),
        })
    }

    /// Module accessor shared with the per-view and auto controllers.
    pub fn modules(&self) -> Arc<ModuleProvider> {
        self.modules.clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Register a listener set. Registration before `init()` is kept and
    /// becomes live as soon as the native event source attaches.
    pub fn add_listeners(&self, set: Arc<NavigationCallbacks>) {
        self.events.add_listeners(set);
    }

    /// Remove a previously registered listener set. Idempotent.
    pub fn remove_listeners(&self, set: &Arc<NavigationCallbacks>) {
        self.events.remove_listeners(set);
    }

    /// Initialize the native navigator.
    ///
    /// Idempotent guard: calling while Initializing or Ready is a no-op, so
    /// re-render cycles cannot trigger duplicate native initialization. A
    /// Failed session may retry. Completion is reported through the
    /// `onNavigationReady` / `onNavigationInitError` events; the returned
    /// future resolves once the native call chain has been issued.
    pub async fn init(self: &Arc<Self>, options: SessionOptions) -> BridgeResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                SessionState::Initializing | SessionState::Ready => {
                    log::debug!("init() ignored in state {:?}", *state);
                    return Ok(());
                }
                SessionState::CleanedUp => return Err(BridgeError::SessionClosed),
                SessionState::Uninitialized | SessionState::Failed => {
                    *state = SessionState::Initializing;
                }
            }
        }

        // A missing module is an integration bug, reported synchronously to
        // the caller rather than through the init-error event.
        let nav = match self.modules.nav() {
            Ok(nav) => nav,
            Err(err) => {
                self.abort_init();
                return Err(err);
            }
        };

        // Attach the event source before touching the navigator so no native
        // emission can race past the multiplexer.
        let source = match self.modules.nav_events() {
            Ok(source) => source,
            Err(err) => {
                self.abort_init();
                return Err(err);
            }
        };
        source.attach(Arc::new(SessionEventSink {
            session: Arc::downgrade(self),
        }));

        // Terms must be settled before the navigator may initialize.
        let accepted = match nav.are_terms_accepted().await {
            Ok(accepted) => accepted,
            Err(err) => {
                self.fail_init(NavigationInitErrorCode::Unknown(err.code.unwrap_or(0)));
                return Err(err.into());
            }
        };
        if !accepted {
            let agreed = match nav.show_terms_and_conditions_dialog(&options.terms).await {
                Ok(agreed) => agreed,
                Err(err) => {
                    self.fail_init(NavigationInitErrorCode::Unknown(err.code.unwrap_or(0)));
                    return Err(err.into());
                }
            };
            if !agreed {
                log::warn!("terms and conditions declined; navigator not initialized");
                self.fail_init(NavigationInitErrorCode::TermsNotAccepted);
                return Ok(());
            }
        }

        if let Err(err) = nav.initialize_navigator(options.task_removed_behavior).await {
            log::warn!("navigator initialization failed: {}", err);
            self.fail_init(NavigationInitErrorCode::Unknown(err.code.unwrap_or(0)));
            return Err(err.into());
        }
        Ok(())
    }

    /// Tear the session down. The event source is detached, the native side
    /// cleaned up, and every subsequent operation fails with `SessionClosed`.
    pub async fn cleanup(&self) -> BridgeResult<()> {
        {
            let state = self.state.lock().unwrap();
            if *state == SessionState::CleanedUp {
                return Err(BridgeError::SessionClosed);
            }
        }
        if let Ok(source) = self.modules.nav_events() {
            source.detach();
        }
        let result = match self.modules.nav() {
            Ok(nav) => nav.cleanup().await.map_err(Into::into),
            Err(err) => Err(err),
        };
        *self.state.lock().unwrap() = SessionState::CleanedUp;
        log::debug!("session cleaned up");
        result
    }

    // --- terms and conditions ------------------------------------------------

    pub async fn are_terms_accepted(&self) -> BridgeResult<bool> {
        self.guard_open()?;
        Ok(self.modules.nav()?.are_terms_accepted().await?)
    }

    pub async fn show_terms_and_conditions_dialog(
        &self,
        options: &TermsAndConditionsDialogOptions,
    ) -> BridgeResult<bool> {
        self.guard_open()?;
        Ok(self
            .modules
            .nav()?
            .show_terms_and_conditions_dialog(options)
            .await?)
    }

    pub async fn reset_terms_accepted(&self) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.reset_terms_accepted().await?)
    }

    // --- routing (control) ---------------------------------------------------

    pub async fn set_destination(&self, waypoint: Waypoint) -> BridgeResult<()> {
        self.set_destinations(vec![waypoint], RoutingOptions::default())
            .await
    }

    pub async fn set_destinations(
        &self,
        waypoints: Vec<Waypoint>,
        options: RoutingOptions,
    ) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self
            .modules
            .nav()?
            .set_destinations(&waypoints, &options)
            .await?)
    }

    pub async fn clear_destinations(&self) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.clear_destinations().await?)
    }

    pub async fn continue_to_next_destination(&self) -> BridgeResult<bool> {
        self.guard_open()?;
        Ok(self.modules.nav()?.continue_to_next_destination().await?)
    }

    pub async fn display_route(&self) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.display_route().await?)
    }

    // --- guidance (control) --------------------------------------------------

    pub async fn start_guidance(&self) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.start_guidance().await?)
    }

    pub async fn stop_guidance(&self) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.stop_guidance().await?)
    }

    pub async fn is_guidance_running(&self) -> BridgeResult<bool> {
        self.guard_open()?;
        Ok(self.modules.nav()?.is_guidance_running().await?)
    }

    // --- location (control) --------------------------------------------------

    pub async fn enable_road_snapped_location_updates(
        &self,
        interval_ms: u64,
    ) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self
            .modules
            .nav()?
            .enable_road_snapped_location_updates(interval_ms)
            .await?)
    }

    pub async fn disable_road_snapped_location_updates(&self) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self
            .modules
            .nav()?
            .disable_road_snapped_location_updates()
            .await?)
    }

    pub async fn allow_background_location_updates(&self, allow: bool) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self
            .modules
            .nav()?
            .allow_background_location_updates(allow)
            .await?)
    }

    // --- voice and speed alerts ----------------------------------------------

    pub async fn set_audio_guidance(&self, guidance: AudioGuidance) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.set_audio_guidance(guidance).await?)
    }

    /// Read-back getter; requires Ready.
    pub async fn get_audio_guidance(&self) -> BridgeResult<AudioGuidance> {
        self.guard_ready()?;
        Ok(self.modules.nav()?.get_audio_guidance().await?)
    }

    pub async fn set_speed_alert_options(&self, options: SpeedAlertOptions) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.set_speed_alert_options(&options).await?)
    }

    /// Read-back getter; requires Ready.
    pub async fn get_speed_alert_options(&self) -> BridgeResult<SpeedAlertOptions> {
        self.guard_ready()?;
        Ok(self.modules.nav()?.get_speed_alert_options().await?)
    }

    // --- navigation info (getters; require Ready) ----------------------------

    pub async fn get_current_time_and_distance(&self) -> BridgeResult<Option<TimeAndDistance>> {
        self.guard_ready()?;
        Ok(self.modules.nav()?.get_current_time_and_distance().await?)
    }

    pub async fn get_route_segments(&self) -> BridgeResult<Vec<RouteSegment>> {
        self.guard_ready()?;
        Ok(self.modules.nav()?.get_route_segments().await?)
    }

    pub async fn get_current_route_segment(&self) -> BridgeResult<Option<RouteSegment>> {
        self.guard_ready()?;
        Ok(self.modules.nav()?.get_current_route_segment().await?)
    }

    pub async fn get_traveled_path(&self) -> BridgeResult<Vec<LatLng>> {
        self.guard_ready()?;
        Ok(self.modules.nav()?.get_traveled_path().await?)
    }

    // --- turn-by-turn (control) ----------------------------------------------

    pub async fn enable_turn_by_turn_events(&self, num_next_steps: u32) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self
            .modules
            .nav()?
            .enable_turn_by_turn_events(num_next_steps)
            .await?)
    }

    pub async fn disable_turn_by_turn_events(&self) -> BridgeResult<()> {
        self.guard_open()?;
        Ok(self.modules.nav()?.disable_turn_by_turn_events().await?)
    }

    /// Location simulation sub-facade.
    pub fn simulator(self: &Arc<Self>) -> Simulator {
        Simulator {
            session: self.clone(),
        }
    }

    // --- internals -----------------------------------------------------------

    fn guard_open(&self) -> BridgeResult<()> {
        if self.state() == SessionState::CleanedUp {
            return Err(BridgeError::SessionClosed);
        }
        Ok(())
    }

    fn guard_ready(&self) -> BridgeResult<()> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::CleanedUp => Err(BridgeError::SessionClosed),
            other => Err(BridgeError::NotReady(other)),
        }
    }

    /// Transition a still-Initializing session to Failed and report through
    /// the init-error event, the same channel a native-side failure uses.
    ///
    /// Any other state means the session moved on while the init call chain
    /// was suspended (most notably a completed `cleanup()`); the late failure
    /// must not reopen it.
    fn fail_init(&self, code: NavigationInitErrorCode) {
        {
            let mut state = self.state.lock().unwrap();
            if *state != SessionState::Initializing {
                log::debug!("late init failure ignored in state {:?}", *state);
                return;
            }
            *state = SessionState::Failed;
        }
        self.events
            .dispatch(&NavigationEvent::NavigationInitError(code));
    }

    /// Like `fail_init`, for integration errors that are already returned
    /// synchronously from `init()` and so carry no native error code.
    fn abort_init(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Initializing {
            *state = SessionState::Failed;
        }
    }

    fn handle_native_event(&self, event: &NavigationEvent) {
        match event {
            NavigationEvent::NavigationReady => {
                let mut state = self.state.lock().unwrap();
                if *state == SessionState::Initializing {
                    *state = SessionState::Ready;
                    log::debug!("navigation session ready");
                }
            }
            NavigationEvent::NavigationInitError(code) => {
                let mut state = self.state.lock().unwrap();
                if *state == SessionState::Initializing {
                    *state = SessionState::Failed;
                    log::warn!("navigation init failed: {:?}", code);
                }
            }
            _ => {}
        }
        self.events.dispatch(event);
    }
}

/// Decodes raw native emissions and feeds them into the owning session.
struct SessionEventSink {
    session: Weak<NavigationSession>,
}

impl EventSink for SessionEventSink {
    fn emit(&self, name: &str, payload: Value) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        match NavigationEvent::decode(name, payload) {
            Ok(event) => session.handle_native_event(&event),
            Err(err) => log::warn!("dropping native navigation event: {}", err),
        }
    }
}

/// Simulation controls, grouped like the native simulator object.
///
/// All simulation calls are control operations: forwarded unconditionally
/// while the session is open.
pub struct Simulator {
    session: Arc<NavigationSession>,
}

impl Simulator {
    pub async fn simulate_location(&self, location: LatLng) -> BridgeResult<()> {
        self.session.guard_open()?;
        Ok(self.session.modules.nav()?.simulate_location(location).await?)
    }

    pub async fn simulate_locations_along_existing_route(
        &self,
        options: LocationSimulationOptions,
    ) -> BridgeResult<()> {
        self.session.guard_open()?;
        Ok(self
            .session
            .modules
            .nav()?
            .simulate_locations_along_existing_route(&options)
            .await?)
    }

    pub async fn pause(&self) -> BridgeResult<()> {
        self.session.guard_open()?;
        Ok(self.session.modules.nav()?.pause_location_simulation().await?)
    }

    pub async fn resume(&self) -> BridgeResult<()> {
        self.session.guard_open()?;
        Ok(self.session.modules.nav()?.resume_location_simulation().await?)
    }

    pub async fn stop(&self) -> BridgeResult<()> {
        self.session.guard_open()?;
        Ok(self.session.modules.nav()?.stop_location_simulation().await?)
    }
}
