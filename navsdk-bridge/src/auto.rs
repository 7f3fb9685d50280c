//! Controller for the auto/secondary-display surface.
//!
//! The auto display mirrors the map on a projected screen (e.g. a car head
//! unit). It has its own native module and its own event source, independent
//! of the phone-side session, and may appear and disappear at any time.

use crate::error::BridgeResult;
use crate::events::{AutoCallbacks, AutoEvent, EventMultiplexer, EventSink};
use crate::transport::ModuleProvider;
use crate::types::CameraPosition;
use serde_json::Value;
use std::sync::{Arc, Weak};

pub struct AutoMapController {
    modules: Arc<ModuleProvider>,
    events: Arc<EventMultiplexer<AutoCallbacks>>,
}

impl AutoMapController {
    pub fn new(modules: Arc<ModuleProvider>) -> Self {
        Self {
            modules,
            events: Arc::new(EventMultiplexer::new()),
        }
    }

    /// Attach to the auto event source. Listener sets registered beforehand
    /// are live from the first event onward.
    pub fn start(&self) -> BridgeResult<()> {
        let source = self.modules.auto_events()?;
        source.attach(Arc::new(AutoEventSink {
            events: Arc::downgrade(&self.events),
        }));
        Ok(())
    }

    pub fn stop(&self) {
        if let Ok(source) = self.modules.auto_events() {
            source.detach();
        }
    }

    pub fn add_listeners(&self, set: Arc<AutoCallbacks>) {
        self.events.add_listeners(set);
    }

    pub fn remove_listeners(&self, set: &Arc<AutoCallbacks>) {
        self.events.remove_listeners(set);
    }

    pub async fn is_auto_screen_available(&self) -> BridgeResult<bool> {
        Ok(self.modules.auto()?.is_auto_screen_available().await?)
    }

    pub async fn move_camera(&self, position: CameraPosition) -> BridgeResult<()> {
        Ok(self.modules.auto()?.move_camera(&position).await?)
    }

    pub async fn set_zoom_level(&self, zoom: f64) -> BridgeResult<()> {
        Ok(self.modules.auto()?.set_zoom_level(zoom).await?)
    }
}

struct AutoEventSink {
    events: Weak<EventMultiplexer<AutoCallbacks>>,
}

impl EventSink for AutoEventSink {
    fn emit(&self, name: &str, payload: Value) {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        match AutoEvent::decode(name, payload) {
            Ok(event) => events.dispatch(&event),
            Err(err) => log::warn!("dropping auto event: {}", err),
        }
    }
}
