//! Bridge layer between an embedding application and a native navigation/map
//! engine.
//!
//! The native engine lives on the other side of a process/language boundary
//! and is supplied by the embedder as implementations of the traits in
//! [`transport`]. On top of that boundary this crate provides:
//!
//! - [`commands`]: lazy, memoized resolution of symbolic view-command names
//!   to native-assigned numeric ids, and fire-and-forget dispatch to a view;
//! - [`events`]: decoding of raw native events into typed payloads and a
//!   multiplexer that fans each event out to every registered listener set
//!   without clobbering other registrations;
//! - [`session`]: the navigation session facade with its lifecycle state
//!   machine (`Uninitialized → Initializing → {Ready | Failed} → CleanedUp`);
//! - [`map_view`] and [`auto`]: per-view and secondary-display controllers.
//!
//! The bridge forwards requests and relays results; route computation,
//! guidance logic and rendering stay on the native side.

pub mod auto;
pub mod commands;
pub mod error;
pub mod events;
pub mod map_view;
pub mod session;
pub mod transport;
pub mod types;

pub use auto::AutoMapController;
pub use commands::{CommandDispatcher, CommandResolver, CommandTable, NAV_VIEW_MANAGER};
pub use error::{BridgeError, BridgeResult, NativeError};
pub use events::{
    AutoCallbacks, AutoEvent, EventDecodeError, EventMultiplexer, EventSink, ListenerSet,
    MapViewCallbacks, MapViewEvent, NavigationCallbacks, NavigationEvent,
};
pub use map_view::{MapViewController, NavigationViewController};
pub use session::{NavigationSession, SessionOptions, SessionState, Simulator};
pub use transport::{
    CommandId, ModuleHost, ModuleProvider, NativeAutoModule, NativeEventSource, NativeMapModule,
    NativeModuleSet, NativeNavModule, TransportKind, ViewCommandHost,
};
pub use types::*;
