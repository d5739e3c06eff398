//! Client sync agent
//!
//! Runs inside each game client: throttles local pose updates, smooths
//! remote players between network updates and surfaces round events to
//! the UI through a [`SyncListener`].

pub mod agent;
pub mod interpolation;
pub mod throttle;

pub use agent::{ClientSyncAgent, KillFeed, LocalPose, RemoteShot, RoundUpdate, SyncListener};
pub use interpolation::RemotePlayer;
pub use throttle::OutboundThrottle;
