//! Arena session: players, rounds, replication and timers

pub mod coordinator;
pub mod effects;
pub mod registry;
pub mod relay;
pub mod round;
pub mod scoreboard;
pub mod session;
pub mod spawn;
pub mod timer;

pub use coordinator::{Coordinator, SessionHandle};
pub use registry::{DamageResult, Player, PlayerRegistry};
pub use round::{Phase, RoundStateMachine};
pub use scoreboard::Scoreboard;
pub use session::{Session, SessionStatus};
pub use spawn::SpawnAllocator;
