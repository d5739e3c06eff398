//! The shared arena session: one inbound event in, one atomic step out

use serde::Serialize;
use tracing::{debug, info};

use crate::config::RoundConfig;
use crate::ws::protocol::{ClientMsg, PlayerId, ServerMsg, Welcome};

use super::effects::Effects;
use super::registry::PlayerRegistry;
use super::relay::ReplicationRelay;
use super::round::{Phase, RoundStateMachine};
use super::spawn::SpawnAllocator;
use super::timer::TimerKind;

/// Read-only summary for health checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub players: usize,
    pub round: u32,
    pub round_active: bool,
    pub phase: Phase,
}

/// Session context owning the registry and round state.
///
/// Every method is one atomic step and returns the messages and timer
/// commands it produced; nothing here does I/O.
pub struct Session {
    registry: PlayerRegistry,
    round: RoundStateMachine,
}

impl Session {
    pub fn new(config: RoundConfig, spawns: SpawnAllocator) -> Self {
        Self {
            registry: PlayerRegistry::new(spawns),
            round: RoundStateMachine::new(config),
        }
    }

    /// Register a new connection and announce it
    pub fn connect(&mut self, id: PlayerId) -> Effects {
        let mut fx = Effects::new();
        let view = self.registry.register(id.clone()).view();
        info!(player_id = %id, players = self.registry.len(), "Player connected");

        fx.send_to(&id, ServerMsg::Welcome(Welcome { id: id.clone() }));
        fx.send_to(&id, ServerMsg::CurrentPlayers(self.registry.roster()));
        fx.send_to(&id, ServerMsg::GameState(self.round.game_state(&self.registry)));
        fx.broadcast_except(&id, ServerMsg::NewPlayer(view));

        self.round.evaluate_start(&self.registry, &mut fx);
        fx
    }

    /// Drop a connection; unknown ids produce nothing
    pub fn disconnect(&mut self, id: &PlayerId) -> Effects {
        let mut fx = Effects::new();
        if self.registry.deregister(id).is_none() {
            return fx;
        }
        info!(player_id = %id, players = self.registry.len(), "Player disconnected");

        fx.broadcast(ServerMsg::PlayerDisconnected(id.clone()));
        self.round.on_player_left(&mut self.registry, &mut fx);
        fx
    }

    /// Apply one client message from `sender`
    pub fn handle(&mut self, sender: &PlayerId, msg: ClientMsg) -> Effects {
        let mut fx = Effects::new();
        if !self.registry.contains(sender) {
            debug!(player_id = %sender, kind = msg.kind(), "Message from unknown player dropped");
            return fx;
        }

        match msg {
            ClientMsg::PlayerMovement(update) => {
                ReplicationRelay::on_movement(&mut self.registry, sender, update, &mut fx);
            }
            ClientMsg::Shoot(shot) => {
                ReplicationRelay::on_shoot(sender, shot, &mut fx);
            }
            ClientMsg::Hit(claim) => {
                ReplicationRelay::on_hit_claim(
                    &mut self.registry,
                    &mut self.round,
                    sender,
                    claim,
                    &mut fx,
                );
            }
            ClientMsg::RequestRespawn(_) => {
                ReplicationRelay::on_respawn_request(&mut self.registry, &self.round, sender, &mut fx);
            }
        }
        fx
    }

    /// Advance the round for a timer tick
    pub fn timer_fired(&mut self, kind: TimerKind) -> Effects {
        let mut fx = Effects::new();
        match kind {
            TimerKind::Countdown => self.round.countdown_tick(&mut self.registry, &mut fx),
            TimerKind::RoundClock => self.round.clock_tick(&mut self.registry, &mut fx),
            TimerKind::Intermission => self.round.intermission_elapsed(&self.registry, &mut fx),
        }
        fx
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            players: self.registry.len(),
            round: self.round.round(),
            round_active: self.round.is_active(),
            phase: self.round.phase(),
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn round(&self) -> &RoundStateMachine {
        &self.round
    }
}
