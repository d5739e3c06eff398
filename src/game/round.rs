//! Round lifecycle: Idle -> Countdown -> Active -> Intermission -> Idle

use serde::Serialize;
use tracing::info;

use crate::config::RoundConfig;
use crate::ws::protocol::{
    EndReason, GameStateView, PlayerId, RoundCountdown, RoundEnd, RoundStart, RoundTimer,
    ServerMsg,
};

use super::effects::Effects;
use super::registry::PlayerRegistry;
use super::timer::TimerKind;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for enough players
    Idle,
    /// Counting down to the next round
    Countdown,
    /// Round in progress
    Active,
    /// Round over, waiting before the next start check
    Intermission,
}

/// Owns phase, round number and the round clock.
///
/// Only one round is ever Active. Every transition that needs a timer emits
/// the matching start/cancel command into [`Effects`].
#[derive(Debug)]
pub struct RoundStateMachine {
    config: RoundConfig,
    phase: Phase,
    round: u32,
    time_remaining: u32,
    countdown: u32,
}

impl RoundStateMachine {
    pub fn new(config: RoundConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            round: 0,
            time_remaining: 0,
            countdown: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn game_state(&self, registry: &PlayerRegistry) -> GameStateView {
        GameStateView {
            round: self.round,
            round_active: self.is_active(),
            time_remaining: self.time_remaining,
            scores: registry.scores().clone(),
        }
    }

    /// Idle -> Countdown once enough players are connected
    pub fn evaluate_start(&mut self, registry: &PlayerRegistry, fx: &mut Effects) -> bool {
        if self.phase != Phase::Idle || registry.len() < self.config.min_players {
            return false;
        }

        self.phase = Phase::Countdown;
        self.countdown = self.config.countdown_secs;
        info!(
            round = self.round + 1,
            players = registry.len(),
            countdown = self.countdown,
            "Round countdown started"
        );

        fx.broadcast(self.countdown_msg());
        fx.start_timer(TimerKind::Countdown);
        true
    }

    /// React to a player leaving. Timers keep running; only an active round
    /// re-checks its alive count.
    pub fn on_player_left(&mut self, registry: &mut PlayerRegistry, fx: &mut Effects) {
        if self.phase == Phase::Active {
            self.check_alive(registry, None, fx);
        }
    }

    /// One countdown second elapsed
    pub fn countdown_tick(&mut self, registry: &mut PlayerRegistry, fx: &mut Effects) {
        if self.phase != Phase::Countdown {
            return;
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            fx.broadcast(self.countdown_msg());
        } else {
            fx.cancel_timer(TimerKind::Countdown);
            self.start_round(registry, fx);
        }
    }

    /// One round second elapsed
    pub fn clock_tick(&mut self, registry: &mut PlayerRegistry, fx: &mut Effects) {
        if self.phase != Phase::Active {
            return;
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        fx.broadcast(ServerMsg::RoundTimer(RoundTimer {
            time_remaining: self.time_remaining,
        }));

        if self.time_remaining == 0 {
            self.end(registry, EndReason::Timeout, fx);
        } else {
            self.check_alive(registry, None, fx);
        }
    }

    /// Intermission delay elapsed; back to Idle and re-check the start condition
    pub fn intermission_elapsed(&mut self, registry: &PlayerRegistry, fx: &mut Effects) {
        if self.phase != Phase::Intermission {
            return;
        }
        self.phase = Phase::Idle;
        self.evaluate_start(registry, fx);
    }

    /// End the round once at most one player is alive.
    ///
    /// A sole survivor earns a point unless they are `credited`, i.e. they
    /// were already awarded the kill that caused this check.
    pub fn check_alive(
        &mut self,
        registry: &mut PlayerRegistry,
        credited: Option<&PlayerId>,
        fx: &mut Effects,
    ) -> Option<EndReason> {
        if self.phase != Phase::Active {
            return None;
        }

        let alive: Vec<PlayerId> = registry.alive().take(2).map(|p| p.id.clone()).collect();
        let reason = match alive.as_slice() {
            [] => EndReason::Draw,
            [survivor] => {
                if credited != Some(survivor) {
                    registry.award_point(survivor);
                }
                EndReason::Elimination
            }
            _ => return None,
        };

        self.end(registry, reason, fx);
        Some(reason)
    }

    fn start_round(&mut self, registry: &mut PlayerRegistry, fx: &mut Effects) {
        self.round += 1;
        self.phase = Phase::Active;
        self.time_remaining = self.config.round_duration_secs;

        registry.respawn_all();

        info!(
            round = self.round,
            players = registry.len(),
            duration = self.time_remaining,
            "Round started"
        );

        fx.broadcast(ServerMsg::RoundStart(RoundStart {
            round: self.round,
            duration: self.config.round_duration_secs,
            players: registry.roster(),
            scores: registry.scores().clone(),
        }));
        fx.start_timer(TimerKind::RoundClock);
    }

    fn end(&mut self, registry: &PlayerRegistry, reason: EndReason, fx: &mut Effects) {
        if self.phase != Phase::Active {
            return;
        }

        self.phase = Phase::Intermission;
        fx.cancel_timer(TimerKind::RoundClock);

        let winner = registry.scores().leader().cloned();
        info!(
            round = self.round,
            %reason,
            winner = winner.as_ref().map(|w| w.as_str()).unwrap_or("none"),
            "Round ended"
        );

        fx.broadcast(ServerMsg::RoundEnd(RoundEnd {
            round: self.round,
            reason,
            winner,
            scores: registry.scores().clone(),
        }));
        fx.start_timer(TimerKind::Intermission);
    }

    fn countdown_msg(&self) -> ServerMsg {
        ServerMsg::RoundCountdown(RoundCountdown {
            countdown: self.countdown,
            message: format!("Round {} starting in...", self.round + 1),
        })
    }
}
