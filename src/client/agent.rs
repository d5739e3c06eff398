//! Client-side sync agent: translates server events into local callbacks and
//! local input into outbound messages.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::game::Scoreboard;
use crate::ws::protocol::{
    ClientMsg, EndReason, HitClaim, MovementUpdate, PlayerId, PlayerView, ProtocolError,
    RespawnRequest, ServerMsg, ShootRequest, Vec3,
};

use super::interpolation::RemotePlayer;
use super::throttle::OutboundThrottle;

/// Local player pose sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalPose {
    pub position: Vec3,
    pub rotation: f32,
}

/// Round HUD events
#[derive(Debug, Clone, PartialEq)]
pub enum RoundUpdate {
    GameState {
        round: u32,
        active: bool,
        time_remaining: u32,
    },
    Countdown {
        countdown: u32,
        message: String,
    },
    RoundStart {
        round: u32,
        duration: u32,
    },
    Timer {
        time_remaining: u32,
    },
    RoundEnd {
        round: u32,
        reason: EndReason,
        winner: Option<PlayerId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KillFeed {
    pub killer: PlayerId,
    pub victim: PlayerId,
    /// The local player was the victim
    pub is_me: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteShot {
    pub shooter: PlayerId,
    pub position: Vec3,
    pub direction: Vec3,
}

/// Observer for everything the agent surfaces. All methods default to no-ops.
pub trait SyncListener {
    fn round_update(&mut self, _update: RoundUpdate) {}
    fn scores_changed(&mut self, _scores: &Scoreboard) {}
    fn player_killed(&mut self, _kill: KillFeed) {}
    fn remote_shot(&mut self, _shot: RemoteShot) {}
    fn damaged(&mut self, _damage: i32) {}
    fn respawned(&mut self, _position: Vec3) {}
    fn remote_joined(&mut self, _id: &PlayerId) {}
    fn remote_left(&mut self, _id: &PlayerId) {}
}

impl SyncListener for () {}

pub struct ClientSyncAgent<L> {
    listener: L,
    local_id: Option<PlayerId>,
    remotes: HashMap<PlayerId, RemotePlayer>,
    throttle: OutboundThrottle,
    round: u32,
    round_active: bool,
    time_remaining: u32,
    scores: Scoreboard,
}

impl<L: SyncListener> ClientSyncAgent<L> {
    pub fn new(listener: L) -> Self {
        Self {
            listener,
            local_id: None,
            remotes: HashMap::new(),
            throttle: OutboundThrottle::default(),
            round: 0,
            round_active: false,
            time_remaining: 0,
            scores: Scoreboard::new(),
        }
    }

    /// Parse one text frame and apply it
    pub fn handle_frame(&mut self, text: &str) -> Result<(), ProtocolError> {
        let msg: ServerMsg = serde_json::from_str(text)?;
        self.handle(msg);
        Ok(())
    }

    pub fn handle(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::Welcome(welcome) => {
                debug!(player_id = %welcome.id, "Assigned connection id");
                self.remotes.remove(&welcome.id);
                self.local_id = Some(welcome.id);
            }
            ServerMsg::CurrentPlayers(roster) => {
                for view in roster.values() {
                    self.add_remote(view);
                }
            }
            ServerMsg::NewPlayer(view) => self.add_remote(&view),
            ServerMsg::PlayerDisconnected(id) => {
                if self.remotes.remove(&id).is_some() {
                    self.listener.remote_left(&id);
                }
            }
            ServerMsg::PlayerMoved(moved) => match self.remotes.get_mut(&moved.id) {
                Some(remote) => remote.set_target(moved.position(), moved.rotation),
                None => trace!(player_id = %moved.id, "Movement for unknown player"),
            },
            ServerMsg::PlayerShot(shot) => {
                if self.remotes.contains_key(&shot.id) {
                    self.listener.remote_shot(RemoteShot {
                        shooter: shot.id,
                        position: shot.position,
                        direction: shot.direction,
                    });
                }
            }
            ServerMsg::TakeDamage(damage) => self.listener.damaged(damage),
            ServerMsg::GameState(state) => {
                self.round = state.round;
                self.round_active = state.round_active;
                self.time_remaining = state.time_remaining;
                self.scores = state.scores;

                self.listener.round_update(RoundUpdate::GameState {
                    round: self.round,
                    active: self.round_active,
                    time_remaining: self.time_remaining,
                });
                self.listener.scores_changed(&self.scores);
            }
            ServerMsg::RoundCountdown(countdown) => {
                self.listener.round_update(RoundUpdate::Countdown {
                    countdown: countdown.countdown,
                    message: countdown.message,
                });
            }
            ServerMsg::RoundStart(start) => {
                self.round = start.round;
                self.round_active = true;
                self.time_remaining = start.duration;
                self.scores = start.scores;

                for (id, view) in &start.players {
                    if Some(id) == self.local_id.as_ref() {
                        self.listener.respawned(view.position());
                    } else if let Some(remote) = self.remotes.get_mut(id) {
                        remote.snap_to(view.position(), view.rotation);
                    }
                }

                self.listener.round_update(RoundUpdate::RoundStart {
                    round: start.round,
                    duration: start.duration,
                });
                self.listener.scores_changed(&self.scores);
            }
            ServerMsg::RoundTimer(timer) => {
                self.time_remaining = timer.time_remaining;
                self.listener.round_update(RoundUpdate::Timer {
                    time_remaining: timer.time_remaining,
                });
            }
            ServerMsg::RoundEnd(end) => {
                self.round_active = false;
                self.scores = end.scores;

                self.listener.round_update(RoundUpdate::RoundEnd {
                    round: end.round,
                    reason: end.reason,
                    winner: end.winner,
                });
                self.listener.scores_changed(&self.scores);
            }
            ServerMsg::PlayerKilled(kill) => {
                self.scores = kill.scores;

                let is_me = Some(&kill.victim) == self.local_id.as_ref();
                self.listener.player_killed(KillFeed {
                    killer: kill.killer,
                    victim: kill.victim,
                    is_me,
                });
                self.listener.scores_changed(&self.scores);
            }
            ServerMsg::Respawn(position) => self.listener.respawned(position),
        }
    }

    /// Per rendered frame: smooth remotes, then emit a movement update when
    /// the send cadence elapses.
    pub fn frame(&mut self, dt: f32, pose: LocalPose) -> Option<ClientMsg> {
        for remote in self.remotes.values_mut() {
            remote.advance(dt);
        }

        self.throttle.tick(dt).then(|| {
            ClientMsg::PlayerMovement(MovementUpdate {
                x: pose.position.x,
                y: pose.position.y,
                z: pose.position.z,
                rotation: pose.rotation,
            })
        })
    }

    pub fn shoot(&self, position: Vec3, direction: Vec3) -> ClientMsg {
        ClientMsg::Shoot(ShootRequest {
            position,
            direction,
        })
    }

    pub fn hit(&self, target_id: PlayerId, damage: i32) -> ClientMsg {
        ClientMsg::Hit(HitClaim { target_id, damage })
    }

    pub fn request_respawn(&self) -> ClientMsg {
        ClientMsg::RequestRespawn(RespawnRequest)
    }

    pub fn local_id(&self) -> Option<&PlayerId> {
        self.local_id.as_ref()
    }

    pub fn remote(&self, id: &PlayerId) -> Option<&RemotePlayer> {
        self.remotes.get(id)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.remotes.values()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn round_active(&self) -> bool {
        self.round_active
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    fn add_remote(&mut self, view: &PlayerView) {
        if Some(&view.id) == self.local_id.as_ref() || self.remotes.contains_key(&view.id) {
            return;
        }
        self.remotes.insert(view.id.clone(), RemotePlayer::new(view));
        self.listener.remote_joined(&view.id);
    }
}
