//! Replication relay - movement, shots, hit claims and respawn requests

use tracing::debug;

use crate::ws::protocol::{
    HitClaim, MovementUpdate, PlayerId, PlayerKilled, PlayerMoved, PlayerShot, ServerMsg,
    ShootRequest,
};

use super::effects::Effects;
use super::registry::PlayerRegistry;
use super::round::RoundStateMachine;

/// Relay for client-reported state.
///
/// Clients are trusted: shots are forwarded without checks and hit claims are
/// applied as reported.
pub struct ReplicationRelay;

impl ReplicationRelay {
    /// Store the pose and forward it to everyone but the sender
    pub fn on_movement(
        registry: &mut PlayerRegistry,
        sender: &PlayerId,
        update: MovementUpdate,
        fx: &mut Effects,
    ) {
        let Some(player) = registry.apply_movement(sender, update.position(), update.rotation) else {
            return;
        };

        fx.broadcast_except(
            sender,
            ServerMsg::PlayerMoved(PlayerMoved {
                id: player.id.clone(),
                x: player.position.x,
                y: player.position.y,
                z: player.position.z,
                rotation: player.rotation,
            }),
        );
    }

    /// Forward a shot so peers can simulate the projectile
    pub fn on_shoot(sender: &PlayerId, shot: ShootRequest, fx: &mut Effects) {
        fx.broadcast_except(
            sender,
            ServerMsg::PlayerShot(PlayerShot {
                id: sender.clone(),
                position: shot.position,
                direction: shot.direction,
            }),
        );
    }

    /// Apply a shooter-reported hit; credit the kill and re-check the round on death
    pub fn on_hit_claim(
        registry: &mut PlayerRegistry,
        round: &mut RoundStateMachine,
        shooter: &PlayerId,
        claim: HitClaim,
        fx: &mut Effects,
    ) {
        let HitClaim { target_id, damage } = claim;
        let Some(result) = registry.apply_damage(&target_id, damage) else {
            debug!(shooter = %shooter, target = %target_id, "Hit claim for unknown target");
            return;
        };

        fx.send_to(&target_id, ServerMsg::TakeDamage(damage));

        if !result.died {
            return;
        }

        let credited = registry.award_point(shooter);
        debug!(killer = %shooter, victim = %target_id, credited, "Player killed");

        fx.broadcast(ServerMsg::PlayerKilled(PlayerKilled {
            killer: shooter.clone(),
            victim: target_id,
            scores: registry.scores().clone(),
        }));

        round.check_alive(registry, credited.then_some(shooter), fx);
    }

    /// Respawn between rounds; ignored while a round is active
    pub fn on_respawn_request(
        registry: &mut PlayerRegistry,
        round: &RoundStateMachine,
        sender: &PlayerId,
        fx: &mut Effects,
    ) {
        if round.is_active() {
            debug!(player_id = %sender, "Respawn request during active round ignored");
            return;
        }

        if let Some(player) = registry.respawn(sender) {
            fx.send_to(sender, ServerMsg::Respawn(player.position));
        }
    }
}
