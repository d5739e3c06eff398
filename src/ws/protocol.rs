//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON envelope `{"event": "<name>", "data": <payload>}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::game::Scoreboard;

/// Opaque per-connection player identity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Fresh id for a newly accepted connection
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// World-space coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Local player pose, sent at the client's throttled cadence
    PlayerMovement(MovementUpdate),

    /// Weapon fired; relayed so peers can simulate the projectile
    Shoot(ShootRequest),

    /// Shooter-reported damage against a target
    Hit(HitClaim),

    /// Ask for a fresh spawn between rounds
    RequestRespawn(RespawnRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementUpdate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in radians
    pub rotation: f32,
}

impl MovementUpdate {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShootRequest {
    pub position: Vec3,
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitClaim {
    pub target_id: PlayerId,
    pub damage: i32,
}

/// Empty payload of `requestRespawn`.
///
/// Accepts a missing `data` field, `null` or `{}`; always written as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RespawnRequest;

impl Serialize for RespawnRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

impl<'de> Deserialize<'de> for RespawnRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EmptyVisitor;

        impl<'de> Visitor<'de> for EmptyVisitor {
            type Value = RespawnRequest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an empty object or null")
            }

            fn visit_none<E: de::Error>(self) -> Result<RespawnRequest, E> {
                Ok(RespawnRequest)
            }

            fn visit_unit<E: de::Error>(self) -> Result<RespawnRequest, E> {
                Ok(RespawnRequest)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<RespawnRequest, D::Error> {
                d.deserialize_any(self)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RespawnRequest, A::Error> {
                while access
                    .next_entry::<de::IgnoredAny, de::IgnoredAny>()?
                    .is_some()
                {}
                Ok(RespawnRequest)
            }
        }

        deserializer.deserialize_option(EmptyVisitor)
    }
}

impl ClientMsg {
    /// Parse and validate one inbound text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let msg: ClientMsg = serde_json::from_str(text)?;
        msg.validate()?;
        Ok(msg)
    }

    /// Reject payloads that are well-formed JSON but out of range.
    ///
    /// Only shape is checked here. Hit claims are trusted: range, line of
    /// sight and fire rate are never verified.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMsg::PlayerMovement(update) => {
                if !update.position().is_finite() {
                    return Err(ProtocolError::NonFinite("position"));
                }
                if !update.rotation.is_finite() {
                    return Err(ProtocolError::NonFinite("rotation"));
                }
            }
            ClientMsg::Shoot(shot) => {
                if !shot.position.is_finite() {
                    return Err(ProtocolError::NonFinite("position"));
                }
                if !shot.direction.is_finite() {
                    return Err(ProtocolError::NonFinite("direction"));
                }
            }
            ClientMsg::Hit(claim) => {
                if claim.target_id.as_str().is_empty() {
                    return Err(ProtocolError::EmptyTarget);
                }
                if claim.damage < 0 {
                    return Err(ProtocolError::NegativeDamage(claim.damage));
                }
            }
            ClientMsg::RequestRespawn(_) => {}
        }
        Ok(())
    }

    /// Short event name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::PlayerMovement(_) => "playerMovement",
            ClientMsg::Shoot(_) => "shoot",
            ClientMsg::Hit(_) => "hit",
            ClientMsg::RequestRespawn(_) => "requestRespawn",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// First message on a new connection
    Welcome(Welcome),

    /// Full roster snapshot for a newly joined player
    CurrentPlayers(Roster),

    /// Another player joined
    NewPlayer(PlayerView),

    /// A player left
    PlayerDisconnected(PlayerId),

    /// Pose update from another player
    PlayerMoved(PlayerMoved),

    /// Another player fired
    PlayerShot(PlayerShot),

    /// Damage applied to the receiving player
    TakeDamage(i32),

    /// Round snapshot for a newly joined player
    GameState(GameStateView),

    /// Countdown announcement or tick
    RoundCountdown(RoundCountdown),

    /// Round went live; every player has been respawned
    RoundStart(RoundStart),

    /// Remaining round time, once per second
    RoundTimer(RoundTimer),

    /// Round finished
    RoundEnd(RoundEnd),

    /// Kill feed entry with updated scores
    PlayerKilled(PlayerKilled),

    /// New spawn position for the receiving player
    Respawn(Vec3),
}

/// Player roster keyed by id
pub type Roster = BTreeMap<PlayerId, PlayerView>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    pub id: PlayerId,
}

/// Public view of one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in radians
    pub rotation: f32,
    pub health: i32,
    pub alive: bool,
}

impl PlayerView {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
}

impl PlayerMoved {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerShot {
    pub id: PlayerId,
    pub position: Vec3,
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub round: u32,
    pub round_active: bool,
    pub time_remaining: u32,
    pub scores: Scoreboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundCountdown {
    pub countdown: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStart {
    pub round: u32,
    /// Round length in seconds
    pub duration: u32,
    pub players: Roster,
    pub scores: Scoreboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTimer {
    pub time_remaining: u32,
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Round clock reached zero
    Timeout,
    /// Exactly one player left alive
    Elimination,
    /// Nobody left alive
    Draw,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndReason::Timeout => "timeout",
            EndReason::Elimination => "elimination",
            EndReason::Draw => "draw",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEnd {
    pub round: u32,
    pub reason: EndReason,
    pub winner: Option<PlayerId>,
    pub scores: Scoreboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerKilled {
    pub killer: PlayerId,
    pub victim: PlayerId,
    pub scores: Scoreboard,
}

/// Inbound protocol errors; the offending frame is dropped
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Non-finite {0}")]
    NonFinite(&'static str),

    #[error("Hit claim without target")]
    EmptyTarget,

    #[error("Negative damage: {0}")]
    NegativeDamage(i32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn movement_frame_uses_event_envelope() {
        let msg = ClientMsg::parse(
            r#"{"event":"playerMovement","data":{"x":1.0,"y":2.0,"z":3.0,"rotation":0.5}}"#,
        )
        .unwrap();

        assert_eq!(
            msg,
            ClientMsg::PlayerMovement(MovementUpdate {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                rotation: 0.5
            })
        );
    }

    #[test]
    fn hit_claim_reads_camel_case_target() {
        let msg = ClientMsg::parse(r#"{"event":"hit","data":{"targetId":"abc","damage":120}}"#)
            .unwrap();

        assert_eq!(
            msg,
            ClientMsg::Hit(HitClaim {
                target_id: PlayerId::from("abc"),
                damage: 120
            })
        );
    }

    #[test]
    fn respawn_request_payload_is_optional() {
        let expected = ClientMsg::RequestRespawn(RespawnRequest);
        for text in [
            r#"{"event":"requestRespawn"}"#,
            r#"{"event":"requestRespawn","data":null}"#,
            r#"{"event":"requestRespawn","data":{}}"#,
        ] {
            assert_eq!(ClientMsg::parse(text).unwrap(), expected, "{text}");
        }
        assert_eq!(
            serde_json::to_value(&expected).unwrap(),
            json!({"event": "requestRespawn", "data": {}})
        );
    }

    #[test]
    fn rejects_unknown_events_and_bad_payloads() {
        assert!(matches!(
            ClientMsg::parse(r#"{"event":"teleport","data":{}}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientMsg::parse(r#"{"event":"hit","data":{"targetId":"abc","damage":-5}}"#),
            Err(ProtocolError::NegativeDamage(-5))
        ));
        assert!(matches!(
            ClientMsg::parse(r#"{"event":"hit","data":{"targetId":"","damage":5}}"#),
            Err(ProtocolError::EmptyTarget)
        ));
        assert!(matches!(
            ClientMsg::parse(r#"{"event":"playerMovement","data":{"x":1.0,"y":2.0}}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_finite_movement() {
        let msg = ClientMsg::PlayerMovement(MovementUpdate {
            x: f32::NAN,
            y: 0.0,
            z: 0.0,
            rotation: 0.0,
        });
        assert!(matches!(msg.validate(), Err(ProtocolError::NonFinite("position"))));
    }

    #[test]
    fn round_end_serializes_reason_and_null_winner() {
        let msg = ServerMsg::RoundEnd(RoundEnd {
            round: 3,
            reason: EndReason::Draw,
            winner: None,
            scores: Scoreboard::default(),
        });

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "event": "roundEnd",
                "data": {"round": 3, "reason": "draw", "winner": null, "scores": {}}
            })
        );
    }

    #[test]
    fn take_damage_carries_bare_amount() {
        let value = serde_json::to_value(ServerMsg::TakeDamage(20)).unwrap();
        assert_eq!(value, json!({"event": "takeDamage", "data": 20}));
    }

    #[test]
    fn game_state_uses_camel_case_fields() {
        let msg = ServerMsg::GameState(GameStateView {
            round: 1,
            round_active: true,
            time_remaining: 90,
            scores: Scoreboard::default(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["data"]["roundActive"], json!(true));
        assert_eq!(value["data"]["timeRemaining"], json!(90));
    }
}
