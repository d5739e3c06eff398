//! Connected players and their last known state

use std::collections::HashMap;

use crate::ws::protocol::{PlayerId, PlayerView, Roster, Vec3};

use super::scoreboard::Scoreboard;
use super::spawn::SpawnAllocator;

/// Health every spawn starts with
pub const MAX_HEALTH: i32 = 100;

/// Player state (authoritative copy of what clients report)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub position: Vec3,
    /// Yaw in radians
    pub rotation: f32,
    /// Can drop below zero; only the death check reads it
    pub health: i32,
    pub alive: bool,
}

impl Player {
    fn spawned_at(id: PlayerId, position: Vec3) -> Self {
        Self {
            id,
            position,
            rotation: 0.0,
            health: MAX_HEALTH,
            alive: true,
        }
    }

    fn reset_at(&mut self, position: Vec3) {
        self.position = position;
        self.health = MAX_HEALTH;
        self.alive = true;
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            rotation: self.rotation,
            health: self.health,
            alive: self.alive,
        }
    }
}

/// Outcome of [`PlayerRegistry::apply_damage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageResult {
    /// True only on the alive -> dead transition
    pub died: bool,
    pub health: i32,
}

/// Owns every player and the scoreboard
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    scores: Scoreboard,
    spawns: SpawnAllocator,
}

impl PlayerRegistry {
    pub fn new(spawns: SpawnAllocator) -> Self {
        Self {
            players: HashMap::new(),
            scores: Scoreboard::new(),
            spawns,
        }
    }

    /// Add a player at a fresh spawn with full health.
    ///
    /// Ids are per connection, so an existing entry is simply replaced.
    pub fn register(&mut self, id: PlayerId) -> &Player {
        let spawn = self.spawns.next_spawn();
        self.scores.ensure(&id);
        self.players
            .entry(id.clone())
            .and_modify(|p| *p = Player::spawned_at(id.clone(), spawn))
            .or_insert_with(|| Player::spawned_at(id, spawn))
    }

    /// Remove the player and their score
    pub fn deregister(&mut self, id: &PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        self.scores.remove(id);
        Some(player)
    }

    /// Overwrite pose; unknown ids are ignored
    pub fn apply_movement(&mut self, id: &PlayerId, position: Vec3, rotation: f32) -> Option<&Player> {
        let player = self.players.get_mut(id)?;
        player.position = position;
        player.rotation = rotation;
        Some(player)
    }

    /// Subtract damage and report the death transition at most once per spawn
    pub fn apply_damage(&mut self, id: &PlayerId, amount: i32) -> Option<DamageResult> {
        let player = self.players.get_mut(id)?;
        player.health = player.health.saturating_sub(amount);

        let died = player.alive && player.health <= 0;
        if died {
            player.alive = false;
        }

        Some(DamageResult {
            died,
            health: player.health,
        })
    }

    /// Full health at a new random spawn
    pub fn respawn(&mut self, id: &PlayerId) -> Option<&Player> {
        let spawn = self.spawns.next_spawn();
        let player = self.players.get_mut(id)?;
        player.reset_at(spawn);
        Some(player)
    }

    /// Respawn everyone in join order, each at an independently drawn spawn
    pub fn respawn_all(&mut self) {
        let order: Vec<PlayerId> = self.scores.iter().map(|(id, _)| id.clone()).collect();
        for id in order {
            if let Some(player) = self.players.get_mut(&id) {
                player.reset_at(self.spawns.next_spawn());
            }
        }
    }

    pub fn award_point(&mut self, id: &PlayerId) -> bool {
        self.scores.increment(id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.keys()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    pub fn roster(&self) -> Roster {
        self.players
            .iter()
            .map(|(id, p)| (id.clone(), p.view()))
            .collect()
    }

    pub fn spawn_pool(&self) -> &[Vec3] {
        self.spawns.pool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::spawn::SPAWN_POINTS;

    fn registry() -> PlayerRegistry {
        PlayerRegistry::new(SpawnAllocator::arena(1))
    }

    fn id(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    #[test]
    fn register_creates_full_health_player_at_spawn() {
        let mut reg = registry();
        let player = reg.register(id("a")).clone();

        assert_eq!(player.health, MAX_HEALTH);
        assert!(player.alive);
        assert!(SPAWN_POINTS.contains(&player.position));
        assert_eq!(reg.scores().get(&id("a")), Some(0));
    }

    #[test]
    fn deregister_drops_score() {
        let mut reg = registry();
        reg.register(id("a"));
        reg.award_point(&id("a"));

        assert!(reg.deregister(&id("a")).is_some());
        assert_eq!(reg.scores().get(&id("a")), None);
        assert!(reg.deregister(&id("a")).is_none());
    }

    #[test]
    fn movement_for_unknown_player_is_noop() {
        let mut reg = registry();
        assert!(reg.apply_movement(&id("ghost"), Vec3::default(), 1.0).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn movement_overwrites_pose() {
        let mut reg = registry();
        reg.register(id("a"));
        reg.apply_movement(&id("a"), Vec3::new(3.0, 1.0, -2.0), 1.5);

        let player = reg.get(&id("a")).unwrap();
        assert_eq!(player.position, Vec3::new(3.0, 1.0, -2.0));
        assert_eq!(player.rotation, 1.5);
    }

    #[test]
    fn death_is_reported_once() {
        let mut reg = registry();
        reg.register(id("b"));

        let first = reg.apply_damage(&id("b"), 120).unwrap();
        assert!(first.died);
        assert_eq!(first.health, -20);

        let second = reg.apply_damage(&id("b"), 10).unwrap();
        assert!(!second.died);
        assert_eq!(second.health, -30);
        assert!(!reg.get(&id("b")).unwrap().alive);
    }

    #[test]
    fn chip_damage_kills_on_crossing_zero() {
        let mut reg = registry();
        reg.register(id("b"));

        assert!(!reg.apply_damage(&id("b"), 60).unwrap().died);
        assert!(reg.apply_damage(&id("b"), 40).unwrap().died);
        assert_eq!(reg.alive_count(), 0);
    }

    #[test]
    fn damage_to_unknown_player_is_noop() {
        let mut reg = registry();
        assert!(reg.apply_damage(&id("ghost"), 50).is_none());
    }

    #[test]
    fn respawn_restores_dead_player() {
        let mut reg = registry();
        reg.register(id("a"));
        reg.apply_damage(&id("a"), 500);

        let player = reg.respawn(&id("a")).unwrap().clone();
        assert_eq!(player.health, MAX_HEALTH);
        assert!(player.alive);
        assert!(SPAWN_POINTS.contains(&player.position));

        assert!(reg.apply_damage(&id("a"), 100).unwrap().died);
    }

    #[test]
    fn respawn_all_resets_everyone() {
        let mut reg = registry();
        for name in ["a", "b", "c"] {
            reg.register(id(name));
            reg.apply_damage(&id(name), 100);
        }
        assert_eq!(reg.alive_count(), 0);

        reg.respawn_all();
        assert_eq!(reg.alive_count(), 3);
        for view in reg.roster().values() {
            assert_eq!(view.health, MAX_HEALTH);
            assert!(reg.spawn_pool().contains(&view.position()));
        }
    }

    #[test]
    fn same_seed_gives_same_spawn_assignments() {
        let names = ["e", "c", "a", "d", "b", "f"];
        let run = || {
            let mut reg = registry();
            for name in names {
                reg.register(id(name));
            }
            reg.respawn_all();
            reg.respawn_all();
            reg.roster()
        };

        let first = run();
        for _ in 0..8 {
            assert_eq!(run(), first);
        }
    }
}
