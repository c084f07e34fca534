//! Projectiles in flight between the two wizards.

use serde::{Deserialize, Serialize};

use crate::components::{NodeId, Side};
use crate::data::spell::SpellId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// What a projectile hits on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileTarget {
    /// One defender node.
    Node(NodeId),
    /// Every defender node within the spell radius of a point.
    Area(Vec2Fixed),
}

/// A spell travelling in a straight line at constant speed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Casting side.
    pub owner: Side,
    /// Spell carried.
    pub spell: SpellId,
    /// Identifies the cast this projectile belongs to.
    pub cast_id: u32,
    /// Current position.
    pub position: Vec2Fixed,
    /// Arrival point.
    pub target_point: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
    /// Pixels per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Distance from launch to arrival.
    #[serde(with = "fixed_serde")]
    pub total_distance: Fixed,
    /// Distance covered so far.
    #[serde(with = "fixed_serde")]
    pub traveled: Fixed,
    /// Hit target.
    pub target: ProjectileTarget,
    /// Set once the projectile reaches its target point.
    pub arrived: bool,
}

impl Projectile {
    /// Launch from `start` toward `target_point`.
    #[must_use]
    pub fn new(
        owner: Side,
        spell: SpellId,
        cast_id: u32,
        start: Vec2Fixed,
        target_point: Vec2Fixed,
        speed: Fixed,
        target: ProjectileTarget,
    ) -> Self {
        Self {
            owner,
            spell,
            cast_id,
            position: start,
            target_point,
            direction: (target_point - start).normalize(),
            speed,
            total_distance: start.distance(target_point),
            traveled: Fixed::ZERO,
            target,
            arrived: false,
        }
    }

    /// Move along the line; snaps to the target point on arrival.
    pub fn update(&mut self, dt: Fixed) {
        if self.arrived {
            return;
        }
        let step = self.speed * dt;
        self.position = self.position + self.direction.scale(step);
        self.traveled += step;
        if self.traveled >= self.total_distance {
            self.position = self.target_point;
            self.arrived = true;
        }
    }

    /// Seconds until arrival at the current speed.
    #[must_use]
    pub fn time_to_arrival(&self) -> Fixed {
        if self.arrived || self.speed <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        (self.total_distance - self.traveled).max(Fixed::ZERO) / self.speed
    }
}
