//! Flat ocean surface.

use floatsand_logic::environment::OceanSurface;
use floatsand_logic::vec2::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ocean {
    /// World y of the surface (m)
    pub sea_level: f32,
}

impl Ocean {
    pub fn new(sea_level: f32) -> Self {
        Self { sea_level }
    }

    /// Waterness of a point: depth below the surface, clamped to [0, 1].
    pub fn waterness_at(&self, position: Vec2) -> f32 {
        self.depth(position).clamp(0.0, 1.0)
    }
}

impl OceanSurface for Ocean {
    fn depth(&self, position: Vec2) -> f32 {
        self.sea_level - position.y
    }
}
