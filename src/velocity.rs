// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Maps a hit position on a pad to a velocity using concentric zones.

use std::fmt;

use midly::num::u7;

/// Hits closer to the center than this (normalized) radius use the center tier.
pub const CENTER_RADIUS: f32 = 0.3;

/// Hits closer to the center than this (normalized) radius use the mid tier.
pub const MID_RADIUS: f32 = 0.7;

/// The zone of a pad that a hit landed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Center,
    Mid,
    Edge,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Center => write!(f, "center"),
            Zone::Mid => write!(f, "mid"),
            Zone::Edge => write!(f, "edge"),
        }
    }
}

/// The three configured velocities of a pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tiers {
    pub center: u7,
    pub mid: u7,
    pub edge: u7,
}

impl Tiers {
    /// Creates a new set of velocity tiers.
    pub fn new(center: u7, mid: u7, edge: u7) -> Tiers {
        Tiers { center, mid, edge }
    }

    /// Gets the velocity configured for the given zone.
    pub fn velocity(&self, zone: Zone) -> u7 {
        match zone {
            Zone::Center => self.center,
            Zone::Mid => self.mid,
            Zone::Edge => self.edge,
        }
    }
}

impl Default for Tiers {
    fn default() -> Self {
        Tiers {
            center: u7::from(127),
            mid: u7::from(80),
            edge: u7::from(40),
        }
    }
}

/// A hit relative to the center of a pad, along with the pad's half extents.
/// Units are arbitrary as long as they agree with each other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitPoint {
    pub dx: f32,
    pub dy: f32,
    pub half_width: f32,
    pub half_height: f32,
}

impl HitPoint {
    /// Creates a hit point from an offset and the pad's half extents.
    pub fn new(dx: f32, dy: f32, half_width: f32, half_height: f32) -> HitPoint {
        HitPoint {
            dx,
            dy,
            half_width,
            half_height,
        }
    }

    /// Creates a hit point from already normalized coordinates in [-1, 1].
    pub fn normalized(x: f32, y: f32) -> HitPoint {
        HitPoint::new(x, y, 1.0, 1.0)
    }

    /// Creates a hit point from a click position measured from the pad's top
    /// left corner and the pad's size in pixels.
    pub fn from_pixels(x: f32, y: f32, width: f32, height: f32) -> HitPoint {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        HitPoint::new(x - half_width, y - half_height, half_width, half_height)
    }

    /// The normalized distance from the pad's center. Returns None if the pad
    /// has no extent to normalize against.
    pub fn distance(&self) -> Option<f32> {
        if self.half_width == 0.0 || self.half_height == 0.0 {
            return None;
        }

        let nx = self.dx / self.half_width;
        let ny = self.dy / self.half_height;
        Some((nx * nx + ny * ny).sqrt())
    }
}

/// Classifies a hit into a zone. Activations without a position (keyboard,
/// external controls) land in the mid zone, and degenerate pads count as edge.
pub fn zone(hit: Option<&HitPoint>) -> Zone {
    let hit = match hit {
        Some(hit) => hit,
        None => return Zone::Mid,
    };

    match hit.distance() {
        Some(distance) if distance < CENTER_RADIUS => Zone::Center,
        Some(distance) if distance < MID_RADIUS => Zone::Mid,
        // NaN distances fall through to here as well.
        _ => Zone::Edge,
    }
}

/// Computes the velocity for a hit along with the zone it was classified into.
pub fn compute_velocity(hit: Option<&HitPoint>, tiers: &Tiers) -> (u7, Zone) {
    let zone = zone(hit);
    (tiers.velocity(zone), zone)
}
