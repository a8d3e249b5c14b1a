//! Plain-data entity record used for tiles, decorations, obstacles, and coins.

use runway_core::{PoolTag, Transform, Vec2};
use serde::{Deserialize, Serialize};

use crate::{Poolable, Template};

/// Colour multiplier applied to an entity by the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tint {
    red: u8,
    green: u8,
    blue: u8,
    alpha: u8,
}

impl Tint {
    /// Neutral tint that leaves the sprite unchanged.
    pub const WHITE: Self = Self::from_rgba(0xff, 0xff, 0xff, 0xff);

    /// Creates a tint from byte RGBA components.
    #[must_use]
    pub const fn from_rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Red component of the tint.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the tint.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the tint.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }

    /// Alpha component of the tint.
    #[must_use]
    pub const fn alpha(&self) -> u8 {
        self.alpha
    }
}

/// Pooled scene record: placement plus the transient state cleared on reuse.
#[derive(Clone, Debug, PartialEq)]
pub struct Prop {
    transform: Transform,
    velocity: Vec2,
    tint: Tint,
    extent: Option<f32>,
    observers: Vec<u64>,
    resets: u32,
}

impl Prop {
    /// Creates an inactive prop whose forward size is `extent`, if known.
    #[must_use]
    pub fn new(extent: Option<f32>) -> Self {
        Self {
            transform: Transform::IDENTITY,
            velocity: Vec2::ZERO,
            tint: Tint::WHITE,
            extent,
            observers: Vec::new(),
            resets: 0,
        }
    }

    /// Velocity applied by the host while the prop is active.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Sets the velocity.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Current tint.
    #[must_use]
    pub const fn tint(&self) -> Tint {
        self.tint
    }

    /// Sets the tint, e.g. for a hit flash.
    pub fn set_tint(&mut self, tint: Tint) {
        self.tint = tint;
    }

    /// Registers an observer notified by the host about this prop.
    pub fn attach_observer(&mut self, observer: u64) {
        self.observers.push(observer);
    }

    /// Observers attached since the last reset.
    #[must_use]
    pub fn observers(&self) -> &[u64] {
        &self.observers
    }

    /// Number of times the reset hook ran.
    #[must_use]
    pub const fn resets(&self) -> u32 {
        self.resets
    }
}

impl Poolable for Prop {
    fn reset(&mut self) {
        self.transform.scale = 1.0;
        self.velocity = Vec2::ZERO;
        self.tint = Tint::WHITE;
        self.observers.clear();
        self.resets += 1;
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn extent(&self) -> Option<f32> {
        self.extent
    }
}

/// Template producing [`Prop`] records with a fixed forward extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropTemplate {
    /// Forward size of instantiated props; `None` when unmeasurable.
    #[serde(default)]
    pub extent: Option<f32>,
}

impl PropTemplate {
    /// Creates a template for props of the provided extent.
    #[must_use]
    pub const fn new(extent: Option<f32>) -> Self {
        Self { extent }
    }
}

impl Template<Prop> for PropTemplate {
    fn instantiate(&self, _tag: &PoolTag) -> Prop {
        Prop::new(self.extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_transient_state_but_keeps_placement() {
        let mut prop = Prop::new(Some(2.0));
        prop.transform_mut().position = Vec2::new(1.5, 12.0);
        prop.transform_mut().rotation_degrees = 10.0;
        prop.transform_mut().scale = 0.2;
        prop.set_velocity(Vec2::new(0.0, 3.0));
        prop.set_tint(Tint::from_rgba(0xff, 0, 0, 0xff));
        prop.attach_observer(7);

        prop.reset();

        assert_eq!(prop.transform().position, Vec2::new(1.5, 12.0));
        assert!((prop.transform().rotation_degrees - 10.0).abs() < f32::EPSILON);
        assert!((prop.transform().scale - 1.0).abs() < f32::EPSILON);
        assert_eq!(prop.velocity(), Vec2::ZERO);
        assert_eq!(prop.tint(), Tint::WHITE);
        assert!(prop.observers().is_empty());
        assert_eq!(prop.resets(), 1);
    }
}
