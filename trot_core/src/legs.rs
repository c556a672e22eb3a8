//! Leg geometry: which actuators form a leg and how its frame is mounted.
//!
//! A mirrored leg is mounted reflected relative to the canonical side. Rather
//! than branching on that everywhere, each leg carries a sign coefficient and
//! its own neutral pose, and every pose is one formula over those.

use std::fmt;

use trot_traits::ActuatorId;

/// Leg slots, in the order commands are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LegPosition {
    FrontLeft,
    FrontRight,
    BackRight,
    BackLeft,
}

impl LegPosition {
    pub const ALL: [Self; 4] = [
        Self::FrontLeft,
        Self::FrontRight,
        Self::BackRight,
        Self::BackLeft,
    ];

    /// Multiplier for the static forward lean: front-left leans with the
    /// configured sign, front-right against it, back legs not at all.
    pub fn lean_sign(self) -> f32 {
        match self {
            LegPosition::FrontLeft => 1.0,
            LegPosition::FrontRight => -1.0,
            LegPosition::BackRight | LegPosition::BackLeft => 0.0,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            LegPosition::FrontLeft => "FL",
            LegPosition::FrontRight => "FR",
            LegPosition::BackRight => "BR",
            LegPosition::BackLeft => "BL",
        }
    }
}

impl fmt::Display for LegPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Semantic (pre-calibration) hip and knee angles of one leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegPose {
    pub hip: f32,
    pub knee: f32,
}

impl LegPose {
    pub const fn new(hip: f32, knee: f32) -> Self {
        Self { hip, knee }
    }
}

/// What a leg does during a half-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegRole {
    Swing,
    Support,
}

/// Neutral poses for both mounting conventions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutralPoses {
    pub canonical: LegPose,
    pub mirrored: LegPose,
}

impl Default for NeutralPoses {
    fn default() -> Self {
        Self {
            canonical: LegPose::new(100.0, 160.0),
            mirrored: LegPose::new(140.0, 80.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegAssembly {
    pub position: LegPosition,
    pub hip: ActuatorId,
    pub knee: ActuatorId,
    pub mirrored: bool,
    pub neutral: LegPose,
}

impl LegAssembly {
    pub fn new(
        position: LegPosition,
        hip: impl Into<ActuatorId>,
        knee: impl Into<ActuatorId>,
        mirrored: bool,
        neutrals: &NeutralPoses,
    ) -> Self {
        Self {
            position,
            hip: hip.into(),
            knee: knee.into(),
            mirrored,
            neutral: if mirrored {
                neutrals.mirrored
            } else {
                neutrals.canonical
            },
        }
    }

    /// +1 on the canonical side, -1 when mirrored.
    #[inline]
    pub fn sign(&self) -> f32 {
        if self.mirrored { -1.0 } else { 1.0 }
    }

    pub fn joints(&self) -> [ActuatorId; 2] {
        [self.hip, self.knee]
    }
}

/// The four legs of the robot, indexed by position.
#[derive(Debug, Clone, PartialEq)]
pub struct LegSet {
    legs: [LegAssembly; 4],
}

impl LegSet {
    /// Legs may be given in any order; each position must appear exactly once.
    pub fn new(legs: [LegAssembly; 4]) -> Option<Self> {
        let mut ordered = legs;
        ordered.sort_by_key(|l| l.position);
        let complete = ordered
            .iter()
            .zip(LegPosition::ALL)
            .all(|(l, p)| l.position == p);
        complete.then_some(Self { legs: ordered })
    }

    /// Legs in command order (FL, FR, BR, BL).
    pub fn iter(&self) -> impl Iterator<Item = &LegAssembly> {
        self.legs.iter()
    }

    pub fn get(&self, position: LegPosition) -> &LegAssembly {
        // `new` guarantees slot i holds LegPosition::ALL[i].
        &self.legs[position as usize]
    }

    pub fn actuators(&self) -> impl Iterator<Item = ActuatorId> + '_ {
        self.legs.iter().flat_map(LegAssembly::joints)
    }
}

impl Default for LegSet {
    /// FL(1,2) FR(3,4) BR(5,6) BL(7,8); the left legs are mirrored.
    fn default() -> Self {
        let n = NeutralPoses::default();
        Self {
            legs: [
                LegAssembly::new(LegPosition::FrontLeft, 1, 2, true, &n),
                LegAssembly::new(LegPosition::FrontRight, 3, 4, false, &n),
                LegAssembly::new(LegPosition::BackRight, 5, 6, false, &n),
                LegAssembly::new(LegPosition::BackLeft, 7, 8, true, &n),
            ],
        }
    }
}
