//! Diagonal trot as a fixed-order state machine.
//!
//! Neutral -> A.Push -> A.Lift -> A.Swing -> A.Down -> B.Push -> ... -> B.Down -> A.Push
//!
//! Half-cycle A swings the front-left/back-right diagonal while the other
//! diagonal supports; half-cycle B is the complement. Every non-neutral state
//! issues one pose per leg (FL, FR, BR, BL) and then waits one quarter of the
//! step period.

use std::fmt;
use std::time::Duration;

use trot_traits::{Actuator, Clock};

use crate::config::{GaitTiming, PoseParams};
use crate::error::TrotError;
use crate::legs::{LegAssembly, LegPose, LegPosition, LegRole, LegSet};
use crate::pose::PoseMapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitPhase {
    Push,
    Lift,
    Swing,
    Down,
}

impl GaitPhase {
    pub const ALL: [Self; 4] = [Self::Push, Self::Lift, Self::Swing, Self::Down];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfCycle {
    A,
    B,
}

impl HalfCycle {
    pub fn role(self, leg: LegPosition) -> LegRole {
        let first_diagonal = matches!(leg, LegPosition::FrontLeft | LegPosition::BackRight);
        match (self, first_diagonal) {
            (HalfCycle::A, true) | (HalfCycle::B, false) => LegRole::Swing,
            _ => LegRole::Support,
        }
    }

    pub fn swing_set(self) -> Vec<LegPosition> {
        self.with_role(LegRole::Swing)
    }

    pub fn support_set(self) -> Vec<LegPosition> {
        self.with_role(LegRole::Support)
    }

    fn with_role(self, role: LegRole) -> Vec<LegPosition> {
        LegPosition::ALL
            .into_iter()
            .filter(|p| self.role(*p) == role)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GaitState {
    #[default]
    Neutral,
    APush,
    ALift,
    ASwing,
    ADown,
    BPush,
    BLift,
    BSwing,
    BDown,
}

impl GaitState {
    /// Successor in the trot. Neutral only ever leads into A.Push; B.Down
    /// wraps around to A.Push.
    pub fn next(self) -> Self {
        use GaitState::*;
        match self {
            Neutral => APush,
            APush => ALift,
            ALift => ASwing,
            ASwing => ADown,
            ADown => BPush,
            BPush => BLift,
            BLift => BSwing,
            BSwing => BDown,
            BDown => APush,
        }
    }

    pub fn half_cycle(self) -> Option<HalfCycle> {
        use GaitState::*;
        match self {
            Neutral => None,
            APush | ALift | ASwing | ADown => Some(HalfCycle::A),
            BPush | BLift | BSwing | BDown => Some(HalfCycle::B),
        }
    }

    pub fn phase(self) -> Option<GaitPhase> {
        use GaitState::*;
        match self {
            Neutral => None,
            APush | BPush => Some(GaitPhase::Push),
            ALift | BLift => Some(GaitPhase::Lift),
            ASwing | BSwing => Some(GaitPhase::Swing),
            ADown | BDown => Some(GaitPhase::Down),
        }
    }
}

impl fmt::Display for GaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.half_cycle(), self.phase()) {
            (Some(h), Some(p)) => write!(f, "{h:?}.{p:?}"),
            _ => f.write_str("Neutral"),
        }
    }
}

/// Ground-contact pose: neutral hip, knee pressed down.
pub fn ground_pose(leg: &LegAssembly, params: &PoseParams) -> LegPose {
    let n = leg.neutral;
    LegPose::new(
        n.hip + lean(leg, params),
        n.knee + params.knee_down,
    )
}

/// Pose of `leg` for a given role and phase.
pub fn leg_pose(leg: &LegAssembly, role: LegRole, phase: GaitPhase, params: &PoseParams) -> LegPose {
    let n = leg.neutral;
    let s = leg.sign();
    let swing = params.hip_swing;
    let support = params.hip_swing * params.support_fraction;
    let ground = n.knee + params.knee_down;
    let lifted = n.knee - params.knee_lift;

    let (hip, knee) = match (role, phase) {
        (LegRole::Swing, GaitPhase::Push) => (n.hip - s * swing, ground),
        (LegRole::Swing, GaitPhase::Lift) => (n.hip - s * swing, lifted),
        (LegRole::Swing, GaitPhase::Swing) => (n.hip + s * swing, lifted),
        (LegRole::Swing, GaitPhase::Down) => (n.hip + s * swing, ground),
        (LegRole::Support, GaitPhase::Push | GaitPhase::Lift) => (n.hip - s * support, ground),
        (LegRole::Support, GaitPhase::Swing) => (n.hip + s * support, ground),
        (LegRole::Support, GaitPhase::Down) => (n.hip, ground),
    };
    LegPose::new(hip + lean(leg, params), knee)
}

#[inline]
fn lean(leg: &LegAssembly, params: &PoseParams) -> f32 {
    params.forward_lean * leg.position.lean_sign()
}

/// Drives the legs through the trot, one state per `advance`.
#[derive(Debug, Clone)]
pub struct GaitSequencer {
    legs: LegSet,
    params: PoseParams,
    timing: GaitTiming,
    state: GaitState,
    advanced: u64,
}

impl GaitSequencer {
    pub fn new(legs: LegSet, params: PoseParams, timing: GaitTiming) -> Self {
        Self {
            legs,
            params,
            timing,
            state: GaitState::Neutral,
            advanced: 0,
        }
    }

    pub fn state(&self) -> GaitState {
        self.state
    }

    /// Non-neutral states entered since construction.
    pub fn states_advanced(&self) -> u64 {
        self.advanced
    }

    pub fn legs(&self) -> &LegSet {
        &self.legs
    }

    pub fn params(&self) -> &PoseParams {
        &self.params
    }

    pub fn timing(&self) -> &GaitTiming {
        &self.timing
    }

    /// Semantic pose of every leg for `state`, in command order.
    pub fn poses(&self, state: GaitState) -> Vec<(LegPosition, LegPose)> {
        self.legs
            .iter()
            .map(|leg| {
                let pose = match (state.half_cycle(), state.phase()) {
                    (Some(h), Some(p)) => leg_pose(leg, h.role(leg.position), p, &self.params),
                    _ => ground_pose(leg, &self.params),
                };
                (leg.position, pose)
            })
            .collect()
    }

    /// Every leg to its ground pose, then let the frame settle.
    pub fn stand(
        &mut self,
        bus: &mut dyn Actuator,
        mapper: &mut PoseMapper,
        clock: &dyn Clock,
    ) -> Result<(), TrotError> {
        tracing::info!(settle_ms = self.timing.settle.as_millis() as u64, "stand");
        self.issue(bus, mapper, GaitState::Neutral, self.timing.move_duration())?;
        self.state = GaitState::Neutral;
        clock.sleep(self.timing.settle);
        Ok(())
    }

    /// Enter the next state: command all four legs, then wait one phase.
    ///
    /// Move timeouts are tolerated; other errors abort before the wait.
    pub fn advance(
        &mut self,
        bus: &mut dyn Actuator,
        mapper: &mut PoseMapper,
        clock: &dyn Clock,
    ) -> Result<GaitState, TrotError> {
        let next = self.state.next();
        tracing::debug!(state = %next, "gait state");
        self.issue(bus, mapper, next, self.timing.move_duration())?;
        self.state = next;
        self.advanced += 1;
        clock.sleep(self.timing.phase());
        Ok(next)
    }

    /// Ground pose on every leg with a custom move duration. Every joint is
    /// attempted; the number of joints that failed is returned. No wait.
    pub fn park(
        &mut self,
        bus: &mut dyn Actuator,
        mapper: &mut PoseMapper,
        duration: Duration,
    ) -> usize {
        let mut failures = 0;
        for (position, pose) in self.poses(GaitState::Neutral) {
            let leg = *self.legs.get(position);
            for (id, angle) in [(leg.hip, pose.hip), (leg.knee, pose.knee)] {
                if let Err(e) = mapper.set_joint_angle(bus, id, angle, duration) {
                    tracing::warn!(leg = %position, actuator = %id, error = %e, "park move failed");
                    failures += 1;
                }
            }
        }
        self.state = GaitState::Neutral;
        failures
    }

    fn issue(
        &self,
        bus: &mut dyn Actuator,
        mapper: &mut PoseMapper,
        state: GaitState,
        duration: Duration,
    ) -> Result<(), TrotError> {
        for (position, pose) in self.poses(state) {
            let leg = self.legs.get(position);
            match mapper.set_leg_angles(bus, leg, pose.hip, pose.knee, duration) {
                Ok(()) => {}
                Err(TrotError::CommTimeout { id }) => {
                    tracing::warn!(leg = %position, actuator = %id, state = %state, "move timed out");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legs::NeutralPoses;

    #[test]
    fn transitions_follow_the_fixed_order() {
        let mut s = GaitState::Neutral;
        let mut seen = Vec::new();
        for _ in 0..10 {
            s = s.next();
            seen.push(s);
        }
        use GaitState::*;
        assert_eq!(
            seen,
            vec![APush, ALift, ASwing, ADown, BPush, BLift, BSwing, BDown, APush, ALift]
        );
    }

    #[test]
    fn half_cycle_a_swings_the_front_left_diagonal() {
        assert_eq!(
            HalfCycle::A.swing_set(),
            vec![LegPosition::FrontLeft, LegPosition::BackRight]
        );
        assert_eq!(HalfCycle::A.swing_set(), HalfCycle::B.support_set());
        assert_eq!(HalfCycle::A.support_set(), HalfCycle::B.swing_set());
    }

    #[test]
    fn canonical_swing_leg_poses() {
        let n = NeutralPoses::default();
        let leg = LegAssembly::new(LegPosition::BackRight, 5, 6, false, &n);
        let p = PoseParams::default();
        let pose = |ph| leg_pose(&leg, LegRole::Swing, ph, &p);
        assert_eq!(pose(GaitPhase::Push), LegPose::new(75.0, 170.0));
        assert_eq!(pose(GaitPhase::Lift), LegPose::new(75.0, 140.0));
        assert_eq!(pose(GaitPhase::Swing), LegPose::new(125.0, 140.0));
        assert_eq!(pose(GaitPhase::Down), LegPose::new(125.0, 170.0));
    }

    #[test]
    fn mirrored_support_leg_inverts_hip_bias() {
        let n = NeutralPoses::default();
        let leg = LegAssembly::new(LegPosition::BackLeft, 7, 8, true, &n);
        let p = PoseParams::default();
        // f * S = 0.4 * 25 = 10
        assert_eq!(
            leg_pose(&leg, LegRole::Support, GaitPhase::Push, &p),
            LegPose::new(150.0, 90.0)
        );
        assert_eq!(
            leg_pose(&leg, LegRole::Support, GaitPhase::Swing, &p),
            LegPose::new(130.0, 90.0)
        );
        assert_eq!(
            leg_pose(&leg, LegRole::Support, GaitPhase::Down, &p),
            ground_pose(&leg, &p)
        );
    }

    #[test]
    fn forward_lean_is_static_and_opposite_on_front_legs() {
        let n = NeutralPoses::default();
        let p = PoseParams {
            forward_lean: 4.0,
            ..PoseParams::default()
        };
        let fl = LegAssembly::new(LegPosition::FrontLeft, 1, 2, true, &n);
        let fr = LegAssembly::new(LegPosition::FrontRight, 3, 4, false, &n);
        let bl = LegAssembly::new(LegPosition::BackLeft, 7, 8, true, &n);
        assert_eq!(ground_pose(&fl, &p).hip, 144.0);
        assert_eq!(ground_pose(&fr, &p).hip, 96.0);
        assert_eq!(ground_pose(&bl, &p).hip, 140.0);
        for phase in GaitPhase::ALL {
            let with = leg_pose(&fl, LegRole::Swing, phase, &p);
            let without = leg_pose(&fl, LegRole::Swing, phase, &PoseParams::default());
            assert_eq!(with.hip - without.hip, 4.0);
            assert_eq!(with.knee, without.knee);
        }
    }

    #[test]
    fn display_names_states() {
        assert_eq!(GaitState::ASwing.to_string(), "A.Swing");
        assert_eq!(GaitState::Neutral.to_string(), "Neutral");
    }
}
