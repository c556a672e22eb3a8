use std::time::Duration;

use proptest::prelude::*;
use rstest::rstest;
use trot_core::{ActuatorUnit, CalibrationTable, PoseMapper, TrotError};
use trot_hardware::{BusCall, SimulatedBus};
use trot_traits::ActuatorId;

fn mapper(units: impl IntoIterator<Item = ActuatorUnit>) -> PoseMapper {
    PoseMapper::new(CalibrationTable::new(units).expect("valid table"))
}

#[rstest]
#[case(195.0, 200.0)]
#[case(100.0, 110.0)]
#[case(25.0, 40.0)]
#[case(f32::INFINITY, 200.0)]
#[case(f32::NEG_INFINITY, 40.0)]
fn offset_then_clamp(#[case] target: f32, #[case] committed: f32) {
    let mut bus = SimulatedBus::new([3]);
    let mut m = mapper([ActuatorUnit::new(3, 10.0, 40.0, 200.0)]);
    let got = m
        .set_joint_angle(&mut bus, ActuatorId(3), target, Duration::from_millis(100))
        .unwrap();
    assert_eq!(got, committed);
    assert_eq!(m.expected().get(ActuatorId(3)), Some(committed));
    assert_eq!(
        bus.calls(),
        vec![BusCall::Move {
            id: ActuatorId(3),
            angle: committed,
            duration: Duration::from_millis(100),
        }]
    );
}

#[test]
fn unknown_actuator_fails_without_motion() {
    let mut bus = SimulatedBus::reference();
    let mut m = mapper([ActuatorUnit::new(1, 0.0, 40.0, 200.0)]);
    let err = m
        .set_joint_angle(&mut bus, ActuatorId(2), 90.0, Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, TrotError::Config(_)));
    assert!(bus.calls().is_empty());
    assert!(m.expected().is_empty());
}

#[test]
fn nan_target_is_rejected() {
    let mut bus = SimulatedBus::new([1]);
    let mut m = mapper([ActuatorUnit::new(1, 0.0, 40.0, 200.0)]);
    let err = m
        .set_joint_angle(&mut bus, ActuatorId(1), f32::NAN, Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, TrotError::Config(msg) if msg.contains("NaN")));
    assert!(bus.calls().is_empty());
}

#[test]
fn expected_angle_is_recorded_even_when_the_move_times_out() {
    let mut bus = SimulatedBus::new([1]);
    bus.fail_next(1, 1).unwrap();
    let mut m = mapper([ActuatorUnit::new(1, 5.0, 40.0, 200.0)]);
    let err = m
        .set_joint_angle(&mut bus, ActuatorId(1), 100.0, Duration::ZERO)
        .unwrap_err();
    assert_eq!(err, TrotError::CommTimeout { id: ActuatorId(1) });
    assert_eq!(m.expected().get(ActuatorId(1)), Some(105.0));
}

#[test]
fn leg_command_attempts_both_joints_and_returns_first_error() {
    use trot_core::{LegAssembly, LegPosition, NeutralPoses};

    let mut bus = SimulatedBus::new([1, 2]);
    bus.fail_next(1, 1).unwrap();
    let mut m = mapper([
        ActuatorUnit::new(1, 0.0, 40.0, 200.0),
        ActuatorUnit::new(2, 0.0, 40.0, 200.0),
    ]);
    let leg = LegAssembly::new(LegPosition::FrontLeft, 1, 2, true, &NeutralPoses::default());
    let err = m
        .set_leg_angles(&mut bus, &leg, 140.0, 90.0, Duration::ZERO)
        .unwrap_err();
    assert_eq!(err, TrotError::CommTimeout { id: ActuatorId(1) });
    assert_eq!(bus.angle(2), Some(90.0));
    assert_eq!(m.expected().get(ActuatorId(2)), Some(90.0));
}

proptest! {
    #[test]
    fn committed_angle_stays_in_range(
        target in -1.0e6f32..1.0e6,
        offset in -90.0f32..90.0,
        min in 0.0f32..180.0,
        span in 0.5f32..180.0,
    ) {
        let max = min + span;
        let mut bus = SimulatedBus::new([7]);
        let mut m = mapper([ActuatorUnit::new(7, offset, min, max)]);
        let got = m.set_joint_angle(&mut bus, ActuatorId(7), target, Duration::ZERO).unwrap();
        prop_assert!((min..=max).contains(&got), "{got} not in [{min}, {max}]");
    }

    #[test]
    fn expected_table_matches_every_committed_angle(
        cmds in proptest::collection::vec((1u8..=4, -400.0f32..400.0), 1..40),
    ) {
        let mut bus = SimulatedBus::new(1..=4);
        let mut m = mapper((1u8..=4).map(|id| ActuatorUnit::new(id, f32::from(id) * 3.0, 40.0, 200.0)));
        for (id, target) in cmds {
            let id = ActuatorId(id);
            let got = m.set_joint_angle(&mut bus, id, target, Duration::ZERO).unwrap();
            prop_assert_eq!(m.expected().get(id), Some(got));
        }
    }
}
