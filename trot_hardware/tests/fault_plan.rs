use rstest::rstest;
use trot_hardware::{FaultPlan, SimError, SimulatedBus};
use trot_traits::{Actuator, ActuatorError, ActuatorId, Capabilities};

#[test]
fn parses_and_applies_a_full_plan() {
    let plan = FaultPlan::from_vars([
        ("TROT_SIM_SUPPLY_MV", "4800"),
        ("TROT_SIM_OVERHEAT", "3:75, 4:80.5"),
        ("TROT_SIM_STUCK", "2"),
        ("TROT_SIM_TIMEOUT", "7,8"),
        ("PATH", "/usr/bin"),
    ])
    .unwrap();
    assert_eq!(plan.supply_mv, Some(4800.0));
    assert_eq!(plan.temperatures, vec![(3, 75.0), (4, 80.5)]);
    assert_eq!(plan.timeouts, vec![7, 8]);

    let mut bus = SimulatedBus::reference();
    plan.apply(&bus).unwrap();
    assert_eq!(bus.read_bus_voltage(ActuatorId(1)).unwrap(), 4800.0);
    assert_eq!(bus.read_temperature(ActuatorId(4)).unwrap(), 80.5);
    assert_eq!(
        bus.read_position(ActuatorId(8)),
        Err(ActuatorError::CommTimeout { id: ActuatorId(8) })
    );
    assert!(bus.servo(2).unwrap().stuck);
}

#[test]
fn basic_servos_lose_optional_capabilities() {
    let plan = FaultPlan::from_vars([("TROT_SIM_BASIC_SERVOS", "1")]).unwrap();
    let mut bus = SimulatedBus::reference();
    plan.apply(&bus).unwrap();
    assert_eq!(bus.capabilities(ActuatorId(1)), Capabilities::default());
    assert!(matches!(
        bus.read_current(ActuatorId(1)),
        Err(ActuatorError::CapabilityMissing { .. })
    ));
}

#[rstest]
#[case("TROT_SIM_SUPPLY_MV", "lots")]
#[case("TROT_SIM_OVERHEAT", "3")]
#[case("TROT_SIM_OVERHEAT", "x:75")]
#[case("TROT_SIM_STUCK", "2,,3")]
#[case("TROT_SIM_WOBBLE", "1")]
fn rejects_malformed_values(#[case] var: &str, #[case] value: &str) {
    let err = FaultPlan::from_vars([(var, value)]).unwrap_err();
    assert!(matches!(err, SimError::InvalidFaultSpec { .. }), "{err}");
}

#[test]
fn empty_environment_is_an_empty_plan() {
    let plan = FaultPlan::from_vars(Vec::<(String, String)>::new()).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn plan_for_missing_servo_fails_to_apply() {
    let plan = FaultPlan::from_vars([("TROT_SIM_STUCK", "12")]).unwrap();
    assert_eq!(
        plan.apply(&SimulatedBus::reference()),
        Err(SimError::UnknownServo(12))
    );
}
