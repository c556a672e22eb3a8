#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration parsing for the trot controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section has defaults matching the reference robot, so an empty
//!   file describes a working eight-servo quadruped.
//! - The calibration CSV loader enforces headers and rejects duplicate ids.
use serde::Deserialize;
use std::collections::BTreeSet;

/// Per-servo offsets of the reference robot, ids 1..=8.
const DEFAULT_OFFSETS: [f32; 8] = [0.0, 0.0, 10.0, 15.0, -25.0, -20.0, -25.0, -15.0];

/// Calibration CSV schema.
///
/// Expected headers:
/// id,offset_deg
///
/// Example:
/// id,offset_deg
/// 3,10.0
/// 5,-25.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct OffsetRow {
    pub id: u8,
    pub offset_deg: f32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BusCfg {
    /// Serial device the bus lives on. Informational; discovery happens elsewhere.
    pub port: Option<String>,
    /// Actuator whose supply reading stands for the whole bus (default: lowest id).
    pub voltage_probe: Option<u8>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Limits {
    pub min_deg: f32,
    pub max_deg: f32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_deg: 40.0,
            max_deg: 200.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ActuatorCfg {
    pub id: u8,
    #[serde(default)]
    pub offset_deg: f32,
    /// Per-actuator override of `[limits]`.
    pub min_deg: Option<f32>,
    pub max_deg: Option<f32>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct LegCfg {
    pub hip: u8,
    pub knee: u8,
    /// Leg is mounted reflected relative to the canonical side.
    #[serde(default)]
    pub mirrored: bool,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Legs {
    pub front_left: LegCfg,
    pub front_right: LegCfg,
    pub back_right: LegCfg,
    pub back_left: LegCfg,
}

impl Default for Legs {
    fn default() -> Self {
        Self {
            front_left: LegCfg {
                hip: 1,
                knee: 2,
                mirrored: true,
            },
            front_right: LegCfg {
                hip: 3,
                knee: 4,
                mirrored: false,
            },
            back_right: LegCfg {
                hip: 5,
                knee: 6,
                mirrored: false,
            },
            back_left: LegCfg {
                hip: 7,
                knee: 8,
                mirrored: true,
            },
        }
    }
}

impl Legs {
    /// Legs in command order: FL, FR, BR, BL.
    pub fn ordered(&self) -> [(&'static str, LegCfg); 4] {
        [
            ("front_left", self.front_left),
            ("front_right", self.front_right),
            ("back_right", self.back_right),
            ("back_left", self.back_left),
        ]
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PoseCfg {
    pub hip_neutral: f32,
    pub knee_neutral: f32,
    pub hip_neutral_mirror: f32,
    pub knee_neutral_mirror: f32,
    /// Hip forward/back excursion from neutral.
    pub hip_swing: f32,
    /// How far the knee bends to lift the foot.
    pub knee_lift: f32,
    /// How far the knee presses into the ground from neutral.
    pub knee_down: f32,
    /// Share of `hip_swing` used by support legs (0.0..=1.0).
    pub support_fraction: f32,
    /// Static hip correction on the front legs (+ on left, - on right).
    pub forward_lean: f32,
}

impl Default for PoseCfg {
    fn default() -> Self {
        Self {
            hip_neutral: 100.0,
            knee_neutral: 160.0,
            hip_neutral_mirror: 140.0,
            knee_neutral_mirror: 80.0,
            hip_swing: 25.0,
            knee_lift: 20.0,
            knee_down: 10.0,
            support_fraction: 0.4,
            forward_lean: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct GaitCfg {
    /// Duration of one half-cycle (push, lift, swing, down).
    pub step_ms: u64,
    /// Pause after standing up or sitting back to neutral.
    pub settle_ms: u64,
    /// Duration of each timed move; defaults to one phase.
    pub move_ms: Option<u64>,
}

impl Default for GaitCfg {
    fn default() -> Self {
        Self {
            step_ms: 400,
            settle_ms: 1000,
            move_ms: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct HealthCfg {
    pub poll_interval_ms: u64,
    pub max_temp_c: f32,
    pub min_voltage_v: f32,
    pub max_voltage_v: f32,
    pub min_current_ma: f32,
    pub max_current_ma: f32,
    pub position_tolerance_deg: f32,
    /// Total tries per metric read, first attempt included.
    pub read_attempts: u8,
    pub retry_delay_ms: u64,
}

impl Default for HealthCfg {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            max_temp_c: 70.0,
            min_voltage_v: 5.0,
            max_voltage_v: 8.4,
            min_current_ma: 0.0,
            max_current_ma: 3000.0,
            position_tolerance_deg: 5.0,
            read_attempts: 3,
            retry_delay_ms: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Safety {
    /// Hard cap on one walking session.
    pub max_runtime_ms: u64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            max_runtime_ms: 300_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ShutdownCfg {
    /// Elongated move used to bring every leg back to the ground.
    pub move_ms: u64,
    pub settle_margin_ms: u64,
}

impl Default for ShutdownCfg {
    fn default() -> Self {
        Self {
            move_ms: 1500,
            settle_margin_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct HomingCfg {
    pub home_deg: f32,
    pub move_ms: u64,
    /// Extra wait after the homing move before positions are verified.
    pub settle_margin_ms: u64,
    pub tolerance_deg: f32,
}

impl Default for HomingCfg {
    fn default() -> Self {
        Self {
            home_deg: 120.0,
            move_ms: 1500,
            settle_margin_ms: 500,
            tolerance_deg: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

fn default_actuators() -> Vec<ActuatorCfg> {
    DEFAULT_OFFSETS
        .iter()
        .zip(1u8..)
        .map(|(&offset_deg, id)| ActuatorCfg {
            id,
            offset_deg,
            min_deg: None,
            max_deg: None,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bus: BusCfg,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default = "default_actuators")]
    pub actuators: Vec<ActuatorCfg>,
    #[serde(default)]
    pub legs: Legs,
    #[serde(default)]
    pub pose: PoseCfg,
    #[serde(default)]
    pub gait: GaitCfg,
    #[serde(default)]
    pub health: HealthCfg,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub shutdown: ShutdownCfg,
    #[serde(default)]
    pub homing: HomingCfg,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: BusCfg::default(),
            limits: Limits::default(),
            actuators: default_actuators(),
            legs: Legs::default(),
            pose: PoseCfg::default(),
            gait: GaitCfg::default(),
            health: HealthCfg::default(),
            safety: Safety::default(),
            shutdown: ShutdownCfg::default(),
            homing: HomingCfg::default(),
            logging: Logging::default(),
        }
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Load per-actuator offsets from a CSV with the exact header `id,offset_deg`.
pub fn load_offsets_csv(path: &std::path::Path) -> eyre::Result<Vec<OffsetRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["id", "offset_deg"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'id,offset_deg', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<OffsetRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<OffsetRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if !row.offset_deg.is_finite() {
            eyre::bail!("invalid CSV row {}: offset_deg must be finite", idx + 2);
        }
        if rows.iter().any(|r| r.id == row.id) {
            eyre::bail!("calibration CSV lists actuator {} more than once", row.id);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("calibration CSV has no rows");
    }
    Ok(rows)
}

impl Config {
    /// Overwrite offsets with rows from a calibration CSV.
    pub fn apply_offsets(&mut self, rows: &[OffsetRow]) -> eyre::Result<()> {
        for row in rows {
            let Some(act) = self.actuators.iter_mut().find(|a| a.id == row.id) else {
                eyre::bail!(
                    "calibration CSV references actuator {} which is not configured",
                    row.id
                );
            };
            act.offset_deg = row.offset_deg;
        }
        Ok(())
    }

    /// Effective `[min, max]` for actuator `id`.
    pub fn limits_for(&self, id: u8) -> Option<(f32, f32)> {
        self.actuators.iter().find(|a| a.id == id).map(|a| {
            (
                a.min_deg.unwrap_or(self.limits.min_deg),
                a.max_deg.unwrap_or(self.limits.max_deg),
            )
        })
    }

    /// Representative actuator for bus voltage.
    pub fn voltage_probe(&self) -> Option<u8> {
        self.bus
            .voltage_probe
            .or_else(|| self.actuators.iter().map(|a| a.id).min())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Actuators
        if self.actuators.is_empty() {
            eyre::bail!("actuators must list at least one actuator");
        }
        let mut ids = BTreeSet::new();
        for a in &self.actuators {
            if a.id == 0 || a.id > 253 {
                eyre::bail!("actuators.id must be in 1..=253, got {}", a.id);
            }
            if !ids.insert(a.id) {
                eyre::bail!("actuators.id {} is listed more than once", a.id);
            }
            if !a.offset_deg.is_finite() {
                eyre::bail!("actuators.offset_deg for {} must be finite", a.id);
            }
        }

        // Limits
        if !(self.limits.min_deg.is_finite() && self.limits.max_deg.is_finite()) {
            eyre::bail!("limits.min_deg and limits.max_deg must be finite");
        }
        for a in &self.actuators {
            let (lo, hi) = self.limits_for(a.id).unwrap_or((0.0, 0.0));
            if !(lo.is_finite() && hi.is_finite()) {
                eyre::bail!("angle limits for actuator {} must be finite", a.id);
            }
            if lo >= hi {
                eyre::bail!(
                    "angle limits for actuator {} must satisfy min_deg < max_deg",
                    a.id
                );
            }
        }

        // Legs
        let mut used = BTreeSet::new();
        for (name, leg) in self.legs.ordered() {
            for (joint, id) in [("hip", leg.hip), ("knee", leg.knee)] {
                if !ids.contains(&id) {
                    eyre::bail!("legs.{name}.{joint} references unknown actuator {id}");
                }
                if !used.insert(id) {
                    eyre::bail!("legs.{name}.{joint}: actuator {id} is used by more than one joint");
                }
            }
        }

        // Pose
        let p = &self.pose;
        let pose_vals = [
            p.hip_neutral,
            p.knee_neutral,
            p.hip_neutral_mirror,
            p.knee_neutral_mirror,
            p.hip_swing,
            p.knee_lift,
            p.knee_down,
            p.forward_lean,
        ];
        if pose_vals.iter().any(|v| !v.is_finite()) {
            eyre::bail!("pose values must be finite");
        }
        if p.hip_swing < 0.0 || p.knee_lift < 0.0 || p.knee_down < 0.0 {
            eyre::bail!("pose.hip_swing, pose.knee_lift and pose.knee_down must be >= 0");
        }
        if !(0.0..=1.0).contains(&p.support_fraction) {
            eyre::bail!("pose.support_fraction must be in [0.0, 1.0]");
        }

        // Gait
        if self.gait.step_ms == 0 {
            eyre::bail!("gait.step_ms must be > 0");
        }
        if self.gait.step_ms > 60_000 {
            eyre::bail!("gait.step_ms is unreasonably large (>60s)");
        }
        if self.gait.move_ms == Some(0) {
            eyre::bail!("gait.move_ms must be > 0 when set");
        }

        // Health
        let h = &self.health;
        if h.poll_interval_ms == 0 {
            eyre::bail!("health.poll_interval_ms must be >= 1");
        }
        if !h.max_temp_c.is_finite() {
            eyre::bail!("health.max_temp_c must be finite");
        }
        if !(h.min_voltage_v.is_finite() && h.max_voltage_v.is_finite())
            || h.min_voltage_v >= h.max_voltage_v
        {
            eyre::bail!("health voltage band must satisfy min_voltage_v < max_voltage_v");
        }
        if !(h.min_current_ma.is_finite() && h.max_current_ma.is_finite())
            || h.min_current_ma >= h.max_current_ma
        {
            eyre::bail!("health current band must satisfy min_current_ma < max_current_ma");
        }
        if !(h.position_tolerance_deg.is_finite() && h.position_tolerance_deg > 0.0) {
            eyre::bail!("health.position_tolerance_deg must be > 0");
        }
        if h.read_attempts == 0 {
            eyre::bail!("health.read_attempts must be >= 1");
        }
        if h.retry_delay_ms > 5_000 {
            eyre::bail!("health.retry_delay_ms is unreasonably large (>5s)");
        }
        match self.voltage_probe() {
            Some(id) if ids.contains(&id) => {}
            Some(id) => eyre::bail!("bus.voltage_probe references unknown actuator {id}"),
            None => eyre::bail!("bus.voltage_probe could not be resolved"),
        }

        // Safety
        if self.safety.max_runtime_ms == 0 {
            eyre::bail!("safety.max_runtime_ms must be >= 1");
        }

        // Shutdown
        if self.shutdown.move_ms == 0 {
            eyre::bail!("shutdown.move_ms must be >= 1");
        }

        // Homing
        if !(self.homing.home_deg.is_finite() && self.homing.tolerance_deg.is_finite()) {
            eyre::bail!("homing.home_deg and homing.tolerance_deg must be finite");
        }
        if self.homing.tolerance_deg <= 0.0 {
            eyre::bail!("homing.tolerance_deg must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
