//! Static structural defaults that are not operator-tunable YAML documents:
//! the fixed interval/window/tolerance constants named throughout section 4
//! of the specification, expressed as plain constants rather than a
//! `Default` impl scattered across every consuming module.

/// Expected PLC sampling interval used by the interpolator when no
/// per-tag override is configured, seconds.
pub const DEFAULT_SAMPLE_INTERVAL_SECONDS: f64 = 1.0;

/// Interpolator: gap-detection tolerance added on top of the expected
/// sampling interval (section 4.2).
pub const GAP_DETECTION_TOLERANCE_SECONDS: f64 = 0.5;

/// Interpolator: maximum gap that is filled rather than marked `missing`.
pub const DEFAULT_MAX_GAP_SECONDS: f64 = 5.0;

/// Reasonableness checker bounds (section 4.2).
pub const THRUST_PENETRATION_RATIO_MIN: f64 = 100.0;
pub const THRUST_PENETRATION_RATIO_MAX: f64 = 2000.0;
pub const TORQUE_THRUST_RATIO_MIN: f64 = 0.01;
pub const TORQUE_THRUST_RATIO_MAX: f64 = 0.15;
pub const CHAMBER_PRESSURE_PER_DEPTH_MIN_BAR_M: f64 = 0.08;
pub const CHAMBER_PRESSURE_PER_DEPTH_MAX_BAR_M: f64 = 0.15;
pub const POWER_CONSISTENCY_LOWER_FRACTION: f64 = 0.5;
pub const POWER_CONSISTENCY_UPPER_FRACTION: f64 = 3.0;

/// Attitude aggregator: Euclidean-deviation tolerance used by the
/// trajectory-quality metric, millimetres (section 4.5).
pub const TRAJECTORY_DEVIATION_TOLERANCE_MM: f64 = 50.0;

/// Settlement associator: default lag window after ring completion,
/// hours (section 4.5).
pub const DEFAULT_SETTLEMENT_LAG_MIN_HOURS: f64 = 6.0;
pub const DEFAULT_SETTLEMENT_LAG_MAX_HOURS: f64 = 8.0;

/// Ring summary writer: critical features used for the completeness flag
/// (section 4.6). Names match the `RingSummary::indicator_values` envelope
/// keys plus the settlement value.
pub const CRITICAL_FEATURES: &[&str] = &[
    "specific_energy",
    "ground_loss_rate",
    "volume_loss_ratio",
    "torque_thrust_ratio",
    "settlement_value",
];

pub const COMPLETENESS_COMPLETE_FRACTION: f64 = 0.90;
pub const COMPLETENESS_PARTIAL_FRACTION: f64 = 0.60;

/// Buffer writer default bounded capacity (section 4.3).
pub const DEFAULT_BUFFER_MAX_SIZE: usize = 10_000;

/// Notification retry schedule, seconds (section 4.8, supplemented 2b).
pub const RETRY_SCHEDULE_SECONDS: &[f64] = &[60.0, 300.0, 900.0];
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_TASK_MAX_AGE_SECONDS: f64 = 24.0 * 3600.0;

/// Health-probe timeout applied to every sub-probe (section 5).
pub const HEALTH_PROBE_TIMEOUT_SECONDS: f64 = 1.0;
