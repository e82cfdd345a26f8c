//! Shield Tunneling Simulation
//!
//! Generates realistic TBM sensor data for testing shield-edge: PLC tags
//! (thrust, torque, advance, grout, ring assembly), attitude/guidance
//! (pitch/roll/yaw, deviations), and monitoring readings (settlement,
//! tilt, groundwater). Emits one [`Sample`] as a JSON line per tick, fed
//! straight into `shield-edge --stdin`.
//!
//! Simulates a normal excavation run with three scripted anomalies:
//! cutterhead clogging (torque/thrust rise, advance drops), over-
//! excavation (ground loss, settlement develops with lag), and a
//! grout-supply interruption (volume loss spikes).
//!
//! # Usage
//!
//! ```bash
//! ./edge-simulator --rings 20 --speed 200 | shield-edge --stdin
//! ```

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use shield_edge::types::{Payload, Sample};

const TYPICAL_RING_DURATION_SECONDS: f64 = 900.0;
const RING_ASSEMBLY_DURATION_SECONDS: f64 = 120.0;
const RING_ADVANCE_MM: f64 = 1500.0;

const BASE_THRUST_KN: f64 = 18000.0;
const BASE_TORQUE_KNM: f64 = 3500.0;
const BASE_ADVANCE_SPEED_MM_PER_MIN: f64 = 35.0;
const BASE_POWER_KW: f64 = 900.0;
const BASE_CUTTERHEAD_POWER_KW: f64 = 650.0;
const BASE_GROUT_VOLUME_M3: f64 = 4.2;

#[derive(Parser, Debug)]
#[command(name = "edge-simulator")]
#[command(about = "Shield-tunneling sensor data simulation for shield-edge testing")]
#[command(version)]
struct Args {
    /// Number of rings to simulate.
    #[arg(short, long, default_value = "20")]
    rings: u32,

    /// Time compression factor (1 = real-time, 200 = 200x faster).
    #[arg(short, long, default_value = "200", value_parser = clap::value_parser!(u32).range(1..=5000))]
    speed: u32,

    /// Suppress the mission log (only output sample data).
    #[arg(short, long)]
    quiet: bool,

    /// PLC/attitude sample rate in Hz.
    #[arg(long, default_value = "1")]
    sample_rate: u32,

    /// Random seed for reproducibility.
    #[arg(long)]
    seed: Option<u64>,

    /// Ring index (1-based, within the run) at which the clogging
    /// anomaly begins; 0 disables it.
    #[arg(long, default_value = "8")]
    clog_at_ring: u32,

    /// Ring index at which the over-excavation / settlement anomaly
    /// begins; 0 disables it.
    #[arg(long, default_value = "14")]
    overexcavation_at_ring: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Normal,
    CutterheadClogging,
    OverExcavation,
    Recovery,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Normal => "Normal Excavation",
            Phase::CutterheadClogging => "Cutterhead Clogging (Torque/Thrust Rise)",
            Phase::OverExcavation => "Over-Excavation (Ground Loss, Settlement Developing)",
            Phase::Recovery => "Recovery (Return to Normal)",
        }
    }
}

struct SimulationState {
    rng: StdRng,
    ring_number: u64,
    ring_elapsed_seconds: f64,
    advance_cumulative_mm: f64,
    phase: Phase,
    clog_at_ring: u32,
    overexcavation_at_ring: u32,

    thrust_total: f64,
    torque_total: f64,
    advance_speed: f64,
    power_total: f64,
    cutterhead_power: f64,
    grout_volume: f64,
    pitch: f64,
    roll: f64,
    yaw: f64,

    settlement_accumulated_mm: f64,

    samples_generated: u64,
    small_noise: Normal<f64>,
    medium_noise: Normal<f64>,
}

impl SimulationState {
    fn new(seed: Option<u64>, clog_at_ring: u32, overexcavation_at_ring: u32) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            ring_number: 1,
            ring_elapsed_seconds: 0.0,
            advance_cumulative_mm: 0.0,
            phase: Phase::Normal,
            clog_at_ring,
            overexcavation_at_ring,
            thrust_total: BASE_THRUST_KN,
            torque_total: BASE_TORQUE_KNM,
            advance_speed: BASE_ADVANCE_SPEED_MM_PER_MIN,
            power_total: BASE_POWER_KW,
            cutterhead_power: BASE_CUTTERHEAD_POWER_KW,
            grout_volume: BASE_GROUT_VOLUME_M3,
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
            settlement_accumulated_mm: 0.0,
            samples_generated: 0,
            small_noise: Normal::new(0.0, 0.02).expect("fixed normal params"),
            medium_noise: Normal::new(0.0, 0.08).expect("fixed normal params"),
        }
    }

    fn update_phase(&mut self) -> bool {
        let ring = self.ring_number as u32;
        let new_phase = if self.clog_at_ring != 0 && ring >= self.clog_at_ring && ring < self.clog_at_ring + 2 {
            Phase::CutterheadClogging
        } else if self.overexcavation_at_ring != 0 && ring >= self.overexcavation_at_ring && ring < self.overexcavation_at_ring + 2 {
            Phase::OverExcavation
        } else if (self.clog_at_ring != 0 && ring == self.clog_at_ring + 2) || (self.overexcavation_at_ring != 0 && ring == self.overexcavation_at_ring + 2) {
            Phase::Recovery
        } else {
            Phase::Normal
        };
        if new_phase != self.phase {
            self.phase = new_phase;
            true
        } else {
            false
        }
    }

    fn update_parameters(&mut self) {
        let noise_small = self.small_noise.sample(&mut self.rng);
        let noise_med = self.medium_noise.sample(&mut self.rng);

        match self.phase {
            Phase::Normal | Phase::Recovery => {
                self.thrust_total = BASE_THRUST_KN * (1.0 + noise_small);
                self.torque_total = BASE_TORQUE_KNM * (1.0 + noise_small);
                self.advance_speed = BASE_ADVANCE_SPEED_MM_PER_MIN * (1.0 + noise_small);
                self.power_total = BASE_POWER_KW * (1.0 + noise_small);
                self.cutterhead_power = BASE_CUTTERHEAD_POWER_KW * (1.0 + noise_small);
                self.grout_volume = BASE_GROUT_VOLUME_M3 * (1.0 + noise_small * 0.5);
            }
            Phase::CutterheadClogging => {
                self.thrust_total = BASE_THRUST_KN * (1.3 + 0.2 * noise_med.abs());
                self.torque_total = BASE_TORQUE_KNM * (1.5 + 0.3 * noise_med.abs());
                self.advance_speed = BASE_ADVANCE_SPEED_MM_PER_MIN * (0.4 + noise_small);
                self.power_total = BASE_POWER_KW * (1.4 + 0.1 * noise_med.abs());
                self.cutterhead_power = BASE_CUTTERHEAD_POWER_KW * (1.6 + 0.1 * noise_med.abs());
                self.grout_volume = BASE_GROUT_VOLUME_M3 * (1.0 + noise_small * 0.5);
            }
            Phase::OverExcavation => {
                self.thrust_total = BASE_THRUST_KN * (0.9 + noise_small);
                self.torque_total = BASE_TORQUE_KNM * (0.95 + noise_small);
                self.advance_speed = BASE_ADVANCE_SPEED_MM_PER_MIN * (1.2 + noise_small);
                self.power_total = BASE_POWER_KW * (1.0 + noise_small);
                self.cutterhead_power = BASE_CUTTERHEAD_POWER_KW * (1.0 + noise_small);
                self.grout_volume = BASE_GROUT_VOLUME_M3 * (0.5 + noise_small * 0.3);
                self.settlement_accumulated_mm += 0.4 + 0.3 * noise_med.abs();
            }
        }

        self.pitch = 0.3 * (self.ring_number as f64 * 0.2).sin() + noise_small;
        self.roll = 0.15 * (self.ring_number as f64 * 0.15).cos() + noise_small;
        self.yaw = 0.2 * (self.ring_number as f64 * 0.1).sin() + noise_small;
    }

    fn advance_depth(&mut self, dt_seconds: f64) {
        self.advance_cumulative_mm += self.advance_speed / 60.0 * dt_seconds;
        self.ring_elapsed_seconds += dt_seconds;
        if self.ring_elapsed_seconds >= TYPICAL_RING_DURATION_SECONDS {
            self.ring_elapsed_seconds = 0.0;
            self.ring_number += 1;
        }
    }

    fn ring_assembly_active(&self) -> bool {
        self.ring_elapsed_seconds < RING_ASSEMBLY_DURATION_SECONDS
    }

    fn plc_samples(&mut self, timestamp: f64) -> Vec<Sample> {
        self.samples_generated += 1;
        let assembly_active = if self.ring_assembly_active() { 1.0 } else { 0.0 };
        vec![
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "thrust_total".into(), value: self.thrust_total }),
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "torque_total".into(), value: self.torque_total }),
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "advance_speed".into(), value: self.advance_speed }),
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "advance_cumulative".into(), value: self.advance_cumulative_mm }),
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "ring_assembly_active".into(), value: assembly_active }),
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "power_total".into(), value: self.power_total }),
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "cutterhead_power".into(), value: self.cutterhead_power }),
            Sample::new("plc-sim", timestamp, Payload::Plc { tag_name: "grout_volume".into(), value: self.grout_volume }),
        ]
    }

    fn attitude_sample(&mut self, timestamp: f64) -> Sample {
        let deviation_scale = if self.phase == Phase::OverExcavation { 1.8 } else { 1.0 };
        Sample::new(
            "guidance-sim",
            timestamp,
            Payload::Attitude {
                pitch: self.pitch,
                roll: self.roll,
                yaw: self.yaw,
                horizontal_deviation: 8.0 * deviation_scale + self.rng.gen_range(-2.0..2.0),
                vertical_deviation: 6.0 * deviation_scale + self.rng.gen_range(-2.0..2.0),
                axis_deviation: 10.0 * deviation_scale + self.rng.gen_range(-2.0..2.0),
            },
        )
    }

    /// Monitoring readings arrive less frequently and lag the excavation
    /// face; emitted once per simulated minute rather than every tick.
    fn monitoring_samples(&mut self, timestamp: f64) -> Vec<Sample> {
        vec![
            Sample::new(
                "monitoring-sim",
                timestamp,
                Payload::Monitoring {
                    sensor_type: "settlement".into(),
                    sensor_location: Some("surface-point-12".into()),
                    value: -self.settlement_accumulated_mm + self.rng.gen_range(-0.1..0.1),
                    unit: "mm".into(),
                },
            ),
            Sample::new(
                "monitoring-sim",
                timestamp,
                Payload::Monitoring {
                    sensor_type: "groundwater_level".into(),
                    sensor_location: Some("well-4".into()),
                    value: 12.5 + self.rng.gen_range(-0.3..0.3),
                    unit: "m".into(),
                },
            ),
        ]
    }
}

fn format_ring_time(ring: u64, elapsed: f64) -> String {
    let minutes = (elapsed / 60.0) as u32;
    let secs = (elapsed % 60.0) as u32;
    format!("ring {ring:03} +{minutes:02}:{secs:02}")
}

fn log_mission(ring: u64, elapsed: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_ring_time(ring, elapsed), message);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut state = SimulationState::new(args.seed, args.clog_at_ring, args.overexcavation_at_ring);

    let dt_sim = 1.0 / args.sample_rate as f64;
    let sample_interval_real = Duration::from_secs_f64(dt_sim / args.speed as f64);
    let monitoring_every_n_ticks = (60.0 / dt_sim).max(1.0) as u64;

    log_mission(1, 0.0, &"=".repeat(70), args.quiet);
    log_mission(1, 0.0, "SHIELD TUNNELING SIMULATION", args.quiet);
    log_mission(1, 0.0, "shield-edge operational test data generator", args.quiet);
    log_mission(1, 0.0, &"=".repeat(70), args.quiet);
    log_mission(1, 0.0, &format!("Target rings: {}", args.rings), args.quiet);
    log_mission(1, 0.0, &format!("Speed: {}x compression", args.speed), args.quiet);
    if let Some(seed) = args.seed {
        log_mission(1, 0.0, &format!("Random seed: {}", seed), args.quiet);
    }
    if args.clog_at_ring != 0 {
        log_mission(1, 0.0, &format!("Cutterhead clogging scripted at ring {}", args.clog_at_ring), args.quiet);
    }
    if args.overexcavation_at_ring != 0 {
        log_mission(1, 0.0, &format!("Over-excavation scripted at ring {}", args.overexcavation_at_ring), args.quiet);
    }
    log_mission(1, 0.0, &"=".repeat(70), args.quiet);

    let start_time = Instant::now();
    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();
    let mut tick: u64 = 0;

    while state.ring_number <= args.rings as u64 {
        let loop_start = Instant::now();
        let sim_timestamp = shield_edge::types::now() + tick as f64 * dt_sim;

        if state.update_phase() {
            log_mission(state.ring_number, state.ring_elapsed_seconds, "", args.quiet);
            log_mission(state.ring_number, state.ring_elapsed_seconds, &format!(">>> PHASE: {}", state.phase.name()), args.quiet);
        }

        state.update_parameters();

        for sample in state.plc_samples(sim_timestamp) {
            let json = serde_json::to_string(&sample)?;
            writeln!(stdout_lock, "{json}")?;
        }
        let attitude = state.attitude_sample(sim_timestamp);
        writeln!(stdout_lock, "{}", serde_json::to_string(&attitude)?)?;

        if tick % monitoring_every_n_ticks == 0 {
            for sample in state.monitoring_samples(sim_timestamp) {
                writeln!(stdout_lock, "{}", serde_json::to_string(&sample)?)?;
            }
        }
        stdout_lock.flush()?;

        state.advance_depth(dt_sim);
        tick += 1;

        if args.speed < 5000 {
            let elapsed = loop_start.elapsed();
            if elapsed < sample_interval_real {
                std::thread::sleep(sample_interval_real - elapsed);
            }
        }
    }

    stdout_lock.flush()?;
    drop(stdout_lock);

    let total_elapsed = start_time.elapsed();
    log_mission(state.ring_number, state.ring_elapsed_seconds, &"=".repeat(70), args.quiet);
    log_mission(state.ring_number, state.ring_elapsed_seconds, "SIMULATION COMPLETE", args.quiet);
    log_mission(state.ring_number, state.ring_elapsed_seconds, &format!("Samples generated: {}", state.samples_generated), args.quiet);
    log_mission(state.ring_number, state.ring_elapsed_seconds, &format!("Real time: {:.1}s", total_elapsed.as_secs_f64()), args.quiet);
    log_mission(state.ring_number, state.ring_elapsed_seconds, &"=".repeat(70), args.quiet);

    Ok(())
}
