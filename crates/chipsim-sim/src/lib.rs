//! ChipSim Sim - frame-stepped evaluation of chip trees
//!
//! This crate handles:
//! - Primitive evaluation (gates, tri-state buffers, buses, clocks, tick delays)
//! - The per-step evaluation scheduler
//! - The `Simulator` facade hosts drive once per frame
//! - Simulation configuration

pub mod config;
pub mod gate_eval;
pub mod scheduler;
pub mod simulator;

pub use config::SimulationConfig;
pub use gate_eval::{clock_level, evaluate_primitive, held_state, update_primitive_state, SimTime};
pub use scheduler::{step, StepReport};
pub use simulator::{SimulationError, SimulationResult, Simulator};
