//! # Canonical Machine Library
//!
//! The layer between a gcode parser and a real-time motion planner. It holds
//! a single, unit-normalized model of where the machine is, which modes are
//! active and what it may do next, and forwards motion, spindle and tool
//! requests to external collaborators.
//!
//! ## Layers
//!
//! 1. **Modal State Store** — committed / incoming / flags records plus runtime counters
//! 2. **Resolver** — units, distance mode, coordinate and origin offsets, arc geometry
//! 3. **Validator** — modal group conflicts and word domains
//! 4. **State machines** — machine state with feedhold and homing sub-states
//! 5. **Dispatcher** — one entry point per canonical function, block executor,
//!    homing and return-to-home cycles driven by scheduler ticks
//!
//! ## Single Writer
//!
//! [`CanonicalMachine`](command::dispatch::CanonicalMachine) owns the store
//! exclusively. Collaborators see derived values through accessors only, and
//! every block either commits completely or leaves no trace.

pub mod arc;
pub mod collab;
pub mod command;
pub mod config;
pub mod resolve;
pub mod script;
pub mod sim;
pub mod state;
pub mod store;
pub mod validate;

pub use command::dispatch::CanonicalMachine;
