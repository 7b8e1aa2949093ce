//! Canonical machine shared types.
//!
//! Everything the machine layer and its collaborators exchange lives here:
//! axis vectors, state enums, G/M code masks, the gcode model records, blocks
//! handed over by the parser, the error taxonomy, configuration and status
//! report payloads.

pub mod axis;
pub mod block;
pub mod codes;
pub mod config;
pub mod error;
pub mod model;
pub mod state;
pub mod status;
