//! Utility library for the guidance software
//!
//! Shared by every executable in the workspace: angle maths, parameter file
//! loading, the session directory and its background saver, logging and the
//! cyclic module interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
