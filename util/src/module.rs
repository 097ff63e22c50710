//! Cyclic module interface
//!
//! Modules run by the guidance executables are initialised once from their
//! parameter files and then driven one tick at a time. Anything a module needs
//! to remember between ticks lives in the implementing struct.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A cyclic module and its state between ticks.
pub trait State {
    /// Data needed to initialise the module, usually parameter file paths.
    type InitData;
    type InitError;

    /// Data consumed by one tick.
    type InputData;
    /// Data produced by one tick.
    type OutputData;
    /// Flags raised during a tick which are not errors.
    type StatusReport;
    type ProcError;

    /// Initialise the module, archiving anything worth keeping into the
    /// session.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Process a single tick.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;

    /// Process a recorded sequence of ticks in order, stopping at the first
    /// error.
    fn proc_all<'a, I>(&mut self, inputs: I)
        -> Result<Vec<(Self::OutputData, Self::StatusReport)>, Self::ProcError>
    where
        I: IntoIterator<Item = &'a Self::InputData>,
        Self::InputData: 'a,
    {
        inputs.into_iter().map(|i| self.proc(i)).collect()
    }
}
