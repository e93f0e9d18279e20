//! Defines the interface `fork`/`branch` use to queue a speculative machine,
//! and the trivial sink a machine run without a [`crate::Scheduler`] gets by
//! default. Grounded on the reference implementation's `context` interface.

use crate::error::{Error, OpResult};
use crate::machine::Machine;

/// Receives machines queued by `fork`/`branch` while a machine runs.
pub trait ForkSink {
    /// Accepts `child` for later execution, or rejects it (queue full, or
    /// no queue installed at all).
    fn queue(&mut self, child: Machine) -> OpResult<()>;
}

/// The sink a bare [`Machine::run_to_halt`](crate::Machine) uses: every
/// `fork`/`branch` fails immediately, since there is nowhere to put the
/// speculative clone.
#[derive(Debug, Default)]
pub struct NoQueue;

impl ForkSink for NoQueue {
    fn queue(&mut self, _child: Machine) -> OpResult<()> {
        Err(Error::NoQueue)
    }
}
