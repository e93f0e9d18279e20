//! `forkvm` is a bytecode stack virtual machine built for constraint-
//! satisfaction search: alongside ordinary sequential execution, a program
//! can `fork` or `branch` to speculatively explore more than one path, with
//! copy-on-write memory keeping each path's state independent.
//!
//! The [`Machine`] owns registers and page-backed memory and knows how to
//! execute one instruction at a time; a [`Scheduler`] drives a machine (and
//! everything it forks) to completion, handing each finished machine's
//! result back to the caller. A [`Tracer`] can observe that whole run
//! without changing its outcome.
//!
//! ```
//! // halt(0): immediate byte 0x80 (value 0, continuation bit set), then
//! // the terminator byte 0x7f (the `halt` opcode).
//! let image: Vec<u8> = {
//!     let mut v = vec![forkvm::program::VERSION];
//!     v.extend_from_slice(&64u16.to_be_bytes());
//!     v.extend_from_slice(&[0x80, 0x7f]);
//!     v
//! };
//! let m = forkvm::program::load(&image).unwrap();
//! let sched = forkvm::Scheduler::new(0);
//! let mut results = Vec::new();
//! sched.run(m, |done| { results.push(done.err()); Ok(()) }).unwrap();
//! assert_eq!(results, vec![Some(forkvm::Error::Halt(0))]);
//! ```

mod context;
mod decode;
mod error;
mod machine;
pub mod opcode;
mod ops;
mod page;
pub mod program;
mod scheduler;
mod tracer;

pub use context::{ForkSink, NoQueue};
pub use error::{Error, MachineError, OpResult, StackKind};
pub use machine::{Machine, PSP_INIT};
pub use page::{PageTable, PAGE_SIZE};
pub use scheduler::Scheduler;
pub use tracer::{
    CountingTracer, FilteredTracer, FuncTracer, IdTracer, MachineId, MultiTracer, NullTracer,
    Tracer,
};

#[cfg(test)]
mod tests;
