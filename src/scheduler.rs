//! The `scheduler` module runs a machine, and every machine its `fork`s and
//! `branch`es spawn, to completion. Grounded on the reference
//! implementation's `context.go` (the LIFO run queue) and `api.go`
//! (`SetHandler`/`Trace`/`Run`).

use crate::context::ForkSink;
use crate::error::{Error, OpResult};
use crate::machine::Machine;
use crate::ops;
use crate::tracer::{NullTracer, Tracer};

/// A capped, LIFO queue of machines still waiting to run. Capacity `0`
/// means unbounded.
#[derive(Debug)]
struct PendingQueue {
    items: Vec<(u64, Machine)>,
    capacity: usize,
}

impl PendingQueue {
    fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    fn push(&mut self, id: u64, m: Machine) -> OpResult<()> {
        if self.capacity != 0 && self.items.len() >= self.capacity {
            return Err(Error::QueueFull);
        }
        self.items.push((id, m));
        Ok(())
    }

    fn pop(&mut self) -> Option<(u64, Machine)> {
        self.items.pop()
    }
}

/// Bridges `ops::step`'s [`ForkSink`] requirement to a scheduler run: tags
/// each queued child with a fresh id and notifies the tracer before handing
/// it to the pending queue.
struct QueueSink<'a, T: Tracer> {
    queue: &'a mut PendingQueue,
    tracer: &'a mut T,
    parent_id: u64,
    next_id: &'a mut u64,
}

impl<T: Tracer> ForkSink for QueueSink<'_, T> {
    fn queue(&mut self, child: Machine) -> OpResult<()> {
        *self.next_id += 1;
        let child_id = *self.next_id;
        self.tracer.queue(self.parent_id, child_id, &child);
        self.queue.push(child_id, child)
    }
}

/// Runs a root machine plus every machine it forks or branches, visiting
/// the pending queue in LIFO order (so a freshly forked machine runs next,
/// depth-first, rather than round-robin).
pub struct Scheduler {
    capacity: usize,
}

impl Scheduler {
    /// `queue_capacity` bounds how many machines may be pending at once;
    /// `0` means unbounded. Exceeding it fails the `fork`/`branch` that
    /// would have overflowed it, per `SPEC_FULL.md` §4.6.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            capacity: queue_capacity,
        }
    }

    /// Runs `root` to completion, calling `on_complete` for every machine
    /// (root and forks alike) as it halts, with no tracer attached.
    ///
    /// `on_complete` is this run's handler: returning `Ok(())` resumes the
    /// next pending machine (if any); returning `Err` stops the whole run
    /// and that error is returned here, per `SPEC_FULL.md` §4.6 — a forked
    /// machine that never got to run is simply dropped, releasing its
    /// pages.
    pub fn run(&self, root: Machine, on_complete: impl FnMut(Machine) -> OpResult<()>) -> OpResult<()> {
        self.run_traced(root, &mut NullTracer, on_complete)
    }

    /// As [`Scheduler::run`], but drives `tracer` through the run's
    /// lifecycle events.
    pub fn run_traced<T: Tracer>(
        &self,
        root: Machine,
        tracer: &mut T,
        mut on_complete: impl FnMut(Machine) -> OpResult<()>,
    ) -> OpResult<()> {
        let mut queue = PendingQueue::new(self.capacity);
        let mut next_id: u64 = 0;
        tracer.begin(0, &root);
        let mut current = Some((0u64, root));

        while let Some((id, mut m)) = current {
            while !m.is_halted() {
                tracer.before(id, &m);
                let mut sink = QueueSink {
                    queue: &mut queue,
                    tracer,
                    parent_id: id,
                    next_id: &mut next_id,
                };
                let _ = ops::step(&mut m, &mut sink);
                tracer.after(id, &m);
            }
            log::debug!("machine {id} halted: {m}");
            tracer.end(id, &m);
            tracer.handle(id, &m);
            on_complete(m)?;
            current = queue.pop();
            if let Some((pending_id, pending_m)) = &current {
                tracer.begin(*pending_id, pending_m);
            }
        }
        Ok(())
    }
}
