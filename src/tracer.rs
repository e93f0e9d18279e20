//! The `tracer` module defines the [`Tracer`] trait a [`crate::Scheduler`]
//! drives as it runs a machine, plus a family of ready-made tracers.
//! Grounded on `x/tracer/*.go`.
//!
//! Every machine a scheduler runs (the root and every fork/branch it spawns)
//! is given a stable `u64` identity for the lifetime of the run; tracer
//! hooks are keyed by that identity rather than by Rust object identity,
//! which forks and branches don't preserve.

use std::collections::HashMap;

use crate::machine::Machine;

/// Observes a scheduler run's lifecycle events.
///
/// All methods have a no-op default; implement only the ones you need.
#[allow(unused_variables)]
pub trait Tracer {
    /// A machine (the root, or a newly dequeued fork) is about to run.
    fn begin(&mut self, id: u64, m: &Machine) {}
    /// About to execute one instruction.
    fn before(&mut self, id: u64, m: &Machine) {}
    /// Just executed one instruction.
    fn after(&mut self, id: u64, m: &Machine) {}
    /// `parent` queued `child` via `fork`/`branch`.
    fn queue(&mut self, parent: u64, child: u64, m: &Machine) {}
    /// A machine stopped running (halt or error).
    fn end(&mut self, id: u64, m: &Machine) {}
    /// A stopped machine's result has been handed to the caller.
    fn handle(&mut self, id: u64, m: &Machine) {}
    /// Arbitrary tracer-specific state lookup, e.g. for formatting.
    fn context(&self, id: u64, key: &str) -> Option<String> {
        None
    }
}

/// A tracer that does nothing; the default when a scheduler run has no
/// tracer of interest.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracer;

impl Tracer for NullTracer {}

/// Counts instructions executed per machine, inheriting a fork's count from
/// its parent at queue time. Grounded on `x/tracer/count.go`.
#[derive(Debug, Default)]
pub struct CountingTracer {
    counts: HashMap<u64, u64>,
}

impl CountingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions executed so far by the machine identified by `id`.
    pub fn count(&self, id: u64) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }
}

impl Tracer for CountingTracer {
    fn before(&mut self, id: u64, _m: &Machine) {
        *self.counts.entry(id).or_insert(0) += 1;
    }

    fn queue(&mut self, parent: u64, child: u64, _m: &Machine) {
        let inherited = self.count(parent);
        self.counts.insert(child, inherited);
    }

    fn handle(&mut self, id: u64, _m: &Machine) {
        self.counts.remove(&id);
    }
}

/// A machine's position in its run's fork tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineId {
    /// Id of the run's root machine.
    pub tree: u64,
    /// Id of the machine this one was forked/branched from (0 for the root).
    pub parent: u64,
    /// This machine's own id.
    pub own: u64,
}

/// Assigns every machine in a run a [`MachineId`]. Grounded on
/// `x/tracer/ids.go`.
#[derive(Debug, Default)]
pub struct IdTracer {
    ids: HashMap<u64, MachineId>,
}

impl IdTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_of(&self, id: u64) -> Option<MachineId> {
        self.ids.get(&id).copied()
    }
}

impl Tracer for IdTracer {
    fn begin(&mut self, id: u64, _m: &Machine) {
        self.ids.entry(id).or_insert(MachineId {
            tree: id,
            parent: 0,
            own: id,
        });
    }

    fn queue(&mut self, parent: u64, child: u64, _m: &Machine) {
        let tree = self.ids.get(&parent).map(|p| p.tree).unwrap_or(parent);
        self.ids.insert(
            child,
            MachineId {
                tree,
                parent,
                own: child,
            },
        );
    }

    fn handle(&mut self, id: u64, _m: &Machine) {
        self.ids.remove(&id);
    }
}

/// Calls a closure for every event, passing along the event's machine.
/// Grounded on `x/tracer/func.go`.
pub struct FuncTracer<F: FnMut(u64, &Machine)> {
    f: F,
}

impl<F: FnMut(u64, &Machine)> FuncTracer<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F: FnMut(u64, &Machine)> Tracer for FuncTracer<F> {
    fn begin(&mut self, id: u64, m: &Machine) {
        (self.f)(id, m)
    }
    fn before(&mut self, id: u64, m: &Machine) {
        (self.f)(id, m)
    }
    fn after(&mut self, id: u64, m: &Machine) {
        (self.f)(id, m)
    }
    fn queue(&mut self, _parent: u64, child: u64, m: &Machine) {
        (self.f)(child, m)
    }
    fn end(&mut self, id: u64, m: &Machine) {
        (self.f)(id, m)
    }
    fn handle(&mut self, id: u64, m: &Machine) {
        (self.f)(id, m)
    }
}

/// Wraps another tracer and only forwards events for which `predicate`
/// returns true. Grounded on `x/tracer/filter.go`.
pub struct FilteredTracer<T: Tracer, P: FnMut(u64, &Machine) -> bool> {
    inner: T,
    predicate: P,
}

impl<T: Tracer, P: FnMut(u64, &Machine) -> bool> FilteredTracer<T, P> {
    pub fn new(inner: T, predicate: P) -> Self {
        Self { inner, predicate }
    }
}

impl<T: Tracer, P: FnMut(u64, &Machine) -> bool> Tracer for FilteredTracer<T, P> {
    fn begin(&mut self, id: u64, m: &Machine) {
        if (self.predicate)(id, m) {
            self.inner.begin(id, m);
        }
    }
    fn before(&mut self, id: u64, m: &Machine) {
        if (self.predicate)(id, m) {
            self.inner.before(id, m);
        }
    }
    fn after(&mut self, id: u64, m: &Machine) {
        if (self.predicate)(id, m) {
            self.inner.after(id, m);
        }
    }
    fn queue(&mut self, parent: u64, child: u64, m: &Machine) {
        if (self.predicate)(child, m) {
            self.inner.queue(parent, child, m);
        }
    }
    fn end(&mut self, id: u64, m: &Machine) {
        if (self.predicate)(id, m) {
            self.inner.end(id, m);
        }
    }
    fn handle(&mut self, id: u64, m: &Machine) {
        if (self.predicate)(id, m) {
            self.inner.handle(id, m);
        }
    }
    fn context(&self, id: u64, key: &str) -> Option<String> {
        self.inner.context(id, key)
    }
}

/// Composes a list of tracers: every event runs on all of them, in order,
/// except `handle`, which runs in reverse (so outer tracers see a machine
/// torn down before inner ones forget it). Grounded on `x/tracer/multi.go`.
#[derive(Default)]
pub struct MultiTracer {
    tracers: Vec<Box<dyn Tracer>>,
}

impl MultiTracer {
    pub fn new(tracers: Vec<Box<dyn Tracer>>) -> Self {
        Self { tracers }
    }
}

impl Tracer for MultiTracer {
    fn begin(&mut self, id: u64, m: &Machine) {
        for t in &mut self.tracers {
            t.begin(id, m);
        }
    }
    fn before(&mut self, id: u64, m: &Machine) {
        for t in &mut self.tracers {
            t.before(id, m);
        }
    }
    fn after(&mut self, id: u64, m: &Machine) {
        for t in &mut self.tracers {
            t.after(id, m);
        }
    }
    fn queue(&mut self, parent: u64, child: u64, m: &Machine) {
        for t in &mut self.tracers {
            t.queue(parent, child, m);
        }
    }
    fn end(&mut self, id: u64, m: &Machine) {
        for t in &mut self.tracers {
            t.end(id, m);
        }
    }
    fn handle(&mut self, id: u64, m: &Machine) {
        for t in self.tracers.iter_mut().rev() {
            t.handle(id, m);
        }
    }
    fn context(&self, id: u64, key: &str) -> Option<String> {
        self.tracers.iter().find_map(|t| t.context(id, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m() -> Machine {
        Machine::new(0, 0x1000)
    }

    #[test]
    fn counting_tracer_tracks_steps_and_inherits_on_fork() {
        let mut t = CountingTracer::new();
        t.before(1, &m());
        t.before(1, &m());
        t.queue(1, 2, &m());
        assert_eq!(t.count(1), 2);
        assert_eq!(t.count(2), 2);
        t.handle(1, &m());
        assert_eq!(t.count(1), 0);
    }

    #[test]
    fn id_tracer_assigns_shared_tree_id_across_forks() {
        let mut t = IdTracer::new();
        t.begin(1, &m());
        t.queue(1, 2, &m());
        let root = t.id_of(1).unwrap();
        let child = t.id_of(2).unwrap();
        assert_eq!(root.tree, 1);
        assert_eq!(child.tree, 1);
        assert_eq!(child.parent, 1);
    }

    #[test]
    fn multi_tracer_runs_handle_in_reverse_order() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let order = Rc::new(RefCell::new(Vec::new()));
        struct Tagging(Rc<RefCell<Vec<&'static str>>>, &'static str);
        impl Tracer for Tagging {
            fn handle(&mut self, _id: u64, _m: &Machine) {
                self.0.borrow_mut().push(self.1);
            }
        }
        let mut multi = MultiTracer::new(vec![
            Box::new(Tagging(order.clone(), "first")),
            Box::new(Tagging(order.clone(), "second")),
        ]);
        multi.handle(1, &m());
        assert_eq!(*order.borrow(), vec!["second", "first"]);
    }
}
