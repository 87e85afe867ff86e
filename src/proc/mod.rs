// src/proc/mod.rs

//! Child process lifecycle.
//!
//! - [`launcher`] forks a child, wires its standard streams and execs the
//!   target program.
//! - [`reaper`] waits on children (blocking or not) and classifies how they
//!   ended.
//! - [`pool`] caps how many asynchronous children may be alive at once.
//!
//! [`ProcSet`] is the bookkeeping shared by the pool: a flat list of pids.

pub mod launcher;
pub mod pool;
pub mod reaper;

use std::ops::Index;

pub use nix::unistd::Pid;

pub use launcher::{StdioFds, launch};
pub use pool::{POLL_INTERVAL, ProcPool};
pub use reaper::{Probe, try_wait, wait};

/// Unordered set of in-flight child pids.
///
/// Removal swaps the removed slot with the last element, so it is O(1) but
/// **does not preserve order**: an index is only meaningful until the next
/// removal.
#[derive(Debug, Default, Clone)]
pub struct ProcSet {
    items: Vec<Pid>,
}

impl ProcSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pid: Pid) {
        self.items.push(pid);
    }

    /// Remove the pid at `index`, moving the last pid into its place.
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> Pid {
        self.items.swap_remove(index)
    }

    pub fn get(&self, index: usize) -> Option<Pid> {
        self.items.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.items.contains(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[Pid] {
        &self.items
    }

    /// Take every pid out, leaving the set empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Pid> {
        self.items.drain(..)
    }
}

impl Index<usize> for ProcSet {
    type Output = Pid;

    fn index(&self, index: usize) -> &Pid {
        &self.items[index]
    }
}

impl Extend<Pid> for ProcSet {
    fn extend<T: IntoIterator<Item = Pid>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl FromIterator<Pid> for ProcSet {
    fn from_iter<T: IntoIterator<Item = Pid>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
