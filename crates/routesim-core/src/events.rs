//! Timed events and the per-router event queue.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::package::Package;
use crate::topology::NodeId;
use crate::units::SimTime;

/// A timestamped event on a router's queue.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Event {
    /// When the event is due for dispatch.
    pub due: SimTime,
    /// What happens.
    pub kind: EventKind,
}

/// The event taxonomy. `ProcessPkg` is derived internally by the router from `IncomingPkg`;
/// everything else arrives from the outside.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum EventKind {
    /// A package arrives on the wire. `sender` is `None` for externally injected traffic.
    IncomingPkg {
        sender: Option<NodeId>,
        pkg: Package,
    },
    /// The package reaches the head of the router's processing queue.
    ProcessPkg {
        sender: Option<NodeId>,
        pkg: Package,
    },
    /// The link to `neighbor` goes down.
    LinkBreak { neighbor: NodeId },
    /// The link to `neighbor` comes back up.
    LinkRestore { neighbor: NodeId },
}

#[derive(Debug)]
struct Scheduled {
    due: SimTime,
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// An ordered multiset of pending events. Events pop in timestamp order; equal timestamps pop in
/// insertion order (the `seq` counter breaks ties).
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an event by timestamp.
    pub fn schedule(&mut self, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled {
            due: event.due,
            seq,
            event,
        }));
    }

    /// Removes and returns the minimum-timestamp event.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(s)| s.event)
    }

    /// The timestamp of the next event, if any.
    pub fn next_due(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(s)| s.due)
    }

    delegate::delegate! {
        to self.heap {
            /// The number of pending events.
            pub fn len(&self) -> usize;

            /// Whether the queue is empty.
            pub fn is_empty(&self) -> bool;
        }
    }
}
