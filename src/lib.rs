//! # nodealloc - A Node-Based Arena Allocator
//!
//! This crate provides a typed **bump allocator** that hands out runs of
//! elements from a list of large backing blocks ("nodes") instead of calling
//! the system allocator for every request.
//!
//! ## Overview
//!
//! ```text
//!   NodeAllocator<T>:
//!
//!   ┌────────────────────────────┐  ┌────────────────┐  ┌──────────────────────────┐
//!   │ node 0                     │  │ node 1         │  │ node 2 (tail)            │
//!   │ ┌────┬────┬──────┬──────┐  │  │ ┌────────────┐ │  │ ┌────┬─────────────────┐ │
//!   │ │ A1 │ A2 │  A3  │ ...  │  │  │ │     A4     │ │  │ │ A5 │      free       │ │
//!   │ └────┴────┴──────┴──────┘  │  │ └────────────┘ │  │ └────┴─────────────────┘ │
//!   │ live: 4                    │  │ live: 10       │  │ live: 1  ▲               │
//!   └────────────────────────────┘  └────────────────┘  └──────────┼───────────────┘
//!                                                                  │
//!                                                               cursor
//!                                                            (next alloc)
//! ```
//!
//! Only the tail node serves new requests. When the tail cannot fit a
//! request, a node of `max(default_capacity, count)` elements is appended.
//! Nodes never move, so growth never invalidates memory already handed out.
//!
//! ## Crate Structure
//!
//! ```text
//!   nodealloc
//!   ├── align      - Word rounding macro (align!)
//!   ├── allocator  - NodeAllocator: allocate, deallocate, clone, rebind
//!   ├── api        - allocator_api2::Allocator for &NodeAllocator
//!   ├── config     - Config, RebindCapacity, Reclaim
//!   ├── error      - AllocError
//!   ├── event      - Event, EventSink, NoopSink, TracingSink
//!   └── node       - Node block bookkeeping, NodeStats
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use nodealloc::NodeAllocator;
//!
//! let allocator = NodeAllocator::<u64>::with_capacity(256);
//!
//! let ptr = allocator.allocate(4).unwrap();
//! unsafe {
//!     for i in 0..4 {
//!         ptr.as_ptr().add(i).write(i as u64);
//!     }
//!     assert_eq!(*ptr.as_ptr().add(3), 3);
//!     allocator.deallocate(ptr, 4);
//! }
//! ```
//!
//! Containers take the allocator by reference through
//! [`allocator_api2`]:
//!
//! ```rust
//! use allocator_api2::vec::Vec;
//! use nodealloc::NodeAllocator;
//!
//! let allocator = NodeAllocator::<u32>::with_capacity(1024);
//! let mut values: Vec<u32, _> = Vec::new_in(&allocator);
//! values.extend(0..100);
//! assert_eq!(values.iter().sum::<u32>(), 4950);
//! ```
//!
//! ## Deallocation
//!
//! Every node counts the elements still allocated from it. With the default
//! [`Reclaim::Nodes`] policy a node that drops to zero is recycled:
//!
//! ```text
//!   emptied node       tail state            result
//!   ────────────       ──────────            ──────
//!   the tail           -                     cursor reset, block kept
//!   not the tail       empty                 block released
//!   not the tail       live elements         moved to the tail, reset
//! ```
//!
//! [`Reclaim::Never`] turns deallocation into a no-op for build-then-discard
//! workloads; all blocks go back to the system when the allocator drops.
//!
//! ## Rebinding
//!
//! [`NodeAllocator::rebind`] produces an allocator for another element type
//! with the same number of nodes. Node sizes follow [`RebindCapacity`].
//!
//! ## Diagnostics
//!
//! Decision points are reported as [`Event`]s to the allocator's
//! [`EventSink`]. [`NoopSink`] is the default; [`TracingSink`] forwards to
//! [`tracing`].
//!
//! ## Limitations
//!
//! - **Single-threaded only**: the allocator is neither `Send` nor `Sync`
//! - **No free list**: space inside a node is reused only once the whole
//!   node is empty
//! - **Unix-only**: blocks come from `libc::posix_memalign`

pub mod align;
mod allocator;
mod api;
mod config;
mod error;
mod event;
mod node;

pub use allocator::NodeAllocator;
pub use config::{Config, DEFAULT_CAPACITY, RebindCapacity, Reclaim};
pub use error::{AllocError, Result};
pub use event::{Event, EventSink, NoopSink, TracingSink};
pub use node::NodeStats;
