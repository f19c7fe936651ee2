use std::fmt;

/// Decision points of a [`NodeAllocator`](crate::NodeAllocator), handed to
/// its [`EventSink`].
///
/// Addresses are plain integers so events can be stored and compared after
/// the memory they describe is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
  /// A node was appended at index `node`.
  NodeCreated {
    node: usize,
    capacity: usize,
    bytes: usize,
    start: usize,
  },
  /// `count` elements were served from `node`. `grew` is set when the node
  /// had to be created for this request.
  Allocated {
    count: usize,
    bytes: usize,
    node: usize,
    addr: usize,
    grew: bool,
  },
  /// `count` elements went back to `node`, leaving `live` elements in it.
  Deallocated {
    count: usize,
    addr: usize,
    node: usize,
    live: usize,
  },
  /// Deallocation was skipped because reclamation is disabled.
  Retained { count: usize, addr: usize },
  /// The empty tail node's cursor went back to the start of its block.
  NodeReset { node: usize },
  /// An empty node moved from index `from` to the tail, cursor reset.
  NodeRecycled { from: usize, node: usize },
  /// An empty node's block was returned to the system.
  NodeReleased { start: usize, remaining: usize },
  /// A fresh allocator was made from one with `nodes` nodes.
  Cloned { nodes: usize },
  /// An allocator for elements of `elem_size` bytes was made with `nodes`
  /// nodes.
  Rebound { nodes: usize, elem_size: usize },
  /// The allocator was dropped, releasing `nodes` blocks.
  Dropped { nodes: usize },
}

impl fmt::Display for Event {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match *self {
      Event::NodeCreated {
        node,
        capacity,
        bytes,
        start,
      } => write!(
        f,
        "initialize node {node}: {capacity} elements, {bytes} bytes at {start:#x}"
      ),
      Event::Allocated {
        count,
        bytes,
        node,
        addr,
        grew,
      } => {
        let memory = if grew { "new" } else { "existing" };
        write!(
          f,
          "allocated {count} elements ({bytes} bytes) at {addr:#x} from {memory} node {node}"
        )
      }
      Event::Deallocated {
        count,
        addr,
        node,
        live,
      } => write!(
        f,
        "deallocated {count} elements at {addr:#x} from node {node}, {live} still live"
      ),
      Event::Retained { count, addr } => {
        write!(f, "kept {count} elements at {addr:#x}, reclamation disabled")
      }
      Event::NodeReset { node } => write!(f, "moved cursor of node {node} back to start"),
      Event::NodeRecycled { from, node } => {
        write!(f, "recycled empty node {from} as tail node {node}")
      }
      Event::NodeReleased { start, remaining } => {
        write!(f, "released block at {start:#x}, {remaining} nodes left")
      }
      Event::Cloned { nodes } => write!(f, "copied allocator with {nodes} nodes"),
      Event::Rebound { nodes, elem_size } => {
        write!(f, "rebound {nodes} nodes for {elem_size}-byte elements")
      }
      Event::Dropped { nodes } => write!(f, "removing {nodes} nodes in destructor"),
    }
  }
}

/// Receives allocator events. The allocator behaves the same whatever the
/// sink does with them.
///
/// Events are recorded once the allocator's own bookkeeping is finished, so a
/// sink may query the allocator it is attached to (`stats`, `node_count`).
pub trait EventSink {
  fn record(
    &self,
    event: &Event,
  );
}

/// Discards every event. The default sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopSink;

impl EventSink for NoopSink {
  #[inline(always)]
  fn record(
    &self,
    _: &Event,
  ) {
  }
}

/// Forwards events to [`tracing`] at debug level under the `nodealloc`
/// target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingSink;

impl EventSink for TracingSink {
  fn record(
    &self,
    event: &Event,
  ) {
    match *event {
      Event::NodeCreated {
        node,
        capacity,
        bytes,
        start,
      } => tracing::debug!(
        target: "nodealloc",
        node,
        capacity,
        bytes,
        start = %format!("{start:#x}"),
        "Initialized node"
      ),
      Event::Allocated {
        count,
        bytes,
        node,
        addr,
        grew,
      } => tracing::debug!(
        target: "nodealloc",
        count,
        bytes,
        node,
        grew,
        addr = %format!("{addr:#x}"),
        "Allocated elements"
      ),
      Event::Deallocated {
        count,
        addr,
        node,
        live,
      } => tracing::debug!(
        target: "nodealloc",
        count,
        node,
        live,
        addr = %format!("{addr:#x}"),
        "Deallocated elements"
      ),
      Event::Retained { count, addr } => tracing::trace!(
        target: "nodealloc",
        count,
        addr = %format!("{addr:#x}"),
        "Kept elements, reclamation disabled"
      ),
      Event::NodeReleased { start, remaining } => tracing::debug!(
        target: "nodealloc",
        remaining,
        start = %format!("{start:#x}"),
        "Released node block"
      ),
      _ => tracing::debug!(target: "nodealloc", "{event}"),
    }
  }
}

impl<S: EventSink + ?Sized> EventSink for &S {
  fn record(
    &self,
    event: &Event,
  ) {
    (**self).record(event)
  }
}

impl<S: EventSink + ?Sized> EventSink for std::rc::Rc<S> {
  fn record(
    &self,
    event: &Event,
  ) {
    (**self).record(event)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    io,
    sync::{Arc, Mutex},
  };

  use super::*;

  #[test]
  fn test_display() {
    let event = Event::NodeCreated {
      node: 1,
      capacity: 4,
      bytes: 16,
      start: 0x1000,
    };
    assert_eq!(
      event.to_string(),
      "initialize node 1: 4 elements, 16 bytes at 0x1000"
    );

    let event = Event::Allocated {
      count: 2,
      bytes: 8,
      node: 0,
      addr: 0x20,
      grew: false,
    };
    assert_eq!(
      event.to_string(),
      "allocated 2 elements (8 bytes) at 0x20 from existing node 0"
    );
  }

  #[derive(Clone, Default)]
  struct Buffer(Arc<Mutex<Vec<u8>>>);

  impl io::Write for Buffer {
    fn write(
      &mut self,
      buf: &[u8],
    ) -> io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn test_tracing_sink_emits() {
    let buffer = Buffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::TRACE)
      .with_ansi(false)
      .with_writer(move || writer.clone())
      .finish();

    tracing::subscriber::with_default(subscriber, || {
      TracingSink.record(&Event::NodeReleased {
        start: 0x40,
        remaining: 1,
      });
      TracingSink.record(&Event::Dropped { nodes: 3 });
    });

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Released node block"));
    assert!(output.contains("remaining=1"));
    assert!(output.contains("removing 3 nodes in destructor"));
  }
}
