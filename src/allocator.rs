use std::{
  alloc::{self, Layout},
  cell::RefCell,
  fmt,
  marker::PhantomData,
  mem,
  ptr::{self, NonNull},
};

use crate::{
  align::block_align,
  config::{Config, RebindCapacity, Reclaim},
  error::{AllocError, Result},
  event::{Event, EventSink, NoopSink},
  node::{Node, NodeStats},
};

/// Arena allocator for elements of `T`, carving allocations out of a growing
/// list of nodes.
///
/// Requests are always served from the last node (the tail). When the tail
/// cannot fit a request, a node of `max(default_capacity, count)` elements is
/// appended and becomes the tail. Nodes never move, so memory handed out
/// stays valid until it is deallocated or the allocator is dropped.
///
/// The allocator is single threaded: it is neither `Send` nor `Sync`.
pub struct NodeAllocator<T, S: EventSink = NoopSink> {
  nodes: RefCell<Vec<Node>>,
  config: Config,
  sink: S,
  _marker: PhantomData<fn() -> T>,
}

impl<T> NodeAllocator<T> {
  /// Creates an allocator with the default configuration.
  ///
  /// Aborts through [`handle_alloc_error`](alloc::handle_alloc_error) if the
  /// first node cannot be obtained.
  pub fn new() -> Self {
    Self::new_in(Config::default(), NoopSink)
  }

  /// Creates an allocator whose nodes hold at least `default_capacity`
  /// elements.
  pub fn with_capacity(default_capacity: usize) -> Self {
    Self::new_in(Config::new(default_capacity), NoopSink)
  }

  pub fn try_with_config(config: Config) -> Result<Self> {
    Self::try_new_in(config, NoopSink)
  }
}

impl<T, S: EventSink> NodeAllocator<T, S> {
  pub fn new_in(
    config: Config,
    sink: S,
  ) -> Self {
    Self::try_new_in(config, sink).unwrap_or_else(|err| fail(err))
  }

  /// Creates an allocator with one empty node of
  /// [`Config::default_capacity`] elements.
  pub fn try_new_in(
    config: Config,
    sink: S,
  ) -> Result<Self> {
    config.validate()?;

    let node = Node::new(config.default_capacity(), mem::size_of::<T>(), mem::align_of::<T>())?;
    sink.record(&Event::NodeCreated {
      node: 0,
      capacity: config.default_capacity(),
      bytes: node.limit(),
      start: node.start(),
    });

    Ok(Self {
      nodes: RefCell::new(vec![node]),
      config,
      sink,
      _marker: PhantomData,
    })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn sink(&self) -> &S {
    &self.sink
  }

  /// Largest element count a single allocation may request.
  pub fn max_size(&self) -> usize {
    match mem::size_of::<T>() {
      0 => usize::MAX,
      size => isize::MAX as usize / size,
    }
  }

  /// Allocates room for `count` contiguous elements of `T`.
  ///
  /// The memory is uninitialized and aligned for `T`. Requests for zero
  /// elements, or for zero-sized `T`, return a dangling pointer and touch no
  /// node.
  ///
  /// # Errors
  ///
  /// [`AllocError::CapacityExceeded`] if `count` is above
  /// [`max_size`](Self::max_size), [`AllocError::Exhausted`] if a new node
  /// was needed and the system refused its block.
  pub fn allocate(
    &self,
    count: usize,
  ) -> Result<NonNull<T>> {
    let max = self.max_size();
    if count > max {
      return Err(AllocError::CapacityExceeded {
        requested: count,
        max,
      });
    }

    let size = mem::size_of::<T>();
    if count == 0 || size == 0 {
      return Ok(NonNull::dangling());
    }

    let bytes = count * size;
    let mut nodes = self.nodes.borrow_mut();

    let grew = !nodes.last().is_some_and(|tail| tail.fits(bytes));
    let mut created = None;
    if grew {
      let capacity = count.max(self.config.default_capacity());
      let node = Node::new(capacity, size, mem::align_of::<T>())?;
      created = Some(Event::NodeCreated {
        node: nodes.len(),
        capacity,
        bytes: node.limit(),
        start: node.start(),
      });
      nodes.push(node);
    }

    let index = nodes.len() - 1;
    let ptr = nodes[index].bump(bytes, count);
    drop(nodes);

    // sinks may inspect the allocator, so events go out with no borrow held
    if let Some(event) = created {
      self.sink.record(&event);
    }
    self.sink.record(&Event::Allocated {
      count,
      bytes,
      node: index,
      addr: ptr.as_ptr() as usize,
      grew,
    });

    Ok(ptr.cast())
  }

  /// Returns `count` elements starting at `ptr` to the allocator.
  ///
  /// With [`Reclaim::Never`] this does nothing. Otherwise the owning node's
  /// live count drops by `count`, and a node left with no live elements is
  /// reused or released:
  ///
  /// ```text
  ///   emptied node is the tail         -> cursor back to start, kept
  ///   tail is already empty            -> block released, node removed
  ///   tail still has live elements     -> node moved to the tail, reset
  /// ```
  ///
  /// # Panics
  ///
  /// If no node owns `ptr`, or `count` is larger than the owning node's live
  /// count.
  ///
  /// # Safety
  ///
  /// `ptr` must come from [`allocate`](Self::allocate) on this allocator with
  /// the same `count`, and must not be used afterwards. Once a node is
  /// released every pointer into it dangles.
  pub unsafe fn deallocate(
    &self,
    ptr: NonNull<T>,
    count: usize,
  ) {
    if count == 0 || mem::size_of::<T>() == 0 {
      return;
    }

    let addr = ptr.as_ptr() as usize;
    if self.config.reclaim() == Reclaim::Never {
      self.sink.record(&Event::Retained { count, addr });
      return;
    }

    let mut nodes = self.nodes.borrow_mut();
    let Some(index) = nodes.iter().position(|node| node.contains(addr)) else {
      panic!("deallocating {addr:#x} which no node owns");
    };

    let live = nodes[index].release(count);
    let reclaimed = (live == 0).then(|| reclaim(&mut nodes, index));
    drop(nodes);

    self.sink.record(&Event::Deallocated {
      count,
      addr,
      node: index,
      live,
    });
    if let Some(event) = reclaimed {
      self.sink.record(&event);
    }
  }

  /// Writes `value` into the slot at `ptr`.
  ///
  /// # Safety
  ///
  /// `ptr` must point into memory allocated by this allocator and still
  /// live. Whatever the slot held before is overwritten without being
  /// dropped.
  pub unsafe fn construct(
    &self,
    ptr: NonNull<T>,
    value: T,
  ) {
    unsafe { ptr.as_ptr().write(value) }
  }

  /// Drops the value at `ptr` in place, leaving the slot allocated.
  ///
  /// # Safety
  ///
  /// `ptr` must hold an initialized `T` that is not used again.
  pub unsafe fn destroy(
    &self,
    ptr: NonNull<T>,
  ) {
    unsafe { ptr::drop_in_place(ptr.as_ptr()) }
  }

  pub fn node_count(&self) -> usize {
    self.nodes.borrow().len()
  }

  /// One entry per node, oldest first. The last entry is the tail.
  pub fn stats(&self) -> Vec<NodeStats> {
    self.nodes.borrow().iter().map(Node::stats).collect()
  }

  /// Whether `ptr` falls inside one of this allocator's blocks.
  pub fn owns(
    &self,
    ptr: NonNull<T>,
  ) -> bool {
    let addr = ptr.as_ptr() as usize;
    self.nodes.borrow().iter().any(|node| node.contains(addr))
  }
}

impl<T, S: EventSink + Clone> NodeAllocator<T, S> {
  /// Creates a fresh allocator with the same configuration and sink.
  ///
  /// Nodes are not shared: the copy starts with a single empty node.
  pub fn try_clone(&self) -> Result<Self> {
    let copy = Self::try_new_in(self.config.clone(), self.sink.clone())?;
    self.sink.record(&Event::Cloned {
      nodes: self.node_count(),
    });
    Ok(copy)
  }

  /// Produces an allocator for elements of `U` with as many nodes as this
  /// one.
  ///
  /// Each node is sized by [`Config::rebind_capacity`] and records the live
  /// count of its source node in [`NodeStats::inherited`]. The new nodes hold
  /// no allocations.
  pub fn rebind<U>(&self) -> Result<NodeAllocator<U, S>> {
    let size = mem::size_of::<U>();
    let nodes = self.nodes.borrow();

    let mut rebound = Vec::with_capacity(nodes.len());
    for source in nodes.iter() {
      let capacity = match self.config.rebind_capacity() {
        RebindCapacity::Default => self.config.default_capacity(),
        RebindCapacity::PreserveBytes => (source.limit() / size.max(1)).max(1),
      };
      let mut node = Node::new(capacity, size, mem::align_of::<U>())?;
      node.set_inherited(source.live());
      rebound.push(node);
    }
    drop(nodes);

    self.sink.record(&Event::Rebound {
      nodes: rebound.len(),
      elem_size: size,
    });

    Ok(NodeAllocator {
      nodes: RefCell::new(rebound),
      config: self.config.clone(),
      sink: self.sink.clone(),
      _marker: PhantomData,
    })
  }
}

impl<T, S: EventSink + Clone> Clone for NodeAllocator<T, S> {
  fn clone(&self) -> Self {
    self.try_clone().unwrap_or_else(|err| fail(err))
  }
}

impl<T, S: EventSink + Default> Default for NodeAllocator<T, S> {
  fn default() -> Self {
    Self::new_in(Config::default(), S::default())
  }
}

/// Allocators compare equal only to themselves: memory from one can never be
/// released through another.
impl<T, S: EventSink> PartialEq for NodeAllocator<T, S> {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    ptr::eq(self, other)
  }
}

impl<T, S: EventSink> Eq for NodeAllocator<T, S> {}

impl<T, S: EventSink> fmt::Debug for NodeAllocator<T, S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("NodeAllocator")
      .field("elem", &std::any::type_name::<T>())
      .field("config", &self.config)
      .field("nodes", &self.stats())
      .finish()
  }
}

impl<T, S: EventSink> Drop for NodeAllocator<T, S> {
  fn drop(&mut self) {
    self.sink.record(&Event::Dropped {
      nodes: self.nodes.get_mut().len(),
    });
  }
}

/// Reuses or releases the emptied node at `index`, returning what was done.
fn reclaim(
  nodes: &mut Vec<Node>,
  index: usize,
) -> Event {
  let tail = nodes.len() - 1;

  if index == tail {
    nodes[index].reset();
    Event::NodeReset { node: index }
  } else if nodes[tail].live() == 0 {
    let node = nodes.remove(index);
    Event::NodeReleased {
      start: node.start(),
      remaining: nodes.len(),
    }
  } else {
    let mut node = nodes.remove(index);
    node.reset();
    nodes.push(node);
    Event::NodeRecycled {
      from: index,
      node: tail,
    }
  }
}

fn fail(err: AllocError) -> ! {
  if let AllocError::Exhausted { bytes, align } = err {
    if let Ok(layout) = Layout::from_size_align(bytes, block_align(align)) {
      alloc::handle_alloc_error(layout);
    }
  }
  panic!("{err}")
}
