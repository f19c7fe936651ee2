use std::ptr::{self, NonNull};

use libc::c_void;

use crate::{
  align,
  align::block_align,
  error::{AllocError, Result},
};

/// Snapshot of one node, as returned by
/// [`NodeAllocator::stats`](crate::NodeAllocator::stats).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStats {
  /// Address of the first byte of the block.
  pub start: usize,
  /// Capacity in elements.
  pub capacity: usize,
  /// Usable bytes, `capacity * size_of::<T>()`.
  pub bytes: usize,
  /// Bytes already handed out since the last reset.
  pub used: usize,
  /// Elements currently allocated from this node.
  pub live: usize,
  /// Live count copied from the source node of a rebind. Informational only.
  pub inherited: usize,
}

impl NodeStats {
  /// One past the last usable byte.
  pub fn end(&self) -> usize {
    self.start + self.bytes
  }

  pub fn contains(
    &self,
    addr: usize,
  ) -> bool {
    addr >= self.start && addr < self.end()
  }
}

/// A backing block plus its bump cursor.
///
/// ```text
///   data                    data + cursor               data + limit
///    │                            │                           │
///    ▼                            ▼                           ▼
///    ┌──────┬──────┬──────────────┬───────────────────────────┐
///    │  A1  │  A2  │      A3      │         free              │
///    └──────┴──────┴──────────────┴───────────────────────────┘
/// ```
///
/// `0 <= cursor <= limit` always holds. The block is released exactly once,
/// when the node is dropped.
pub(crate) struct Node {
  data: NonNull<u8>,
  cursor: usize,
  limit: usize,
  capacity: usize,
  live: usize,
  inherited: usize,
}

impl Node {
  /// Obtains a block for `capacity` elements of `size` bytes aligned to
  /// `align`.
  pub(crate) fn new(
    capacity: usize,
    size: usize,
    align: usize,
  ) -> Result<Self> {
    let limit = capacity
      .checked_mul(size)
      .filter(|bytes| *bytes <= isize::MAX as usize)
      .ok_or(AllocError::CapacityExceeded {
        requested: capacity,
        max: isize::MAX as usize / size.max(1),
      })?;

    let bytes = align!(limit.max(1));
    let align = block_align(align);

    let mut raw: *mut c_void = ptr::null_mut();
    let rc = unsafe { libc::posix_memalign(&mut raw, align, bytes) };
    if rc != 0 {
      return Err(AllocError::Exhausted { bytes, align });
    }
    let data = NonNull::new(raw as *mut u8).ok_or(AllocError::Exhausted { bytes, align })?;

    Ok(Self {
      data,
      cursor: 0,
      limit,
      capacity,
      live: 0,
      inherited: 0,
    })
  }

  pub(crate) fn start(&self) -> usize {
    self.data.as_ptr() as usize
  }

  pub(crate) fn limit(&self) -> usize {
    self.limit
  }

  pub(crate) fn live(&self) -> usize {
    self.live
  }

  pub(crate) fn fits(
    &self,
    bytes: usize,
  ) -> bool {
    bytes <= self.limit - self.cursor
  }

  /// Hands out `bytes` from the cursor and charges `count` elements to the
  /// node. The caller has checked [`Node::fits`].
  pub(crate) fn bump(
    &mut self,
    bytes: usize,
    count: usize,
  ) -> NonNull<u8> {
    debug_assert!(self.fits(bytes));

    let ptr = unsafe { self.data.add(self.cursor) };
    self.cursor += bytes;
    self.live += count;
    ptr
  }

  pub(crate) fn contains(
    &self,
    addr: usize,
  ) -> bool {
    addr >= self.start() && addr < self.start() + self.limit
  }

  /// Returns `count` elements to the node and yields the remaining live count.
  ///
  /// Panics if more elements are returned than were handed out.
  pub(crate) fn release(
    &mut self,
    count: usize,
  ) -> usize {
    self.live = match self.live.checked_sub(count) {
      Some(live) => live,
      None => panic!(
        "node at {:#x} released {} elements but only {} are live",
        self.start(),
        count,
        self.live
      ),
    };
    self.live
  }

  pub(crate) fn reset(&mut self) {
    debug_assert_eq!(self.live, 0);
    self.cursor = 0;
  }

  pub(crate) fn set_inherited(
    &mut self,
    inherited: usize,
  ) {
    self.inherited = inherited;
  }

  pub(crate) fn stats(&self) -> NodeStats {
    NodeStats {
      start: self.start(),
      capacity: self.capacity,
      bytes: self.limit,
      used: self.cursor,
      live: self.live,
      inherited: self.inherited,
    }
  }
}

impl Drop for Node {
  fn drop(&mut self) {
    unsafe { libc::free(self.data.as_ptr() as *mut c_void) };
  }
}
