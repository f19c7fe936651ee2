use thiserror::Error;

/// Failures reported by [`NodeAllocator`](crate::NodeAllocator).
///
/// Broken bookkeeping (double free, a pointer no node owns) is not an error
/// value: it panics.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// The element count is larger than a single allocation can represent.
  #[error("requested {requested} elements, at most {max} fit in one allocation")]
  CapacityExceeded { requested: usize, max: usize },

  /// The C allocator refused to hand out a node block.
  #[error("backing store refused {bytes} bytes aligned to {align}")]
  Exhausted { bytes: usize, align: usize },

  /// The allocator configuration was rejected before any node was created.
  #[error("invalid configuration: {0}")]
  InvalidConfig(&'static str),
}

pub type Result<T, E = AllocError> = std::result::Result<T, E>;

impl From<AllocError> for allocator_api2::alloc::AllocError {
  fn from(_: AllocError) -> Self {
    allocator_api2::alloc::AllocError
  }
}
