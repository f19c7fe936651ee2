use crate::error::{AllocError, Result};

/// Node capacity, in elements, used when no other capacity is configured.
pub const DEFAULT_CAPACITY: usize = 1024;

/// How [`NodeAllocator::rebind`](crate::NodeAllocator::rebind) sizes the nodes
/// of the allocator it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebindCapacity {
  /// Every rebound node holds `default_capacity` elements of the new type,
  /// whatever the source node held.
  #[default]
  Default,
  /// Every rebound node keeps the byte size of its source node, so it holds
  /// `source_bytes / size_of::<U>()` elements (at least one).
  PreserveBytes,
}

/// What deallocation does with the memory it is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reclaim {
  /// Track live counts per node and recycle or release a node once it is
  /// empty.
  #[default]
  Nodes,
  /// Deallocation is a no-op. Blocks go back to the system only when the
  /// allocator is dropped.
  Never,
}

/// Allocator settings, fixed at construction and carried over by clone and
/// rebind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  default_capacity: usize,
  rebind_capacity: RebindCapacity,
  reclaim: Reclaim,
}

impl Config {
  pub fn new(default_capacity: usize) -> Self {
    Self {
      default_capacity,
      ..Self::default()
    }
  }

  pub fn with_rebind_capacity(
    mut self,
    rebind_capacity: RebindCapacity,
  ) -> Self {
    self.rebind_capacity = rebind_capacity;
    self
  }

  pub fn with_reclaim(
    mut self,
    reclaim: Reclaim,
  ) -> Self {
    self.reclaim = reclaim;
    self
  }

  /// Capacity, in elements, of the first node and the minimum capacity of
  /// every node created on growth.
  pub fn default_capacity(&self) -> usize {
    self.default_capacity
  }

  pub fn rebind_capacity(&self) -> RebindCapacity {
    self.rebind_capacity
  }

  pub fn reclaim(&self) -> Reclaim {
    self.reclaim
  }

  pub fn validate(&self) -> Result<()> {
    if self.default_capacity == 0 {
      return Err(AllocError::InvalidConfig("default node capacity must be positive"));
    }
    Ok(())
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      default_capacity: DEFAULT_CAPACITY,
      rebind_capacity: RebindCapacity::default(),
      reclaim: Reclaim::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.default_capacity(), DEFAULT_CAPACITY);
    assert_eq!(config.rebind_capacity(), RebindCapacity::Default);
    assert_eq!(config.reclaim(), Reclaim::Nodes);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_builder() {
    let config = Config::new(16)
      .with_rebind_capacity(RebindCapacity::PreserveBytes)
      .with_reclaim(Reclaim::Never);

    assert_eq!(config.default_capacity(), 16);
    assert_eq!(config.rebind_capacity(), RebindCapacity::PreserveBytes);
    assert_eq!(config.reclaim(), Reclaim::Never);
  }

  #[test]
  fn test_zero_capacity_rejected() {
    assert!(matches!(
      Config::new(0).validate(),
      Err(AllocError::InvalidConfig(_))
    ));
  }
}
