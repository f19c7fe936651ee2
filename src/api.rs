use std::{mem, ptr::NonNull};

use allocator_api2::alloc::{AllocError, Allocator, Layout};

use crate::{allocator::NodeAllocator, event::EventSink};

/// Element count of `T` needed to hold `layout`.
///
/// Layouts aligned more strictly than `T` cannot be served.
fn elements_for<T>(layout: Layout) -> Result<usize, AllocError> {
  if layout.align() > mem::align_of::<T>() {
    return Err(AllocError);
  }
  if layout.size() == 0 {
    return Ok(0);
  }
  match mem::size_of::<T>() {
    0 => Err(AllocError),
    size => Ok(layout.size().div_ceil(size)),
  }
}

/// Containers hold the allocator by reference. Copies of a reference are the
/// same allocator, so memory from one copy can be freed through another; an
/// owned [`NodeAllocator`] clone has nodes of its own and could not honor
/// that.
unsafe impl<T, S: EventSink> Allocator for &NodeAllocator<T, S> {
  fn allocate(
    &self,
    layout: Layout,
  ) -> Result<NonNull<[u8]>, AllocError> {
    let count = elements_for::<T>(layout)?;
    let ptr = NodeAllocator::allocate(*self, count)?;

    Ok(NonNull::slice_from_raw_parts(
      ptr.cast(),
      count * mem::size_of::<T>(),
    ))
  }

  unsafe fn deallocate(
    &self,
    ptr: NonNull<u8>,
    layout: Layout,
  ) {
    if let Ok(count) = elements_for::<T>(layout) {
      unsafe { NodeAllocator::deallocate(*self, ptr.cast(), count) }
    }
  }
}

#[cfg(test)]
mod tests {
  use allocator_api2::{boxed::Box, vec::Vec};

  use super::*;
  use crate::config::Config;

  #[test]
  fn test_elements_for() {
    assert_eq!(elements_for::<u32>(Layout::new::<u32>()).ok(), Some(1));
    assert_eq!(elements_for::<u32>(Layout::array::<u32>(5).unwrap()).ok(), Some(5));
    assert_eq!(elements_for::<u32>(Layout::array::<u8>(5).unwrap()).ok(), Some(2));
    assert_eq!(elements_for::<u32>(Layout::array::<u8>(0).unwrap()).ok(), Some(0));
    assert!(elements_for::<u32>(Layout::new::<u64>()).is_err());
    assert!(elements_for::<()>(Layout::new::<u8>()).is_err());
  }

  #[test]
  fn test_vec_push() {
    let allocator = NodeAllocator::<u32>::with_capacity(16);
    let mut values: Vec<u32, _> = Vec::new_in(&allocator);

    for i in 0..1000 {
      values.push(i);
    }

    assert_eq!(values.len(), 1000);
    assert!(values.iter().copied().eq(0..1000));
    assert!(allocator.owns(NonNull::from(&values[0])));

    let live: usize = allocator.stats().iter().map(|node| node.live).sum();
    assert!(live >= 1000);
    drop(values);

    let live: usize = allocator.stats().iter().map(|node| node.live).sum();
    assert_eq!(live, 0);
  }

  #[test]
  fn test_boxed_values() {
    let allocator = NodeAllocator::<u64>::with_capacity(8);
    let boxes: std::vec::Vec<Box<u64, &NodeAllocator<u64>>> = (0..100)
      .map(|value| Box::new_in(value, &allocator))
      .collect();

    // 100 single-element allocations, 8 per node
    assert_eq!(allocator.node_count(), 13);
    assert!(boxes.iter().map(|value| **value).eq(0..100));

    // front to back: the first node is recycled as the tail, every later
    // node finds an empty tail and is released
    drop(boxes);
    assert_eq!(allocator.node_count(), 1);
    assert_eq!(allocator.stats()[0].live, 0);
    assert_eq!(allocator.stats()[0].used, 0);
  }

  #[test]
  fn test_over_aligned_layout_refused() {
    let allocator = NodeAllocator::<u8>::new_in(Config::new(64), crate::event::NoopSink);

    assert!(Allocator::allocate(&&allocator, Layout::new::<u64>()).is_err());
    assert_eq!(allocator.stats()[0].used, 0);
  }

  /// Frees through a copy of the handle it allocated with.
  fn free_through_copy<A: Allocator + Copy>(
    allocator: A,
    layout: Layout,
  ) {
    let block = allocator.allocate(layout).unwrap();
    let copy = allocator;
    unsafe { copy.deallocate(block.cast(), layout) };
  }

  #[test]
  fn test_copied_handles_share_nodes() {
    let allocator = NodeAllocator::<u32>::with_capacity(4);
    let first = &allocator;
    let second = first;

    let layout = Layout::array::<u32>(3).unwrap();
    let block = Allocator::allocate(&first, layout).unwrap();
    assert_eq!(block.len(), 12);
    assert_eq!(allocator.stats()[0].live, 3);

    unsafe { Allocator::deallocate(&second, block.cast(), layout) };
    assert_eq!(allocator.stats()[0].live, 0);
    assert_eq!(allocator.stats()[0].used, 0);

    free_through_copy(&allocator, Layout::new::<u32>());
    assert_eq!(allocator.node_count(), 1);
    assert_eq!(allocator.stats()[0].live, 0);
  }
}
