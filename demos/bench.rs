use std::{ptr::NonNull, time::Instant};

use allocator_api2::vec::Vec;
use nodealloc::{Config, NodeAllocator, NoopSink, Reclaim};

const SEQUENCE_SIZE: u64 = 10_000_000;
const LIST_SIZE: u64 = 1_000_000;

/// Runs `f` and returns how long it took, in microseconds.
fn measure(f: impl FnOnce()) -> u128 {
  let start = Instant::now();
  f();
  start.elapsed().as_micros()
}

/// Pushes `size` values into a vector backed by the global allocator.
fn sequence_global(size: u64) {
  let mut values = std::vec::Vec::new();
  for value in 0..size {
    values.push(value);
  }
  std::hint::black_box(&values);
}

/// Pushes `size` values into a vector backed by a node allocator.
fn sequence_nodes(
  size: u64,
  capacity: usize,
) {
  let allocator = NodeAllocator::<u64>::with_capacity(capacity);
  let mut values: Vec<u64, _> = Vec::new_in(&allocator);
  for value in 0..size {
    values.push(value);
  }
  std::hint::black_box(&values);
}

struct Link {
  value: u64,
  next: Option<NonNull<Link>>,
}

/// Builds a singly linked list one heap node at a time.
fn list_global(size: u64) {
  let mut head: Option<Box<LinkBox>> = None;
  for value in 0..size {
    head = Some(Box::new(LinkBox { value, next: head }));
  }

  let mut sum = 0u64;
  let mut cursor = head.as_deref();
  while let Some(link) = cursor {
    sum = sum.wrapping_add(link.value);
    cursor = link.next.as_deref();
  }
  std::hint::black_box(sum);

  while let Some(mut link) = head {
    head = link.next.take();
  }
}

struct LinkBox {
  value: u64,
  next: Option<Box<LinkBox>>,
}

/// Builds the same list with every link carved out of a node allocator.
/// Links are never freed one by one: the whole arena goes at once.
fn list_nodes(
  size: u64,
  capacity: usize,
) {
  let config = Config::new(capacity).with_reclaim(Reclaim::Never);
  let allocator = NodeAllocator::<Link>::new_in(config, NoopSink);

  let mut head = None;
  for value in 0..size {
    let Ok(link) = allocator.allocate(1) else {
      tracing::error!(value, "Allocation failed");
      return;
    };
    unsafe { allocator.construct(link, Link { value, next: head }) };
    head = Some(link);
  }

  let mut sum = 0u64;
  let mut cursor = head;
  while let Some(link) = cursor {
    let link = unsafe { link.as_ref() };
    sum = sum.wrapping_add(link.value);
    cursor = link.next;
  }
  std::hint::black_box(sum);
}

fn main() {
  tracing_subscriber::fmt().with_target(false).init();

  tracing::info!(
    micros = measure(|| sequence_global(SEQUENCE_SIZE)),
    "vector, global allocator"
  );
  tracing::info!(
    micros = measure(|| sequence_nodes(SEQUENCE_SIZE, 1024 * 256)),
    "vector, node allocator"
  );

  tracing::info!(
    micros = measure(|| list_global(LIST_SIZE)),
    "list, global allocator"
  );
  tracing::info!(
    micros = measure(|| list_nodes(LIST_SIZE, 1024 * 16)),
    "list, node allocator"
  );
}
