/// Rounds `value` up to a whole number of machine words.
///
/// Node blocks are requested from the C allocator in whole words, so a node
/// holding `n` bytes of elements never asks `posix_memalign` for an odd size
/// (or for zero bytes, once the caller clamps the input to at least one).
///
/// ```rust
/// use nodealloc::align;
///
/// let word = std::mem::size_of::<usize>();
/// assert_eq!(align!(1), word);
/// assert_eq!(align!(word), word);
/// assert_eq!(align!(3 * word + 1), 4 * word);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {{
    let word = ::core::mem::size_of::<usize>();
    ($value + word - 1) & !(word - 1)
  }};
}

/// Alignment handed to `posix_memalign` for a block of elements aligned to
/// `align`. POSIX requires a power of two that is also a multiple of the
/// pointer size.
pub(crate) fn block_align(align: usize) -> usize {
  align.max(::core::mem::size_of::<usize>())
}
