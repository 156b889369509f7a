//! Fixed-size batching of records.

/// Upper bound on the buffer reserved up front; larger batches grow on demand.
const MAX_PREALLOCATED: usize = 1024;

/// Accumulates items into batches of at most `capacity` items.
///
/// A full batch is handed back from [`Batcher::push`] as soon as it fills;
/// whatever remains at end of stream comes back from [`Batcher::finish`].
/// Item order is preserved within and across batches.
///
/// # Examples
///
/// ```
/// use stockpile_core::batch::Batcher;
///
/// let mut batcher = Batcher::new(2);
/// assert_eq!(batcher.push("a"), None);
/// assert_eq!(batcher.push("b"), Some(vec!["a", "b"]));
/// assert_eq!(batcher.push("c"), None);
/// assert_eq!(batcher.finish(), Some(vec!["c"]));
/// ```
#[derive(Debug)]
pub struct Batcher<T> {
    capacity: usize,
    buffer: Vec<T>,
}

impl<T> Batcher<T> {
    /// Creates a batcher emitting batches of `capacity` items.
    ///
    /// A zero capacity is treated as 1; the engine validates its batch size
    /// before constructing one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buffer: Vec::with_capacity(capacity.min(MAX_PREALLOCATED)),
        }
    }

    /// Appends an item, returning a full batch when the buffer reaches capacity.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.buffer.push(item);
        if self.buffer.len() >= self.capacity {
            Some(std::mem::replace(
                &mut self.buffer,
                Vec::with_capacity(self.capacity.min(MAX_PREALLOCATED)),
            ))
        } else {
            None
        }
    }

    /// Consumes the batcher, returning the final partial batch if non-empty.
    pub fn finish(self) -> Option<Vec<T>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }
}
