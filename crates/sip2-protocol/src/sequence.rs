use sip2_core::constants::MAX_SEQUENCE;

/// Cyclic transaction sequence number for the `AY` field.
///
/// The counter starts before 0, so the first call to [`next`](Self::next)
/// yields 0. After 9 it wraps back to 0. Servers that track sequence numbers
/// match resends by this value, so one counter must live as long as the
/// connection it numbers.
///
/// # Example
/// ```
/// use sip2_protocol::SequenceCounter;
///
/// let mut seq = SequenceCounter::new();
/// let digits: Vec<u8> = (0..11).map(|_| seq.next()).collect();
/// assert_eq!(digits, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    last: Option<u8>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the next sequence number.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u8 {
        let next = match self.last {
            Some(n) if n < MAX_SEQUENCE => n + 1,
            _ => 0,
        };
        self.last = Some(next);
        next
    }

    /// The most recently issued number, if any.
    pub fn current(&self) -> Option<u8> {
        self.last
    }

    /// Return to the initial state so the next call yields 0.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
