use crate::{checksum, sequence::SequenceCounter};
use sip2_core::{
    FrameOptions,
    constants::{MAX_VARIABLE_FIELD_LENGTH, TAG_CHECKSUM, TAG_LENGTH, TAG_SEQUENCE},
};
use tracing::{debug, trace, warn};

/// Position of the builder within the fixed-then-variable frame layout.
///
/// The transition to [`VariableOnly`](BuildState::VariableOnly) is one way:
/// only [`MessageBuilder::reset`] returns to
/// [`AcceptingFixed`](BuildState::AcceptingFixed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Fixed width fields may still be appended.
    AcceptingFixed,
    /// A variable field has been appended; fixed fields are rejected.
    VariableOnly,
}

/// Builder for SIP2 request frames
///
/// One builder is kept per connection because it owns the
/// [`SequenceCounter`] whose numbers the server uses to correlate resends.
/// Each request starts with [`reset`](Self::reset), appends its fixed fields,
/// then its variable fields, and ends with [`finish`](Self::finish).
///
/// # Example
/// ```
/// use sip2_core::FrameOptions;
/// use sip2_protocol::MessageBuilder;
///
/// let mut builder = MessageBuilder::new(FrameOptions::default());
/// builder.reset("93");
/// builder.add_fixed("0", 1);
/// builder.add_fixed("0", 1);
/// builder.add_variable("CN", "user", false);
/// builder.add_variable("CO", "pass", false);
/// builder.add_variable("CP", "", true);
///
/// assert_eq!(builder.finish(true, true), "9300CNuser|COpass|AY0AZF83E\r");
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buffer: String,
    state: BuildState,
    options: FrameOptions,
    sequence: SequenceCounter,
}

impl MessageBuilder {
    /// Create a builder with an empty buffer and a fresh sequence counter.
    pub fn new(options: FrameOptions) -> Self {
        MessageBuilder {
            buffer: String::new(),
            state: BuildState::AcceptingFixed,
            options,
            sequence: SequenceCounter::new(),
        }
    }

    /// Start a new message with the given command code.
    ///
    /// Discards anything left from the previous message. The sequence
    /// counter is not touched.
    pub fn reset(&mut self, command_code: &str) -> &mut Self {
        self.buffer.clear();
        self.buffer.push_str(command_code);
        self.state = BuildState::AcceptingFixed;
        self
    }

    /// Append a fixed width field.
    ///
    /// The value is left-justified and space padded, or truncated, to exactly
    /// `width` characters. Returns `false` without touching the buffer once a
    /// variable field has been added.
    pub fn add_fixed(&mut self, value: &str, width: usize) -> bool {
        if self.state == BuildState::VariableOnly {
            debug!(
                value,
                width, "Fixed field rejected after variable fields were added"
            );
            return false;
        }

        let truncated: String = value.chars().take(width).collect();
        self.buffer
            .push_str(&format!("{:<width$}", truncated, width = width));
        true
    }

    /// Append a variable length field.
    ///
    /// An `optional` field with an empty value is skipped entirely. Values
    /// longer than 255 characters are truncated.
    pub fn add_variable(&mut self, tag: &str, value: &str, optional: bool) -> &mut Self {
        debug_assert_eq!(tag.chars().count(), TAG_LENGTH, "field tags are 2 characters");

        if optional && value.is_empty() {
            debug!(tag, "Skipping empty optional field");
            return self;
        }

        if value.contains(self.options.field_terminator) {
            warn!(
                tag,
                terminator = ?self.options.field_terminator,
                "Field value contains the field terminator"
            );
        }

        self.state = BuildState::VariableOnly;
        self.buffer.push_str(tag);
        self.buffer
            .extend(value.chars().take(MAX_VARIABLE_FIELD_LENGTH));
        self.buffer.push(self.options.field_terminator);
        self
    }

    /// Complete the frame and return its text.
    ///
    /// Appends `AY` and the next sequence number when `with_sequence` is set,
    /// then `AZ` and the checksum of everything written so far (including the
    /// `AZ` tag) when `with_checksum` is set, then the message terminator.
    pub fn finish(&mut self, with_sequence: bool, with_checksum: bool) -> String {
        if with_sequence {
            let seq = self.sequence.next();
            self.buffer.push_str(TAG_SEQUENCE);
            self.buffer.push(char::from(b'0' + seq));
        }

        if with_checksum {
            self.buffer.push_str(TAG_CHECKSUM);
            let crc = checksum::compute(&self.buffer);
            self.buffer.push_str(&crc);
        }

        self.buffer.push(self.options.message_terminator);
        trace!(frame = %self.buffer.escape_debug(), "Request frame built");
        self.buffer.clone()
    }

    /// Complete the frame using the sequence and checksum toggles from the
    /// builder's [`FrameOptions`].
    pub fn finish_default(&mut self) -> String {
        self.finish(self.options.sequence, self.options.checksum)
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Text written so far for the current message.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn options(&self) -> &FrameOptions {
        &self.options
    }

    pub fn sequence(&self) -> &SequenceCounter {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut SequenceCounter {
        &mut self.sequence
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(FrameOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn builder() -> MessageBuilder {
        MessageBuilder::new(FrameOptions::default())
    }

    #[test]
    fn test_reset_starts_with_code() {
        let mut b = builder();
        b.reset("99");
        assert_eq!(b.buffer(), "99");
        assert_eq!(b.state(), BuildState::AcceptingFixed);
    }

    #[rstest]
    #[case("N", 1, "N")]
    #[case("080", 3, "080")]
    #[case("ab", 5, "ab   ")]
    #[case("abcdef", 3, "abc")]
    #[case("", 4, "    ")]
    #[case("Müller", 3, "Mül")]
    fn test_add_fixed_width(#[case] value: &str, #[case] width: usize, #[case] expected: &str) {
        let mut b = builder();
        b.reset("XX");
        assert!(b.add_fixed(value, width));
        assert_eq!(&b.buffer()[2..], expected);
        assert_eq!(b.buffer().chars().count(), 2 + width);
    }

    #[test]
    fn test_fixed_after_variable_is_noop() {
        let mut b = builder();
        b.reset("93");
        b.add_variable("CN", "user", false);
        let before = b.buffer().to_string();

        assert!(!b.add_fixed("0", 1));
        assert_eq!(b.buffer(), before);
        assert_eq!(b.state(), BuildState::VariableOnly);
    }

    #[test]
    fn test_optional_empty_field_is_skipped() {
        let mut b = builder();
        b.reset("93");
        b.add_variable("CP", "", true);
        assert_eq!(b.buffer(), "93");
        // Skipping does not close the fixed section
        assert_eq!(b.state(), BuildState::AcceptingFixed);
    }

    #[test]
    fn test_required_empty_field_is_written() {
        let mut b = builder();
        b.reset("09");
        b.add_variable("AC", "", false);
        assert_eq!(b.buffer(), "09AC|");
    }

    #[test]
    fn test_variable_value_truncated_to_255() {
        let mut b = builder();
        b.reset("01");
        b.add_variable("AL", &"x".repeat(300), false);
        assert_eq!(b.buffer(), format!("01AL{}|", "x".repeat(255)));
    }

    #[test]
    fn test_finish_without_sequence_or_checksum() {
        let mut b = builder();
        b.reset("97");
        assert_eq!(b.finish(false, false), "97\r");
    }

    #[test]
    fn test_finish_checksum_only() {
        let mut b = builder();
        b.reset("97");
        assert_eq!(b.finish(false, true), "97AZFEF5\r");
    }

    #[test]
    fn test_finish_with_sequence_and_checksum() {
        let mut b = builder();
        b.reset("93");
        b.add_fixed("0", 1);
        b.add_fixed("0", 1);
        b.add_variable("CN", "user", false);
        b.add_variable("CO", "pass", false);

        let frame = b.finish(true, true);
        assert_eq!(frame, "9300CNuser|COpass|AY0AZF83E\r");
        assert!(checksum::verify(&frame));
    }

    #[test]
    fn test_sequence_advances_across_messages() {
        let mut b = builder();
        let frames: Vec<String> = (0..3)
            .map(|_| {
                b.reset("97");
                b.finish(true, false)
            })
            .collect();

        assert_eq!(frames, vec!["97AY0\r", "97AY1\r", "97AY2\r"]);
        assert_eq!(b.sequence().current(), Some(2));
    }

    #[test]
    fn test_finish_default_uses_options() {
        let mut b = MessageBuilder::new(FrameOptions::plain());
        b.reset("99");
        b.add_fixed("0", 1);
        assert_eq!(b.finish_default(), "990\r");
    }

    #[test]
    fn test_custom_terminators() {
        let options = FrameOptions {
            field_terminator: '^',
            message_terminator: '\n',
            ..FrameOptions::plain()
        };
        let mut b = MessageBuilder::new(options);
        b.reset("23");
        b.add_variable("AO", "inst", false);
        assert_eq!(b.finish_default(), "23AOinst^\n");
    }

    #[test]
    fn test_reset_clears_previous_message() {
        let mut b = builder();
        b.reset("93");
        b.add_variable("CN", "user", false);
        b.finish(true, true);

        b.reset("99");
        assert_eq!(b.buffer(), "99");
        assert!(b.add_fixed("0", 1));
    }
}
