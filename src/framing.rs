//! Line framing and validation.
//!
//! Turns one raw line read off the wire into a validated message, or a
//! length-violation signal that the session reports without disconnecting.

/// Maximum accepted message length in bytes, measured after trimming.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Result of framing one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A valid message, line terminator and trailing whitespace removed.
    Message(String),
    /// Message exceeded [`MAX_MESSAGE_LEN`]; its content is discarded.
    TooLong {
        /// Trimmed length in bytes.
        len: usize,
    },
}

/// Frame one raw line.
///
/// The input is a line as read up to the newline delimiter. Trailing
/// `\r` and whitespace are stripped; leading whitespace is part of the
/// message. An empty message is valid.
pub fn frame_line(raw: &str) -> Frame {
    let trimmed = raw.trim_end();
    if trimmed.len() > MAX_MESSAGE_LEN {
        Frame::TooLong { len: trimmed.len() }
    } else {
        Frame::Message(trimmed.to_string())
    }
}

/// Notice sent to the peer when a message exceeds the maximum length.
pub fn too_long_notice() -> String {
    format!("Error: Message too long (max {MAX_MESSAGE_LEN} bytes)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_line_terminator() {
        assert_eq!(
            frame_line("hi there\r\n"),
            Frame::Message("hi there".to_string())
        );
        assert_eq!(
            frame_line("hi there\n"),
            Frame::Message("hi there".to_string())
        );
    }

    #[test]
    fn test_keeps_leading_whitespace() {
        assert_eq!(
            frame_line("  indented\n"),
            Frame::Message("  indented".to_string())
        );
    }

    #[test]
    fn test_empty_line_is_valid() {
        assert_eq!(frame_line("\n"), Frame::Message(String::new()));
        assert_eq!(frame_line("\r\n"), Frame::Message(String::new()));
    }

    #[test]
    fn test_max_length_boundary() {
        let exact = "a".repeat(MAX_MESSAGE_LEN);
        match frame_line(&format!("{exact}\n")) {
            Frame::Message(msg) => assert_eq!(msg.len(), MAX_MESSAGE_LEN),
            other => panic!("unexpected: {:?}", other),
        }

        let over = "a".repeat(MAX_MESSAGE_LEN + 1);
        match frame_line(&format!("{over}\n")) {
            Frame::TooLong { len } => assert_eq!(len, MAX_MESSAGE_LEN + 1),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_too_long_notice() {
        assert_eq!(too_long_notice(), "Error: Message too long (max 1024 bytes)");
    }
}
