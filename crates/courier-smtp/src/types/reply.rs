//! SMTP reply types.

use std::fmt;

/// A complete, coalesced SMTP reply.
///
/// A multi-line reply (`250-a`, `250-b`, `250 c`) is a single `Reply` with
/// one entry per line in `lines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit reply code shared by every line.
    pub code: ReplyCode,
    /// Text after the code and separator, one entry per line.
    pub lines: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Returns true if the reply code is one of `expected`.
    #[must_use]
    pub fn is_one_of(&self, expected: &[ReplyCode]) -> bool {
        expected.contains(&self.code)
    }

    /// Returns the lines joined with `\n`.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// First digit of a reply code (RFC 5321 section 4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyClass {
    /// 2yz: the action completed.
    Completed,
    /// 3yz: more input is expected.
    Intermediate,
    /// 4yz: try again later.
    Transient,
    /// 5yz: do not retry as is.
    Permanent,
    /// Any other first digit.
    Unknown,
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Closing connection
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCEEDED: Self = Self(235);
    /// 250 Completed
    pub const OK: Self = Self(250);
    /// 251 User not local, will forward
    pub const FORWARD: Self = Self(251);
    /// 334 Authentication challenge
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the class given by the first digit.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completed,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::Transient,
            5 => ReplyClass::Permanent,
            _ => ReplyClass::Unknown,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_classes() {
        assert_eq!(ReplyCode::OK.class(), ReplyClass::Completed);
        assert_eq!(ReplyCode::START_DATA.class(), ReplyClass::Intermediate);
        assert_eq!(ReplyCode::new(451).class(), ReplyClass::Transient);
        assert_eq!(ReplyCode::new(550).class(), ReplyClass::Permanent);
        assert_eq!(ReplyCode::new(999).class(), ReplyClass::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(ReplyCode::new(535).to_string(), "535");
        assert_eq!(ReplyCode::new(0).to_string(), "000");
    }

    #[test]
    fn test_is_one_of() {
        let reply = Reply::new(ReplyCode::FORWARD, vec!["will forward".to_string()]);
        assert!(reply.is_one_of(&[ReplyCode::OK, ReplyCode::FORWARD]));
        assert!(!reply.is_one_of(&[ReplyCode::OK]));
    }

    #[test]
    fn test_text_joins_lines() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["smtp.example.com".to_string(), "SIZE 1000".to_string()],
        );
        assert_eq!(reply.text(), "smtp.example.com\nSIZE 1000");
        assert_eq!(Reply::new(ReplyCode::OK, vec![]).text(), "");
    }
}
