//! Ordered header block.

use std::fmt;

/// Preferred maximum header line length, excluding CRLF (RFC 5322 2.1.1).
pub const MAX_HEADER_LINE: usize = 78;

/// Collection of email headers kept in insertion order.
///
/// Lookups are case-insensitive; names are rendered as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses a header block, stopping at the first empty line.
    ///
    /// Folded continuation lines are joined with a single space.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = headers.entries.last_mut() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(line.trim());
                }
            } else if let Some((name, value)) = line.split_once(':') {
                headers.add(name.trim(), value.trim());
            }
        }

        headers
    }
}

/// Renders each header as `Name: value` followed by CRLF.
///
/// Values that would run past [`MAX_HEADER_LINE`] are folded at spaces.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write_folded(f, name, value)?;
        }
        Ok(())
    }
}

fn write_folded(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(f, "{name}:")?;
    let mut width = name.len() + 1;
    // True right after a fold, so a word never gets a line of its own twice
    let mut fresh = false;

    for word in value.split(' ') {
        if !word.is_empty() && !fresh && width + 1 + word.len() > MAX_HEADER_LINE {
            f.write_str("\r\n")?;
            width = 0;
            fresh = true;
        }
        write!(f, " {word}")?;
        width += 1 + word.len();
        if !word.is_empty() {
            fresh = false;
        }
    }

    f.write_str("\r\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_fold_long_values() {
        let recipients = (0..12)
            .map(|i| format!("\"Recipient {i}\" <recipient{i}@example.com>"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut headers = Headers::new();
        headers.add("To", recipients.as_str());
        headers.add("Subject", "short");

        let rendered = headers.to_string();
        let lines: Vec<_> = rendered.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert!(lines.len() > 3);
        assert!(lines.iter().all(|line| line.len() <= MAX_HEADER_LINE));
        assert!(lines[1..lines.len() - 1].iter().all(|line| line.starts_with(' ')));
        assert_eq!(*lines.last().unwrap(), "Subject: short");

        let parsed = Headers::parse(&rendered);
        assert_eq!(parsed.get("To"), Some(recipients.as_str()));
    }

    #[test]
    fn test_headers_fold_keeps_overlong_word_whole() {
        let token = "x".repeat(120);
        let mut headers = Headers::new();
        headers.add("Message-ID", format!("<{token}>"));

        assert_eq!(headers.to_string(), format!("Message-ID:\r\n <{token}>\r\n"));
    }

    #[test]
    fn test_headers_display_keeps_order() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        headers.add("From", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "Subject: Test\r\nFrom: sender@example.com\r\n"
        );
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: multipart/mixed;\r\n",
            " boundary=\"abc\"\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("from"), Some("sender@example.com"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("multipart/mixed; boundary=\"abc\"")
        );
        assert!(!headers.contains("Body"));
    }
}
