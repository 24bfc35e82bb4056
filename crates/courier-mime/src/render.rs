//! Message-to-wire rendering.
//!
//! Produces the exact bytes sent after the SMTP `DATA` command: CRLF line
//! endings throughout, leading dots stuffed, no line over the RFC 5322
//! limit, attachments base64 encoded and framed by a boundary that does not
//! occur in the body.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_quoted_printable, encode_rfc2047};
use crate::error::Result;
use crate::header::Headers;
use crate::message::Message;
use chrono::{DateTime, FixedOffset, Local};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt::Write as _;

/// Preamble shown by clients that do not understand multipart bodies.
const MULTIPART_PREAMBLE: &str = "This is a multi-part message in MIME format.";

/// Longest body line sent without encoding, excluding CRLF (RFC 5322 2.1.1).
pub const MAX_BODY_LINE: usize = 998;

/// Longest RFC 2231 parameter segment before a continuation is started.
const PARAM_SEGMENT: usize = 60;

/// Bytes that must be percent-encoded in an RFC 2231 extended value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Renders [`Message`]s into DATA payloads.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    date: Option<DateTime<FixedOffset>>,
    boundary: Option<String>,
}

impl Renderer {
    /// Creates a renderer that stamps the current local time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed `Date` header value.
    #[must_use]
    pub fn with_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Prefers `boundary` for multipart messages.
    ///
    /// A random boundary is used instead if the body contains it.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Renders the message.
    ///
    /// All attachments are read before anything is rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment cannot be read.
    pub fn render(&self, message: &Message) -> Result<Vec<u8>> {
        let contents = message
            .attachments()
            .iter()
            .map(|attachment| attachment.read().map(|bytes| (attachment, bytes)))
            .collect::<Result<Vec<_>>>()?;

        let (encoding, body) = encode_body(&normalize_line_endings(message.body()));
        let mut headers = self.headers(message);
        let mut out = String::new();

        if contents.is_empty() {
            headers.add("Content-Type", message.kind().content_type().to_string());
            headers.add("Content-Transfer-Encoding", encoding);
            out.push_str(&headers.to_string());
            out.push_str("\r\n");
            out.push_str(&body);
        } else {
            let boundary = self.boundary_for(&body);
            headers.add(
                "Content-Type",
                ContentType::multipart_mixed(boundary.as_str()).to_string(),
            );
            out.push_str(&headers.to_string());
            out.push_str("\r\n");
            out.push_str(MULTIPART_PREAMBLE);
            out.push_str("\r\n");

            let mut part = Headers::new();
            part.add("Content-Type", message.kind().content_type().to_string());
            part.add("Content-Transfer-Encoding", encoding);
            let _ = write!(out, "\r\n--{boundary}\r\n{part}\r\n{body}\r\n");

            for (attachment, bytes) in &contents {
                let mut part = Headers::new();
                part.add(
                    "Content-Type",
                    format!(
                        "{}; {}",
                        attachment.content_type(),
                        file_param("name", attachment.name())
                    ),
                );
                part.add("Content-Transfer-Encoding", "base64");
                part.add(
                    "Content-Disposition",
                    format!("attachment; {}", file_param("filename", attachment.name())),
                );
                let encoded = encode_base64_wrapped(bytes);
                let _ = write!(out, "--{boundary}\r\n{part}\r\n{encoded}\r\n");
            }

            let _ = write!(out, "--{boundary}--\r\n");
        }

        if !out.ends_with("\r\n") {
            out.push_str("\r\n");
        }

        Ok(dot_stuff(&out).into_bytes())
    }

    fn headers(&self, message: &Message) -> Headers {
        let date = self
            .date
            .unwrap_or_else(|| Local::now().fixed_offset());

        let mut headers = Headers::new();
        headers.add("From", message.from().to_string());
        headers.add("To", join_mailboxes(message.to()));
        if !message.cc().is_empty() {
            headers.add("Cc", join_mailboxes(message.cc()));
        }
        headers.add("Subject", encode_rfc2047(message.subject(), "utf-8"));
        headers.add("Date", date.to_rfc2822());
        headers.add(
            "Message-ID",
            format!(
                "<{:032x}.{}@{}>",
                rand::random::<u128>(),
                date.timestamp(),
                message.from().domain()
            ),
        );
        headers.add("MIME-Version", "1.0");
        headers
    }

    fn boundary_for(&self, body: &str) -> String {
        let mut boundary = self
            .boundary
            .clone()
            .unwrap_or_else(generate_boundary);
        while body.contains(&boundary) {
            boundary = generate_boundary();
        }
        boundary
    }
}

fn generate_boundary() -> String {
    format!("=_courier_{:032x}", rand::random::<u128>())
}

fn join_mailboxes(mailboxes: &[crate::Mailbox]) -> String {
    mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Picks the transfer encoding for a CRLF-normalized text body.
///
/// Bodies with a line over [`MAX_BODY_LINE`] are sent quoted-printable.
fn encode_body(body: &str) -> (&'static str, String) {
    if body.split("\r\n").any(|line| line.len() > MAX_BODY_LINE) {
        ("quoted-printable", encode_quoted_printable(body))
    } else if body.is_ascii() {
        ("7bit", body.to_string())
    } else {
        ("8bit", body.to_string())
    }
}

/// Formats a file name parameter.
///
/// Printable ASCII names are quoted. Anything else uses RFC 2231 extended
/// notation, split into numbered segments when long.
fn file_param(attribute: &str, name: &str) -> String {
    if name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return format!("{attribute}={}", quote(name));
    }

    let encoded = utf8_percent_encode(name, ATTR_CHAR).to_string();
    if encoded.len() <= PARAM_SEGMENT {
        return format!("{attribute}*=utf-8''{encoded}");
    }

    let mut segments = Vec::new();
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let mut end = PARAM_SEGMENT.min(rest.len());
        // Never split a %XX escape
        while end < rest.len() && rest[..end].rfind('%').is_some_and(|i| i + 3 > end) {
            end -= 1;
        }
        segments.push(&rest[..end]);
        rest = &rest[end..];
    }

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let charset = if i == 0 { "utf-8''" } else { "" };
            format!("{attribute}*{i}*={charset}{segment}")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Converts CR, LF, and CRLF line endings to CRLF.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}

/// Doubles the leading dot of every line that starts with one (RFC 5321 4.5.2).
///
/// Expects CRLF line endings.
#[must_use]
pub fn dot_stuff(text: &str) -> String {
    let mut stuffed = String::with_capacity(text.len());
    for (i, line) in text.split("\r\n").enumerate() {
        if i > 0 {
            stuffed.push_str("\r\n");
        }
        if line.starts_with('.') {
            stuffed.push('.');
        }
        stuffed.push_str(line);
    }
    stuffed
}
