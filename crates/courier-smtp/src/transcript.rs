//! Record of everything a session sent and received.

use std::fmt;

/// One command and the reply lines that answered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    /// Line written by the client, without CRLF. `None` for the greeting.
    pub sent: Option<String>,
    /// Raw reply lines, in arrival order, without CRLF.
    pub received: Vec<String>,
}

/// Ordered log of a session's exchanges.
///
/// Lines are kept verbatim, including AUTH lines. The message payload is
/// recorded as a size marker rather than its full content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    exchanges: Vec<Exchange>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            exchanges: Vec::new(),
        }
    }

    /// Starts a new exchange for a line the client is about to send.
    pub fn record_sent(&mut self, line: impl Into<String>) {
        self.exchanges.push(Exchange {
            sent: Some(line.into()),
            received: Vec::new(),
        });
    }

    /// Appends a reply line to the current exchange.
    ///
    /// Lines arriving before anything was sent open an exchange of their own.
    pub fn record_received(&mut self, line: impl Into<String>) {
        match self.exchanges.last_mut() {
            Some(exchange) => exchange.received.push(line.into()),
            None => self.exchanges.push(Exchange {
                sent: None,
                received: vec![line.into()],
            }),
        }
    }

    /// Returns the exchanges in order.
    #[must_use]
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Returns the lines the client sent, in order.
    pub fn sent_lines(&self) -> impl Iterator<Item = &str> {
        self.exchanges.iter().filter_map(|e| e.sent.as_deref())
    }

    /// Returns every received line, in order.
    pub fn received_lines(&self) -> impl Iterator<Item = &str> {
        self.exchanges
            .iter()
            .flat_map(|e| e.received.iter().map(String::as_str))
    }

    /// Returns true if nothing was exchanged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Returns the number of exchanges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }
}

/// Renders the transcript as a communication log, one line per entry,
/// client lines prefixed `C: ` and server lines `S: `.
impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for exchange in &self.exchanges {
            if let Some(sent) = &exchange.sent {
                writeln!(f, "C: {sent}")?;
            }
            for line in &exchange.received {
                writeln!(f, "S: {line}")?;
            }
        }
        Ok(())
    }
}
