//! # courier-smtp
//!
//! A single-shot SMTP submission client implementing RFC 5321.
//!
//! ## Features
//!
//! - **Explicit state machine**: every session step is checked against a
//!   transition table, so out-of-order calls are errors, not undefined
//!   behavior
//! - **Protocol support**: EHLO with HELO fallback, STARTTLS, AUTH LOGIN and
//!   PLAIN, MAIL FROM with SIZE, RCPT TO, DATA, QUIT
//! - **TLS support**: both implicit TLS (port 465) and STARTTLS
//! - **Structured outcome**: a status code, a discriminated failure kind,
//!   and the full transcript, whatever happened
//!
//! ## Quick Start
//!
//! ```no_run
//! use courier_mime::{Mailbox, Message};
//! use courier_smtp::{Config, Credentials, Mailer};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let message = Message::plain_text(
//!     Mailbox::with_name("Sender", "sender@example.com")?,
//!     Mailbox::new("recipient@example.com")?,
//!     "Hello",
//!     "Hello, World!",
//! );
//!
//! let mailer = Mailer::new(Config::new("smtp.example.com"))
//!     .with_credentials(Credentials::new("sender@example.com", "password"));
//!
//! let result = mailer.send(&message).await;
//! if !result.is_success() {
//!     eprintln!("status {}\n{}", result.status_code(), result.transcript());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Opened → Connected → Greeted → [SecureUpgrade] → [Authenticated]
//!        → EnvelopeFrom → EnvelopeTo (repeats) → DataAnnounced → PayloadSent → Closed
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transport, configuration, and the session state machine
//! - [`parser`]: Reply parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod credentials;
mod error;
mod mailer;
pub mod parser;
mod result;
mod transcript;
pub mod types;

pub use connection::{
    Config, ConfigBuilder, Security, ServerInfo, Session, SessionState, SmtpStream,
};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use mailer::Mailer;
pub use result::{FailureKind, SessionError, SessionResult, status};
pub use transcript::{Exchange, Transcript};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyClass, ReplyCode};
