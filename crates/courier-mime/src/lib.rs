//! # courier-mime
//!
//! Message model and MIME rendering for outgoing email.
//!
//! ## Features
//!
//! - **Message model**: sender, `To`/`Cc`/`Bcc` recipients, subject, body,
//!   attachments, plain text or HTML body
//! - **Rendering**: RFC 5322 headers, single-part or `multipart/mixed`
//!   bodies, CRLF line endings and dot-stuffing ready for SMTP `DATA`
//! - **Encoding**: Base64 (with RFC 2045 line folding), Quoted-Printable for
//!   bodies with overlong lines, RFC 2047 header encoding and RFC 2231 file
//!   names
//!
//! ## Quick Start
//!
//! ```ignore
//! use courier_mime::{Attachment, Mailbox, Message};
//!
//! let message = Message::builder()
//!     .from(Mailbox::with_name("Sender", "sender@example.com")?)
//!     .to(Mailbox::new("recipient@example.com")?)
//!     .subject("Report")
//!     .body("Please find the report attached.")
//!     .attach(Attachment::new("/tmp/report.pdf", "report.pdf"))
//!     .build()?;
//!
//! let payload = message.render()?;
//! ```
//!
//! ### Encoding
//!
//! ```ignore
//! use courier_mime::encoding::{decode_base64, encode_base64};
//!
//! let encoded = encode_base64(b"Hello, World!");
//! let decoded = decode_base64(&encoded)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod content_type;
mod error;
mod header;
mod message;
mod render;

pub mod encoding;

pub use address::Mailbox;
pub use attachment::Attachment;
pub use content_type::{ContentType, OCTET_STREAM};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{BodyKind, Message, MessageBuilder};
pub use render::{Renderer, dot_stuff, normalize_line_endings};
