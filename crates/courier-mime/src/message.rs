//! Outgoing message model.

use crate::address::Mailbox;
use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::error::{Error, Result};
use crate::render::Renderer;

/// Body variant of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// `text/plain` body.
    #[default]
    PlainText,
    /// `text/html` body.
    Html,
}

impl BodyKind {
    /// Returns the MIME type of the body, without parameters.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Html => "text/html",
        }
    }

    /// Returns the full content type of the body.
    #[must_use]
    pub fn content_type(self) -> ContentType {
        match self {
            Self::PlainText => ContentType::text_plain(),
            Self::Html => ContentType::text_html(),
        }
    }
}

/// An email message ready to be rendered and sent.
///
/// Always has a sender and at least one `To` recipient. `Bcc` recipients are
/// used for the envelope only and never appear in rendered headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: String,
    body: String,
    attachments: Vec<Attachment>,
    kind: BodyKind,
}

impl Message {
    /// Creates a message builder.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Creates a plain text message with a single recipient.
    #[must_use]
    pub fn plain_text(
        from: Mailbox,
        to: Mailbox,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::single(BodyKind::PlainText, from, to, subject.into(), body.into())
    }

    /// Creates an HTML message with a single recipient.
    #[must_use]
    pub fn html(
        from: Mailbox,
        to: Mailbox,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::single(BodyKind::Html, from, to, subject.into(), body.into())
    }

    fn single(kind: BodyKind, from: Mailbox, to: Mailbox, subject: String, body: String) -> Self {
        Self {
            from,
            to: vec![to],
            cc: Vec::new(),
            bcc: Vec::new(),
            subject,
            body,
            attachments: Vec::new(),
            kind,
        }
    }

    /// Returns the sender.
    #[must_use]
    pub const fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Returns the primary recipients.
    #[must_use]
    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    /// Returns the carbon-copy recipients.
    #[must_use]
    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    /// Returns the blind carbon-copy recipients.
    #[must_use]
    pub fn bcc(&self) -> &[Mailbox] {
        &self.bcc
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the attachments in order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns the body variant.
    #[must_use]
    pub const fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Returns the MIME type of the body.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    /// Returns every envelope recipient: `To`, then `Cc`, then `Bcc`.
    pub fn envelope_recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Renders the message with a fresh [`Renderer`].
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment cannot be read.
    pub fn render(&self) -> Result<Vec<u8>> {
        Renderer::new().render(self)
    }
}

/// Builder for [`Message`].
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: String,
    body: String,
    attachments: Vec<Attachment>,
    kind: BodyKind,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, from: Mailbox) -> Self {
        self.from = Some(from);
        self
    }

    /// Adds a primary recipient.
    #[must_use]
    pub fn to(mut self, to: Mailbox) -> Self {
        self.to.push(to);
        self
    }

    /// Adds a carbon-copy recipient.
    #[must_use]
    pub fn cc(mut self, cc: Mailbox) -> Self {
        self.cc.push(cc);
        self
    }

    /// Adds a blind carbon-copy recipient.
    #[must_use]
    pub fn bcc(mut self, bcc: Mailbox) -> Self {
        self.bcc.push(bcc);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the body variant.
    #[must_use]
    pub const fn kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSender`] without a sender and
    /// [`Error::NoRecipients`] without a `To` recipient.
    pub fn build(self) -> Result<Message> {
        let from = self.from.ok_or(Error::MissingSender)?;
        if self.to.is_empty() {
            return Err(Error::NoRecipients);
        }

        Ok(Message {
            from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            body: self.body,
            attachments: self.attachments,
            kind: self.kind,
        })
    }
}
