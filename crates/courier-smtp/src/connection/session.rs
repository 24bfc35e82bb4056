//! SMTP session driven by an explicit state machine.
//!
//! Every operation checks [`SessionState::can_transition_to`] before any
//! bytes are written and advances the state only when the server answers
//! with one of [`SessionState::expected_replies`]. Operations take
//! `&mut self`, so the transcript and server capabilities stay available
//! after a failure.

use super::{ServerInfo, SessionState, SmtpStream};
use crate::command::Command;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::transcript::Transcript;
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// A single SMTP session over one stream.
#[derive(Debug)]
pub struct Session {
    stream: SmtpStream,
    state: SessionState,
    server_info: ServerInfo,
    transcript: Transcript,
    last_command: Option<String>,
}

impl Session {
    /// Creates a session over a freshly opened stream.
    #[must_use]
    pub fn new(stream: SmtpStream) -> Self {
        Self {
            stream,
            state: SessionState::Opened,
            server_info: ServerInfo::default(),
            transcript: Transcript::new(),
            last_command: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns what the server announced about itself.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns the transcript so far.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the last command sent, in a form safe to log.
    #[must_use]
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    /// Consumes the session, returning its transcript.
    #[must_use]
    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    /// Returns true if the stream has been upgraded to TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is not 220 or cannot be read.
    pub async fn read_greeting(&mut self) -> Result<()> {
        let next = self.check(SessionState::Connected)?;
        let greeting = self.read_reply().await?;
        Self::expect(&greeting, next)?;

        self.server_info.hostname = greeting
            .lines
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        self.state = next;
        Ok(())
    }

    /// Identifies the client with EHLO, falling back to HELO when the
    /// server rejects EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings are rejected or the exchange fails.
    pub async fn hello(&mut self, client_name: &str) -> Result<()> {
        let next = self.check(SessionState::Greeted)?;

        match self.ehlo(client_name).await {
            Ok(()) => {}
            Err(Error::SmtpError { code, .. }) => {
                tracing::debug!(code, "EHLO rejected, falling back to HELO");
                self.server_info.extensions.clear();
                let helo = Command::Helo {
                    hostname: client_name.to_string(),
                };
                self.command(&helo, next).await?;
            }
            Err(e) => return Err(e),
        }

        self.state = next;
        Ok(())
    }

    /// Upgrades the connection with STARTTLS and greets the server again.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not advertise STARTTLS, rejects
    /// it, the handshake fails, or the second EHLO is rejected.
    pub async fn starttls(&mut self, host: &str, client_name: &str) -> Result<()> {
        let next = self.check(SessionState::SecureUpgrade)?;
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.command(&Command::StartTls, next).await?;
        self.stream.upgrade_to_tls(host).await?;
        tracing::debug!(host, "TLS established");

        // Capabilities learned in plaintext are discarded
        self.server_info.extensions.clear();
        self.ehlo(client_name).await?;

        self.state = next;
        Ok(())
    }

    /// Authenticates with AUTH LOGIN, or AUTH PLAIN when the server offers
    /// PLAIN but not LOGIN.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the exchange is rejected.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let next = self.check(SessionState::Authenticated)?;
        let mechanisms = self.server_info.auth_mechanisms();

        let plain_only = mechanisms.contains(&AuthMechanism::Plain)
            && !mechanisms.contains(&AuthMechanism::Login);

        if plain_only {
            let response = format!("\0{}\0{}", credentials.username(), credentials.password());
            let auth = Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(STANDARD.encode(response)),
            };
            self.command(&auth, next).await?;
        } else {
            let auth = Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            };
            self.challenge(&auth).await?;
            let username = Command::AuthResponse(STANDARD.encode(credentials.username()));
            self.challenge(&username).await?;
            let password = Command::AuthResponse(STANDARD.encode(credentials.password()));
            self.command(&password, next).await?;
        }

        tracing::debug!(username = credentials.username(), "Authenticated");
        self.state = next;
        Ok(())
    }

    /// Opens the envelope with MAIL FROM.
    ///
    /// `size` is the payload size; it is checked against the server's SIZE
    /// limit and announced when the server supports SIZE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] before sending anything if the
    /// payload exceeds the advertised limit, or an error if the sender is
    /// rejected.
    pub async fn mail_from(&mut self, from: &Address, size: Option<usize>) -> Result<()> {
        let next = self.check(SessionState::EnvelopeFrom)?;

        if let (Some(size), Some(limit)) = (size, self.server_info.max_message_size())
            && limit > 0
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let mail = Command::MailFrom {
            from: from.clone(),
            size: size.filter(|_| self.server_info.supports_size()),
        };
        self.command(&mail, next).await?;

        self.state = next;
        Ok(())
    }

    /// Adds a recipient with RCPT TO.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient is rejected.
    pub async fn rcpt_to(&mut self, to: &Address) -> Result<()> {
        let next = self.check(SessionState::EnvelopeTo)?;
        let rcpt = Command::RcptTo { to: to.clone() };
        self.command(&rcpt, next).await?;

        self.state = next;
        Ok(())
    }

    /// Announces the payload with DATA.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(&mut self) -> Result<()> {
        let next = self.check(SessionState::DataAnnounced)?;
        self.command(&Command::Data, next).await?;

        self.state = next;
        Ok(())
    }

    /// Sends an already dot-stuffed payload followed by the end-of-data
    /// marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the relay rejects the message.
    pub async fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        let next = self.check(SessionState::PayloadSent)?;

        let marker = format!("<message: {} bytes>", payload.len());
        self.transcript.record_sent(marker.as_str());
        self.last_command = Some(marker);
        tracing::debug!(bytes = payload.len(), "C: <message>");

        self.stream.write_chunked(payload).await?;
        let terminator: &[u8] = if payload.is_empty() || payload.ends_with(b"\r\n") {
            b".\r\n"
        } else {
            b"\r\n.\r\n"
        };
        self.stream.write_all(terminator).await?;

        let reply = self.read_reply().await?;
        Self::expect(&reply, next)?;

        self.state = next;
        Ok(())
    }

    /// Sends QUIT and closes the stream.
    ///
    /// The session is closed afterwards whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the reply is not 221.
    pub async fn quit(&mut self) -> Result<()> {
        let next = self.check(SessionState::Closed)?;
        let result = self.command(&Command::Quit, next).await.map(|_| ());
        self.close().await;
        result
    }

    /// Closes the stream without saying goodbye.
    pub async fn close(&mut self) {
        self.stream.close().await;
        self.state = SessionState::Closed;
    }

    async fn ehlo(&mut self, client_name: &str) -> Result<()> {
        let ehlo = Command::Ehlo {
            hostname: client_name.to_string(),
        };
        let reply = self.command(&ehlo, SessionState::Greeted).await?;

        // First line is the server's greeting, the rest are extensions
        self.server_info.extensions = reply
            .lines
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }

    /// Sends an AUTH step that must be answered with 334.
    async fn challenge(&mut self, cmd: &Command) -> Result<()> {
        self.send(cmd).await?;
        let reply = self.read_reply().await?;
        if reply.code != ReplyCode::AUTH_CONTINUE {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.text()));
        }
        Ok(())
    }

    fn check(&self, next: SessionState) -> Result<SessionState> {
        if self.state.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidState {
                from: self.state,
                to: next,
            })
        }
    }

    fn expect(reply: &Reply, next: SessionState) -> Result<()> {
        if reply.is_one_of(next.expected_replies()) {
            Ok(())
        } else {
            Err(Error::smtp_error(reply.code.as_u16(), reply.text()))
        }
    }

    async fn command(&mut self, cmd: &Command, next: SessionState) -> Result<Reply> {
        self.send(cmd).await?;
        let reply = self.read_reply().await?;
        Self::expect(&reply, next)?;
        Ok(reply)
    }

    async fn send(&mut self, cmd: &Command) -> Result<()> {
        let redacted = cmd.redacted();
        self.transcript.record_sent(cmd.line());
        tracing::debug!(command = %redacted, "C");
        self.last_command = Some(redacted);
        self.stream.write_all(&cmd.serialize()).await
    }

    /// Reads one complete reply, recording each raw line as it arrives.
    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.stream.read_line().await?;
            self.transcript.record_received(line.as_str());
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        let reply = parse_reply(&lines)?;
        tracing::debug!(code = reply.code.as_u16(), "S");
        Ok(reply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn session(mock: tokio_test::io::Mock) -> Session {
        Session::new(SmtpStream::new(mock, TIMEOUT))
    }

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_blank_reply_lines_are_recorded() {
        let mut session = session(Builder::new().read(b"\r\n220 mx.example.com\r\n").build());

        session.read_greeting().await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        let received: Vec<_> = session.transcript().received_lines().collect();
        assert_eq!(received, vec!["", "220 mx.example.com"]);
    }

    #[tokio::test]
    async fn test_greeting_records_hostname() {
        let mut session = session(Builder::new().read(b"220 mx.example.com ESMTP\r\n").build());

        session.read_greeting().await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.server_info().hostname, "mx.example.com");
        assert_eq!(session.transcript().exchanges()[0].sent, None);
    }

    #[tokio::test]
    async fn test_greeting_rejected() {
        let mut session = session(Builder::new().read(b"554 go away\r\n").build());

        let err = session.read_greeting().await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 554, .. }));
        assert_eq!(session.state(), SessionState::Opened);
        assert_eq!(
            session.transcript().received_lines().collect::<Vec<_>>(),
            vec!["554 go away"]
        );
    }

    #[tokio::test]
    async fn test_ehlo_parses_extensions() {
        let mock = Builder::new()
            .read(b"220 mx.example.com ESMTP\r\n")
            .write(b"EHLO client.example.com\r\n")
            .read(b"250-mx.example.com\r\n250-STARTTLS\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1000\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("client.example.com").await.unwrap();

        let info = session.server_info();
        assert_eq!(session.state(), SessionState::Greeted);
        assert!(info.supports_starttls());
        assert_eq!(info.max_message_size(), Some(1000));
        assert_eq!(
            info.auth_mechanisms(),
            vec![AuthMechanism::Plain, AuthMechanism::Login]
        );
        assert_eq!(session.transcript().exchanges()[1].received.len(), 4);
    }

    #[tokio::test]
    async fn test_helo_fallback() {
        let mock = Builder::new()
            .read(b"220 old.example.com\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"502 command not implemented\r\n")
            .write(b"HELO localhost\r\n")
            .read(b"250 old.example.com\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();

        assert_eq!(session.state(), SessionState::Greeted);
        assert!(session.server_info().extensions.is_empty());
        assert_eq!(
            session.transcript().sent_lines().collect::<Vec<_>>(),
            vec!["EHLO localhost", "HELO localhost"]
        );
    }

    #[tokio::test]
    async fn test_helo_rejected_too() {
        let mock = Builder::new()
            .read(b"220 old.example.com\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"500 what\r\n")
            .write(b"HELO localhost\r\n")
            .read(b"501 still no\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        let err = session.hello("localhost").await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 501, .. }));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_illegal_transition_sends_nothing() {
        let mut session = session(Builder::new().build());

        let err = session.data().await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                from: SessionState::Opened,
                to: SessionState::DataAnnounced,
            }
        ));
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_starttls_requires_advertisement() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250 mx\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        let err = session.starttls("mx", "localhost").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_auth_login() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx\r\n250 AUTH LOGIN PLAIN\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .write(b"cGFzcw==\r\n")
            .read(b"235 2.7.0 Authentication successful\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        session
            .authenticate(&Credentials::new("user", "pass"))
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_auth_plain_when_login_missing() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx\r\n250 AUTH PLAIN\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        session
            .authenticate(&Credentials::new("user", "pass"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_auth_rejected() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250 mx\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .write(b"d3Jvbmc=\r\n")
            .read(b"535 bad credentials\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        let err = session
            .authenticate(&Credentials::new("user", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 535, .. }));
        assert_eq!(session.state(), SessionState::Greeted);
        assert_eq!(session.last_command(), Some("<credentials>"));
        assert_eq!(
            session.transcript().sent_lines().last(),
            Some("d3Jvbmc=")
        );
    }

    #[tokio::test]
    async fn test_mail_from_announces_size() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx\r\n250 SIZE 1000\r\n")
            .write(b"MAIL FROM:<a@example.com> SIZE=42\r\n")
            .read(b"250 ok\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        session
            .mail_from(&addr("a@example.com"), Some(42))
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::EnvelopeFrom);
    }

    #[tokio::test]
    async fn test_mail_from_too_large() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx\r\n250 SIZE 10\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        let err = session
            .mail_from(&addr("a@example.com"), Some(11))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge { size: 11, limit: 10 }));
    }

    #[tokio::test]
    async fn test_full_transaction() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250 mx\r\n")
            .write(b"MAIL FROM:<a@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<b@example.com>\r\n")
            .read(b"251 will forward\r\n")
            .write(b"DATA\r\n")
            .read(b"354 go ahead\r\n")
            .write(b"Subject: hi\r\n\r\nbody\r\n.\r\n")
            .read(b"250 queued\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        session.mail_from(&addr("a@example.com"), None).await.unwrap();
        session.rcpt_to(&addr("b@example.com")).await.unwrap();
        session.data().await.unwrap();
        session
            .send_payload(b"Subject: hi\r\n\r\nbody\r\n")
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::PayloadSent);
        session.quit().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);

        let sent: Vec<_> = session.transcript().sent_lines().collect();
        assert_eq!(
            sent,
            vec![
                "EHLO localhost",
                "MAIL FROM:<a@example.com>",
                "RCPT TO:<b@example.com>",
                "DATA",
                "<message: 21 bytes>",
                "QUIT",
            ]
        );
    }

    #[tokio::test]
    async fn test_payload_before_data_is_rejected() {
        let mut session = session(Builder::new().read(b"220 mx\r\n").build());

        session.read_greeting().await.unwrap();
        let err = session.send_payload(b"x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(session.transcript().sent_lines().count(), 0);
    }

    #[tokio::test]
    async fn test_payload_without_trailing_crlf() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250 mx\r\n")
            .write(b"MAIL FROM:<a@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<b@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"DATA\r\n")
            .read(b"354 go ahead\r\n")
            .write(b"body\r\n.\r\n")
            .read(b"250 queued\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        session.hello("localhost").await.unwrap();
        session.mail_from(&addr("a@example.com"), None).await.unwrap();
        session.rcpt_to(&addr("b@example.com")).await.unwrap();
        session.data().await.unwrap();
        session.send_payload(b"body").await.unwrap();
    }

    #[tokio::test]
    async fn test_quit_closes_even_when_rejected() {
        let mock = Builder::new()
            .read(b"220 mx\r\n")
            .write(b"QUIT\r\n")
            .read(b"500 huh\r\n")
            .build();
        let mut session = session(mock);

        session.read_greeting().await.unwrap();
        assert!(session.quit().await.is_err());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.quit().await.is_err());
    }
}
