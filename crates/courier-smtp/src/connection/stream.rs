//! Low-level SMTP transport.
//!
//! Every read and write is bounded by the configured I/O timeout; a timeout
//! is reported as [`Error::Timeout`] and treated like any other transport
//! failure.

use super::config::{Config, Security};
use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore},
};

/// Maximum accepted reply line length, terminator included.
const MAX_LINE_LENGTH: u64 = 64 * 1024;

/// Bytes per timed write when sending a message payload.
const WRITE_CHUNK: usize = 16 * 1024;

/// Byte stream an SMTP session can run over.
///
/// Implemented for anything async-readable and -writable, so a TCP socket,
/// an in-memory pipe, or a test double all work.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

type BoxedIo = Box<dyn Io>;

#[derive(Debug)]
enum Inner {
    Plain(BufReader<BoxedIo>),
    Tls(Box<BufReader<TlsStream<BoxedIo>>>),
    Closed,
}

/// SMTP stream (plain or TLS) with per-operation timeouts.
#[derive(Debug)]
pub struct SmtpStream {
    inner: Inner,
    io_timeout: Duration,
}

impl SmtpStream {
    /// Wraps a connected byte stream.
    pub fn new<S: Io + 'static>(io: S, io_timeout: Duration) -> Self {
        Self {
            inner: Inner::Plain(BufReader::new(Box::new(io))),
            io_timeout,
        }
    }

    /// Returns true once the stream has been upgraded to TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.inner, Inner::Tls(_))
    }

    /// Returns true after [`close`](Self::close).
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.inner, Inner::Closed)
    }

    /// Reads one line and strips its terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails, times out, the peer closes the
    /// connection, or the line exceeds the length limit.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match &mut self.inner {
            Inner::Plain(reader) => {
                timeout(self.io_timeout, read_limited(reader, &mut line)).await
            }
            Inner::Tls(reader) => {
                timeout(self.io_timeout, read_limited(reader.as_mut(), &mut line)).await
            }
            Inner::Closed => return Err(not_connected()),
        };

        let count = read.map_err(|_| Error::Timeout("read"))??;
        if count == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        if !line.ends_with('\n') && count as u64 >= MAX_LINE_LENGTH {
            return Err(Error::Protocol("reply line too long".into()));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes and flushes data.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let written = match &mut self.inner {
            Inner::Plain(reader) => {
                timeout(self.io_timeout, write_flush(reader.get_mut(), data)).await
            }
            Inner::Tls(reader) => {
                timeout(self.io_timeout, write_flush(reader.get_mut(), data)).await
            }
            Inner::Closed => return Err(not_connected()),
        };

        written.map_err(|_| Error::Timeout("write"))??;
        Ok(())
    }

    /// Writes `data` in chunks, each bounded by the I/O timeout.
    ///
    /// A large payload on a slow link that keeps making progress does not
    /// time out.
    ///
    /// # Errors
    ///
    /// Returns an error if a chunk fails or times out.
    pub async fn write_chunked(&mut self, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(WRITE_CHUNK) {
            self.write_all(chunk).await?;
        }
        Ok(())
    }

    /// Upgrades a plain stream to TLS in place (STARTTLS).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already secured or closed, if the
    /// server sent data ahead of the handshake, or if the handshake fails.
    pub async fn upgrade_to_tls(&mut self, hostname: &str) -> Result<()> {
        self.handshake(hostname, self.io_timeout).await
    }

    async fn handshake(&mut self, hostname: &str, limit: Duration) -> Result<()> {
        let io = match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Plain(reader) => {
                if !reader.buffer().is_empty() {
                    return Err(Error::Protocol(
                        "Server sent data before TLS handshake".into(),
                    ));
                }
                reader.into_inner()
            }
            Inner::Tls(reader) => {
                self.inner = Inner::Tls(reader);
                return Err(Error::Protocol("Already using TLS".into()));
            }
            Inner::Closed => return Err(not_connected()),
        };

        let connector = create_tls_connector();
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

        let tls_stream = timeout(limit, connector.connect(server_name, io))
            .await
            .map_err(|_| Error::Timeout("TLS handshake"))??;
        self.inner = Inner::Tls(Box::new(BufReader::new(tls_stream)));
        Ok(())
    }

    /// Shuts the stream down. Further reads and writes fail.
    pub async fn close(&mut self) {
        let limit = self.io_timeout;
        match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Plain(mut reader) => {
                let _ = timeout(limit, reader.get_mut().shutdown()).await;
            }
            Inner::Tls(mut reader) => {
                let _ = timeout(limit, reader.get_mut().shutdown()).await;
            }
            Inner::Closed => {}
        }
    }
}

async fn read_limited<R>(reader: &mut R, line: &mut String) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    reader.take(MAX_LINE_LENGTH).read_line(line).await
}

async fn write_flush<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(data).await?;
    writer.flush().await
}

fn not_connected() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::NotConnected, "stream closed"))
}

/// Connects to the configured server, performing the TLS handshake right
/// away for [`Security::Implicit`].
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails or times out.
pub async fn connect(config: &Config) -> Result<SmtpStream> {
    let addr = (config.host.as_str(), config.port);
    let tcp_stream = timeout(config.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| Error::Timeout("connect"))??;

    let mut stream = SmtpStream::new(tcp_stream, config.io_timeout);
    if config.security == Security::Implicit {
        stream.handshake(&config.host, config.connect_timeout).await?;
    }
    Ok(stream)
}

/// Creates a TLS connector with the Mozilla root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
