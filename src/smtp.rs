//! SMTP client used to submit the composed message.
//!
//! A deliberately small client: plain TCP, EHLO, AUTH LOGIN, one message,
//! QUIT. Reply parsing handles multi-line responses; the read buffer grows
//! on demand up to a hard cap.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Initial size of the read buffer for SMTP replies.
const BUFFER_SIZE: usize = 8192;

/// Maximum size of the read buffer to prevent unbounded growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Errors that can occur when using the SMTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an SMTP reply from the server.
    #[error("Failed to parse SMTP reply: {0}")]
    ParseError(String),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A complete SMTP reply, which may span multiple lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The SMTP status code.
    pub code: u16,
    /// All message lines in the reply.
    pub lines: Vec<String>,
}

impl Response {
    /// The complete message with lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// `true` for 2xx replies.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// `true` for the 3xx intermediate replies (DATA, AUTH prompts).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    /// Parses one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes consumed, or `None` when
    /// the buffer does not yet hold the final line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the reply is malformed.
    pub fn parse(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let text = std::str::from_utf8(buffer)?;
        let mut lines = Vec::new();
        let mut consumed = 0;
        let mut code = None;

        loop {
            let rest = &text[consumed..];
            let Some(end) = rest.find('\n') else {
                return Ok(None);
            };
            let raw = rest[..end].trim_end_matches('\r');
            consumed += end + 1;

            if raw.len() < 3 {
                return Err(ClientError::ParseError(format!(
                    "reply line too short: '{raw}'"
                )));
            }

            let code_str = raw.get(..3).unwrap_or_default();
            let line_code: u16 = code_str.parse().map_err(|_| {
                ClientError::ParseError(format!("invalid reply code: '{code_str}'"))
            })?;

            match code {
                None => code = Some(line_code),
                Some(code) if code != line_code => {
                    return Err(ClientError::ParseError(format!(
                        "reply code changed mid-reply: {code} then {line_code}"
                    )));
                }
                Some(_) => {}
            }

            lines.push(raw.get(4..).unwrap_or_default().to_string());

            match raw.as_bytes().get(3) {
                // Continuation line; the final line uses a space.
                Some(b'-') => {}
                None | Some(b' ') => {
                    return Ok(Some((
                        Self {
                            code: line_code,
                            lines,
                        },
                        consumed,
                    )));
                }
                Some(other) => {
                    return Err(ClientError::ParseError(format!(
                        "invalid separator character: '{}'",
                        *other as char
                    )));
                }
            }
        }
    }
}

/// An SMTP client holding one connection to the submission server.
pub struct SmtpClient {
    stream: TcpStream,
    buffer: Vec<u8>,
    filled: usize,
}

impl SmtpClient {
    /// Connects to the server. The greeting is not consumed here; call
    /// [`Self::read_greeting`] next.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;

        Ok(Self {
            stream,
            buffer: vec![0u8; BUFFER_SIZE],
            filled: 0,
        })
    }

    /// Reads the initial server greeting (220 reply).
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the greeting is malformed.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        self.read_response().await
    }

    /// Sends one command line and reads the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.stream
            .write_all(format!("{command}\r\n").as_bytes())
            .await?;
        self.read_response().await
    }

    /// Sends EHLO with the specified domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("EHLO {domain}")).await
    }

    /// Authenticates with AUTH LOGIN: base64 username and password, each in
    /// answer to a 334 prompt.
    ///
    /// Returns the final reply; anything other than a 235 means the server
    /// declined. A non-prompt reply to an earlier step is returned as-is so
    /// the caller sees what the server said.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn auth_login(&mut self, username: &str, password: &str) -> Result<Response> {
        let prompt = self.command("AUTH LOGIN").await?;
        if !prompt.is_intermediate() {
            return Ok(prompt);
        }

        let prompt = self.command(&BASE64.encode(username)).await?;
        if !prompt.is_intermediate() {
            return Ok(prompt);
        }

        self.command(&BASE64.encode(password)).await
    }

    /// Sends MAIL FROM.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    /// Sends RCPT TO.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// Sends DATA. A 354 reply invites the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Transmits the message payload and the end-of-data marker.
    ///
    /// Lines beginning with a dot are doubled (RFC 5321 Section 4.5.2), and
    /// a payload without a trailing newline gets one before the marker.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_data(&mut self, data: &str) -> Result<Response> {
        let mut payload = String::with_capacity(data.len() + 16);
        for line in data.split_inclusive('\n') {
            if line.starts_with('.') {
                payload.push('.');
            }
            payload.push_str(line);
        }

        self.stream.write_all(payload.as_bytes()).await?;
        if !payload.ends_with('\n') {
            self.stream.write_all(b"\r\n").await?;
        }
        self.stream.write_all(b".\r\n").await?;

        self.read_response().await
    }

    /// Sends QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        self.command("QUIT").await
    }

    /// Reads a complete SMTP reply from the server.
    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) = Response::parse(&self.buffer[..self.filled])? {
                // Remove consumed bytes from the buffer
                self.buffer.copy_within(consumed..self.filled, 0);
                self.filled -= consumed;
                return Ok(response);
            }

            if self.filled == self.buffer.len() {
                let grown = self.buffer.len() * 2;
                if grown > MAX_BUFFER_SIZE {
                    return Err(ClientError::ParseError(format!(
                        "reply too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(grown, 0);
            }

            let read = self.stream.read(&mut self.buffer[self.filled..]).await?;
            if read == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            self.filled += read;
        }
    }
}
