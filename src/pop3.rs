//! POP3 client used for mailbox pre-authentication.
//!
//! Some relays only accept mail from a client that has recently logged into
//! its mailbox, a leftover anti-abuse measure. This client performs that
//! login and nothing else: USER, PASS, a read-only STAT of the inbox, QUIT.
//! Replies are the single-line `+OK`/`-ERR` form; the multi-line listing
//! commands are never issued.

use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

/// Errors that can occur when using the POP3 client.
#[derive(Error, Debug)]
pub enum Pop3Error {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// The server answered `-ERR`.
    #[error("server rejected command: {0}")]
    Rejected(String),

    /// The reply carried neither status marker.
    #[error("malformed reply: {0}")]
    Malformed(String),
}

/// Specialized `Result` type for POP3 client operations.
pub type Result<T> = std::result::Result<T, Pop3Error>;

/// One POP3 session, alive from connect to QUIT.
pub struct Pop3Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Pop3Client {
    /// Connects to the server and consumes its greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the greeting is not
    /// `+OK`.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read, write) = stream.into_split();

        let mut client = Self {
            reader: BufReader::new(read),
            writer: write,
        };
        client.read_reply().await?;

        Ok(client)
    }

    /// Logs in with USER and PASS.
    ///
    /// # Errors
    ///
    /// Returns an error if either step fails or is rejected.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.command(&format!("USER {username}")).await?;
        self.command(&format!("PASS {password}")).await?;
        Ok(())
    }

    /// Opens the mailbox read-only via STAT. The counts in the reply are
    /// discarded; a successful reply is all the pre-authentication needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or is rejected.
    pub async fn stat(&mut self) -> Result<()> {
        self.command("STAT").await.map(drop)
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or is rejected.
    pub async fn quit(&mut self) -> Result<()> {
        self.command("QUIT").await.map(drop)
    }

    /// Sends one command line and reads the status reply.
    async fn command(&mut self, command: &str) -> Result<String> {
        self.writer
            .write_all(format!("{command}\r\n").as_bytes())
            .await?;
        self.read_reply().await
    }

    /// Reads one status line; `-ERR` becomes `Pop3Error::Rejected`.
    async fn read_reply(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(Pop3Error::ConnectionClosed);
        }

        parse_reply(line.trim_end())
    }
}

fn parse_reply(line: &str) -> Result<String> {
    if let Some(rest) = line.strip_prefix("+OK") {
        Ok(rest.trim_start().to_string())
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        Err(Pop3Error::Rejected(rest.trim_start().to_string()))
    } else {
        Err(Pop3Error::Malformed(line.to_string()))
    }
}
