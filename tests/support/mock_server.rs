//! Mock SMTP and POP3 servers for exercising the delivery pipeline
//!
//! Both servers bind an ephemeral local port, record every command they
//! receive, and answer with configurable replies so tests can inject
//! rejections at any step.
#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

/// SMTP command received by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    /// EHLO command with hostname
    Ehlo(String),
    /// AUTH LOGIN command
    AuthLogin,
    /// Username line answering the AUTH prompt (base64, as received)
    AuthUsername(String),
    /// Password line answering the AUTH prompt (base64, as received)
    AuthPassword(String),
    /// MAIL command with its argument (`FROM:<...>`)
    MailFrom(String),
    /// RCPT command with its argument (`TO:<...>`)
    RcptTo(String),
    /// DATA command
    Data,
    /// Message content (after DATA)
    MessageContent(String),
    /// QUIT command
    Quit,
    /// Unknown/other command
    Other(String),
}

/// A single configured reply line
#[derive(Debug, Clone)]
pub struct MockReply {
    pub code: u16,
    pub message: String,
}

impl MockReply {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Clone)]
struct MockSmtpConfig {
    greeting: MockReply,
    ehlo_capabilities: Vec<String>,
    auth_response: MockReply,
    mail_from_response: MockReply,
    rcpt_to_response: MockReply,
    data_response: MockReply,
    data_end_response: MockReply,
    quit_response: MockReply,
}

impl Default for MockSmtpConfig {
    fn default() -> Self {
        Self {
            greeting: MockReply::new(220, "Mock SMTP Server"),
            ehlo_capabilities: vec!["localhost".to_string(), "AUTH LOGIN".to_string()],
            auth_response: MockReply::new(235, "Authentication successful"),
            mail_from_response: MockReply::new(250, "OK"),
            rcpt_to_response: MockReply::new(250, "OK"),
            data_response: MockReply::new(354, "Start mail input; end with <CRLF>.<CRLF>"),
            data_end_response: MockReply::new(250, "OK: Message accepted"),
            quit_response: MockReply::new(221, "Bye"),
        }
    }
}

/// What the handler expects the next line to be
enum AuthState {
    None,
    ExpectUsername,
    ExpectPassword,
}

/// Mock SMTP server for testing
pub struct MockSmtpServer {
    addr: SocketAddr,
    commands_received: Arc<RwLock<Vec<SmtpCommand>>>,
    shutdown: Arc<AtomicBool>,
    command_count: Arc<AtomicUsize>,
}

impl MockSmtpServer {
    /// Create a new builder for configuring the mock server
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder {
            config: MockSmtpConfig::default(),
        }
    }

    /// Start a server that accepts everything
    pub async fn start() -> std::io::Result<Self> {
        Self::builder().build().await
    }

    /// Get the address the server is listening on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get all commands received by the server
    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.commands_received.read().await.clone()
    }

    /// Get the number of commands received
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.command_count.load(Ordering::Relaxed)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Handle a single client connection
    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockSmtpConfig>,
        commands: Arc<RwLock<Vec<SmtpCommand>>>,
        command_count: Arc<AtomicUsize>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut auth_state = AuthState::None;

        writer.write_all(&config.greeting.to_bytes()).await?;
        writer.flush().await?;

        loop {
            line.clear();
            let bytes_read = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await;
            let Ok(bytes_read) = bytes_read else {
                return Ok(()); // timed out waiting for a command
            };
            if bytes_read? == 0 {
                return Ok(()); // connection closed
            }

            command_count.fetch_add(1, Ordering::Relaxed);
            let cmd_line = line.trim().to_string();

            // AUTH LOGIN interleaves bare base64 lines with the commands.
            match auth_state {
                AuthState::ExpectUsername => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::AuthUsername(cmd_line));
                    auth_state = AuthState::ExpectPassword;
                    writer.write_all(b"334 UGFzc3dvcmQ6\r\n").await?;
                    writer.flush().await?;
                    continue;
                }
                AuthState::ExpectPassword => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::AuthPassword(cmd_line));
                    auth_state = AuthState::None;
                    writer.write_all(&config.auth_response.to_bytes()).await?;
                    writer.flush().await?;
                    continue;
                }
                AuthState::None => {}
            }

            let parts: Vec<&str> = cmd_line.splitn(2, ' ').collect();
            let argument = parts.get(1).unwrap_or(&"").to_string();

            let (response, smtp_cmd) = match parts[0].to_uppercase().as_str() {
                "EHLO" => {
                    let mut reply = String::new();
                    let last = config.ehlo_capabilities.len().saturating_sub(1);
                    for (i, capability) in config.ehlo_capabilities.iter().enumerate() {
                        let separator = if i < last { '-' } else { ' ' };
                        reply.push_str(&format!("250{separator}{capability}\r\n"));
                    }
                    (reply.into_bytes(), SmtpCommand::Ehlo(argument))
                }
                "AUTH" => {
                    auth_state = AuthState::ExpectUsername;
                    (b"334 VXNlcm5hbWU6\r\n".to_vec(), SmtpCommand::AuthLogin)
                }
                "MAIL" => (
                    config.mail_from_response.to_bytes(),
                    SmtpCommand::MailFrom(argument),
                ),
                "RCPT" => (
                    config.rcpt_to_response.to_bytes(),
                    SmtpCommand::RcptTo(argument),
                ),
                "DATA" => (config.data_response.to_bytes(), SmtpCommand::Data),
                "QUIT" => {
                    commands.write().await.push(SmtpCommand::Quit);
                    writer.write_all(&config.quit_response.to_bytes()).await?;
                    writer.flush().await?;
                    return Ok(());
                }
                _ => (
                    MockReply::new(500, "Unknown command").to_bytes(),
                    SmtpCommand::Other(cmd_line.clone()),
                ),
            };

            commands.write().await.push(smtp_cmd.clone());
            writer.write_all(&response).await?;
            writer.flush().await?;

            // After a 354, collect the payload until the lone dot.
            if matches!(smtp_cmd, SmtpCommand::Data) && config.data_response.code == 354 {
                let mut content = String::new();
                loop {
                    line.clear();
                    if reader.read_line(&mut line).await? == 0 {
                        return Ok(());
                    }
                    if line.trim_end() == "." {
                        break;
                    }
                    content.push_str(&line);
                }

                commands
                    .write()
                    .await
                    .push(SmtpCommand::MessageContent(content));
                writer.write_all(&config.data_end_response.to_bytes()).await?;
                writer.flush().await?;
            }
        }
    }
}

/// Builder for configuring a `MockSmtpServer`
pub struct MockSmtpServerBuilder {
    config: MockSmtpConfig,
}

impl MockSmtpServerBuilder {
    /// Set the greeting reply
    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = MockReply::new(code, message);
        self
    }

    /// Set the reply sent after the AUTH password line
    #[must_use]
    pub fn with_auth_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.auth_response = MockReply::new(code, message);
        self
    }

    /// Set the MAIL FROM reply
    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from_response = MockReply::new(code, message);
        self
    }

    /// Set the RCPT TO reply
    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.rcpt_to_response = MockReply::new(code, message);
        self
    }

    /// Set the reply after message content (after `<CRLF>.<CRLF>`)
    #[must_use]
    pub fn with_data_end_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_end_response = MockReply::new(code, message);
        self
    }

    /// Build and start the mock SMTP server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> std::io::Result<MockSmtpServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let commands = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let command_count = Arc::new(AtomicUsize::new(0));

        let config_clone = Arc::clone(&config);
        let commands_clone = Arc::clone(&commands);
        let shutdown_clone = Arc::clone(&shutdown);
        let command_count_clone = Arc::clone(&command_count);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                // Accept with a timeout so the shutdown flag gets checked
                let accepted = timeout(Duration::from_millis(100), listener.accept()).await;
                if let Ok(Ok((stream, _peer))) = accepted {
                    let config = Arc::clone(&config_clone);
                    let commands = Arc::clone(&commands_clone);
                    let command_count = Arc::clone(&command_count_clone);

                    tokio::spawn(async move {
                        if let Err(error) =
                            MockSmtpServer::handle_client(stream, config, commands, command_count)
                                .await
                        {
                            eprintln!("mock SMTP client error: {error}");
                        }
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            commands_received: commands,
            shutdown,
            command_count,
        })
    }
}

/// POP3 command received by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop3Command {
    User(String),
    Pass(String),
    Stat,
    Quit,
    Other(String),
}

#[derive(Clone)]
struct MockPop3Config {
    greeting: String,
    user_response: String,
    pass_response: String,
    stat_response: String,
}

impl Default for MockPop3Config {
    fn default() -> Self {
        Self {
            greeting: "+OK mock POP3 server ready".to_string(),
            user_response: "+OK send PASS".to_string(),
            pass_response: "+OK mailbox locked and ready".to_string(),
            stat_response: "+OK 0 0".to_string(),
        }
    }
}

/// Mock POP3 server for testing the pre-authentication step
pub struct MockPop3Server {
    addr: SocketAddr,
    commands_received: Arc<RwLock<Vec<Pop3Command>>>,
    shutdown: Arc<AtomicBool>,
}

impl MockPop3Server {
    /// Create a new builder for configuring the mock server
    #[must_use]
    pub fn builder() -> MockPop3ServerBuilder {
        MockPop3ServerBuilder {
            config: MockPop3Config::default(),
        }
    }

    /// Start a server that accepts everything
    pub async fn start() -> std::io::Result<Self> {
        Self::builder().build().await
    }

    /// Get the address the server is listening on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get all commands received by the server
    pub async fn commands(&self) -> Vec<Pop3Command> {
        self.commands_received.read().await.clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockPop3Config>,
        commands: Arc<RwLock<Vec<Pop3Command>>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer
            .write_all(format!("{}\r\n", config.greeting).as_bytes())
            .await?;
        writer.flush().await?;

        loop {
            line.clear();
            let bytes_read = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await;
            let Ok(bytes_read) = bytes_read else {
                return Ok(());
            };
            if bytes_read? == 0 {
                return Ok(());
            }

            let cmd_line = line.trim().to_string();
            let parts: Vec<&str> = cmd_line.splitn(2, ' ').collect();
            let argument = parts.get(1).unwrap_or(&"").to_string();

            let (response, pop_cmd) = match parts[0].to_uppercase().as_str() {
                "USER" => (config.user_response.clone(), Pop3Command::User(argument)),
                "PASS" => (config.pass_response.clone(), Pop3Command::Pass(argument)),
                "STAT" => (config.stat_response.clone(), Pop3Command::Stat),
                "QUIT" => {
                    commands.write().await.push(Pop3Command::Quit);
                    writer.write_all(b"+OK bye\r\n").await?;
                    writer.flush().await?;
                    return Ok(());
                }
                _ => (
                    "-ERR unknown command".to_string(),
                    Pop3Command::Other(cmd_line.clone()),
                ),
            };

            commands.write().await.push(pop_cmd);
            writer.write_all(format!("{response}\r\n").as_bytes()).await?;
            writer.flush().await?;
        }
    }
}

/// Builder for configuring a `MockPop3Server`
pub struct MockPop3ServerBuilder {
    config: MockPop3Config,
}

impl MockPop3ServerBuilder {
    /// Set the reply to PASS (e.g. `-ERR invalid password`)
    #[must_use]
    pub fn with_pass_response(mut self, response: impl Into<String>) -> Self {
        self.config.pass_response = response.into();
        self
    }

    /// Build and start the mock POP3 server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> std::io::Result<MockPop3Server> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let commands = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let config_clone = Arc::clone(&config);
        let commands_clone = Arc::clone(&commands);
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                let accepted = timeout(Duration::from_millis(100), listener.accept()).await;
                if let Ok(Ok((stream, _peer))) = accepted {
                    let config = Arc::clone(&config_clone);
                    let commands = Arc::clone(&commands_clone);

                    tokio::spawn(async move {
                        if let Err(error) =
                            MockPop3Server::handle_client(stream, config, commands).await
                        {
                            eprintln!("mock POP3 client error: {error}");
                        }
                    });
                }
            }
        });

        Ok(MockPop3Server {
            addr,
            commands_received: commands,
            shutdown,
        })
    }
}
