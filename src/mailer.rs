//! The delivery pipeline: availability gate, flood control, identity check,
//! sanitization, optional mailbox pre-authentication, SMTP submission.
//!
//! Every failure class maps to a [`DeliveryOutcome`]; nothing escapes
//! `mail` as an error or a panic.

use std::{fmt, sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{
    address::Mailbox,
    config::{MailerConfig, Properties},
    error::TransportError,
    message::MessageBuilder,
    pop3::Pop3Client,
    rate::{Admission, RateLimiter, RateWindow},
    sanitize::clean,
    smtp::SmtpClient,
};

/// Maximum length of the claimed mailer name before comparison.
const MAX_MAILER_NAME: usize = 255;

/// Interval between rate-window ticks.
const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Name we present in EHLO. The submission servers this talks to
/// authenticate by credentials, not by client hostname.
const CLIENT_NAME: &str = "localhost";

/// Classified result of a `mail` call.
///
/// `Display` renders the fixed human-readable form of each outcome, which
/// is also the only signal some callers consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The message was handed to the SMTP server.
    Ok,
    /// Construction rejected the configuration; the mailer never recovers.
    NotConfigured,
    /// The per-minute window is exhausted.
    MinuteFloodControl,
    /// The per-day window is exhausted.
    DayFloodControl,
    /// The claimed mailer name does not match the configured identity.
    InvalidMailerName(String),
    /// The transport failed somewhere between pre-auth and submission.
    SendFailed,
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("Ok"),
            Self::NotConfigured => f.write_str("Mailer has not been configured."),
            Self::MinuteFloodControl => {
                f.write_str("There have been a flood of emails.  Please try again in a minute.")
            }
            Self::DayFloodControl => {
                f.write_str("There have been a flood of emails.  Please try again in 24 hours.")
            }
            Self::InvalidMailerName(name) => {
                write!(f, "The name {name} is not a valid mailer.")
            }
            Self::SendFailed => f.write_str("Failed to send mail."),
        }
    }
}

/// A gatekeeper for outbound mail with one configured identity.
///
/// Construction never fails: a rejected property set leaves the mailer
/// permanently unavailable, and every `mail` call answers with
/// [`DeliveryOutcome::NotConfigured`]. A configured mailer owns a
/// background task that ticks the rate window every minute; the task is
/// cancelled when the mailer is dropped.
///
/// Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct Mailer {
    config: Option<MailerConfig>,
    limiter: Arc<RateLimiter>,
    tick_task: Option<JoinHandle<()>>,
}

impl Mailer {
    /// Builds a mailer from a flat property set.
    ///
    /// A property set that does not resolve is logged with its diagnostic
    /// class (numeric vs address) and produces an unavailable mailer.
    #[must_use]
    pub fn new(properties: &Properties) -> Self {
        match MailerConfig::from_properties(properties) {
            Ok(config) => {
                let limiter = Arc::new(RateLimiter::new(
                    config.max_per_minute,
                    config.max_per_day,
                ));
                let tick_task = Some(Self::spawn_tick(Arc::clone(&limiter)));

                Self {
                    config: Some(config),
                    limiter,
                    tick_task,
                }
            }
            Err(error) => {
                tracing::error!(class = error.class(), %error, "could not parse properties");

                Self {
                    config: None,
                    limiter: Arc::new(RateLimiter::new(0, 0)),
                    tick_task: None,
                }
            }
        }
    }

    /// Starts the 60-second window tick. The first tick fires immediately,
    /// the same as a timer scheduled with no initial delay.
    fn spawn_tick(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(TICK_INTERVAL);

            loop {
                timer.tick().await;
                limiter.tick();
            }
        })
    }

    /// Whether construction accepted the configuration.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.config.is_some()
    }

    /// Snapshot of the rate window, for observation.
    #[must_use]
    pub fn rate_window(&self) -> RateWindow {
        self.limiter.window()
    }

    /// Validates, rate-limits, and delivers one message.
    ///
    /// The pipeline runs in a fixed order: availability, flood control
    /// (minute before day), quota consumption, sanitization, identity
    /// check, then the transport. Quota is burned on admission, before the
    /// identity check, so a rejected or failed request still counts against
    /// the caller's windows.
    pub async fn mail(
        &self,
        mailer_name: &str,
        from: &str,
        subject: &str,
        message: &str,
    ) -> DeliveryOutcome {
        tracing::debug!(mailer_name, from, subject, body = message, "mail request");

        let Some(config) = &self.config else {
            return DeliveryOutcome::NotConfigured;
        };

        match self.limiter.admit() {
            Admission::DeniedMinute => return DeliveryOutcome::MinuteFloodControl,
            Admission::DeniedDay => return DeliveryOutcome::DayFloodControl,
            Admission::Granted => {}
        }
        self.limiter.record_sent();

        let mailer_name = clean(Some(mailer_name), MAX_MAILER_NAME);
        let from = clean(Some(from), config.max_size_address);
        // The subject and body take their text from the cleaned `from`
        // value, not their own arguments. Suspected copy/paste defect, kept
        // until the service owners confirm a fix would break nobody.
        let subject = clean(Some(&from), config.max_size_subject);
        let message = clean(Some(&from), config.max_size_message);

        if config.mailer_name.as_deref() != Some(mailer_name.as_str()) {
            return DeliveryOutcome::InvalidMailerName(mailer_name);
        }

        match Self::deliver(config, &from, &subject, &message).await {
            Ok(()) => DeliveryOutcome::Ok,
            Err(error) => {
                tracing::error!(%error, "exception mailing message");
                DeliveryOutcome::SendFailed
            }
        }
    }

    /// Runs the transport half of the pipeline: optional POP3 pre-auth,
    /// composition, SMTP submission. Sessions opened here are closed on
    /// every exit path; a failed QUIT never overrides the primary outcome.
    async fn deliver(
        config: &MailerConfig,
        from: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let mut pop_session = None;
        let mut smtp_session = None;

        let result = Self::deliver_inner(
            config,
            from,
            subject,
            body,
            &mut pop_session,
            &mut smtp_session,
        )
        .await;

        if let Some(mut session) = pop_session {
            let _ = session.quit().await;
        }
        if let Some(mut session) = smtp_session {
            let _ = session.quit().await;
        }

        result
    }

    async fn deliver_inner(
        config: &MailerConfig,
        from: &str,
        subject: &str,
        body: &str,
        pop_session: &mut Option<Pop3Client>,
        smtp_session: &mut Option<SmtpClient>,
    ) -> Result<(), TransportError> {
        if config.requires_pop_to_use_smtp {
            let pop = pop_session.insert(Pop3Client::connect(&config.pop.host).await?);
            pop.login(&config.pop.username, &config.pop.password).await?;
            // The login itself is the point; the mailbox stays untouched.
            pop.stat().await?;
        }

        let mut builder = MessageBuilder::new()
            .to(config.to.to_string())
            .subject(subject)
            .body(body);
        if let Some(cc) = &config.cc {
            builder = builder.cc(cc.to_string());
        }
        if let Some(bcc) = &config.bcc {
            builder = builder.bcc(bcc.to_string());
        }
        if let Some(default_from) = &config.default_from {
            builder = builder.from(default_from.to_string());
        }
        if !from.is_empty() {
            // A caller-supplied sender wins over the configured default.
            let from = Mailbox::parse(from)?;
            builder = builder.from(from.to_string());
        }

        let smtp = smtp_session.insert(SmtpClient::connect(&config.smtp.host).await?);

        let greeting = smtp.read_greeting().await?;
        if !greeting.is_success() {
            return Err(TransportError::rejected("greeting", &greeting));
        }

        let ehlo = smtp.ehlo(CLIENT_NAME).await?;
        if !ehlo.is_success() {
            return Err(TransportError::rejected("EHLO", &ehlo));
        }

        if !config.smtp.username.is_empty() {
            let auth = smtp
                .auth_login(&config.smtp.username, &config.smtp.password)
                .await?;
            if !auth.is_success() {
                return Err(TransportError::rejected("AUTH", &auth));
            }
        }

        let sender = builder.sender().unwrap_or_default().to_string();
        let accepted = smtp.mail_from(&sender).await?;
        if !accepted.is_success() {
            return Err(TransportError::rejected("MAIL FROM", &accepted));
        }

        for recipient in builder.recipients() {
            let accepted = smtp.rcpt_to(&recipient).await?;
            if !accepted.is_success() {
                return Err(TransportError::rejected("RCPT TO", &accepted));
            }
        }

        let invited = smtp.data().await?;
        if !invited.is_intermediate() {
            return Err(TransportError::rejected("DATA", &invited));
        }

        let accepted = smtp.send_data(&builder.build()).await?;
        if !accepted.is_success() {
            return Err(TransportError::rejected("message data", &accepted));
        }

        Ok(())
    }
}

impl Drop for Mailer {
    fn drop(&mut self) {
        // The tick task would otherwise outlive the instance.
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }
}
