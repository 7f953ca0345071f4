//! Outbound message composition.
//!
//! Builds the RFC 822 text handed to the DATA phase, and tracks the
//! envelope alongside it. Header recipients and envelope recipients diverge
//! on purpose: blind-carbon recipients ride the envelope only and never
//! appear in the message text. Bodies are plain text.

/// Builder for the outbound message and its envelope.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: Option<String>,
    body: Option<String>,
}

impl MessageBuilder {
    /// Creates a new empty message builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender. A later call replaces the earlier value.
    #[must_use]
    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(email.into());
        self
    }

    /// Adds a recipient to the To header and the envelope.
    #[must_use]
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.to.push(email.into());
        self
    }

    /// Adds a recipient to the Cc header and the envelope.
    #[must_use]
    pub fn cc(mut self, email: impl Into<String>) -> Self {
        self.cc.push(email.into());
        self
    }

    /// Adds a recipient to the envelope only.
    #[must_use]
    pub fn bcc(mut self, email: impl Into<String>) -> Self {
        self.bcc.push(email.into());
        self
    }

    /// Sets the Subject header.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn body(mut self, content: impl Into<String>) -> Self {
        self.body = Some(content.into());
        self
    }

    /// The envelope sender, if one was set.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// All envelope recipients: to, then cc, then bcc.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .cloned()
            .collect()
    }

    /// Renders the message text: headers, a blank line, then the body.
    #[must_use]
    pub fn build(&self) -> String {
        let mut message = String::with_capacity(256);

        if let Some(from) = &self.from {
            message.push_str(&format!("From: {from}\r\n"));
        }
        if !self.to.is_empty() {
            message.push_str(&format!("To: {}\r\n", self.to.join(", ")));
        }
        if !self.cc.is_empty() {
            message.push_str(&format!("Cc: {}\r\n", self.cc.join(", ")));
        }
        if let Some(subject) = &self.subject {
            message.push_str(&format!("Subject: {subject}\r\n"));
        }

        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("\r\n");

        if let Some(body) = &self.body {
            message.push_str(body);
        }

        message
    }
}
