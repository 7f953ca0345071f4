//! Typed error handling for configuration and delivery.
//!
//! Nothing here crosses the public `mail` boundary. Configuration errors
//! are logged once at construction and the mailer degrades to unavailable;
//! transport errors are caught inside the pipeline and collapse into the
//! generic send-failure outcome.

use thiserror::Error;

use crate::{
    address::AddressError,
    pop3::Pop3Error,
    smtp::{ClientError, Response},
};

/// Why a property set was rejected at construction time.
///
/// The two variants are the two diagnostic classes reported when a mailer
/// degrades to unavailable: a malformed (or missing) numeric value, or a
/// malformed address.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("property '{key}' is not a valid number: {source}")]
    Numeric {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("property '{key}' is not a valid address: {source}")]
    Address {
        key: &'static str,
        #[source]
        source: AddressError,
    },
}

impl ConfigError {
    /// The diagnostic class named in the construction-failure log line.
    #[must_use]
    pub const fn class(&self) -> &'static str {
        match self {
            Self::Numeric { .. } => "numeric",
            Self::Address { .. } => "address",
        }
    }
}

/// Failures inside the delivery pipeline.
///
/// Every variant is caught at the `mail` boundary, logged, and converted to
/// the generic send-failure outcome.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The SMTP client failed at the protocol or socket level.
    #[error("SMTP failure: {0}")]
    Smtp(#[from] ClientError),

    /// The POP3 pre-authentication step failed.
    #[error("POP3 failure: {0}")]
    Pop3(#[from] Pop3Error),

    /// The caller-supplied sender did not survive address validation.
    #[error("invalid sender address: {0}")]
    Sender(#[from] AddressError),

    /// The server answered a command with a non-success reply.
    #[error("server rejected {command}: {code} {message}")]
    Rejected {
        command: &'static str,
        code: u16,
        message: String,
    },
}

impl TransportError {
    /// Wraps a non-success SMTP reply with the command it answered.
    #[must_use]
    pub fn rejected(command: &'static str, response: &Response) -> Self {
        Self::Rejected {
            command,
            code: response.code,
            message: response.message(),
        }
    }
}
