//! Mailbox address validation
//!
//! Validates `local-part@domain` in the shape of RFC 5321 Section 4.1.2,
//! reduced to what a submission gatekeeper accepts: dot-string local parts
//! and LDH-style domains. Source routes, address literals and quoted
//! strings are the receiving MTA's problem, not ours, and are rejected.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum octets in a local-part (RFC 5321 Section 4.5.3.1.1).
const MAX_LOCAL_PART: usize = 64;

/// Maximum octets in a domain (RFC 5321 Section 4.5.3.1.2).
const MAX_DOMAIN: usize = 255;

/// Errors that can occur during address validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,

    #[error("Missing '@' separator in mailbox")]
    MissingAtSign,

    #[error("Local-part exceeds {MAX_LOCAL_PART} octets")]
    LocalPartTooLong,

    #[error("Domain exceeds {MAX_DOMAIN} octets")]
    DomainTooLong,

    #[error("Invalid local-part: {0}")]
    InvalidLocalPart(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// A validated mailbox (`local-part@domain`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    /// The local part (before @)
    pub local_part: String,
    /// The domain (after @)
    pub domain: String,
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

impl FromStr for Mailbox {
    type Err = AddressError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl Mailbox {
    /// Validates a bare or angle-bracketed mailbox.
    ///
    /// # Errors
    ///
    /// Returns an `AddressError` naming the first constraint the input
    /// violates.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        // `<user@host>` is accepted and unwrapped; everything else must be
        // the bare mailbox form.
        let bare = trimmed
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(trimmed);

        let at = bare.rfind('@').ok_or(AddressError::MissingAtSign)?;
        let (local_part, domain) = (&bare[..at], &bare[at + 1..]);

        if local_part.len() > MAX_LOCAL_PART {
            return Err(AddressError::LocalPartTooLong);
        }
        if domain.len() > MAX_DOMAIN {
            return Err(AddressError::DomainTooLong);
        }

        validate_dot_string(local_part)?;
        validate_domain(domain)?;

        Ok(Self {
            local_part: local_part.to_string(),
            domain: domain.to_string(),
        })
    }
}

/// `Dot-string = Atom *("." Atom)`
fn validate_dot_string(input: &str) -> Result<(), AddressError> {
    if input.is_empty() {
        return Err(AddressError::InvalidLocalPart("empty local-part".into()));
    }

    for atom in input.split('.') {
        if atom.is_empty() {
            return Err(AddressError::InvalidLocalPart(format!(
                "empty atom in '{input}'"
            )));
        }

        if let Some(ch) = atom.chars().find(|ch| !is_atext(*ch)) {
            return Err(AddressError::InvalidLocalPart(format!(
                "invalid character '{ch}'"
            )));
        }
    }

    Ok(())
}

/// `atext` from RFC 5321: alphanumerics plus the printable specials that
/// need no quoting.
const fn is_atext(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// `Domain = sub-domain *("." sub-domain)` where each label starts and ends
/// with a letter or digit and may contain hyphens in between.
fn validate_domain(input: &str) -> Result<(), AddressError> {
    if input.is_empty() {
        return Err(AddressError::InvalidDomain("empty domain".into()));
    }

    for label in input.split('.') {
        if label.is_empty() {
            return Err(AddressError::InvalidDomain(format!(
                "empty label in '{input}'"
            )));
        }

        let first = label.chars().next();
        let last = label.chars().last();
        if !first.is_some_and(|ch| ch.is_ascii_alphanumeric())
            || !last.is_some_and(|ch| ch.is_ascii_alphanumeric())
        {
            return Err(AddressError::InvalidDomain(format!(
                "label '{label}' must start and end with a letter or digit"
            )));
        }

        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
        {
            return Err(AddressError::InvalidDomain(format!(
                "invalid character '{ch}'"
            )));
        }
    }

    Ok(())
}
