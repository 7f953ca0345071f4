//! Construction-time resolution of the flat property set.
//!
//! The mailer is configured from a flat string-keyed map, the way its
//! deployments have always shipped it. All typing happens here, once: the
//! limits become integers, the addresses are validated, and the transport
//! parameters are carried through opaquely. The first failure rejects the
//! whole set; no partially resolved configuration escapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    address::{AddressError, Mailbox},
    error::ConfigError,
};

/// The flat string-keyed property set a mailer is constructed from.
pub type Properties = HashMap<String, String>;

/// Connection parameters for one of the transport collaborators, carried
/// through untyped. `host` is used verbatim as the TCP connect address
/// (`host:port`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub username: String,
    pub password: String,
}

/// Immutable mailer configuration, resolved once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Longest accepted address field, in characters.
    pub max_size_address: usize,
    /// Longest accepted subject, in characters.
    pub max_size_subject: usize,
    /// Longest accepted message body, in characters.
    pub max_size_message: usize,
    /// Per-minute admission threshold.
    pub max_per_minute: u32,
    /// Per-day admission threshold.
    pub max_per_day: u32,
    /// Whether a POP3 login must precede every SMTP session.
    pub requires_pop_to_use_smtp: bool,
    /// The identity token callers must present. Absent means no caller can
    /// ever match.
    pub mailer_name: Option<String>,
    /// The one configured recipient.
    pub to: Mailbox,
    pub cc: Option<Mailbox>,
    pub bcc: Option<Mailbox>,
    /// Sender used when the request does not carry one.
    pub default_from: Option<Mailbox>,
    /// SMTP submission endpoint.
    pub smtp: Endpoint,
    /// POP3 endpoint for the pre-authentication login.
    pub pop: Endpoint,
}

impl MailerConfig {
    /// Resolves a property set into a typed configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` encountered; the caller is expected
    /// to treat any error as total rejection.
    pub fn from_properties(props: &Properties) -> Result<Self, ConfigError> {
        let max_size_address = parse_count(props, "maxSizeAddress")?;
        let max_size_subject = parse_count(props, "maxSizeSubject")?;
        let max_size_message = parse_count(props, "maxSizeMessage")?;
        let max_per_minute = parse_count(props, "maxPerMinute")?;
        // The day limit reads the per-minute key. Suspected copy/paste
        // defect, but deployed configurations may rely on a `maxPerDay`
        // entry being ignored; confirm with the service owners before
        // switching keys.
        let max_per_day = parse_count(props, "maxPerMinute")?;

        let to = match optional_address(props, "to")? {
            Some(to) => to,
            None => {
                return Err(ConfigError::Address {
                    key: "to",
                    source: AddressError::Empty,
                });
            }
        };
        let cc = optional_address(props, "cc")?;
        let bcc = optional_address(props, "bcc")?;
        let default_from = optional_address(props, "defaultFrom")?;

        // Only the literal `true` turns the flag on; anything else,
        // malformed included, means off.
        let requires_pop_to_use_smtp = props
            .get("requiresPopToUseSmtp")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        Ok(Self {
            max_size_address,
            max_size_subject,
            max_size_message,
            max_per_minute,
            max_per_day,
            requires_pop_to_use_smtp,
            mailer_name: props.get("name").cloned(),
            to,
            cc,
            bcc,
            default_from,
            smtp: endpoint(props, "smtpHost", "smtpUsername", "smtpPassword"),
            pop: endpoint(props, "popHost", "popUsername", "popPassword"),
        })
    }
}

/// A missing key reads as the empty string, which fails the same way a
/// malformed value does.
fn get<'props>(props: &'props Properties, key: &str) -> &'props str {
    props.get(key).map(String::as_str).unwrap_or_default()
}

fn parse_count<T>(props: &Properties, key: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    get(props, key)
        .parse()
        .map_err(|source| ConfigError::Numeric { key, source })
}

/// Absent or empty values mean "not configured", not an error.
fn optional_address(props: &Properties, key: &'static str) -> Result<Option<Mailbox>, ConfigError> {
    let value = get(props, key);

    if value.is_empty() {
        return Ok(None);
    }

    Mailbox::parse(value)
        .map(Some)
        .map_err(|source| ConfigError::Address { key, source })
}

fn endpoint(props: &Properties, host: &str, username: &str, password: &str) -> Endpoint {
    Endpoint {
        host: get(props, host).to_string(),
        username: get(props, username).to_string(),
        password: get(props, password).to_string(),
    }
}
