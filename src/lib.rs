//! A gatekeeper for outbound electronic mail
//!
//! `postern` fronts a single configured mail identity. Requests name that
//! identity, and are validated, sanitized and rate limited before anything
//! touches the network. Only a request that clears every check is composed
//! and submitted over SMTP, optionally preceded by a read-only POP3 login
//! for relays that require POP-before-SMTP.
//!
//! The pipeline, in order:
//! - availability gate (set once, at construction)
//! - flood control (rolling per-minute and per-day windows)
//! - input sanitization and mailer-name check
//! - optional POP3 pre-authentication
//! - message composition and SMTP submission
//!
//! Construction never fails. A property set that does not resolve leaves
//! the mailer permanently unavailable, and every request is answered with
//! the not-configured outcome instead.
//!
//! ```no_run
//! use postern::{Mailer, Properties};
//!
//! # async fn example() {
//! let mut properties = Properties::new();
//! properties.insert("maxSizeAddress".into(), "128".into());
//! properties.insert("maxSizeSubject".into(), "128".into());
//! properties.insert("maxSizeMessage".into(), "4096".into());
//! properties.insert("maxPerMinute".into(), "2".into());
//! properties.insert("name".into(), "contact-form".into());
//! properties.insert("to".into(), "inbox@example.com".into());
//! properties.insert("smtpHost".into(), "mail.example.com:587".into());
//! properties.insert("smtpUsername".into(), "mailer".into());
//! properties.insert("smtpPassword".into(), "hunter2".into());
//!
//! let mailer = Mailer::new(&properties);
//! let outcome = mailer
//!     .mail("contact-form", "visitor@example.org", "Hello", "Hi there")
//!     .await;
//! println!("{outcome}");
//! # }
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod message;
pub mod pop3;
pub mod rate;
pub mod sanitize;
pub mod smtp;

pub use address::{AddressError, Mailbox};
pub use config::{MailerConfig, Properties};
pub use error::{ConfigError, TransportError};
pub use mailer::{DeliveryOutcome, Mailer};
