//! Canonical log lines.
//!
//! A [`LogEntry`] is built once from a raw message and is opaque afterwards:
//! `<prefix> <timestamp> <sanitized body>[ | Username: <user> | Computer name: <host>]`.
//! The body never spans more than one physical line and never contains a
//! reserved prefix token.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};

use crate::message_type::{LogMessageType, RESERVED_PREFIXES};

/// `log` target used to mirror every normalized line.
pub const MIRROR_TARGET: &str = "tandemlog::mirror";

/// The user and machine that produced a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub host: String,
}

impl Identity {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }

    /// Capture the identity of the current process.
    pub fn current() -> Self {
        let user = ["USER", "USERNAME", "LOGNAME"]
            .into_iter()
            .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "unknown".to_owned());
        let host = sysinfo::System::host_name()
            .filter(|h| !h.is_empty())
            .or_else(|| {
                ["HOSTNAME", "COMPUTERNAME"]
                    .into_iter()
                    .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
            })
            .unwrap_or_else(|| "unknown".to_owned());
        Self { user, host }
    }

    /// The suffix appended to identified lines.
    pub fn suffix(&self) -> String {
        format!(
            " | Username: {} | Computer name: {}",
            sanitize_message(&self.user),
            sanitize_message(&self.host)
        )
    }
}

/// Replace line breaks with a space and escape every reserved prefix token.
///
/// Escaping swaps the token's dashes for underscores, so `-E-` becomes `_E_`
/// and `-D:E-` becomes `_D:E_`. Escaping only ever removes dashes, so one
/// pass per token leaves no reserved token behind.
pub fn sanitize_message(raw: &str) -> String {
    let mut body = raw.replace("\r\n", " ").replace(['\n', '\r'], " ");
    for token in RESERVED_PREFIXES {
        if body.contains(token) {
            body = body.replace(token, &token.replace('-', "_"));
        }
    }
    body
}

/// `MM/dd/yyyy HH:mm:ss:ffff` in UTC.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    let ten_thousandths = (timestamp.timestamp_subsec_nanos() / 100_000).min(9_999);
    format!(
        "{}:{ten_thousandths:04}",
        timestamp.format("%m/%d/%Y %H:%M:%S")
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry(String);

impl LogEntry {
    /// Normalize `message` using the current time.
    pub fn new(message: &str, message_type: LogMessageType, identity: Option<&Identity>) -> Self {
        Self::at(Utc::now(), message, message_type, identity)
    }

    /// Normalize `message` with an explicit timestamp.
    pub fn at(
        timestamp: DateTime<Utc>,
        message: &str,
        message_type: LogMessageType,
        identity: Option<&Identity>,
    ) -> Self {
        let mut line = format!(
            "{} {} {}",
            message_type.prefix(),
            format_timestamp(timestamp),
            sanitize_message(message)
        );
        if let Some(identity) = identity {
            line.push_str(&identity.suffix());
        }
        Self(line)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Mirror the line to the trace sink when one is listening.
    ///
    /// Failures inside the sink never reach the caller.
    pub fn mirror(&self) {
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            if log::log_enabled!(target: MIRROR_TARGET, log::Level::Debug) {
                log::debug!(target: MIRROR_TARGET, "{}", self.0);
            }
        }));
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<LogEntry> for String {
    fn from(entry: LogEntry) -> Self {
        entry.0
    }
}
