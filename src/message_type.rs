//! Message types and their reserved line prefixes.
//!
//! Every persisted line starts with exactly one prefix token. The tokens are
//! reserved: message bodies are escaped so a reader scanning a log file line
//! by line never mistakes user content for a prefix.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LogMessageType {
    Error,
    Warning,
    #[default]
    Information,
    Verbose,
    Debug,
    DebugError,
    DebugWarning,
    DebugInformation,
    DebugVerbose,
    Unknown,
}

/// Every prefix token the writer may emit, in escaping order.
pub const RESERVED_PREFIXES: [&str; 10] = [
    "-E-", "-W-", "-I-", "-V-", "-D-", "-D:E-", "-D:W-", "-D:I-", "-D:V-", "-U-",
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log message type: {0}")]
pub struct ParseMessageTypeError(pub String);

impl LogMessageType {
    pub const ALL: [Self; 10] = [
        Self::Error,
        Self::Warning,
        Self::Information,
        Self::Verbose,
        Self::Debug,
        Self::DebugError,
        Self::DebugWarning,
        Self::DebugInformation,
        Self::DebugVerbose,
        Self::Unknown,
    ];

    /// The token written at the start of the line for this type.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Error => "-E-",
            Self::Warning => "-W-",
            Self::Information => "-I-",
            Self::Verbose => "-V-",
            Self::Debug => "-D-",
            Self::DebugError => "-D:E-",
            Self::DebugWarning => "-D:W-",
            Self::DebugInformation => "-D:I-",
            Self::DebugVerbose => "-D:V-",
            Self::Unknown => "-U-",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Information => "Information",
            Self::Verbose => "Verbose",
            Self::Debug => "Debug",
            Self::DebugError => "DebugError",
            Self::DebugWarning => "DebugWarning",
            Self::DebugInformation => "DebugInformation",
            Self::DebugVerbose => "DebugVerbose",
            Self::Unknown => "Unknown",
        }
    }

    /// Map a line prefix back to its message type.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.prefix() == prefix)
    }

    /// Parse a type name, falling back to [`LogMessageType::Unknown`].
    pub fn parse_or_unknown(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for LogMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogMessageType {
    type Err = ParseMessageTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "ERROR" => Ok(Self::Error),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "INFORMATION" | "INFO" => Ok(Self::Information),
            "VERBOSE" => Ok(Self::Verbose),
            "DEBUG" => Ok(Self::Debug),
            "DEBUGERROR" => Ok(Self::DebugError),
            "DEBUGWARNING" => Ok(Self::DebugWarning),
            "DEBUGINFORMATION" => Ok(Self::DebugInformation),
            "DEBUGVERBOSE" => Ok(Self::DebugVerbose),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(ParseMessageTypeError(s.to_owned())),
        }
    }
}
