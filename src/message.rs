//! ProtocolMessage: the decoded unit every connection exchanges.
//!
//! ARCHITECTURE
//! ============
//! The transport hands the hub one decoded message at a time: a 16-bit id
//! that correlates requests with replies, a command, and a string body.
//! Replies reuse the request id so the originator can match them up. Sync
//! copies and hardware forwards also keep the original id.
//!
//! DESIGN
//! ======
//! - Messages are immutable once decoded. Every constructor returns a new value.
//! - A response message carries its numeric `Response` code as the body.
//! - The router never inspects `command` beyond the gateway's dispatch.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Protocol command carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Status reply to a previously received message.
    Response,
    /// Pin command travelling between an app and hardware.
    Hardware,
    /// Copy of an accepted command mirrored to other viewers.
    AppSync,
    Ping,
}

/// Status codes carried by `Command::Response` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Response {
    Ok,
    IllegalCommand,
    NotAllowed,
    DeviceNotInNetwork,
    NoActiveDashboard,
    IllegalCommandBody,
}

impl Response {
    /// Numeric code placed on the wire.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::IllegalCommand => 2,
            Self::NotAllowed => 6,
            Self::DeviceNotInNetwork => 7,
            Self::NoActiveDashboard => 8,
            Self::IllegalCommandBody => 11,
        }
    }

    /// Inverse of [`Response::code`].
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Self::Ok),
            2 => Some(Self::IllegalCommand),
            6 => Some(Self::NotAllowed),
            7 => Some(Self::DeviceNotInNetwork),
            8 => Some(Self::NoActiveDashboard),
            11 => Some(Self::IllegalCommandBody),
            _ => None,
        }
    }
}

/// One decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    /// Correlates request and response. Not unique across time.
    pub id: u16,
    pub command: Command,
    pub body: String,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and protocol response for hard faults surfaced to
/// the gateway.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Response sent to the originator when this error reaches the gateway.
    fn response(&self) -> Response {
        Response::IllegalCommand
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl ProtocolMessage {
    pub fn new(command: Command, id: u16, body: impl Into<String>) -> Self {
        Self { id, command, body: body.into() }
    }

    /// Create a status reply addressed to message `id`.
    #[must_use]
    pub fn response(id: u16, response: Response) -> Self {
        Self::new(Command::Response, id, response.code().to_string())
    }

    #[must_use]
    pub fn ok(id: u16) -> Self {
        Self::response(id, Response::Ok)
    }

    #[must_use]
    pub fn illegal_command_body(id: u16) -> Self {
        Self::response(id, Response::IllegalCommandBody)
    }

    #[must_use]
    pub fn no_active_dashboard(id: u16) -> Self {
        Self::response(id, Response::NoActiveDashboard)
    }

    #[must_use]
    pub fn not_allowed(id: u16) -> Self {
        Self::response(id, Response::NotAllowed)
    }

    #[must_use]
    pub fn device_not_in_network(id: u16) -> Self {
        Self::response(id, Response::DeviceNotInNetwork)
    }

    /// Error reply for a typed hard fault.
    #[must_use]
    pub fn error_from(id: u16, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::response(id, err.response())
    }

    /// Verbatim copy of this message re-tagged with another command.
    #[must_use]
    pub fn retag(&self, command: Command) -> Self {
        Self { id: self.id, command, body: self.body.clone() }
    }

    /// Decoded response code, if this is a well-formed response message.
    #[must_use]
    pub fn response_code(&self) -> Option<Response> {
        if self.command != Command::Response {
            return None;
        }
        self.body.parse().ok().and_then(Response::from_code)
    }
}

// =============================================================================
// TESTS
// =============================================================================
