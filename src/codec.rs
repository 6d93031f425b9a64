//! String command codec: splits hardware command bodies into typed tokens.
//!
//! DESIGN
//! ======
//! A body looks like `"<dash>[-<target>]\0<pinType><op>\0<pin>\0<value>"`.
//! Field 0 names the dashboard and optional target, field 1 (the op-spec) is
//! forwarded to hardware untouched. The operation character is decoded once
//! into [`Operation`]; operation-specific tokens are parsed lazily by the
//! router so authorization runs before write/read validation.
//!
//! Parsing is pure: no I/O, no side effects.

use serde::{Deserialize, Serialize};

pub const BODY_SEPARATOR: char = '\0';
pub const DEVICE_SEPARATOR: char = '-';

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed numeric field: {0:?}")]
    Parse(String),
    #[error("illegal command body")]
    IllegalCommandBody,
    #[error("invalid pin type: {0:?}")]
    InvalidPinType(String),
}

impl crate::message::ErrorCode for CodecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "E_PARSE",
            Self::IllegalCommandBody => "E_ILLEGAL_COMMAND_BODY",
            Self::InvalidPinType(_) => "E_INVALID_PIN_TYPE",
        }
    }

    fn response(&self) -> crate::message::Response {
        crate::message::Response::IllegalCommandBody
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    Digital,
    Analog,
    Virtual,
}

impl PinType {
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'd' => Some(Self::Digital),
            'a' => Some(Self::Analog),
            'v' => Some(Self::Virtual),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Digital => 'd',
            Self::Analog => 'a',
            Self::Virtual => 'v',
        }
    }
}

/// Operation selected by the second character of the op-spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `'u'`: change the device picked by a device-selector widget.
    SelectorUpdate,
    /// `'w'`: write a pin value.
    Write,
    /// `'r'`: read a pin value from hardware.
    Read,
}

impl Operation {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'u' => Some(Self::SelectorUpdate),
            'w' => Some(Self::Write),
            'r' => Some(Self::Read),
            _ => None,
        }
    }
}

/// Top-level decode of a hardware command body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBody<'a> {
    pub dash_id: i32,
    /// Device, tag, or device-selector id. `0` when the body names none.
    pub target_id: i32,
    pub operation: Operation,
    /// Field 1 verbatim; this is what hardware receives.
    pub op_spec: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCommand<'a> {
    pub pin_type: PinType,
    pub pin: u8,
    pub value: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCommand {
    pub pin_type: PinType,
    pub pin: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorUpdate {
    pub widget_id: i64,
    pub device_id: i32,
}

// =============================================================================
// SPLITTING
// =============================================================================

/// Split on the first body separator into at most two fields.
#[must_use]
pub fn split2(body: &str) -> Vec<&str> {
    body.splitn(2, BODY_SEPARATOR).collect()
}

/// Split `"<dash>-<target>"` into one or two parts.
#[must_use]
pub fn split2_device(field: &str) -> Vec<&str> {
    field.splitn(2, DEVICE_SEPARATOR).collect()
}

/// Split into at most three fields; the last keeps any remaining separators.
#[must_use]
pub fn split3(body: &str) -> Vec<&str> {
    body.splitn(3, BODY_SEPARATOR).collect()
}

fn parse_num<T: std::str::FromStr>(raw: &str) -> Result<T, CodecError> {
    raw.parse().map_err(|_| CodecError::Parse(raw.to_owned()))
}

fn parse_pin_type(token: &str) -> Result<PinType, CodecError> {
    token
        .chars()
        .next()
        .and_then(PinType::from_char)
        .ok_or_else(|| CodecError::InvalidPinType(token.to_owned()))
}

// =============================================================================
// PARSERS
// =============================================================================

impl<'a> CommandBody<'a> {
    /// Decode the dashboard/target header and operation of a body.
    ///
    /// # Errors
    ///
    /// `IllegalCommandBody` when the body lacks an op-spec or names an unknown
    /// operation, `Parse` when the dash or target id isn't numeric.
    pub fn parse(body: &'a str) -> Result<Self, CodecError> {
        let fields = split2(body);
        let [head, op_spec] = fields[..] else {
            return Err(CodecError::IllegalCommandBody);
        };

        let ids = split2_device(head);
        let dash_id = parse_num(ids[0])?;
        let target_id = match ids.get(1) {
            Some(raw) => parse_num(raw)?,
            None => 0,
        };

        let operation = op_spec
            .chars()
            .nth(1)
            .and_then(Operation::from_char)
            .ok_or(CodecError::IllegalCommandBody)?;

        Ok(Self { dash_id, target_id, operation, op_spec })
    }
}

impl<'a> WriteCommand<'a> {
    /// Parse `"<pinType>w\0<pin>\0<value>"`.
    ///
    /// # Errors
    ///
    /// `IllegalCommandBody` with fewer than three tokens, otherwise pin type
    /// or pin number errors.
    pub fn parse(op_spec: &'a str) -> Result<Self, CodecError> {
        let tokens = split3(op_spec);
        let [kind, pin, value] = tokens[..] else {
            return Err(CodecError::IllegalCommandBody);
        };
        Ok(Self { pin_type: parse_pin_type(kind)?, pin: parse_num(pin)?, value })
    }
}

impl ReadCommand {
    /// Parse `"<pinType>r\0<pin>"`.
    ///
    /// # Errors
    ///
    /// `IllegalCommandBody` without a pin token, otherwise pin type or pin
    /// number errors.
    pub fn parse(op_spec: &str) -> Result<Self, CodecError> {
        let tokens = split3(op_spec);
        if tokens.len() < 2 {
            return Err(CodecError::IllegalCommandBody);
        }
        Ok(Self { pin_type: parse_pin_type(tokens[0])?, pin: parse_num(tokens[1])? })
    }
}

impl SelectorUpdate {
    /// Parse `"<x>u\0<widgetId>\0<deviceId>"`.
    ///
    /// # Errors
    ///
    /// `IllegalCommandBody` with fewer than three tokens, `Parse` for
    /// non-numeric ids.
    pub fn parse(op_spec: &str) -> Result<Self, CodecError> {
        let tokens = split3(op_spec);
        let [_, widget_id, device_id] = tokens[..] else {
            return Err(CodecError::IllegalCommandBody);
        };
        Ok(Self { widget_id: parse_num(widget_id)?, device_id: parse_num(device_id)? })
    }
}

/// Render a pin write op-spec, e.g. `"vw\05\0on"`.
#[must_use]
pub fn write_op_spec(pin_type: PinType, pin: u8, value: &str) -> String {
    format!("{}w{BODY_SEPARATOR}{pin}{BODY_SEPARATOR}{value}", pin_type.as_char())
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
