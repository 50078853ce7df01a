//! Command frame encoding
//!
//! Command kinds `0..=24` are reserved for built-in commands; `25..=255` are
//! free for application-defined commands. Payloads carry no length prefix,
//! the transport's own framing delimits them.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::debug;

use crate::error::{SessionError, SessionResult};

/// Identifier the robot endpoint assigned to the connected robot
pub type RobotId = i32;

// Built-in command codes
const SPEAK_CODE: u8 = 0x01;
const EXCLUSIVE_CONTROL_REQUEST_CODE: u8 = 0x02;
const EXCLUSIVE_CONTROL_RELEASE_CODE: u8 = 0x03;

/// Lowest command code available to custom commands
pub const CUSTOM_COMMAND_MIN: u8 = 25;

/// Highest command code available to custom commands
pub const CUSTOM_COMMAND_MAX: u8 = u8::MAX;

/// Kind of command carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Text-to-speech on the robot
    Speak,
    /// Ask the robot for exclusive control
    ExclusiveControlRequest,
    /// Give exclusive control back
    ExclusiveControlRelease,
    /// Application-defined command
    ///
    /// Only [`CommandEncoder::custom`] guarantees a code within 25..=255; a
    /// hand-built `Custom` with a lower code still counts as reserved.
    Custom(u8),
}

impl CommandKind {
    /// Returns the wire code for this kind
    pub fn code(&self) -> u8 {
        match self {
            CommandKind::Speak => SPEAK_CODE,
            CommandKind::ExclusiveControlRequest => EXCLUSIVE_CONTROL_REQUEST_CODE,
            CommandKind::ExclusiveControlRelease => EXCLUSIVE_CONTROL_RELEASE_CODE,
            CommandKind::Custom(code) => *code,
        }
    }

    /// Returns true if the wire code lies in the reserved range 0..=24
    pub fn is_builtin(&self) -> bool {
        self.code() < CUSTOM_COMMAND_MIN
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Speak => write!(f, "Speak"),
            CommandKind::ExclusiveControlRequest => write!(f, "ExclusiveControlRequest"),
            CommandKind::ExclusiveControlRelease => write!(f, "ExclusiveControlRelease"),
            CommandKind::Custom(code) => write!(f, "Custom({})", code),
        }
    }
}

/// A command ready to be handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    kind: CommandKind,
    payload: Bytes,
    target: RobotId,
}

impl CommandFrame {
    /// Returns the command kind
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Returns the encoded payload
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the robot this frame is addressed to
    pub fn target(&self) -> RobotId {
        self.target
    }
}

/// Builds command frames addressed to the connected robot
///
/// An encoder only exists while there is a robot to address, so every frame
/// it produces has a valid target.
#[derive(Debug, Clone, Copy)]
pub struct CommandEncoder {
    target: RobotId,
}

impl CommandEncoder {
    /// Creates an encoder for the session's current robot
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if there is no connected robot
    pub fn for_target(target: Option<RobotId>) -> SessionResult<Self> {
        target
            .map(|target| Self { target })
            .ok_or(SessionError::NotConnected)
    }

    /// Returns the robot frames are addressed to
    pub fn target(&self) -> RobotId {
        self.target
    }

    /// Encodes a speech command
    ///
    /// Layout: little-endian `f32` volume followed by the raw UTF-8 text.
    pub fn speech(&self, text: &str, volume: f32) -> CommandFrame {
        let mut payload = BytesMut::with_capacity(std::mem::size_of::<f32>() + text.len());
        payload.put_f32_le(volume);
        payload.put_slice(text.as_bytes());

        self.frame(CommandKind::Speak, payload.freeze())
    }

    /// Encodes an exclusive-control request (empty payload)
    pub fn exclusive_control_request(&self) -> CommandFrame {
        self.frame(CommandKind::ExclusiveControlRequest, Bytes::new())
    }

    /// Encodes an exclusive-control release (empty payload)
    pub fn exclusive_control_release(&self) -> CommandFrame {
        self.frame(CommandKind::ExclusiveControlRelease, Bytes::new())
    }

    /// Encodes an application-defined command carrying raw text
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommandId` if `command_id` is outside 25..=255
    pub fn custom(&self, command_id: i64, text: &str) -> SessionResult<CommandFrame> {
        let code = u8::try_from(command_id)
            .ok()
            .filter(|code| *code >= CUSTOM_COMMAND_MIN)
            .ok_or(SessionError::InvalidCommandId(command_id))?;

        Ok(self.frame(
            CommandKind::Custom(code),
            Bytes::copy_from_slice(text.as_bytes()),
        ))
    }

    fn frame(&self, kind: CommandKind, payload: Bytes) -> CommandFrame {
        debug!(
            "Encoded {} frame for robot {} ({} bytes)",
            kind,
            self.target,
            payload.len()
        );

        CommandFrame {
            kind,
            payload,
            target: self.target,
        }
    }
}
