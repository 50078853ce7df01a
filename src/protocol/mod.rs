//! Robot command protocol
//!
//! This module defines the binary command frames sent to the robot and the
//! encoder that validates and builds them.

pub mod command;

pub use command::{
    CommandEncoder, CommandFrame, CommandKind, RobotId, CUSTOM_COMMAND_MAX, CUSTOM_COMMAND_MIN,
};
