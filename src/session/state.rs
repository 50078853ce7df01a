//! Session state for the robot connection
//!
//! Tracks the connection, the exclusive-control arbitration and the
//! per-connection selections, and validates control transitions.

use std::fmt;

use crate::protocol::RobotId;
use crate::session::image::ImageStream;

/// Whether a robot connection is established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No robot connection
    Disconnected,
    /// Logged on to a robot
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Exclusive-control arbitration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExclusiveControl {
    /// Not holding or asking for control
    #[default]
    None,
    /// Request sent, waiting for the robot's grant
    Requested,
    /// The robot granted control
    Held,
}

impl fmt::Display for ExclusiveControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusiveControl::None => write!(f, "None"),
            ExclusiveControl::Requested => write!(f, "Requested"),
            ExclusiveControl::Held => write!(f, "Held"),
        }
    }
}

impl ExclusiveControl {
    /// Returns valid transitions from this state
    ///
    /// Disconnects bypass this table; they always return to `None`.
    pub fn valid_transitions(&self) -> &'static [ExclusiveControl] {
        match self {
            ExclusiveControl::None => &[ExclusiveControl::Requested],
            ExclusiveControl::Requested => &[
                ExclusiveControl::Requested,
                ExclusiveControl::Held,
                ExclusiveControl::None,
            ],
            ExclusiveControl::Held => &[ExclusiveControl::None],
        }
    }

    /// Returns true if the transition is valid
    pub fn can_transition(&self, to: ExclusiveControl) -> bool {
        self.valid_transitions().contains(&to)
    }
}

/// State of the client's robot session
///
/// `Session::default()` is the disconnected state every reset returns to;
/// only the connection epoch survives a reset.
#[derive(Debug, Clone, Default)]
pub struct Session {
    connected: bool,
    robot_id: Option<RobotId>,
    exclusive_control: ExclusiveControl,
    telemetry_on: bool,
    active_camera: Option<usize>,
    cameras: Vec<String>,
    epoch: u64,
    image_stream: Option<ImageStream>,
}

impl Session {
    /// Returns the connection state
    pub fn connection_state(&self) -> ConnectionState {
        if self.connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Returns true while logged on to a robot
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns the connected robot's identifier
    pub fn robot_id(&self) -> Option<RobotId> {
        self.robot_id
    }

    /// Returns the exclusive-control state
    pub fn exclusive_control(&self) -> ExclusiveControl {
        self.exclusive_control
    }

    /// Returns true while the telemetry stream is on
    pub fn is_telemetry_on(&self) -> bool {
        self.telemetry_on
    }

    /// Returns the selected camera index
    pub fn active_camera(&self) -> Option<usize> {
        self.active_camera
    }

    /// Returns the cached camera names
    pub fn cameras(&self) -> &[String] {
        &self.cameras
    }

    /// Returns the epoch of the current (or last) connection
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns true if an image subscription is registered
    pub fn has_image_subscription(&self) -> bool {
        self.image_stream.is_some()
    }

    /// Checks the cross-field invariants
    pub fn invariants_hold(&self) -> bool {
        let control_ok = self.exclusive_control == ExclusiveControl::None || self.connected;
        let telemetry_ok = !self.telemetry_on || self.connected;
        let robot_ok = self.connected == self.robot_id.is_some();
        let camera_ok = self
            .active_camera
            .map_or(true, |index| index < self.cameras.len());
        control_ok && telemetry_ok && robot_ok && camera_ok
    }

    /// Starts a connection attempt and returns its epoch
    pub(crate) fn begin_attempt(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Returns true if `epoch` names the live connection
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.connected && self.epoch == epoch
    }

    pub(crate) fn establish(&mut self, robot: RobotId) {
        let epoch = self.epoch;
        *self = Session {
            connected: true,
            robot_id: Some(robot),
            epoch,
            ..Session::default()
        };
    }

    /// Returns to the disconnected defaults
    pub(crate) fn reset(&mut self) {
        let epoch = self.epoch;
        *self = Session {
            epoch,
            ..Session::default()
        };
    }

    /// Applies a control transition if the table allows it
    pub(crate) fn transition_control(&mut self, to: ExclusiveControl) -> bool {
        if !self.connected || !self.exclusive_control.can_transition(to) {
            return false;
        }
        self.exclusive_control = to;
        true
    }

    pub(crate) fn set_telemetry(&mut self, on: bool) {
        self.telemetry_on = on && self.connected;
    }

    /// Replaces the camera cache, dropping a selection that no longer fits
    pub(crate) fn set_cameras(&mut self, cameras: Vec<String>) {
        self.cameras = cameras;
        if self.active_camera.is_some_and(|index| index >= self.cameras.len()) {
            self.active_camera = None;
        }
    }

    pub(crate) fn select_camera(&mut self, index: usize) {
        self.active_camera = Some(index);
    }

    pub(crate) fn set_image_stream(&mut self, stream: Option<ImageStream>) {
        self.image_stream = stream;
    }

    pub(crate) fn image_stream_mut(&mut self) -> Option<&mut ImageStream> {
        self.image_stream.as_mut()
    }
}
