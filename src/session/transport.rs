//! Transport abstraction for the robot connection
//!
//! The session layer never touches sockets. It drives a [`Transport`] for
//! outbound calls and receives asynchronous notifications through the
//! [`SessionLink`] handed over at logon.
//!
//! [`LoopbackTransport`] is an in-memory robot endpoint that records every
//! call, primarily for testing and demonstration.

use parking_lot::Mutex;
use tracing::debug;

use crate::protocol::{CommandFrame, RobotId};
use crate::security::{AuthToken, CredentialCodec};
use crate::session::manager::SessionLink;

/// Outbound side of the robot connection
///
/// Calls are made while the session is locked, so an implementation must
/// not call back into the [`SessionLink`] from inside one of these methods
/// on the same thread. Deliver notifications from the transport's own
/// thread instead.
pub trait Transport: Send + Sync {
    /// Logs on to the robot at `address`; blocks until accepted or rejected
    ///
    /// On success returns the robot's identifier and keeps `link` for
    /// notifications about this connection. On failure returns the reason.
    fn logon(&self, address: &str, token: &AuthToken, link: SessionLink)
        -> Result<RobotId, String>;

    /// Tears down every robot connection
    fn disconnect_all(&self);

    /// Sends one command frame (fire-and-forget)
    fn send_command(&self, frame: CommandFrame);

    /// Starts the telemetry stream of `robot`
    fn start_telemetry(&self, robot: RobotId);

    /// Stops the telemetry stream
    fn stop_telemetry(&self);

    /// Returns the camera names the robot reported
    fn query_camera_list(&self) -> Vec<String>;

    /// Switches the robot's active camera, returning whether it did
    fn select_camera(&self, robot: RobotId, index: usize) -> bool;

    /// Returns true if the robot allows this client to take exclusive control
    fn can_have_exclusive_control(&self) -> bool;
}

/// A call observed by [`LoopbackTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// `logon` was called
    Logon {
        /// Requested address
        address: String,
        /// Presented token
        token: AuthToken,
    },
    /// `disconnect_all` was called
    DisconnectAll,
    /// `send_command` was called
    SendCommand(CommandFrame),
    /// `start_telemetry` was called
    StartTelemetry(RobotId),
    /// `stop_telemetry` was called
    StopTelemetry,
    /// `query_camera_list` was called
    QueryCameraList,
    /// `select_camera` was called
    SelectCamera {
        /// Addressed robot
        robot: RobotId,
        /// Requested camera
        index: usize,
    },
}

#[derive(Debug, Clone)]
struct LoopbackRobot {
    address: String,
    token: AuthToken,
    robot_id: RobotId,
    cameras: Vec<String>,
    allow_exclusive_control: bool,
    accept_camera_switch: bool,
}

/// In-memory robot endpoint
pub struct LoopbackTransport {
    robot: Mutex<LoopbackRobot>,
    calls: Mutex<Vec<TransportCall>>,
    link: Mutex<Option<SessionLink>>,
}

impl LoopbackTransport {
    /// Creates an endpoint serving one robot at `address` that accepts
    /// `credential` (plaintext or pre-hashed, normalized like a client would)
    pub fn new(address: &str, credential: &str, robot_id: RobotId) -> Self {
        Self {
            robot: Mutex::new(LoopbackRobot {
                address: address.to_string(),
                token: CredentialCodec::normalize(credential),
                robot_id,
                cameras: Vec::new(),
                allow_exclusive_control: true,
                accept_camera_switch: true,
            }),
            calls: Mutex::new(Vec::new()),
            link: Mutex::new(None),
        }
    }

    /// Sets the cameras the robot reports
    pub fn with_cameras<I, S>(self, cameras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.robot.lock().cameras = cameras.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether exclusive control may be requested
    pub fn allow_exclusive_control(&self, allow: bool) {
        self.robot.lock().allow_exclusive_control = allow;
    }

    /// Sets whether camera switches succeed
    pub fn accept_camera_switch(&self, accept: bool) {
        self.robot.lock().accept_camera_switch = accept;
    }

    /// Returns the link of the latest accepted logon
    ///
    /// Tests use it to play the robot's side of the conversation.
    pub fn link(&self) -> Option<SessionLink> {
        self.link.lock().clone()
    }

    /// Returns every call made so far
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Returns the command frames sent so far
    pub fn sent_frames(&self) -> Vec<CommandFrame> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::SendCommand(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets the recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: TransportCall) {
        debug!("Loopback transport call: {:?}", call);
        self.calls.lock().push(call);
    }
}

impl Transport for LoopbackTransport {
    fn logon(
        &self,
        address: &str,
        token: &AuthToken,
        link: SessionLink,
    ) -> Result<RobotId, String> {
        self.record(TransportCall::Logon {
            address: address.to_string(),
            token: token.clone(),
        });

        let robot = self.robot.lock();
        if address != robot.address {
            return Err(format!("no robot at {}", address));
        }
        if *token != robot.token {
            return Err("authentication failed".to_string());
        }

        *self.link.lock() = Some(link);
        Ok(robot.robot_id)
    }

    fn disconnect_all(&self) {
        self.record(TransportCall::DisconnectAll);
        self.link.lock().take();
    }

    fn send_command(&self, frame: CommandFrame) {
        self.record(TransportCall::SendCommand(frame));
    }

    fn start_telemetry(&self, robot: RobotId) {
        self.record(TransportCall::StartTelemetry(robot));
    }

    fn stop_telemetry(&self) {
        self.record(TransportCall::StopTelemetry);
    }

    fn query_camera_list(&self) -> Vec<String> {
        self.record(TransportCall::QueryCameraList);
        self.robot.lock().cameras.clone()
    }

    fn select_camera(&self, robot: RobotId, index: usize) -> bool {
        self.record(TransportCall::SelectCamera { robot, index });
        self.robot.lock().accept_camera_switch
    }

    fn can_have_exclusive_control(&self) -> bool {
        self.robot.lock().allow_exclusive_control
    }
}
