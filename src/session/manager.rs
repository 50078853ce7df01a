//! Session manager for the robot connection
//!
//! All session mutations, whether they come from API calls or from
//! transport notifications, go through the one lock around [`Session`].
//! Notifications carry the epoch of the connection they belong to and are
//! dropped once that connection is gone, so a late grant can't leak into a
//! newer connection to the same robot.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::protocol::{CommandEncoder, RobotId};
use crate::security::CredentialCodec;
use crate::session::events::{EventHandler, ImageFrame, RemoteEvent, TelemetryData};
use crate::session::image::{prepare_frame, ImageStream, ImageSubscription};
use crate::session::state::{ExclusiveControl, Session};
use crate::session::transport::Transport;

struct SessionCore {
    session: Mutex<Session>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn EventHandler>,
}

/// Owner of the robot session
pub struct SessionManager {
    core: Arc<SessionCore>,
}

impl SessionManager {
    /// Creates a disconnected session manager
    pub fn new(transport: Arc<dyn Transport>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            core: Arc::new(SessionCore {
                session: Mutex::new(Session::default()),
                transport,
                handler,
            }),
        }
    }

    /// Connects to the robot at `address`
    ///
    /// The credential is normalized into an authentication token first;
    /// see [`CredentialCodec::normalize`]. Blocks until the transport
    /// accepts or rejects the logon.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConnected` if a robot is connected, or
    /// `ConnectionRejected` if the transport refuses the logon
    pub fn connect(&self, address: &str, credential: &str) -> SessionResult<RobotId> {
        let mut session = self.core.session.lock();
        if session.is_connected() {
            return Err(SessionError::AlreadyConnected);
        }

        let token = CredentialCodec::normalize(credential);
        let epoch = session.begin_attempt();
        debug!(
            "Logging on to {} (epoch {}, pre-hashed credential: {})",
            address,
            epoch,
            CredentialCodec::looks_prehashed(credential)
        );

        let link = SessionLink {
            epoch,
            core: Arc::downgrade(&self.core),
        };

        match self.core.transport.logon(address, &token, link) {
            Ok(robot) => {
                session.establish(robot);
                info!("Connected to robot {} at {}", robot, address);
                Ok(robot)
            }
            Err(reason) => {
                warn!("Logon to {} rejected: {}", address, reason);
                Err(SessionError::ConnectionRejected(reason))
            }
        }
    }

    /// Disconnects from the robot
    ///
    /// Safe while a control request is outstanding; its grant will be
    /// discarded. Does nothing when already disconnected.
    pub fn disconnect(&self) {
        let mut session = self.core.session.lock();
        if !session.is_connected() {
            debug!("Disconnect requested while already disconnected");
            return;
        }

        self.core.transport.disconnect_all();
        let robot = session.robot_id();
        session.reset();
        info!("Disconnected from robot {:?}", robot);
    }

    /// Returns true while connected to a robot
    pub fn is_connected(&self) -> bool {
        self.core.session.lock().is_connected()
    }

    /// Returns the connected robot's identifier
    pub fn robot_id(&self) -> Option<RobotId> {
        self.core.session.lock().robot_id()
    }

    /// Returns the exclusive-control state
    pub fn exclusive_control(&self) -> ExclusiveControl {
        self.core.session.lock().exclusive_control()
    }

    /// Returns true once the robot granted exclusive control
    pub fn has_exclusive_control(&self) -> bool {
        self.exclusive_control() == ExclusiveControl::Held
    }

    /// Returns true while the telemetry stream is on
    pub fn is_telemetry_on(&self) -> bool {
        self.core.session.lock().is_telemetry_on()
    }

    /// Returns a copy of the current session state
    pub fn snapshot(&self) -> Session {
        self.core.session.lock().clone()
    }

    /// Asks the robot for exclusive control
    ///
    /// Sends a request and moves to `Requested`; the robot's grant arrives
    /// later through the [`SessionLink`]. Does nothing when control is
    /// already held.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or, if the robot does not allow this client
    /// to take control, `NotPermitted`
    pub fn take_exclusive_control(&self) -> SessionResult<()> {
        let mut session = self.lock_connected()?;

        if !self.core.transport.can_have_exclusive_control() {
            return Err(SessionError::NotPermitted);
        }

        if session.exclusive_control() == ExclusiveControl::Held {
            debug!("Exclusive control already held");
            return Ok(());
        }

        let encoder = CommandEncoder::for_target(session.robot_id())?;
        self.core
            .transport
            .send_command(encoder.exclusive_control_request());
        session.transition_control(ExclusiveControl::Requested);
        info!("Requested exclusive control of robot {}", encoder.target());

        Ok(())
    }

    /// Gives exclusive control back
    ///
    /// Takes effect immediately, without waiting for the robot. Does
    /// nothing when neither holding nor requesting control.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no robot is connected
    pub fn release_exclusive_control(&self) -> SessionResult<()> {
        let mut session = self.lock_connected()?;

        if session.exclusive_control() == ExclusiveControl::None {
            debug!("No exclusive control to release");
            return Ok(());
        }

        let encoder = CommandEncoder::for_target(session.robot_id())?;
        self.core
            .transport
            .send_command(encoder.exclusive_control_release());
        session.transition_control(ExclusiveControl::None);
        info!("Released exclusive control of robot {}", encoder.target());

        Ok(())
    }

    /// Turns the telemetry stream on
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no robot is connected
    pub fn enable_telemetry(&self) -> SessionResult<()> {
        let mut session = self.lock_connected()?;

        if !session.is_telemetry_on() {
            if let Some(robot) = session.robot_id() {
                self.core.transport.start_telemetry(robot);
                session.set_telemetry(true);
                info!("Telemetry enabled for robot {}", robot);
            }
        }
        Ok(())
    }

    /// Turns the telemetry stream off
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no robot is connected
    pub fn disable_telemetry(&self) -> SessionResult<()> {
        let mut session = self.lock_connected()?;

        if session.is_telemetry_on() {
            self.core.transport.stop_telemetry();
            session.set_telemetry(false);
            info!("Telemetry disabled");
        }
        Ok(())
    }

    /// Queries the robot's cameras and caches the result
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no robot is connected
    pub fn list_cameras(&self) -> SessionResult<Vec<String>> {
        let mut session = self.lock_connected()?;

        let cameras = self.core.transport.query_camera_list();
        session.set_cameras(cameras.clone());
        Ok(cameras)
    }

    /// Returns the selected camera, if any
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no robot is connected
    pub fn active_camera(&self) -> SessionResult<Option<usize>> {
        Ok(self.lock_connected()?.active_camera())
    }

    /// Selects the active camera
    ///
    /// The index is checked against the cached camera list; the robot then
    /// decides whether the switch happens, reported as the returned bool.
    /// The selection only changes when it returns true.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, or `InvalidCameraIndex` if the index is not
    /// within the cached camera list
    pub fn set_active_camera(&self, index: i64) -> SessionResult<bool> {
        let mut session = self.lock_connected()?;

        let available = session.cameras().len();
        let camera = usize::try_from(index)
            .ok()
            .filter(|camera| *camera < available)
            .ok_or(SessionError::InvalidCameraIndex { index, available })?;

        let robot = session.robot_id().ok_or(SessionError::NotConnected)?;
        let switched = self.core.transport.select_camera(robot, camera);
        if switched {
            session.select_camera(camera);
            info!("Active camera set to {}", camera);
        } else {
            warn!("Robot {} refused to switch to camera {}", robot, camera);
        }
        Ok(switched)
    }

    /// Makes the robot speak
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no robot is connected
    pub fn say(&self, text: &str, volume: f32) -> SessionResult<()> {
        let session = self.core.session.lock();
        let frame = CommandEncoder::for_target(session.robot_id())?.speech(text, volume);
        self.core.transport.send_command(frame);
        Ok(())
    }

    /// Sends an application-defined command
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, or `InvalidCommandId` if `command_id` is
    /// outside 25..=255
    pub fn issue_command(&self, command_id: i64, text: &str) -> SessionResult<()> {
        let session = self.core.session.lock();
        let frame = CommandEncoder::for_target(session.robot_id())?.custom(command_id, text)?;
        self.core.transport.send_command(frame);
        Ok(())
    }

    /// Registers (`Some`) or removes (`None`) the image-frame subscription
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no robot is connected
    pub fn register_image_data(
        &self,
        subscription: Option<ImageSubscription>,
    ) -> SessionResult<()> {
        let mut session = self.lock_connected()?;

        match subscription {
            Some(subscription) => info!(
                "Image frames registered ({} fps, decode: {})",
                subscription.fps(),
                subscription.decode()
            ),
            None => info!("Image frames deregistered"),
        }
        session.set_image_stream(subscription.map(ImageStream::new));
        Ok(())
    }

    /// Resets the session after the robot side dropped the connection
    ///
    /// For transports that report the disconnect outside a [`SessionLink`].
    pub fn handle_peer_disconnect(&self) {
        self.current_link().peer_disconnected();
    }

    fn current_link(&self) -> SessionLink {
        SessionLink {
            epoch: self.core.session.lock().epoch(),
            core: Arc::downgrade(&self.core),
        }
    }

    fn lock_connected(&self) -> SessionResult<MutexGuard<'_, Session>> {
        let session = self.core.session.lock();
        if !session.is_connected() {
            return Err(SessionError::NotConnected);
        }
        Ok(session)
    }
}

/// Notification path from the transport into the session
///
/// Handed to [`Transport::logon`] and bound to that connection. Once the
/// connection is gone (disconnect, peer disconnect, or a newer logon) every
/// notification through this link is discarded.
#[derive(Clone)]
pub struct SessionLink {
    epoch: u64,
    core: Weak<SessionCore>,
}

impl fmt::Debug for SessionLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLink")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl SessionLink {
    /// Returns the connection epoch this link belongs to
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns true while the link's connection is live
    pub fn is_current(&self) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.session.lock().is_current(self.epoch))
    }

    /// The robot granted exclusive control
    pub fn control_granted(&self) {
        let granted = self.with_current("control grant", |session| {
            if session.transition_control(ExclusiveControl::Held) {
                session.robot_id()
            } else {
                debug!(
                    "Ignoring control grant in state {}",
                    session.exclusive_control()
                );
                None
            }
        });

        if let Some((core, robot)) = granted {
            info!("Exclusive control of robot {} granted", robot);
            core.handler.handle(RemoteEvent::ControlGranted { robot });
        }
    }

    /// The robot withdrew exclusive control
    pub fn control_revoked(&self) {
        let revoked = self.with_current("control revocation", |session| {
            if session.transition_control(ExclusiveControl::None) {
                session.robot_id()
            } else {
                None
            }
        });

        if let Some((core, robot)) = revoked {
            info!("Exclusive control of robot {} revoked", robot);
            core.handler.handle(RemoteEvent::ControlRevoked { robot });
        }
    }

    /// A telemetry sample arrived
    ///
    /// Delivered only while telemetry is enabled.
    pub fn telemetry(&self, payload: Bytes) {
        let robot = self.with_current("telemetry", |session| {
            if session.is_telemetry_on() {
                session.robot_id()
            } else {
                None
            }
        });

        if let Some((core, robot)) = robot {
            core.handler
                .handle(RemoteEvent::Telemetry(TelemetryData { robot, payload }));
        }
    }

    /// A camera frame arrived
    ///
    /// Delivered only with a registered subscription, throttled to its
    /// frame rate.
    pub fn image_frame(&self, data: Bytes) {
        let admitted = self.with_current("image frame", |session| {
            let robot = session.robot_id()?;
            let stream = session.image_stream_mut()?;
            let sequence = stream.admit(Instant::now())?;
            Some((robot, sequence, stream.subscription().decode()))
        });

        let Some((core, (robot, sequence, decode))) = admitted else {
            return;
        };

        if let Some(data) = prepare_frame(data, decode) {
            core.handler.handle(RemoteEvent::ImageFrame(ImageFrame {
                robot,
                sequence,
                data,
            }));
        }
    }

    /// The robot reported a new camera list
    pub fn cameras_updated(&self, cameras: Vec<String>) {
        self.with_current("camera list", |session| {
            debug!("Camera list updated: {:?}", cameras);
            session.set_cameras(cameras);
            Some(())
        });
    }

    /// The robot side closed the connection
    pub fn peer_disconnected(&self) {
        let dropped = self.with_current("peer disconnect", |session| {
            let robot = session.robot_id();
            session.reset();
            robot
        });

        if let Some((core, robot)) = dropped {
            warn!("Robot {} disconnected", robot);
            core.handler.handle(RemoteEvent::PeerDisconnected { robot });
        }
    }

    // Runs `apply` under the session lock if this link's connection is
    // live. The lock is released before the caller notifies the handler.
    fn with_current<R>(
        &self,
        what: &str,
        apply: impl FnOnce(&mut Session) -> Option<R>,
    ) -> Option<(Arc<SessionCore>, R)> {
        let core = self.core.upgrade()?;

        let outcome = {
            let mut session = core.session.lock();
            if !session.is_current(self.epoch) {
                debug!("Discarding stale {} (epoch {})", what, self.epoch);
                return None;
            }
            let outcome = apply(&mut session);
            debug_assert!(session.invariants_hold());
            outcome
        }?;

        Some((core, outcome))
    }
}
