//! Remote robot client
//!
//! [`RemoteClient`] is the surface a host application (or a scripting
//! binding) talks to. It composes the session manager, the command encoder
//! and the timer registry, and fills in omitted arguments from [`Config`].

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{SessionResult, TimerResult};
use crate::protocol::RobotId;
use crate::session::{
    EventHandler, ExclusiveControl, ImageSubscription, RemoteEvent, SessionManager, Transport,
};
use crate::timer::{Scheduler, TimerId, TimerRegistry, TokioScheduler};

/// Client for one remote robot
///
/// Dropping the client removes its timers and disconnects.
pub struct RemoteClient {
    config: Config,
    session: SessionManager,
    timers: TimerRegistry,
}

impl RemoteClient {
    /// Creates a client from its collaborators
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        scheduler: Arc<dyn Scheduler>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            config,
            session: SessionManager::new(transport, handler),
            timers: TimerRegistry::new(scheduler),
        }
    }

    /// Creates a client whose timers run on a tokio runtime
    ///
    /// Timer fires are delivered to `handler` as [`RemoteEvent::TimerFired`].
    pub fn with_runtime(
        config: Config,
        transport: Arc<dyn Transport>,
        runtime: Handle,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        let on_fire = Arc::clone(&handler);
        let scheduler = TokioScheduler::new(runtime, move |timer| {
            on_fire.handle(RemoteEvent::TimerFired(timer));
        });
        Self::new(config, transport, Arc::new(scheduler), handler)
    }

    /// Returns the client configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying session manager
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    // Connection

    /// Connects to the robot at `address`
    ///
    /// `credential` is either a plaintext password or the base64 form of
    /// its SHA-256 digest.
    pub fn connect(&self, address: &str, credential: &str) -> SessionResult<RobotId> {
        self.session.connect(address, credential)
    }

    /// Disconnects from the robot; does nothing when not connected
    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    /// Returns true while connected to a robot
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Returns the connected robot's identifier
    pub fn robot_id(&self) -> Option<RobotId> {
        self.session.robot_id()
    }

    /// Resets the session after the robot side went away
    pub fn peer_disconnected(&self) {
        self.session.handle_peer_disconnect();
    }

    // Exclusive control

    /// Asks the robot for exclusive control
    pub fn take_exclusive_control(&self) -> SessionResult<()> {
        self.session.take_exclusive_control()
    }

    /// Gives exclusive control back
    pub fn release_exclusive_control(&self) -> SessionResult<()> {
        self.session.release_exclusive_control()
    }

    /// Returns the exclusive-control state
    pub fn exclusive_control(&self) -> ExclusiveControl {
        self.session.exclusive_control()
    }

    /// Returns true once the robot granted exclusive control
    pub fn has_exclusive_control(&self) -> bool {
        self.session.has_exclusive_control()
    }

    // Telemetry and cameras

    /// Turns the telemetry stream on
    pub fn enable_telemetry(&self) -> SessionResult<()> {
        self.session.enable_telemetry()
    }

    /// Turns the telemetry stream off
    pub fn disable_telemetry(&self) -> SessionResult<()> {
        self.session.disable_telemetry()
    }

    /// Returns the robot's camera names
    pub fn list_cameras(&self) -> SessionResult<Vec<String>> {
        self.session.list_cameras()
    }

    /// Returns the selected camera
    pub fn active_camera(&self) -> SessionResult<Option<usize>> {
        self.session.active_camera()
    }

    /// Selects the active camera, returning whether the robot switched
    pub fn set_active_camera(&self, index: i64) -> SessionResult<bool> {
        self.session.set_active_camera(index)
    }

    /// Registers for camera frames
    ///
    /// Omitted arguments come from the `[video]` config section.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `fps` is outside 1..=30, or
    /// `NotConnected`
    pub fn register_image_data(
        &self,
        decode: Option<bool>,
        fps: Option<i64>,
    ) -> SessionResult<()> {
        let decode = decode.unwrap_or(self.config.video.decode_frames);
        let fps = fps.unwrap_or(i64::from(self.config.video.default_fps));
        let subscription = ImageSubscription::new(decode, fps)?;
        self.session.register_image_data(Some(subscription))
    }

    /// Stops camera frame delivery
    pub fn deregister_image_data(&self) -> SessionResult<()> {
        self.session.register_image_data(None)
    }

    // Commands

    /// Makes the robot speak, at the configured volume unless one is given
    pub fn say(&self, text: &str, volume: Option<f32>) -> SessionResult<()> {
        let volume = volume.unwrap_or(self.config.speech.default_volume);
        self.session.say(text, volume)
    }

    /// Sends an application-defined command (ID 25..=255)
    pub fn issue_command(&self, command_id: i64, text: &str) -> SessionResult<()> {
        self.session.issue_command(command_id, text)
    }

    // Timers

    /// Adds a timer
    ///
    /// Omitted arguments come from the `[timers]` config section.
    pub fn add_timer(
        &self,
        initial_delay: f32,
        repeat_count: Option<i64>,
        interval: Option<f32>,
    ) -> TimerResult<TimerId> {
        let repeat_count = repeat_count.unwrap_or(self.config.timers.default_repeat_count);
        let interval = interval.unwrap_or(self.config.timers.default_interval_secs);
        self.timers.add(initial_delay, repeat_count, interval)
    }

    /// Removes a timer
    pub fn remove_timer(&self, id: TimerId) -> TimerResult<()> {
        self.timers.remove(id)
    }

    /// Removes every timer added through this client
    pub fn remove_all_timers(&self) {
        self.timers.remove_all();
    }

    /// Returns true if the timer is still alive
    pub fn is_timer_running(&self, id: TimerId) -> TimerResult<bool> {
        self.timers.is_running(id)
    }

    /// Returns true while the timer's callback is running
    pub fn is_timer_executing(&self, id: TimerId) -> TimerResult<bool> {
        self.timers.is_executing(id)
    }

    /// Returns the IDs of the timers added through this client
    pub fn timer_ids(&self) -> Vec<TimerId> {
        self.timers.tracked_ids()
    }
}

impl Drop for RemoteClient {
    fn drop(&mut self) {
        debug!("Shutting down remote client");
        self.timers.remove_all();
        if self.session.is_connected() {
            info!("Disconnecting on client shutdown");
            self.session.disconnect();
        }
    }
}
