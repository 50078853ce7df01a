//! Notifications delivered to the host application
//!
//! Every asynchronous notification the client produces goes through one
//! [`EventHandler`]. Handlers are called without any session lock held, on
//! whichever thread produced the event.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::warn;

use crate::protocol::RobotId;
use crate::timer::TimerId;

/// Telemetry sample streamed from the robot
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    /// Robot the sample came from
    pub robot: RobotId,
    /// Raw telemetry payload
    pub payload: Bytes,
}

/// Image content as delivered to the handler
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    /// Frame bytes exactly as received from the robot
    Encoded(Bytes),
    /// Frame decoded to 8-bit RGB
    Decoded(image::RgbImage),
}

/// Camera frame from the active robot camera
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    /// Robot the frame came from
    pub robot: RobotId,
    /// Sequence number of delivered frames, starting at 1 per subscription
    pub sequence: u64,
    /// Frame content
    pub data: ImageData,
}

/// Notification from the client to the host application
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// A camera frame arrived for the registered subscription
    ImageFrame(ImageFrame),
    /// A telemetry sample arrived while telemetry is enabled
    Telemetry(TelemetryData),
    /// A timer fired
    TimerFired(TimerId),
    /// The robot granted exclusive control
    ControlGranted {
        /// Robot granting control
        robot: RobotId,
    },
    /// The robot withdrew exclusive control
    ControlRevoked {
        /// Robot withdrawing control
        robot: RobotId,
    },
    /// The robot side closed the connection
    PeerDisconnected {
        /// Robot that went away
        robot: RobotId,
    },
}

/// Receiver of client notifications
pub trait EventHandler: Send + Sync {
    /// Handles one notification
    fn handle(&self, event: RemoteEvent);
}

impl<F> EventHandler for F
where
    F: Fn(RemoteEvent) + Send + Sync,
{
    fn handle(&self, event: RemoteEvent) {
        self(event)
    }
}

/// Handler that discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreEvents;

impl EventHandler for IgnoreEvents {
    fn handle(&self, _event: RemoteEvent) {}
}

/// Handler forwarding notifications into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<RemoteEvent>,
}

impl EventHandler for ChannelHandler {
    fn handle(&self, event: RemoteEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event receiver dropped, discarding notification");
        }
    }
}

/// Creates a handler whose notifications can be awaited from async code
pub fn event_channel() -> (ChannelHandler, mpsc::UnboundedReceiver<RemoteEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelHandler { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_closure_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |event: RemoteEvent| sink.lock().push(event);

        handler.handle(RemoteEvent::TimerFired(4));
        assert_eq!(*seen.lock(), vec![RemoteEvent::TimerFired(4)]);
    }

    #[tokio::test]
    async fn test_channel_handler() {
        let (handler, mut rx) = event_channel();

        handler.handle(RemoteEvent::ControlGranted { robot: 3 });
        assert_eq!(rx.recv().await, Some(RemoteEvent::ControlGranted { robot: 3 }));

        drop(rx);
        // receiver gone: the handler must not panic
        handler.handle(RemoteEvent::TimerFired(1));
    }
}
