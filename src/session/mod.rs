//! Robot session module
//!
//! This module tracks the connection to one robot, arbitrates exclusive
//! control, and routes the robot's notifications to the host application.

pub mod events;
pub mod image;
pub mod manager;
pub mod state;
pub mod transport;

pub use events::{
    event_channel, ChannelHandler, EventHandler, IgnoreEvents, ImageData, ImageFrame,
    RemoteEvent, TelemetryData,
};
pub use image::ImageSubscription;
pub use manager::{SessionLink, SessionManager};
pub use state::{ConnectionState, ExclusiveControl, Session};
pub use transport::{LoopbackTransport, Transport, TransportCall};
