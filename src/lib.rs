//! RemoteRobot - client-side session layer for remote robot control
//!
//! This library provides the core functionality for RemoteRobot, including:
//! - Credential normalization for robot logon
//! - Robot session management with exclusive-control arbitration
//! - Binary command frame encoding
//! - Timer registration on top of a pluggable scheduler
//! - Configuration management and logging infrastructure
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use remote_robot::{config::ConfigManager, logging, RemoteClient};
//! use remote_robot::session::{event_channel, LoopbackTransport};
//!
//! # async fn run() -> remote_robot::Result<()> {
//! // Load configuration
//! let config = ConfigManager::new()?.load_or_create_default()?;
//!
//! // Initialize logging at the configured level
//! logging::init_from_config(&config.logging);
//!
//! let transport = Arc::new(LoopbackTransport::new("10.0.0.7", "hunter2", 1));
//! let (handler, mut events) = event_channel();
//! let client = RemoteClient::with_runtime(
//!     config,
//!     transport,
//!     tokio::runtime::Handle::current(),
//!     Arc::new(handler),
//! );
//!
//! client.connect("10.0.0.7", "hunter2")?;
//! client.say("Hello", None)?;
//! client.add_timer(1.0, None, None)?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod security;
pub mod session;
pub mod timer;

// Re-export commonly used types at crate root
pub use client::RemoteClient;
pub use error::{RemoteRobotError, Result};
