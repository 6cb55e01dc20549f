//! Host-facing contracts and the JSON bridge for native shell integration.

pub mod channel;
pub mod contract;
pub mod handler;
pub mod platform;
pub mod stdio;

pub use platform::BridgePlatform;
