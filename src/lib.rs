// ABOUTME: Library root for slipway - a continuous-delivery orchestration core.
// ABOUTME: Push-driven phase selection, goal status propagation, managed local deployments.

pub mod config;
pub mod deploy;
pub mod machine;
pub mod notify;
pub mod phases;
pub mod push;
pub mod status;
pub mod types;
