//! Azure AD authentication module.
//!
//! Provides the device-code sign-in flow and the authenticated [`Session`]
//! used for Microsoft Graph calls.

pub mod clipboard;
pub mod device_flow;
pub mod session;

pub use device_flow::{DeviceCodeChallenge, DeviceFlowClient};
pub use session::{acquire_session, Session};
