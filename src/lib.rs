//! Graph Console
//!
//! Signs in to Azure AD with the device-code flow, then walks through a
//! chain of Microsoft Graph calls: read the profile, download the profile
//! photo, upload it to OneDrive, create a sharing link and mail that link.

#![deny(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod sample;
