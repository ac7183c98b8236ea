//! Microsoft Graph operations.
//!
//! Each operation is a thin request/response wrapper over a
//! [`GraphTransport`]; non-2xx statuses come back as responses for the caller
//! to inspect.

pub mod client;
pub mod drive;
pub mod endpoint;
pub mod mail;
pub mod models;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::GraphClient;
pub use endpoint::EndpointResolver;
pub use models::{BodyType, DriveItem, LinkType, MailMessage, PhotoResult, SharingLink, UserProfile};
pub use transport::{GraphRequest, GraphResponse, GraphTransport, RequestBody};
