//! Moodle Fetch Core Library
//!
//! Logs into a session-based Moodle portal through its HTML login form and
//! extracts courses, sections and resources from server-rendered pages.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Cookie jar, login token, outcome classifier and login state machine
//! - [`extract`] - Pattern-based record extraction from portal markup
//! - [`transport`] - HTTP exchange contract and the `reqwest` implementation
//! - [`service`] - [`CourseService`], the entry point for callers
//! - [`download`] - File naming and URL helpers for resource downloads
//! - [`model`] - Course, section and resource records
//! - [`error`] - Transport and portal error types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use moodle_core::{CourseService, Credentials, ReqwestTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = CourseService::new(Arc::new(ReqwestTransport::new()?));
//! let credentials = Credentials::new("student", "password");
//! let mut session = service.login(&credentials, "https://lms.example.edu").await?;
//! for course in service.list_courses(&mut session).await? {
//!     println!("{} {}", course.id(), course.name());
//! }
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod download;
pub mod error;
pub mod extract;
pub mod model;
pub mod service;
pub mod transport;

mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use auth::{
    AuthSession, AuthState, CookieJar, Credentials, LoginClassifier, LoginSignals,
    MarkerClassifier, PortalEndpoints, Session, extract_token,
};
pub use download::{DownloadedFile, resolve_unique_path};
pub use error::{PortalError, TransportError};
pub use extract::{
    PatternExtractor, RecordExtractor, extract_course_details, extract_courses, extract_file_link,
};
pub use model::{CategoryListing, Course, CourseDetails, PLUGINFILE_MODULE, Resource, Section};
pub use service::CourseService;
pub use transport::{
    ExchangeRequest, ExchangeResponse, HttpMethod, ReqwestTransport, Transport, TransportTimeouts,
};
