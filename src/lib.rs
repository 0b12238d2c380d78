//! UOS Hub Library
//!
//! This library logs a student in to the university portals (Blackboard,
//! myUDC and Outlook), scrapes their student-facing data and serves it as
//! one small JSON API.

pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod portals;
pub mod service;
pub mod session;

pub use config::HubConfig;
pub use error::{HubError, HubResult};
pub use service::HubService;

// Re-export key types for convenience
pub use helpers::term::{clean_course_name, current_term_code, term_code, Season, TermCode};
pub use helpers::values::{values_of, values_of_majors, values_of_names, Attribute, ValueMap};
pub use portals::{Credentials, PortalCookies, Recipients};
