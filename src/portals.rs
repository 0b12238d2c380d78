//! Seams between the API layer and the external portals.
//!
//! Every call receives the credentials or cookies it needs explicitly; the
//! adapters hold no per-student state.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HubResult;

/// Student id and pin as submitted at login
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub sid: String,
    pub pin: String,
}

impl Credentials {
    pub fn new(sid: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            pin: pin.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("sid", &self.sid)
            .field("pin", &"***")
            .finish()
    }
}

/// Session cookies handed out by a portal, ready for a `Cookie` header
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortalCookies(pub Vec<(String, String)>);

impl PortalCookies {
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One or more bare usernames an email is addressed to
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Recipients::One(recipient) => vec![recipient],
            Recipients::Many(recipients) => recipients,
        }
    }
}

impl From<&str> for Recipients {
    fn from(recipient: &str) -> Self {
        Recipients::One(recipient.to_string())
    }
}

impl From<String> for Recipients {
    fn from(recipient: String) -> Self {
        Recipients::One(recipient)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(recipients: Vec<String>) -> Self {
        Recipients::Many(recipients)
    }
}

impl<const N: usize> From<[&str; N]> for Recipients {
    fn from(recipients: [&str; N]) -> Self {
        Recipients::Many(recipients.iter().map(|r| r.to_string()).collect())
    }
}

/// The learning-management system
#[async_trait]
pub trait Blackboard: Send + Sync {
    /// Rejected credentials are `InvalidCredentials`, a down portal is `Unreachable`
    async fn login(&self, credentials: &Credentials) -> HubResult<PortalCookies>;
    async fn get_basic_info(&self, cookies: &PortalCookies, sid: &str) -> HubResult<String>;
    async fn get_updates(&self, cookies: &PortalCookies) -> HubResult<String>;
}

/// The student-records system
#[async_trait]
pub trait MyUdc: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> HubResult<PortalCookies>;
    async fn get_reg_history(&self, cookies: &PortalCookies) -> HubResult<String>;
}

/// The mail service
#[async_trait]
pub trait Outlook: Send + Sync {
    /// `Ok(false)` when the mail service refuses the credentials
    async fn login(&self, credentials: &Credentials) -> HubResult<bool>;
    async fn get_emails(&self, credentials: &Credentials) -> HubResult<String>;
    async fn send_email(
        &self,
        credentials: &Credentials,
        subject: &str,
        body: &str,
        recipients: Recipients,
    ) -> HubResult<StatusCode>;
}
