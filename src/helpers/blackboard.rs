use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::DateTime;
use regex::Regex;
use reqwest::{header, Client, Url};
use tracing::{error, info};

use crate::{
    error::{HubError, HubResult},
    helpers::{
        http::{collect_cookies, cookie_header, read_body},
        term::clean_course_name,
    },
    models::blackboard::{StreamResponse, StudentInfo, Update, Updates, UserRecord},
    portals::{Blackboard, Credentials, PortalCookies},
};

static LOGIN_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"id="loginErrorMessage"[^>]*>\s*([^<]*?)\s*<"#).expect("static regex")
});

/// Blackboard Learn reached over HTTP
#[derive(Clone)]
pub struct BlackboardClient {
    client: Client,
    base_url: String,
}

impl BlackboardClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

/// Public REST address of a user, with the username escaped as one path segment
pub fn user_url(base_url: &str, username: &str) -> HubResult<Url> {
    let mut url = Url::parse(base_url).map_err(|e| HubError::InvalidUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| HubError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(["learn", "api", "public", "v1", "users"])
        .push(&format!("userName:{username}"));
    Ok(url)
}

#[async_trait]
impl Blackboard for BlackboardClient {
    async fn login(&self, credentials: &Credentials) -> HubResult<PortalCookies> {
        let url = format!("{}/webapps/login/", self.base_url);
        info!("Logging {} in to Blackboard", credentials.sid);

        let form = [
            ("user_id", credentials.sid.as_str()),
            ("password", credentials.pin.as_str()),
            ("login", "Login"),
            ("action", "login"),
        ];

        let response = match self.client.post(&url).form(&form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!("Failed to reach Blackboard login: {}", e);
                return Err(HubError::from_transport(e));
            }
        };

        let status = response.status();
        let cookies = collect_cookies(&response);
        let page = response.text().await.map_err(HubError::from_transport)?;

        if let Some(message) = login_error(&page) {
            info!("Blackboard rejected credentials of {}", credentials.sid);
            return Err(HubError::InvalidCredentials(message));
        }

        if !(status.is_success() || status.is_redirection()) || cookies.is_empty() {
            error!("Unexpected Blackboard login response: {}", status);
            return Err(HubError::upstream(status.as_u16(), &page));
        }

        info!("Blackboard login succeeded with {} cookies", cookies.0.len());
        Ok(cookies)
    }

    async fn get_basic_info(&self, cookies: &PortalCookies, sid: &str) -> HubResult<String> {
        let url = user_url(&self.base_url, sid)?;
        info!("Fetching Blackboard basic info for {}", sid);

        let response = self
            .client
            .get(url)
            .header(header::COOKIE, cookie_header(cookies))
            .send()
            .await
            .map_err(HubError::from_transport)?;

        read_body(response, "Blackboard").await
    }

    async fn get_updates(&self, cookies: &PortalCookies) -> HubResult<String> {
        let url = format!("{}/webapps/streamViewer/streamViewer", self.base_url);
        info!("Fetching Blackboard updates stream");

        let form = [
            ("cmd", "loadStream"),
            ("streamName", "alerts"),
            ("providers", "{}"),
            ("forOverview", "false"),
        ];

        let response = self
            .client
            .post(&url)
            .header(header::COOKIE, cookie_header(cookies))
            .form(&form)
            .send()
            .await
            .map_err(HubError::from_transport)?;

        read_body(response, "Blackboard").await
    }
}

/// Message shown on a failed login page, if any
fn login_error(page: &str) -> Option<String> {
    if !page.contains("loginErrorMessage") {
        return None;
    }

    let message = LOGIN_ERROR
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "Wrong Credentials!".to_string());
    Some(message)
}

pub fn scrape_basic_info(raw: &str) -> HubResult<StudentInfo> {
    let user: UserRecord = serde_json::from_str(raw)?;
    Ok(StudentInfo {
        id: user.student_id.unwrap_or(user.user_name),
        name: format!("{} {}", user.name.given.trim(), user.name.family.trim()),
        email: user.contact.and_then(|c| c.email),
    })
}

pub fn scrape_updates(raw: &str) -> HubResult<Updates> {
    let stream: StreamResponse = serde_json::from_str(raw)?;

    let courses = stream
        .extras
        .courses
        .into_iter()
        .map(|course| (course.id, clean_course_name(&course.name)))
        .collect();

    let updates = stream
        .entries
        .into_iter()
        .map(|entry| Update {
            title: entry.item.title.trim().to_string(),
            course: entry.course_id,
            time: DateTime::from_timestamp_millis(entry.timestamp)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        })
        .collect();

    Ok(Updates { updates, courses })
}
