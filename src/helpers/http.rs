use reqwest::{header, redirect, Client, Response};
use std::error::Error;
use tracing::{error, info};

use crate::{
    error::{HubError, HubResult},
    portals::PortalCookies,
};

/// Client shared by every portal adapter. Redirects are left to the caller
/// so login responses keep their `Set-Cookie` headers.
pub fn portal_client_init() -> Result<Client, Box<dyn Error>> {
    info!("Initializing portal client");

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static("Mozilla/5.0 (compatible; uos-hub)"),
    );

    match Client::builder()
        .default_headers(headers)
        .redirect(redirect::Policy::none())
        .build()
    {
        Ok(client) => {
            info!("Portal client initialized successfully");
            Ok(client)
        }
        Err(e) => {
            error!("Failed to build portal client: {}", e);
            Err(Box::new(e))
        }
    }
}

/// `name=value` pairs from every `Set-Cookie` header of a response
pub fn collect_cookies(response: &Response) -> PortalCookies {
    PortalCookies(
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect(),
    )
}

fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Builds a `Cookie` header value, flagged sensitive so it never shows in logs
pub fn cookie_header(cookies: &PortalCookies) -> header::HeaderValue {
    let mut value = header::HeaderValue::from_str(&cookies.header_value())
        .unwrap_or_else(|_| header::HeaderValue::from_static(""));
    value.set_sensitive(true);
    value
}

/// Reads a portal response body, turning non-success statuses into errors
pub async fn read_body(response: Response, portal: &str) -> HubResult<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("{} returned error status {}", portal, status);
        return Err(HubError::upstream(status.as_u16(), &body));
    }

    match response.text().await {
        Ok(text) => {
            info!("Received {} chars from {}", text.len(), portal);
            Ok(text)
        }
        Err(e) => {
            error!("Failed to read {} response body: {}", portal, e);
            Err(HubError::from_transport(e))
        }
    }
}
