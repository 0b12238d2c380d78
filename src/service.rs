use axum::{
    extract::{OriginalUri, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{error::Error, sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::{
    config::HubConfig,
    error::{HubError, HubResult},
    helpers::{
        blackboard::{self, BlackboardClient},
        http::portal_client_init,
        myudc::{self, MyUdcClient},
        outlook::{self, OutlookClient},
        reports::{self, HttpReportSource, ReportSource},
        term::TermCode,
    },
    portals::{Blackboard, Credentials, MyUdc, Outlook, PortalCookies, Recipients},
    session::{session_cookie, session_id, SessionStore, StudentSession},
};

/// The hub: portal adapters plus the sessions of logged in clients
#[derive(Clone)]
pub struct HubService {
    pub blackboard: Arc<dyn Blackboard>,
    pub myudc: Arc<dyn MyUdc>,
    pub outlook: Arc<dyn Outlook>,
    pub reports: Arc<dyn ReportSource>,
    pub sessions: SessionStore,
}

#[derive(Deserialize, Debug)]
pub struct SendEmailRequest {
    pub subject: String,
    pub body: String,
    pub recipients: Recipients,
}

impl HubService {
    /// Create a new hub from its portal adapters
    pub fn new(
        blackboard: Arc<dyn Blackboard>,
        myudc: Arc<dyn MyUdc>,
        outlook: Arc<dyn Outlook>,
        reports: Arc<dyn ReportSource>,
    ) -> Self {
        info!("Creating new HubService instance");
        Self {
            blackboard,
            myudc,
            outlook,
            reports,
            sessions: SessionStore::new(),
        }
    }

    /// Forget sessions left unused for `ttl`
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionStore::with_ttl(ttl);
        self
    }

    /// Create a hub talking to the real portals named in `config`
    pub fn from_config(config: &HubConfig) -> Result<Self, Box<dyn Error>> {
        let client = portal_client_init()?;

        let service = Self::new(
            Arc::new(BlackboardClient::new(client.clone(), config.blackboard_url.clone())),
            Arc::new(MyUdcClient::new(client.clone(), config.myudc_url.clone())),
            Arc::new(OutlookClient::new(
                client.clone(),
                config.outlook_url.clone(),
                config.email_domain.clone(),
            )),
            Arc::new(HttpReportSource::new(client, config.report_url.clone())),
        );
        Ok(service.with_session_ttl(config.session_ttl))
    }

    /// Create an Axum router serving the hub API
    pub fn router(self) -> Router {
        info!("Creating hub router");
        let shared_state = Arc::new(self);

        Router::new()
            .route("/api/", get(api_root))
            .route("/api/login/", get(login_status).post(login))
            .route("/api/details/", get(layout_details))
            .route("/api/updates/", get(updates))
            .route("/api/schedule/", get(registered_terms))
            .route("/api/schedule/{term}/", get(schedule))
            .route("/api/emails/", get(emails_root))
            .route("/api/emails/previews/", get(emails_previews))
            .route("/api/emails/send/", post(send_email))
            .route("/health", get(|| async { "OK" }))
            .with_state(shared_state)
    }

    /// Logs in to Blackboard, confirming credentials through Outlook when
    /// Blackboard is down
    pub async fn login(&self, credentials: Credentials) -> HubResult<StudentSession> {
        let mut session = StudentSession::new(credentials);

        match self.blackboard.login(&session.credentials).await {
            Ok(cookies) => session.blackboard = Some(cookies),
            Err(HubError::Unreachable(reason)) => {
                warn!("Blackboard is down ({}), checking credentials with Outlook", reason);
                if !self.outlook.login(&session.credentials).await? {
                    return Err(HubError::InvalidCredentials("Wrong Credentials!".to_string()));
                }
            }
            Err(e) => return Err(e),
        }

        Ok(session)
    }

    /// Blackboard cookies of the session, logging in now if Blackboard was down at login
    async fn blackboard_cookies(&self, id: &str, session: &StudentSession) -> HubResult<PortalCookies> {
        if let Some(cookies) = &session.blackboard {
            return Ok(cookies.clone());
        }

        let cookies = self.blackboard.login(&session.credentials).await?;
        self.sessions.set_blackboard(id, cookies.clone()).await;
        Ok(cookies)
    }

    async fn myudc_cookies(&self, id: &str, session: &StudentSession) -> HubResult<PortalCookies> {
        if let Some(cookies) = &session.myudc {
            return Ok(cookies.clone());
        }

        let cookies = self.myudc.login(&session.credentials).await?;
        self.sessions.set_myudc(id, cookies.clone()).await;
        Ok(cookies)
    }
}

type Hub = State<Arc<HubService>>;

/// Requests from a browser get navigable responses instead of raw data
fn client_side(headers: &HeaderMap) -> bool {
    !headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Resolves `relative` against the requested URL, like a browser would
fn absolute_url(headers: &HeaderMap, uri: &OriginalUri, relative: &str) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let path = uri.0.path();
    let base = &path[..path.rfind('/').map_or(0, |i| i + 1)];

    format!("{scheme}://{host}{base}{relative}")
}

// Route handlers
async fn api_root(headers: HeaderMap, uri: OriginalUri) -> Json<Value> {
    let url = |relative| absolute_url(&headers, &uri, relative);

    Json(json!({
        "Login": url("login/"),
        "Layout Details": url("details/"),
        "Updates": url("updates/"),
        "Schedule": url("schedule/"),
        "Emails": url("emails/"),
    }))
}

async fn login(
    State(service): Hub,
    headers: HeaderMap,
    uri: OriginalUri,
    Json(credentials): Json<Credentials>,
) -> HubResult<Response> {
    info!("Received login request from {}", credentials.sid);

    let session = service.login(credentials).await?;
    if let Some(previous) = session_id(&headers) {
        service.sessions.remove(&previous).await;
    }
    let id = service.sessions.save(session).await;
    let cookie = [(header::SET_COOKIE, session_cookie(&id))];

    if client_side(&headers) {
        Ok((StatusCode::OK, cookie, Json(json!({}))).into_response())
    } else {
        Ok((cookie, Redirect::to(uri.0.path())).into_response())
    }
}

async fn login_status(State(service): Hub, headers: HeaderMap) -> Json<Value> {
    let id = service.sessions.current_id(&headers).await;
    Json(json!({
        "sessionId": id.unwrap_or_else(|| "You're not logged in!".to_string())
    }))
}

async fn layout_details(State(service): Hub, headers: HeaderMap) -> HubResult<Json<Value>> {
    let (id, session) = service.sessions.require(&headers).await?;
    let cookies = service.blackboard_cookies(&id, &session).await?;

    let raw = service
        .blackboard
        .get_basic_info(&cookies, &session.credentials.sid)
        .await?;
    let student = blackboard::scrape_basic_info(&raw)?;

    Ok(Json(json!({ "student": student })))
}

async fn updates(State(service): Hub, headers: HeaderMap) -> HubResult<Json<Value>> {
    let (id, session) = service.sessions.require(&headers).await?;
    let cookies = service.blackboard_cookies(&id, &session).await?;

    let raw = service.blackboard.get_updates(&cookies).await?;
    let updates = blackboard::scrape_updates(&raw)?;
    info!("Serving {} updates", updates.updates.len());

    Ok(Json(serde_json::to_value(updates)?))
}

async fn registered_terms(
    State(service): Hub,
    headers: HeaderMap,
    uri: OriginalUri,
) -> HubResult<Json<IndexMap<String, String>>> {
    let (id, session) = service.sessions.require(&headers).await?;
    let cookies = service.myudc_cookies(&id, &session).await?;

    let page = service.myudc.get_reg_history(&cookies).await?;
    let terms = myudc::scrape_registered_terms(&page);

    if client_side(&headers) {
        return Ok(Json(terms));
    }

    Ok(Json(
        terms
            .into_iter()
            .map(|(code, name)| (name, absolute_url(&headers, &uri, &format!("{code}/"))))
            .collect(),
    ))
}

async fn schedule(
    State(service): Hub,
    headers: HeaderMap,
    Path(term): Path<String>,
) -> HubResult<Json<Value>> {
    let (_, session) = service.sessions.require(&headers).await?;
    let term: TermCode = term.parse()?;
    info!("Serving schedule of {} for {}", session.credentials.sid, term);

    let report = reports::schedule(
        service.reports.as_ref(),
        &session.credentials.sid,
        &term.to_string(),
    )
    .await?;
    let schedule = myudc::scrape_schedule(&report)?;

    Ok(Json(serde_json::to_value(schedule)?))
}

async fn emails_root(headers: HeaderMap, uri: OriginalUri) -> Json<Value> {
    Json(json!({
        "Previews": absolute_url(&headers, &uri, "previews/"),
        "Send": absolute_url(&headers, &uri, "send/"),
    }))
}

async fn emails_previews(State(service): Hub, headers: HeaderMap) -> HubResult<Json<Value>> {
    let (_, session) = service.sessions.require(&headers).await?;

    let raw = service.outlook.get_emails(&session.credentials).await?;
    let previews = outlook::scrape_emails_previews(&raw)?;

    Ok(Json(serde_json::to_value(previews)?))
}

async fn send_email(
    State(service): Hub,
    headers: HeaderMap,
    Json(request): Json<SendEmailRequest>,
) -> HubResult<Json<Value>> {
    let (_, session) = service.sessions.require(&headers).await?;

    let status = service
        .outlook
        .send_email(
            &session.credentials,
            &request.subject,
            &request.body,
            request.recipients,
        )
        .await?;

    Ok(Json(json!({ "status": status.as_u16() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Uri};

    fn headers(accept: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("hub.test"));
        if let Some(accept) = accept {
            headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
        }
        headers
    }

    #[test]
    fn browsers_are_not_client_side() {
        assert!(client_side(&headers(None)));
        assert!(client_side(&headers(Some("application/json"))));
        assert!(!client_side(&headers(Some("text/html,application/xhtml+xml"))));
    }

    #[test]
    fn relative_urls_resolve_against_request_path() {
        let uri = OriginalUri(Uri::from_static("/api/schedule/"));
        assert_eq!(
            absolute_url(&headers(None), &uri, "201710/"),
            "http://hub.test/api/schedule/201710/"
        );

        let uri = OriginalUri(Uri::from_static("/api/emails"));
        assert_eq!(
            absolute_url(&headers(None), &uri, "previews/"),
            "http://hub.test/api/previews/"
        );
    }
}
