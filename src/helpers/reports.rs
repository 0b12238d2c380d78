use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use tracing::{error, info};

use crate::error::{HubError, HubResult};

/// Flat parameter set sent to the reporting endpoint
pub type ReportRequest = IndexMap<&'static str, String>;

/// Anything that can render a canned report from its parameters
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn report(&self, params: &ReportRequest) -> HubResult<Vec<u8>>;
}

/// Reporting endpoint reached over HTTP
#[derive(Clone)]
pub struct HttpReportSource {
    client: Client,
    url: String,
}

impl HttpReportSource {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ReportSource for HttpReportSource {
    async fn report(&self, params: &ReportRequest) -> HubResult<Vec<u8>> {
        let cipher = params.get("REPORT").map(String::as_str).unwrap_or("?");
        info!("Requesting report {} from {}", cipher, self.url);

        let response = self
            .client
            .get(&self.url)
            .query(params)
            .query(&[("DESFORMAT", "xml"), ("DESTYPE", "cache")])
            .send()
            .await
            .map_err(HubError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("Report {} returned status {}", cipher, status);
            return Err(HubError::upstream(status.as_u16(), &body));
        }

        let content = response.bytes().await?;
        info!("Report {} received, {} bytes", cipher, content.len());
        Ok(content.to_vec())
    }
}

/// Parameter sets for each canned report, kept free of I/O
pub mod params {
    use super::ReportRequest;

    fn request(pairs: &[(&'static str, &str)]) -> ReportRequest {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    pub fn personal_info(sid: &str) -> ReportRequest {
        let sid = sid.to_uppercase();
        request(&[("REPORT", "SYREXDT_REP"), ("P_SPRIDEN_ID", &sid)])
    }

    pub fn schedule(sid: &str, term: &str) -> ReportRequest {
        let sid = sid.to_uppercase();
        request(&[
            ("REPORT", "SYFSSCE_REP"),
            ("P_ID_FROM", &sid),
            ("P_ID_TO", &sid),
            ("P_TERM_CODE", term),
        ])
    }

    pub fn final_exams(sid: &str, term_code: &str) -> ReportRequest {
        let sid = sid.to_uppercase();
        request(&[("REPORT", "SYRSSFE_REP"), ("P_ID", &sid), ("P_TERM_CODE", term_code)])
    }

    pub fn study_plan(sid: &str, reg_term_code: &str) -> ReportRequest {
        let sid = sid.to_uppercase();
        request(&[
            ("REPORT", "SYRSPOS_REP"),
            ("P_PROG_CODE", "ALL"),
            ("P_EXP_GRD", "ALL"),
            ("P_COLL_CODE", "ALL"),
            ("P_CAMP_CODE", "ALL"),
            ("P_LEVEL_CODE", "ALL"),
            ("P_STUDENT_ID", &sid),
            ("P_TERM_CODE", reg_term_code),
        ])
    }

    /// `None` falls back to every department (`%`) and the 201720 catalog
    pub fn offered_courses(department: Option<&str>, term_code: Option<&str>) -> ReportRequest {
        request(&[
            ("REPORT", "SYRSCHE_REP"),
            ("CAMP", "%"),
            ("COLL", "%"),
            ("DEPT", department.unwrap_or("%")),
            ("LEVL", "ALL"),
            ("P_IND", "ALL"),
            ("P_WEB", "Y"),
            ("MAX", "258"),
            ("MIN", "0"),
            ("TERM", term_code.unwrap_or("201720")),
        ])
    }
}

/// Student's personal information, decoded since it contains Arabic text
pub async fn personal_info(source: &dyn ReportSource, sid: &str) -> HubResult<String> {
    let content = source.report(&params::personal_info(sid)).await?;
    String::from_utf8(content).map_err(|e| HubError::Encoding(e.utf8_error()))
}

pub async fn schedule(source: &dyn ReportSource, sid: &str, term: &str) -> HubResult<Vec<u8>> {
    source.report(&params::schedule(sid, term)).await
}

pub async fn final_exams(source: &dyn ReportSource, sid: &str, term_code: &str) -> HubResult<Vec<u8>> {
    source.report(&params::final_exams(sid, term_code)).await
}

pub async fn study_plan(source: &dyn ReportSource, sid: &str, reg_term_code: &str) -> HubResult<Vec<u8>> {
    source.report(&params::study_plan(sid, reg_term_code)).await
}

pub async fn offered_courses(
    source: &dyn ReportSource,
    department: Option<&str>,
    term_code: Option<&str>,
) -> HubResult<Vec<u8>> {
    source.report(&params::offered_courses(department, term_code)).await
}
