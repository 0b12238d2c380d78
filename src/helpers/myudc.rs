use std::sync::LazyLock;

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use reqwest::{header, Client};
use roxmltree::Document;
use tracing::{debug, error, info};

use crate::{
    error::{HubError, HubResult},
    helpers::{
        http::{collect_cookies, cookie_header, read_body},
        term::{clean_course_name, TermCode},
        values::{field, records},
    },
    models::myudc::ScheduleEntry,
    portals::{Credentials, MyUdc, PortalCookies},
};

static TERM_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<option\s+value="(\d{6})"[^>]*>([^<]*)<"#).expect("static regex")
});

/// myUDC (Banner self-service) reached over HTTP
#[derive(Clone)]
pub struct MyUdcClient {
    client: Client,
    base_url: String,
}

impl MyUdcClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl MyUdc for MyUdcClient {
    async fn login(&self, credentials: &Credentials) -> HubResult<PortalCookies> {
        let url = format!("{}/twbkwbis.P_ValLogin", self.base_url);
        info!("Logging {} in to myUDC", credentials.sid);

        // Banner refuses logins from clients that did not pass its cookie test
        let response = self
            .client
            .post(&url)
            .header(header::COOKIE, "TESTID=set")
            .form(&[("sid", credentials.sid.as_str()), ("PIN", credentials.pin.as_str())])
            .send()
            .await
            .map_err(HubError::from_transport)?;

        let mut cookies = collect_cookies(&response);
        let page = read_body(response, "myUDC").await?;

        if page.contains("Invalid login information") {
            info!("myUDC rejected credentials of {}", credentials.sid);
            return Err(HubError::InvalidCredentials("Wrong Credentials!".to_string()));
        }

        if cookies.is_empty() {
            error!("myUDC login returned no session cookie");
            return Err(HubError::upstream(200, &page));
        }

        cookies.0.push(("TESTID".to_string(), "set".to_string()));
        Ok(cookies)
    }

    async fn get_reg_history(&self, cookies: &PortalCookies) -> HubResult<String> {
        let url = format!("{}/bwskfshd.P_CrseSchdDetl", self.base_url);
        info!("Fetching myUDC registration history");

        let response = self
            .client
            .get(&url)
            .header(header::COOKIE, cookie_header(cookies))
            .send()
            .await
            .map_err(HubError::from_transport)?;

        read_body(response, "myUDC").await
    }
}

/// Terms the student registered in, as `{term code: term name}`
pub fn scrape_registered_terms(page: &str) -> IndexMap<String, String> {
    TERM_OPTION
        .captures_iter(page)
        .map(|caps| {
            let code = caps[1].to_string();
            let name = caps[2].replace("(View only)", "").trim().to_string();
            let name = if name.is_empty() {
                code.parse::<TermCode>().map(|t| t.name()).unwrap_or_else(|_| code.clone())
            } else {
                name
            };
            (code, name)
        })
        .collect()
}

/// `0830` -> `08:30`; anything else passes through
fn clock(raw: &str) -> String {
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}:{}", &raw[..2], &raw[2..])
    } else {
        raw.to_string()
    }
}

/// Courses of a `SYFSSCE_REP` schedule report keyed by `SUBJ CRSE`
pub fn scrape_schedule(report: &[u8]) -> HubResult<IndexMap<String, ScheduleEntry>> {
    let text = std::str::from_utf8(report)?;
    let doc = Document::parse(text)?;
    let mut schedule = IndexMap::new();

    for section in records(&doc, "LIST_G_SSBSECT_CRN")? {
        let key = format!(
            "{} {}",
            field(section, "SSBSECT_SUBJ_CODE")?,
            field(section, "SSBSECT_CRSE_NUMB")?
        );
        let begin = field(section, "SSRMEET_BEGIN_TIME")?;
        let end = field(section, "SSRMEET_END_TIME")?;
        let time = if begin.is_empty() && end.is_empty() {
            String::new()
        } else {
            format!("{} - {}", clock(&begin), clock(&end))
        };

        schedule.insert(
            key,
            ScheduleEntry {
                title: clean_course_name(&field(section, "SCBCRSE_TITLE")?),
                crn: field(section, "SSBSECT_CRN")?,
                days: field(section, "SSRMEET_DAYS")?,
                time,
                building: field(section, "SSRMEET_BLDG_CODE")?,
                room: field(section, "SSRMEET_ROOM_CODE")?,
                instructor: field(section, "INSTRUCTOR_NAME")?,
            },
        );
    }

    debug!("Scraped {} scheduled courses", schedule.len());
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registered_terms_from_select() {
        let page = r#"<select name="term_in" id="term_id">
            <OPTION VALUE="201720">Spring Semester 2017 - 2018</OPTION>
            <option value="201710" selected>Fall Semester 2017 - 2018 (View only)</option>
            <option value="201630"></option>
            <option value="">None</option>
        </select>"#;

        let terms = scrape_registered_terms(page);
        assert_eq!(
            terms.into_iter().collect::<Vec<_>>(),
            vec![
                ("201720".to_string(), "Spring Semester 2017 - 2018".to_string()),
                ("201710".to_string(), "Fall Semester 2017 - 2018".to_string()),
                ("201630".to_string(), "Summer Session 2016".to_string()),
            ]
        );
    }

    #[test]
    fn no_terms_on_unrelated_page() {
        assert!(scrape_registered_terms("<html><body>Main Menu</body></html>").is_empty());
    }

    #[test]
    fn clock_formats_four_digit_times() {
        assert_eq!(clock("0830"), "08:30");
        assert_eq!(clock("TBA"), "TBA");
        assert_eq!(clock(""), "");
    }

    fn section(crn: &str, subj: &str, numb: &str, title: &str, begin: &str) -> String {
        format!(
            "<G_SSBSECT_CRN>\
               <SSBSECT_CRN>{crn}</SSBSECT_CRN>\
               <SSBSECT_SUBJ_CODE>{subj}</SSBSECT_SUBJ_CODE>\
               <SSBSECT_CRSE_NUMB>{numb}</SSBSECT_CRSE_NUMB>\
               <SCBCRSE_TITLE>{title}</SCBCRSE_TITLE>\
               <SSRMEET_DAYS>UTR</SSRMEET_DAYS>\
               <SSRMEET_BEGIN_TIME>{begin}</SSRMEET_BEGIN_TIME>\
               <SSRMEET_END_TIME>0920</SSRMEET_END_TIME>\
               <SSRMEET_BLDG_CODE>M10</SSRMEET_BLDG_CODE>\
               <SSRMEET_ROOM_CODE>W1</SSRMEET_ROOM_CODE>\
               <INSTRUCTOR_NAME>Dr. Omar</INSTRUCTOR_NAME>\
             </G_SSBSECT_CRN>"
        )
    }

    #[test]
    fn schedule_report_becomes_courses() {
        let report = format!(
            "<SYFSSCE><LIST_G_SSBSECT_CRN>{}{}</LIST_G_SSBSECT_CRN></SYFSSCE>",
            section("12345", "CS", "0201", "Programming I ++ 11", "0830"),
            section("23456", "MATH", "0101", "Calculus &amp; Analytic Geometry", "1000"),
        );

        let schedule = scrape_schedule(report.as_bytes()).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(
            schedule["CS 0201"],
            ScheduleEntry {
                title: "Programming I".to_string(),
                crn: "12345".to_string(),
                days: "UTR".to_string(),
                time: "08:30 - 09:20".to_string(),
                building: "M10".to_string(),
                room: "W1".to_string(),
                instructor: "Dr. Omar".to_string(),
            }
        );
        assert_eq!(schedule["MATH 0101"].title, "Calculus & Analytic Geometry");
    }

    #[test]
    fn schedule_without_section_list_is_missing_field() {
        let err = scrape_schedule(b"<SYFSSCE/>").unwrap_err();
        assert!(matches!(err, HubError::MissingField { field: "LIST_G_SSBSECT_CRN" }));
    }
}
