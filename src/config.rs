use std::{env, time::Duration};

use tracing::{info, warn};

use crate::session::DEFAULT_SESSION_TTL;

/// Where the hub listens and where each portal lives
#[derive(Clone, Debug)]
pub struct HubConfig {
    pub bind_addr: String,
    pub blackboard_url: String,
    pub myudc_url: String,
    pub report_url: String,
    pub outlook_url: String,
    /// Appended to bare usernames to form mailbox addresses
    pub email_domain: String,
    /// How long an unused session stays valid
    pub session_ttl: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            blackboard_url: "https://elearning.sharjah.ac.ae".to_string(),
            myudc_url: "https://uos.sharjah.ac.ae:9050/prod_enUS".to_string(),
            report_url: "https://uos.sharjah.ac.ae:9050/reports/rwservlet".to_string(),
            outlook_url: "https://outlook.office365.com/api/v2.0/me/".to_string(),
            email_domain: "sharjah.ac.ae".to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl HubConfig {
    /// Defaults, overridden by any `UOS_HUB_*` variable that is set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let overrides = [
            ("UOS_HUB_BIND_ADDR", &mut config.bind_addr),
            ("UOS_HUB_BLACKBOARD_URL", &mut config.blackboard_url),
            ("UOS_HUB_MYUDC_URL", &mut config.myudc_url),
            ("UOS_HUB_REPORT_URL", &mut config.report_url),
            ("UOS_HUB_OUTLOOK_URL", &mut config.outlook_url),
            ("UOS_HUB_EMAIL_DOMAIN", &mut config.email_domain),
        ];

        for (key, slot) in overrides {
            if let Ok(value) = env::var(key) {
                info!("Config override from {}", key);
                *slot = value;
            }
        }

        if let Ok(value) = env::var("UOS_HUB_SESSION_TTL_SECS") {
            match parse_seconds(&value) {
                Some(ttl) => {
                    info!("Config override from UOS_HUB_SESSION_TTL_SECS");
                    config.session_ttl = ttl;
                }
                None => warn!("Ignoring UOS_HUB_SESSION_TTL_SECS={:?}, not a number of seconds", value),
            }
        }

        config
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value.trim().parse().ok().map(Duration::from_secs)
}
