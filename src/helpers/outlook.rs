use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{
    error::{HubError, HubResult},
    helpers::http::read_body,
    models::outlook::{EmailPreview, MessagesResponse},
    portals::{Credentials, Outlook, Recipients},
};

/// Outlook REST API, authenticated with the student's mailbox and pin
#[derive(Clone)]
pub struct OutlookClient {
    client: Client,
    root_url: String,
    email_domain: String,
}

impl OutlookClient {
    pub fn new(client: Client, root_url: String, email_domain: String) -> Self {
        Self {
            client,
            root_url,
            email_domain,
        }
    }

    fn mailbox(&self, credentials: &Credentials) -> String {
        email_address(&credentials.sid, &self.email_domain)
    }
}

/// Mailbox address of a university username
pub fn email_address(username: &str, domain: &str) -> String {
    format!("{}@{}", username, domain)
}

/// Mailbox addresses for a single username or a list of them
pub fn recipient_addresses(recipients: Recipients, domain: &str) -> Vec<String> {
    recipients
        .into_vec()
        .iter()
        .map(|username| email_address(username, domain))
        .collect()
}

/// JSON body of a `sendmail` call; the message is kept in Sent Items
pub fn sendmail_payload(subject: &str, body: &str, recipients: &[String]) -> Value {
    let to: Vec<Value> = recipients
        .iter()
        .map(|address| json!({ "EmailAddress": { "Address": address } }))
        .collect();

    json!({
        "Message": {
            "Subject": subject,
            "Body": {
                "ContentType": "Text",
                "Content": body,
            },
            "ToRecipients": to,
        },
        "SaveToSentItems": "true",
    })
}

#[async_trait]
impl Outlook for OutlookClient {
    async fn login(&self, credentials: &Credentials) -> HubResult<bool> {
        info!("Checking Outlook credentials of {}", credentials.sid);

        let response = self
            .client
            .get(&self.root_url)
            .basic_auth(self.mailbox(credentials), Some(&credentials.pin))
            .send()
            .await
            .map_err(HubError::from_transport)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                info!("Outlook rejected credentials of {}", credentials.sid);
                Ok(false)
            }
            status => {
                error!("Unexpected Outlook login status {}", status);
                read_body(response, "Outlook").await.map(|_| false)
            }
        }
    }

    async fn get_emails(&self, credentials: &Credentials) -> HubResult<String> {
        let url = format!("{}messages", self.root_url);
        info!("Fetching email previews of {}", credentials.sid);

        let response = self
            .client
            .get(&url)
            .basic_auth(self.mailbox(credentials), Some(&credentials.pin))
            .query(&[
                ("$select", "Subject,BodyPreview,ReceivedDateTime,From"),
                ("$top", "25"),
            ])
            .send()
            .await
            .map_err(HubError::from_transport)?;

        read_body(response, "Outlook").await
    }

    async fn send_email(
        &self,
        credentials: &Credentials,
        subject: &str,
        body: &str,
        recipients: Recipients,
    ) -> HubResult<StatusCode> {
        let addresses = recipient_addresses(recipients, &self.email_domain);

        info!("Sending email {:?} to {} recipient(s)", subject, addresses.len());

        let response = self
            .client
            .post(format!("{}sendmail", self.root_url))
            .basic_auth(self.mailbox(credentials), Some(&credentials.pin))
            .json(&sendmail_payload(subject, body, &addresses))
            .send()
            .await
            .map_err(HubError::from_transport)?;

        let status = response.status();
        info!("Outlook sendmail answered {}", status);
        Ok(status)
    }
}

pub fn scrape_emails_previews(raw: &str) -> HubResult<Vec<EmailPreview>> {
    let messages: MessagesResponse = serde_json::from_str(raw)?;

    Ok(messages
        .value
        .into_iter()
        .map(|message| EmailPreview {
            title: message.subject.unwrap_or_default(),
            event: message.body_preview.trim().to_string(),
            time: message.received_date_time,
            sender: message
                .from
                .map(|from| from.email_address.name.unwrap_or(from.email_address.address))
                .unwrap_or_default(),
        })
        .collect())
}
