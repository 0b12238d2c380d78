use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct MessagesResponse {
    #[serde(default)]
    pub value: Vec<Message>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body_preview: String,
    pub received_date_time: String,
    #[serde(default)]
    pub from: Option<Sender>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Sender {
    pub email_address: EmailAddress,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
}

/// Short form of an email as listed in the inbox
#[derive(Serialize, Debug, PartialEq)]
pub struct EmailPreview {
    pub title: String,
    pub event: String,
    pub time: String,
    pub sender: String,
}
