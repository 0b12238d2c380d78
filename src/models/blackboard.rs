use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// Blackboard public REST user record
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_name: String,
    pub student_id: Option<String>,
    pub name: UserName,
    #[serde(default)]
    pub contact: Option<UserContact>,
}

#[derive(Deserialize, Debug)]
pub struct UserName {
    pub given: String,
    pub family: String,
}

#[derive(Deserialize, Debug)]
pub struct UserContact {
    pub email: Option<String>,
}

// Stream viewer payload, only the parts the hub reads
#[derive(Deserialize, Debug)]
pub struct StreamResponse {
    #[serde(rename = "sv_streamEntries", default)]
    pub entries: Vec<StreamEntry>,
    #[serde(rename = "sv_extras", default)]
    pub extras: StreamExtras,
}

#[derive(Deserialize, Debug)]
pub struct StreamEntry {
    #[serde(rename = "se_courseId")]
    pub course_id: Option<String>,
    #[serde(rename = "se_timestamp")]
    pub timestamp: i64,
    #[serde(rename = "itemSpecificData")]
    pub item: StreamItem,
}

#[derive(Deserialize, Debug)]
pub struct StreamItem {
    pub title: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct StreamExtras {
    #[serde(rename = "sx_courses", default)]
    pub courses: Vec<StreamCourse>,
}

#[derive(Deserialize, Debug)]
pub struct StreamCourse {
    pub id: String,
    pub name: String,
}

/// What the layout shows about the logged in student
#[derive(Serialize, Debug, PartialEq)]
pub struct StudentInfo {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Update {
    pub title: String,
    pub course: Option<String>,
    pub time: String,
}

/// Updates plus the names of the courses they come from
#[derive(Serialize, Debug, PartialEq)]
pub struct Updates {
    pub updates: Vec<Update>,
    pub courses: IndexMap<String, String>,
}
