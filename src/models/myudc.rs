use serde::Serialize;

/// One registered course section as shown in the schedule
#[derive(Serialize, Debug, PartialEq, Clone)]
pub struct ScheduleEntry {
    pub title: String,
    pub crn: String,
    pub days: String,
    pub time: String,
    pub building: String,
    pub room: String,
    pub instructor: String,
}
