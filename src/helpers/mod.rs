pub mod blackboard;
pub mod http;
pub mod myudc;
pub mod outlook;
pub mod reports;
pub mod term;
pub mod values;
