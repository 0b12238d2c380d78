pub mod blackboard;
pub mod myudc;
pub mod outlook;
