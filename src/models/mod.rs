pub mod quiz;
pub mod quiz_set;
pub mod submission;
