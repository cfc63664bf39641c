pub mod quiz_set_dto;
pub mod submission_dto;
