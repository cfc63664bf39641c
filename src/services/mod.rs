pub mod evaluation_service;
pub mod quiz_set_service;
pub mod retry_service;
pub mod shuffle_service;
pub mod submission_service;
