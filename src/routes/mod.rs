pub mod health;
pub mod quiz_sets;
pub mod submissions;
