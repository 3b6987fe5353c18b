pub mod types;
pub mod cache;
pub mod history;