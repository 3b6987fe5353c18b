pub mod file_lock;
pub mod backend;
pub mod csv_backend;
pub mod memory_backend;
pub mod record_store;