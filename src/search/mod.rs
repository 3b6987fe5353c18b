pub mod results;
pub mod executor;
pub mod content;
pub mod snippet;