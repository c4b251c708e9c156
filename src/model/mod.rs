pub mod document;
pub mod donation;
pub mod project;
pub mod task;
