pub mod engine;
pub mod projector;
pub mod summary;
