//! Storage for harvested data: JSON batches and downloaded media files.

pub mod local;

pub use local::LocalStorage;
