pub mod email;
pub mod render;
pub mod repository;
pub mod types;
