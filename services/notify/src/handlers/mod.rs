pub mod admin;
pub mod feed;
pub mod response;
pub mod service;
pub mod stream;
