pub mod admin;
pub mod directory_sync;
pub mod email;
pub mod feed;
pub mod lifecycle;
pub mod system_template;
pub mod trigger;
