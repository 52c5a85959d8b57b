//! sea-orm entities for the notify service database.

pub mod notification_recipients;
pub mod notifications;
pub mod sync_states;
pub mod system_notification_templates;
pub mod users;
