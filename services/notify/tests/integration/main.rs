mod helpers;

mod email_test;
mod router_test;
mod sync_test;
mod trigger_test;
