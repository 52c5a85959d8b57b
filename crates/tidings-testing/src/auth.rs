//! Mock identity helpers for router tests.
//!
//! Services behind the gateway receive `x-tidings-user-id` + `x-tidings-user-role`
//! headers. `MockAuth` builds them directly so no gateway is needed.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use tidings_auth_types::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
use tidings_domain::user::UserRole;

/// Configurable identity injected into test requests.
pub struct MockAuth {
    pub user_id: Uuid,
    pub user_role: UserRole,
}

impl MockAuth {
    pub fn new(user_id: Uuid, user_role: UserRole) -> Self {
        Self { user_id, user_role }
    }

    pub fn user() -> Self {
        Self::new(Uuid::new_v4(), UserRole::User)
    }

    pub fn admin() -> Self {
        Self::new(Uuid::new_v4(), UserRole::Admin)
    }

    /// Return headers as if the gateway injected them.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_str(&self.user_id.to_string()).unwrap(),
        );
        map.insert(
            HeaderName::from_static(USER_ROLE_HEADER),
            HeaderValue::from_static(self.user_role.as_str()),
        );
        map
    }

    /// Header pairs for clients that take `(name, value)` tuples.
    pub fn header_pairs(&self) -> Vec<(HeaderName, HeaderValue)> {
        self.headers()
            .into_iter()
            .filter_map(|(name, value)| name.map(|n| (n, value)))
            .collect()
    }
}
