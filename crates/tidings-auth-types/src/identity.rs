//! Gateway-injected identity headers extractor.

use axum::extract::FromRequestParts;
use http::StatusCode;
use http::request::Parts;
use uuid::Uuid;

use tidings_domain::user::UserRole;

pub const USER_ID_HEADER: &str = "x-tidings-user-id";
pub const USER_ROLE_HEADER: &str = "x-tidings-user-role";
pub const DEVICE_ID_HEADER: &str = "x-tidings-device-id";

/// User identity injected by the gateway via `x-tidings-user-id` and `x-tidings-user-role` headers.
///
/// Returns 401 if either header is absent or malformed.
/// Role enforcement (403) is done by handlers after extraction.
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    pub user_id: Uuid,
    pub user_role: UserRole,
    /// Optional client device id, used to correlate push failures.
    pub device_id: Option<String>,
}

impl IdentityHeaders {
    pub fn is_admin(&self) -> bool {
        self.user_role.is_admin()
    }
}

impl<S> FromRequestParts<S> for IdentityHeaders
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // axum-core 0.5 declares `fn -> impl Future + Send`; extract synchronously
    // and return a 'static async block.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        let user_id = header(USER_ID_HEADER).and_then(|s| s.parse::<Uuid>().ok());
        let user_role = header(USER_ROLE_HEADER).and_then(|s| s.parse::<UserRole>().ok());
        let device_id = header(DEVICE_ID_HEADER).filter(|s| !s.is_empty());

        async move {
            let user_id = user_id.ok_or(StatusCode::UNAUTHORIZED)?;
            let user_role = user_role.ok_or(StatusCode::UNAUTHORIZED)?;
            Ok(Self {
                user_id,
                user_role,
                device_id,
            })
        }
    }
}
