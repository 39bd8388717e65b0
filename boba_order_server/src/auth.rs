//! Upstream identity handling.
//!
//! Authentication and session issuance live outside this service. An identity-aware proxy
//! validates the customer's session and forwards two headers that this server treats as fact:
//! `X-User-Id` (the authenticated user's id) and `X-Shop-Role` (`customer` or `admin`).
//! Requests carrying neither are guest traffic.
use std::{
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::debug;

use crate::errors::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// The caller's identity as asserted by the upstream proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthInfo {
    /// `None` for guests.
    pub user_id: Option<i64>,
    pub role: Role,
}

impl AuthInfo {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Guard for admin-only handlers.
    pub fn require_admin(&self) -> Result<(), ServerError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions("This endpoint requires the admin role".to_string()))
        }
    }
}

impl FromRequest for AuthInfo {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
        let user_id = header("X-User-Id").and_then(|v| {
            v.parse::<i64>()
                .map_err(|e| debug!("💻️ Ignoring malformed X-User-Id header ({v}): {e}"))
                .ok()
        });
        let role = header("X-Shop-Role").and_then(|v| v.parse::<Role>().ok()).unwrap_or_default();
        ready(Ok(AuthInfo { user_id, role }))
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    async fn extract(req: TestRequest) -> AuthInfo {
        let (req, mut payload) = req.to_http_parts();
        AuthInfo::from_request(&req, &mut payload).await.unwrap()
    }

    #[actix_web::test]
    async fn guest_without_headers() {
        let auth = extract(TestRequest::default()).await;
        assert_eq!(auth.user_id, None);
        assert_eq!(auth.role, Role::Customer);
        assert!(auth.require_admin().is_err());
    }

    #[actix_web::test]
    async fn authenticated_customer() {
        let auth = extract(TestRequest::default().insert_header(("X-User-Id", "42"))).await;
        assert_eq!(auth.user_id, Some(42));
        assert!(!auth.is_admin());
    }

    #[actix_web::test]
    async fn admin_role_header() {
        let auth = extract(
            TestRequest::default().insert_header(("X-User-Id", "7")).insert_header(("X-Shop-Role", "Admin")),
        )
        .await;
        assert!(auth.is_admin());
        assert!(auth.require_admin().is_ok());
    }

    #[actix_web::test]
    async fn malformed_user_id_is_guest() {
        let auth = extract(TestRequest::default().insert_header(("X-User-Id", "banana"))).await;
        assert_eq!(auth.user_id, None);
    }
}
