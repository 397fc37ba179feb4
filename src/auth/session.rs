use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use std::future::{Ready, ready};
use uuid::Uuid;

use crate::errors::AppError;

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

const ACCESS_MAX_AGE_SECS: i64 = 60 * 60;
const REFRESH_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Which owned rows a request may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    Owner(Uuid),
    /// Test-mode identity; owner filtering is skipped.
    Unrestricted,
}

impl AccessScope {
    pub fn resolve(user_id: Uuid, test_account: Option<Uuid>) -> Self {
        if test_account == Some(user_id) {
            AccessScope::Unrestricted
        } else {
            AccessScope::Owner(user_id)
        }
    }

    /// Bind value for `($n::uuid IS NULL OR owner_user_id = $n)` filters.
    pub fn owner_filter(&self) -> Option<Uuid> {
        match self {
            AccessScope::Owner(id) => Some(*id),
            AccessScope::Unrestricted => None,
        }
    }

    pub fn permits(&self, owner_user_id: Uuid) -> bool {
        match self {
            AccessScope::Owner(id) => *id == owner_user_id,
            AccessScope::Unrestricted => true,
        }
    }
}

/// The authenticated caller, placed in request extensions by the auth gate.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: String,
    pub access_token: String,
    pub scope: AccessScope,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(AppError::Unauthorized),
        )
    }
}

pub fn access_cookie(token: &str) -> Cookie<'static> {
    session_cookie(ACCESS_COOKIE, token, ACCESS_MAX_AGE_SECS)
}

pub fn refresh_cookie(token: &str) -> Cookie<'static> {
    session_cookie(REFRESH_COOKIE, token, REFRESH_MAX_AGE_SECS)
}

fn session_cookie(name: &'static str, value: &str, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_is_unrestricted_only_for_test_account() {
        let me = Uuid::new_v4();
        assert_eq!(AccessScope::resolve(me, None), AccessScope::Owner(me));
        assert_eq!(AccessScope::resolve(me, Some(Uuid::new_v4())), AccessScope::Owner(me));
        assert_eq!(AccessScope::resolve(me, Some(me)), AccessScope::Unrestricted);
    }

    #[test]
    fn owner_filter_and_permits() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = AccessScope::Owner(me);
        assert_eq!(scope.owner_filter(), Some(me));
        assert!(scope.permits(me));
        assert!(!scope.permits(other));
        assert_eq!(AccessScope::Unrestricted.owner_filter(), None);
        assert!(AccessScope::Unrestricted.permits(other));
    }

    #[test]
    fn cookies_are_http_only_lax() {
        let cookie = access_cookie("abc");
        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
        assert_eq!(refresh_cookie("r").max_age(), Some(Duration::seconds(604_800)));
    }
}
