use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};

use crate::auth::client::{AuthClient, AuthUserRecord, RefreshedSession};
use crate::auth::session::{
    ACCESS_COOKIE, AccessScope, AuthUser, REFRESH_COOKIE, access_cookie, refresh_cookie,
};
use crate::config::AppConfig;
use crate::errors::ApiErrorResponse;

pub const LOGIN_PATH: &str = "/login";
pub const PENDING_REVIEW_PATH: &str = "/pending-review";

const PUBLIC_EXACT: &[&str] = &["/welcome", "/privacy", "/health"];
const PUBLIC_PREFIXES: &[&str] = &[LOGIN_PATH, "/register", PENDING_REVIEW_PATH];
const ASSET_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".svg", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".webp", ".woff", ".woff2",
    ".ttf", ".eot",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    StaticAsset,
    Public,
    Protected,
}

pub fn classify_path(path: &str) -> PathClass {
    if path.starts_with("/static/") || path.starts_with("/_fresh/") {
        return PathClass::StaticAsset;
    }
    let lower = path.to_ascii_lowercase();
    if ASSET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return PathClass::StaticAsset;
    }
    if PUBLIC_EXACT.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return PathClass::Public;
    }
    PathClass::Protected
}

/// `Location` for an unauthenticated page request.
pub fn login_location(path: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("{LOGIN_PATH}?redirect={encoded}")
}

fn unauthenticated(path: &str) -> HttpResponse {
    if path.starts_with("/api/") {
        HttpResponse::Unauthorized().json(ApiErrorResponse {
            error: "Unauthorized".to_string(),
            details: None,
        })
    } else {
        HttpResponse::Found()
            .insert_header(("Location", login_location(path)))
            .finish()
    }
}

/// Resolve the session behind the request cookies, refreshing once if the
/// access token is rejected.
async fn resolve_session(
    auth: &AuthClient,
    access: Option<String>,
    refresh: Option<String>,
) -> Option<(AuthUserRecord, String, Option<RefreshedSession>)> {
    if let Some(token) = access {
        match auth.get_user(&token).await {
            Ok(user) => return Some((user, token, None)),
            Err(e) => log::debug!("Access token rejected: {e}"),
        }
    }

    let refresh = refresh?;
    match auth.refresh_session(&refresh).await {
        Ok(session) => {
            let user = session.user.clone();
            let token = session.access_token.clone();
            Some((user, token, Some(session)))
        }
        Err(e) => {
            log::info!("Session refresh failed: {e}");
            None
        }
    }
}

/// Middleware function gating every non-public request on a valid session.
///
/// Page requests without a session are redirected to the login page with the
/// original path preserved; `/api/` requests receive a 401 JSON body.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let path = req.path().to_string();
    if classify_path(&path) != PathClass::Protected {
        return next.call(req).await.map(|res| res.map_into_left_body());
    }

    let Some(auth) = req.app_data::<web::Data<AuthClient>>().cloned() else {
        log::error!("AuthClient missing from app data; rejecting {path}");
        return Ok(req
            .into_response(HttpResponse::InternalServerError().finish())
            .map_into_right_body());
    };
    let test_account = req
        .app_data::<web::Data<AppConfig>>()
        .and_then(|cfg| cfg.test_account());

    let access = req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string());
    let refresh = req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string());

    let Some((record, access_token, refreshed)) = resolve_session(&auth, access, refresh).await
    else {
        let response = unauthenticated(&path);
        return Ok(req.into_response(response).map_into_right_body());
    };

    if record.registration_status() == Some("pending_review")
        && !path.starts_with(PENDING_REVIEW_PATH)
    {
        let response = HttpResponse::Found()
            .insert_header(("Location", PENDING_REVIEW_PATH))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    }

    req.extensions_mut().insert(AuthUser {
        id: record.id,
        email: record.email.clone(),
        display_name: record.display_name(),
        access_token,
        scope: AccessScope::resolve(record.id, test_account),
    });

    let mut res = next.call(req).await?;
    if let Some(session) = refreshed {
        let cookies = [
            access_cookie(&session.access_token),
            refresh_cookie(&session.refresh_token),
        ];
        for cookie in &cookies {
            if let Err(e) = res.response_mut().add_cookie(cookie) {
                log::warn!("Failed to reissue session cookie: {e}");
            }
        }
    }
    Ok(res.map_into_left_body())
}
