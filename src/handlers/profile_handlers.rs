use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::client::AuthClient;
use crate::auth::session::AuthUser;
use crate::auth::validate::{Validate, validate_present};
use crate::errors::AppError;
use crate::handlers::ok;

#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
}

impl Validate for ProfileUpdate {
    fn validation_errors(&self) -> Vec<String> {
        validate_present(self.display_name.as_deref(), "Display name", 100)
            .into_iter()
            .collect()
    }
}

/// GET /api/profile
pub async fn read(user: AuthUser) -> Result<HttpResponse, AppError> {
    Ok(ok(Profile {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
    }))
}

/// PUT /api/profile - Store the display name as `full_name` on the identity record
pub async fn update(
    auth: web::Data<AuthClient>,
    user: AuthUser,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let name = body.display_name.as_deref().unwrap_or_default().trim();

    let record = auth
        .update_user_metadata(&user.access_token, json!({ "full_name": name }))
        .await?;
    log::info!("Profile of {} updated", user.id);

    Ok(ok(Profile {
        id: record.id,
        email: record.email,
        display_name: name.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_required() {
        assert!(ProfileUpdate { display_name: Some("  ".into()) }.validate().is_err());
        assert!(ProfileUpdate { display_name: None }.validate().is_err());
        assert!(ProfileUpdate { display_name: Some("Hanako".into()) }.validate().is_ok());
    }
}
