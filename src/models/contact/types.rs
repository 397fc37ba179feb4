use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::validate::{Validate, validate_one_of, validate_optional, validate_present};
use crate::models::double_option;

pub const CONTACT_TYPES: [&str; 2] = ["person", "corporation"];
pub const PRIVACY_REASON_TYPES: [&str; 2] = ["personal_info", "other"];

/// A donor, payee or other counterparty referenced by journals.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub contact_type: String,
    pub name: String,
    pub address: Option<String>,
    pub occupation: Option<String>,
    pub is_name_private: bool,
    pub is_address_private: bool,
    pub is_occupation_private: bool,
    pub privacy_reason_type: Option<String>,
    pub privacy_reason_other: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shown in the contact picker.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactSummary {
    pub id: Uuid,
    pub name: String,
    pub contact_type: String,
    pub address: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContact {
    pub contact_type: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub occupation: Option<String>,
    #[serde(default)]
    pub is_name_private: bool,
    #[serde(default)]
    pub is_address_private: bool,
    #[serde(default)]
    pub is_occupation_private: bool,
    pub privacy_reason_type: Option<String>,
    pub privacy_reason_other: Option<String>,
}

impl Validate for NewContact {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate_one_of(self.contact_type.as_deref(), "contact_type", &CONTACT_TYPES));
        errors.extend(validate_present(self.name.as_deref(), "Name", 200));
        errors.extend(validate_optional(self.address.as_deref(), "Address", 500));
        errors.extend(validate_optional(self.occupation.as_deref(), "Occupation", 200));
        if let Some(reason) = self.privacy_reason_type.as_deref().filter(|r| !r.is_empty()) {
            errors.extend(validate_one_of(Some(reason), "privacy_reason_type", &PRIVACY_REASON_TYPES));
        }
        errors
    }
}

/// Partial update. For nullable columns an explicit `null` clears the value
/// while an absent key leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    pub contact_type: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub occupation: Option<Option<String>>,
    pub is_name_private: Option<bool>,
    pub is_address_private: Option<bool>,
    pub is_occupation_private: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub privacy_reason_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub privacy_reason_other: Option<Option<String>>,
}

impl Validate for ContactUpdate {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(kind) = self.contact_type.as_deref() {
            errors.extend(validate_one_of(Some(kind), "contact_type", &CONTACT_TYPES));
        }
        if let Some(name) = self.name.as_deref() {
            errors.extend(validate_present(Some(name), "Name", 200));
        }
        if let Some(Some(reason)) = self.privacy_reason_type.as_ref() {
            errors.extend(validate_one_of(Some(reason), "privacy_reason_type", &PRIVACY_REASON_TYPES));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_contact_requires_type_and_name() {
        let input = NewContact::default();
        let errors = input.validation_errors();
        assert_eq!(errors.len(), 2);

        let input = NewContact {
            contact_type: Some("company".into()),
            name: Some("ACME".into()),
            ..Default::default()
        };
        assert_eq!(input.validation_errors().len(), 1);
    }

    #[test]
    fn privacy_reason_must_be_known() {
        let input = NewContact {
            contact_type: Some("person".into()),
            name: Some("Yamada".into()),
            privacy_reason_type: Some("shy".into()),
            ..Default::default()
        };
        assert_eq!(input.validation_errors().len(), 1);
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: ContactUpdate =
            serde_json::from_str(r#"{"address": null, "occupation": "Farmer"}"#).unwrap();
        assert_eq!(update.address, Some(None));
        assert_eq!(update.occupation, Some(Some("Farmer".to_string())));
        assert_eq!(update.privacy_reason_other, None);
        assert!(update.validation_errors().is_empty());
    }
}
