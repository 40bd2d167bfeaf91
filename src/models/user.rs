use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub cin: String,
    pub governorate: String,
    pub phone: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub driver_license: Option<String>,
    pub vehicle_matricule: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Driver capability is derived from field presence, not stored: a user
    /// counts as a driver exactly when both credentials are on file.
    pub fn is_driver(&self) -> bool {
        self.driver_license.is_some() && self.vehicle_matricule.is_some()
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            profile_image: self.profile_image.clone(),
            is_driver: self.is_driver(),
        }
    }

    /// Extended profile shown to a ride creator inspecting a passenger.
    pub fn to_authorized(&self) -> AuthorizedUser {
        AuthorizedUser {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            profile_image: self.profile_image.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            governorate: self.governorate.clone(),
            is_driver: self.is_driver(),
            driver_license: self.driver_license.clone(),
            vehicle_matricule: self.vehicle_matricule.clone(),
            created_at: self.created_at,
        }
    }
}

/// Profile visible to anyone browsing rides.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub is_driver: bool,
}

/// Profile including contact details, creator-only.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizedUser {
    pub id: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub email: String,
    pub phone: String,
    pub governorate: String,
    pub is_driver: bool,
    pub driver_license: Option<String>,
    pub vehicle_matricule: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u1".into(),
            full_name: "Amira Ben Salah".into(),
            cin: "01234567".into(),
            governorate: "Sousse".into(),
            phone: "+216 20 000 000".into(),
            email: "amira@example.tn".into(),
            profile_image: None,
            driver_license: None,
            vehicle_matricule: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn driver_capability_needs_both_credentials() {
        let mut u = user();
        assert!(!u.is_driver());
        u.driver_license = Some("L-123".into());
        assert!(!u.is_driver());
        u.vehicle_matricule = Some("200 TU 1234".into());
        assert!(u.is_driver());
    }
}
