//! Shared types - entities stored in the clinic datastore
//!
//! Every entity serializes with camelCase keys, both on disk and on the wire.

use serde::{Serialize, Deserialize};

/// Clinician account
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    /// Salted PBKDF2 hash, or a legacy plaintext value from the seed
    pub password: String,
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
}

/// User as returned by the API (no password)
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            name: u.name.clone(),
            role: u.role.clone(),
            email: u.email.clone(),
            image: u.image.clone(),
            created_at: u.created_at.clone(),
            last_login_at: u.last_login_at.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: u64,
    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhaar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
}

/// Normalized patient fields produced by `validation::validate_patient`
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientInput {
    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
}

impl Patient {
    pub fn from_input(id: u64, input: PatientInput) -> Self {
        Self {
            id,
            full_name: input.full_name,
            age: input.age,
            gender: input.gender,
            phone: input.phone,
            address: input.address,
            aadhaar: input.aadhaar,
            mrn: input.mrn,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConsultationStatus {
    Draft,
    Final,
    #[serde(rename = "In Progress")]
    InProgress,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: u64,
    /// Not checked against the patients collection
    pub patient_id: u64,
    pub started_at: String,
    pub status: ConsultationStatus,
    pub summary: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    M,
    F,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    pub initials: String,
    pub name: String,
    pub dob: String,
    pub age: u32,
    pub sex: Sex,
    pub date: String,
    pub duration: String,
    pub clinician: String,
    pub summary: String,
    #[serde(default)]
    pub hpi: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuestAttempt {
    pub id: u64,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClinicalInsight {
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// The whole JSON document
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub users: Vec<User>,
    pub patients: Vec<Patient>,
    pub consultations: Vec<Consultation>,
    pub guest_attempts: Vec<GuestAttempt>,
    pub recordings: Vec<Recording>,
    pub clinical_insights: Vec<ClinicalInsight>,
}

/// Top-level keys of the persisted document, in write order
pub const COLLECTIONS: [&str; 6] = [
    "users",
    "patients",
    "consultations",
    "guestAttempts",
    "recordings",
    "clinicalInsights",
];

impl Database {
    /// Record count per collection, keyed like the document
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("users", self.users.len()),
            ("patients", self.patients.len()),
            ("consultations", self.consultations.len()),
            ("guestAttempts", self.guest_attempts.len()),
            ("recordings", self.recordings.len()),
            ("clinicalInsights", self.clinical_insights.len()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_optional_fields_omitted() {
        let p = Patient {
            id: 1,
            full_name: "A B".to_string(),
            age: 40,
            gender: "F".to_string(),
            phone: "9876543210".to_string(),
            address: None,
            aadhaar: None,
            mrn: Some("MRN-1".to_string()),
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["fullName"], "A B");
        assert!(v.get("address").is_none());
        assert_eq!(v["mrn"], "MRN-1");
    }

    #[test]
    fn test_consultation_status_wire_names() {
        let s: ConsultationStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(s, ConsultationStatus::InProgress);
        assert_eq!(serde_json::to_string(&ConsultationStatus::Final).unwrap(), "\"Final\"");
    }

    #[test]
    fn test_public_user_hides_password() {
        let u = User {
            id: 7,
            username: "dr.rao".to_string(),
            password: "secret".to_string(),
            name: "Dr Rao".to_string(),
            role: "Cardiology".to_string(),
            email: None,
            image: None,
            created_at: None,
            last_login_at: None,
        };
        let v = serde_json::to_value(PublicUser::from(&u)).unwrap();
        assert!(v.get("password").is_none());
        assert_eq!(v["username"], "dr.rao");
    }
}
