use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants;

/// A record persisted as a JSON document in one collection of the store
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> Option<Uuid>;
    fn set_id(&mut self, id: Uuid);
    fn created_at(&self) -> DateTime<Utc>;
    fn set_created_at(&mut self, at: DateTime<Utc>);
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Record-specific fields accepted by `sort_by`
    const SORT_FIELDS: &'static [&'static str];

    /// True if results of this type can be ordered by `field`. Timestamps
    /// are always sortable.
    fn is_sortable(field: &str) -> bool {
        matches!(field, "created_at" | "updated_at") || Self::SORT_FIELDS.contains(&field)
    }

    /// Value used to order results when sorting by `field`.
    /// `None` means the field is not sortable for this record type.
    fn sort_key(&self, field: &str) -> Option<SortKey>;
}

/// Comparable projection of a single field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl SortKey {
    fn text(value: &str) -> Self {
        SortKey::Text(value.to_lowercase())
    }

    fn opt_text(value: &Option<String>) -> Self {
        SortKey::text(value.as_deref().unwrap_or_default())
    }
}

macro_rules! impl_document {
    ($ty:ty, $collection:expr, |$rec:ident| { $($name:literal => $key:expr),* $(,)? }) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;
            const SORT_FIELDS: &'static [&'static str] = &[$($name),*];

            fn id(&self) -> Option<Uuid> {
                self.id
            }

            fn set_id(&mut self, id: Uuid) {
                self.id = Some(id);
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn set_created_at(&mut self, at: DateTime<Utc>) {
                self.created_at = at;
            }

            fn set_updated_at(&mut self, at: DateTime<Utc>) {
                self.updated_at = at;
            }

            fn sort_key(&self, field: &str) -> Option<SortKey> {
                let $rec = self;
                match field {
                    "created_at" => Some(SortKey::Timestamp($rec.created_at)),
                    "updated_at" => Some(SortKey::Timestamp($rec.updated_at)),
                    $($name => Some($key),)*
                    _ => None,
                }
            }
        }
    };
}

/// The three isolated actor classes. Each has its own token secrets and
/// route namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Administrative,
    Doctor,
    Patient,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Administrative => "administrative",
            Actor::Doctor => "doctor",
            Actor::Patient => "patient",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    SuperAdmin,
    Admin,
    Staff,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::SuperAdmin => "super_admin",
            StaffRole::Admin => "admin",
            StaffRole::Staff => "staff",
        }
    }
}

/// Fields every account record shares. Login, logout, token refresh and
/// password reset are written once against this trait.
pub trait Account: Document {
    const ACTOR: Actor;

    fn username(&self) -> &str;
    fn email(&self) -> &str;
    fn password_hash(&self) -> &str;
    fn set_password_hash(&mut self, hash: String);
    fn refresh_token_hash(&self) -> Option<&str>;
    fn set_refresh_token_hash(&mut self, hash: Option<String>);

    /// Value matched against the login request
    fn login_identifier(&self) -> &str {
        self.username()
    }

    /// True if `identifier` from a login request names this account
    fn matches_login(&self, identifier: &str) -> bool {
        self.login_identifier() == identifier
    }

    fn roles(&self) -> Vec<String> {
        Vec::new()
    }
}

macro_rules! impl_account {
    ($ty:ty, $actor:expr $(, { $($overrides:tt)* })?) => {
        impl Account for $ty {
            const ACTOR: Actor = $actor;

            fn username(&self) -> &str {
                &self.username
            }

            fn email(&self) -> &str {
                &self.email
            }

            fn password_hash(&self) -> &str {
                &self.password
            }

            fn set_password_hash(&mut self, hash: String) {
                self.password = hash;
            }

            fn refresh_token_hash(&self) -> Option<&str> {
                self.refresh_token.as_deref()
            }

            fn set_refresh_token_hash(&mut self, hash: Option<String>) {
                self.refresh_token = hash;
            }

            $($($overrides)*)?
        }
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<StaffRole>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    /// `super_admin` satisfies every role requirement
    pub fn has_role(&self, role: StaffRole) -> bool {
        self.roles.contains(&StaffRole::SuperAdmin) || self.roles.contains(&role)
    }
}

impl_document!(Staff, constants::STAFF_COLLECTION, |s| {
    "username" => SortKey::text(&s.username),
    "email" => SortKey::text(&s.email),
});

impl_account!(Staff, Actor::Administrative, {
    // Staff log in by email, in any letter case
    fn login_identifier(&self) -> &str {
        &self.email
    }

    fn matches_login(&self, identifier: &str) -> bool {
        self.email.eq_ignore_ascii_case(identifier.trim())
    }

    fn roles(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub specialization: String,
    #[serde(default)]
    pub patients: Vec<Uuid>,
    #[serde(default)]
    pub appointments: Vec<Uuid>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_document!(Doctor, constants::DOCTORS_COLLECTION, |d| {
    "username" => SortKey::text(&d.username),
    "first_name" => SortKey::text(&d.first_name),
    "last_name" => SortKey::text(&d.last_name),
    "email" => SortKey::text(&d.email),
    "specialization" => SortKey::text(&d.specialization),
});

impl_account!(Doctor, Actor::Doctor);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub address: Option<String>,
    #[serde(default)]
    pub doctors: Vec<Uuid>,
    #[serde(default)]
    pub appointments: Vec<Uuid>,
    #[serde(default)]
    pub prescriptions: Vec<Uuid>,
    #[serde(default)]
    pub medical_history: Vec<Uuid>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_document!(Patient, constants::PATIENTS_COLLECTION, |p| {
    "username" => SortKey::text(&p.username),
    "first_name" => SortKey::opt_text(&p.first_name),
    "last_name" => SortKey::opt_text(&p.last_name),
    "email" => SortKey::text(&p.email),
    "date_of_birth" => SortKey::Date(p.date_of_birth),
});

impl_account!(Patient, Actor::Patient);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

impl AppointmentStatus {
    /// Only scheduled appointments move; cancelled and completed are final.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Scheduled, AppointmentStatus::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Option<Uuid>,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// Time of day as `HH:MM`
    pub time: String,
    pub reason: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// True if this appointment occupies the given slot for either party
    pub fn occupies_slot(&self, patient_id: Uuid, doctor_id: Uuid, date: NaiveDate, time: &str) -> bool {
        self.status != AppointmentStatus::Cancelled
            && self.date == date
            && self.time == time
            && (self.patient_id == patient_id || self.doctor_id == doctor_id)
    }
}

impl_document!(Appointment, constants::APPOINTMENTS_COLLECTION, |a| {
    "date" => SortKey::Date(a.date),
    "time" => SortKey::text(&a.time),
    "status" => SortKey::text(a.status.as_str()),
    "reason" => SortKey::text(&a.reason),
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Option<Uuid>,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Uuid,
    pub medications: Vec<Medication>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_document!(Prescription, constants::PRESCRIPTIONS_COLLECTION, |p| {
    "start_date" => SortKey::Date(p.start_date),
    "end_date" => SortKey::Date(p.end_date),
    "patient_id" => SortKey::Text(p.patient_id.to_string()),
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub id: Option<Uuid>,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub prescription_id: Uuid,
    pub diagnosis: String,
    pub treatment: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_document!(MedicalHistory, constants::MEDICAL_HISTORIES_COLLECTION, |h| {
    "patient_id" => SortKey::Text(h.patient_id.to_string()),
    "doctor_id" => SortKey::Text(h.doctor_id.to_string()),
    "diagnosis" => SortKey::text(&h.diagnosis),
    "treatment" => SortKey::text(&h.treatment),
});

/// Pushes `id` onto `ids` unless it is already present
pub fn push_unique(ids: &mut Vec<Uuid>, id: Uuid) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
