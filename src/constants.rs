/// Error codes returned in HTTP error bodies.
/// These are stable strings clients match on, so never reword them.

// Shared across every area
pub const EMAIL_ALREADY_EXISTS: &str = "EMAIL_ALREADY_EXISTS";
pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
// Bad passwords deliberately report the same code as unknown users
pub const INVALID_PASSWORD: &str = USER_NOT_FOUND;
pub const SOMETHING_WENT_WRONG: &str = "SOMETHING_WENT_WRONG";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const YOU_ARE_NOT_ALLOWED_TO_MANAGE_THIS_RESOURCE: &str =
    "YOU_ARE_NOT_ALLOWED_TO_MANAGE_THIS_RESOURCE";
pub const YOU_ARE_NOT_AUTHORIZED_TO_PERFORM_THIS_ACTION: &str =
    "YOU_ARE_NOT_AUTHORIZED_TO_PERFORM_THIS_ACTION";
pub const PASSWORD_HAS_BEEN_USED_RECENTLY: &str = "PASSWORD_HAS_BEEN_USED_RECENTLY";
pub const PASSWORD_TOO_SHORT: &str =
    "Password must be minimum 8 characters long and contain at least one letter and one number";
pub const PASSWORDS_DO_NOT_MATCH: &str = "PASSWORDS_DO_NOT_MATCH";
pub const INVALID_PHONE_NUMBER: &str = "INVALID_PHONE_NUMBER";
pub const INVALID_EMAIL: &str = "INVALID_EMAIL";
pub const INVALID_LENGTH: &str = "INVALID_LENGTH";
pub const REQUIRED_FIELD: &str = "REQUIRED_FIELD";
pub const INVALID_TIME_FORMAT: &str = "INVALID_TIME_FORMAT";
pub const INVALID_ROLE: &str = "INVALID_ROLE";
pub const END_DATE_MUST_BE_AFTER_START_DATE: &str = "END_DATE_MUST_BE_AFTER_START_DATE";

// Doctors
pub const DOCTOR_NOT_FOUND: &str = "DOCTOR_NOT_FOUND";
pub const DOCTOR_ALREADY_EXISTS: &str = "DOCTOR_ALREADY_EXISTS";

// Patients
pub const PATIENT_NOT_FOUND: &str = "PATIENT_NOT_FOUND";
pub const PATIENT_ALREADY_EXISTS: &str = "PATIENT_ALREADY_EXISTS";

// Appointments
pub const APPOINTMENT_NOT_FOUND: &str = "APPOINTMENT_NOT_FOUND";
pub const APPOINTMENT_DATE_TIME_MUST_BE_IN_FUTURE: &str =
    "APPOINTMENT_DATE_TIME_MUST_BE_IN_FUTURE";
pub const APPOINTMENT_ALREADY_SCHEDULED_FOR_THIS_TIME: &str =
    "APPOINTMENT_ALREADY_SCHEDULED_FOR_THIS_TIME";
pub const APPOINTMENT_NOT_EDITABLE: &str = "APPOINTMENT_NOT_EDITABLE";
pub const INVALID_APPOINTMENT_STATUS_TRANSITION: &str = "INVALID_APPOINTMENT_STATUS_TRANSITION";

// Prescriptions
pub const PRESCRIPTION_NOT_FOUND: &str = "PRESCRIPTION_NOT_FOUND";

// Medical histories
pub const MEDICAL_HISTORY_NOT_FOUND: &str = "MEDICAL_HISTORY_NOT_FOUND";
pub const MEDICAL_HISTORY_RECORD_ALREADY_EXISTS: &str = "MEDICAL_HISTORY_RECORD_ALREADY_EXISTS";

/// Document store collection names
pub const STAFF_COLLECTION: &str = "staff";
pub const DOCTORS_COLLECTION: &str = "doctors";
pub const PATIENTS_COLLECTION: &str = "patients";
pub const APPOINTMENTS_COLLECTION: &str = "appointments";
pub const PRESCRIPTIONS_COLLECTION: &str = "prescriptions";
pub const MEDICAL_HISTORIES_COLLECTION: &str = "medical_histories";

/// Versioned API prefix
pub const API_PREFIX: &str = "/api/v1";

/// Pagination defaults
pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

/// Fields stripped from every HTTP response body
pub const SENSITIVE_FIELDS: &[&str] = &["password", "refresh_token"];
