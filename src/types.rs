//! Request bodies and query parameters accepted by the HTTP layer.

use crate::constants;
use crate::domain::{
    Actor, Appointment, AppointmentStatus, Doctor, MedicalHistory, Medication, Patient, Prescription, StaffRole,
};
use crate::error::{ClinicError, Result};
use crate::repository::FindQuery;
use crate::validation;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_text(value: &str, filter: &Option<String>) -> bool {
    filter.as_deref().map_or(true, |needle| contains_ignore_case(value, needle))
}

fn matches_opt_text(value: &Option<String>, filter: &Option<String>) -> bool {
    match filter {
        Some(needle) => value.as_deref().is_some_and(|v| contains_ignore_case(v, needle)),
        None => true,
    }
}

fn matches_eq<T: PartialEq>(value: &T, filter: &Option<T>) -> bool {
    filter.as_ref().map_or(true, |expected| value == expected)
}

fn validate_optional(value: &Option<String>, check: impl Fn(&str) -> Result<()>) -> Result<()> {
    match value {
        Some(v) => check(v),
        None => Ok(()),
    }
}

// ---- Accounts ----

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    /// Staff sign in with their email, doctors and patients with their username
    pub fn identifier(&self, actor: Actor) -> Result<&str> {
        let (field, value) = match actor {
            Actor::Administrative => ("email", &self.email),
            Actor::Doctor | Actor::Patient => ("username", &self.username),
        };
        let value = value.as_deref().map(str::trim).unwrap_or_default();
        validation::required(field, value)?;
        validation::required("password", &self.password)?;
        Ok(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<()> {
        validation::email(&self.email)?;
        validation::password("password", &self.password)?;
        validation::passwords_match(&self.password, &self.confirm_password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaffRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub roles: Vec<StaffRole>,
}

impl CreateStaffRequest {
    pub fn validate(&self) -> Result<()> {
        validation::required("username", &self.username)?;
        validation::length("username", &self.username, 2, None)?;
        validation::email(&self.email)?;
        validation::password("password", &self.password)?;
        validation::passwords_match(&self.password, &self.confirm_password)?;
        if self.roles.is_empty() {
            return Err(ClinicError::Validation { field: "roles", code: constants::REQUIRED_FIELD });
        }
        // super_admin only comes from seeding
        if self.roles.contains(&StaffRole::SuperAdmin) {
            return Err(ClinicError::Validation { field: "roles", code: constants::INVALID_ROLE });
        }
        Ok(())
    }
}

// ---- Doctors ----

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDoctorRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub specialization: String,
}

impl RegisterDoctorRequest {
    pub fn validate(&self) -> Result<()> {
        validation::username(&self.username)?;
        validation::email(&self.email)?;
        validation::password("password", &self.password)?;
        validation::passwords_match(&self.password, &self.confirm_password)?;
        validation::required("first_name", &self.first_name)?;
        validation::required("last_name", &self.last_name)?;
        validation::phone_number(&self.phone_number)?;
        validation::required("specialization", &self.specialization)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctorRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub specialization: Option<String>,
}

impl UpdateDoctorRequest {
    pub fn validate(&self) -> Result<()> {
        validate_optional(&self.username, validation::username)?;
        validate_optional(&self.email, validation::email)?;
        validate_optional(&self.first_name, |v| validation::required("first_name", v))?;
        validate_optional(&self.last_name, |v| validation::required("last_name", v))?;
        validate_optional(&self.phone_number, validation::phone_number)?;
        validate_optional(&self.specialization, |v| validation::required("specialization", v))
    }

    pub fn apply(self, doctor: &mut Doctor) {
        if let Some(username) = self.username {
            doctor.username = username;
        }
        if let Some(email) = self.email {
            doctor.email = email;
        }
        if let Some(first_name) = self.first_name {
            doctor.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            doctor.last_name = last_name;
        }
        if let Some(phone_number) = self.phone_number {
            doctor.phone_number = phone_number;
        }
        if let Some(specialization) = self.specialization {
            doctor.specialization = specialization;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub phone_number: Option<String>,
}

impl DoctorSearch {
    pub fn matches(&self, doctor: &Doctor) -> bool {
        matches_text(&doctor.username, &self.username)
            && matches_text(&doctor.first_name, &self.first_name)
            && matches_text(&doctor.last_name, &self.last_name)
            && matches_text(&doctor.email, &self.email)
            && matches_text(&doctor.specialization, &self.specialization)
            && matches_text(&doctor.phone_number, &self.phone_number)
    }
}

// ---- Patients ----

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPatientRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub address: Option<String>,
}

impl RegisterPatientRequest {
    pub fn validate(&self) -> Result<()> {
        validation::username(&self.username)?;
        validation::email(&self.email)?;
        validation::password("password", &self.password)?;
        validation::passwords_match(&self.password, &self.confirm_password)?;
        validation::phone_number(&self.phone_number)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

impl UpdatePatientRequest {
    pub fn validate(&self) -> Result<()> {
        validate_optional(&self.username, validation::username)?;
        validate_optional(&self.email, validation::email)?;
        validate_optional(&self.phone_number, validation::phone_number)
    }

    pub fn apply(self, patient: &mut Patient) {
        if let Some(username) = self.username {
            patient.username = username;
        }
        if let Some(email) = self.email {
            patient.email = email;
        }
        if self.first_name.is_some() {
            patient.first_name = self.first_name;
        }
        if self.last_name.is_some() {
            patient.last_name = self.last_name;
        }
        if let Some(phone_number) = self.phone_number {
            patient.phone_number = phone_number;
        }
        if let Some(date_of_birth) = self.date_of_birth {
            patient.date_of_birth = date_of_birth;
        }
        if self.address.is_some() {
            patient.address = self.address;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientSearch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl PatientSearch {
    pub fn matches(&self, patient: &Patient) -> bool {
        matches_text(&patient.username, &self.username)
            && matches_opt_text(&patient.first_name, &self.first_name)
            && matches_opt_text(&patient.last_name, &self.last_name)
            && matches_text(&patient.email, &self.email)
            && matches_text(&patient.phone_number, &self.phone_number)
    }
}

// ---- Appointments ----

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
}

impl CreateAppointmentRequest {
    pub fn validate(&self) -> Result<()> {
        validation::time_of_day(&self.time)?;
        validation::required("reason", &self.reason)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub reason: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn validate(&self) -> Result<()> {
        validate_optional(&self.time, |t| validation::time_of_day(t).map(|_| ()))?;
        validate_optional(&self.reason, |r| validation::required("reason", r))
    }

    /// True if applying this update moves the appointment to another slot
    pub fn changes_slot(&self, current: &Appointment) -> bool {
        self.patient_id.is_some_and(|p| p != current.patient_id)
            || self.date.is_some_and(|d| d != current.date)
            || self.time.as_ref().is_some_and(|t| *t != current.time)
    }

    pub fn apply(self, appointment: &mut Appointment) {
        if let Some(patient_id) = self.patient_id {
            appointment.patient_id = patient_id;
        }
        if let Some(date) = self.date {
            appointment.date = date;
        }
        if let Some(time) = self.time {
            appointment.time = time;
        }
        if let Some(reason) = self.reason {
            appointment.reason = reason;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearch {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

impl AppointmentSearch {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        matches_eq(&appointment.patient_id, &self.patient_id)
            && matches_eq(&appointment.doctor_id, &self.doctor_id)
            && matches_eq(&appointment.status, &self.status)
            && matches_eq(&appointment.date, &self.date)
    }
}

// ---- Prescriptions ----

fn validate_medications(medications: &[Medication]) -> Result<()> {
    if medications.is_empty() {
        return Err(ClinicError::Validation { field: "medications", code: constants::REQUIRED_FIELD });
    }
    for item in medications {
        validation::required("medication", &item.medication)?;
        validation::required("dosage", &item.dosage)?;
        validation::required("frequency", &item.frequency)?;
    }
    Ok(())
}

pub fn validate_date_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
    if end_date < start_date {
        return Err(ClinicError::bad_request(constants::END_DATE_MUST_BE_AFTER_START_DATE));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    pub appointment_id: Uuid,
    pub medications: Vec<Medication>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CreatePrescriptionRequest {
    pub fn validate(&self) -> Result<()> {
        validate_medications(&self.medications)?;
        validate_date_range(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub patient_id: Option<Uuid>,
    pub medications: Option<Vec<Medication>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl UpdatePrescriptionRequest {
    pub fn validate(&self) -> Result<()> {
        match &self.medications {
            Some(medications) => validate_medications(medications),
            None => Ok(()),
        }
    }

    pub fn apply(self, prescription: &mut Prescription) {
        if let Some(patient_id) = self.patient_id {
            prescription.patient_id = patient_id;
        }
        if let Some(medications) = self.medications {
            prescription.medications = medications;
        }
        if let Some(start_date) = self.start_date {
            prescription.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            prescription.end_date = end_date;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionSearch {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub medication: Option<String>,
    /// Prescriptions starting on or after this day
    pub start_date: Option<NaiveDate>,
    /// Prescriptions ending on or before this day
    pub end_date: Option<NaiveDate>,
}

impl PrescriptionSearch {
    pub fn matches(&self, prescription: &Prescription) -> bool {
        matches_eq(&prescription.patient_id, &self.patient_id)
            && matches_eq(&prescription.doctor_id, &self.doctor_id)
            && self.medication.as_deref().map_or(true, |needle| {
                prescription.medications.iter().any(|m| contains_ignore_case(&m.medication, needle))
            })
            && self.start_date.map_or(true, |start| prescription.start_date >= start)
            && self.end_date.map_or(true, |end| prescription.end_date <= end)
    }
}

// ---- Medical histories ----

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicalHistoryRequest {
    pub patient_id: Uuid,
    pub prescription_id: Uuid,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: Option<String>,
}

impl CreateMedicalHistoryRequest {
    pub fn validate(&self) -> Result<()> {
        validation::required("diagnosis", &self.diagnosis)?;
        validation::required("treatment", &self.treatment)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMedicalHistoryRequest {
    pub patient_id: Option<Uuid>,
    pub prescription_id: Option<Uuid>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

impl UpdateMedicalHistoryRequest {
    pub fn validate(&self) -> Result<()> {
        validate_optional(&self.diagnosis, |v| validation::required("diagnosis", v))?;
        validate_optional(&self.treatment, |v| validation::required("treatment", v))
    }

    pub fn apply(self, history: &mut MedicalHistory) {
        if let Some(patient_id) = self.patient_id {
            history.patient_id = patient_id;
        }
        if let Some(prescription_id) = self.prescription_id {
            history.prescription_id = prescription_id;
        }
        if let Some(diagnosis) = self.diagnosis {
            history.diagnosis = diagnosis;
        }
        if let Some(treatment) = self.treatment {
            history.treatment = treatment;
        }
        if let Some(notes) = self.notes {
            history.notes = notes;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalHistorySearch {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
}

impl MedicalHistorySearch {
    pub fn matches(&self, history: &MedicalHistory) -> bool {
        matches_eq(&history.patient_id, &self.patient_id)
            && matches_eq(&history.doctor_id, &self.doctor_id)
            && matches_text(&history.diagnosis, &self.diagnosis)
            && matches_text(&history.treatment, &self.treatment)
    }
}

// ---- Paging ----

/// `?limit=&skip=&sort_by=&order=` shared by every list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub sort_by: Option<String>,
    pub order: Option<i32>,
}

impl PageParams {
    pub fn validate(&self) -> Result<()> {
        match self.order {
            None | Some(1) | Some(-1) => Ok(()),
            Some(_) => Err(ClinicError::bad_request("order must be 1 or -1")),
        }
    }

    pub fn into_query<T>(self) -> Result<FindQuery<T>> {
        self.validate()?;
        Ok(FindQuery::default().page(self.skip, self.limit).sort(self.sort_by, self.order))
    }
}
