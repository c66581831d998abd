//! Routes for doctors under `/doctor`.

use crate::app::{ModuleRegistry, Scope};
use crate::auth::{Auth, AuthDoctor};
use crate::domain::{Appointment, Doctor, MedicalHistory, Patient, Prescription};
use crate::error::{ClinicError, Result};
use crate::handlers::account;
use crate::handlers::extract::{Payload, Params, PathParam};
use crate::handlers::response::Sanitized;
use crate::repository::Page;
use crate::types::{
    AppointmentSearch, CreateAppointmentRequest, CreateMedicalHistoryRequest, CreatePrescriptionRequest,
    MedicalHistorySearch, PageParams, PatientSearch, PrescriptionSearch, UpdateAppointmentRequest,
    UpdateMedicalHistoryRequest, UpdatePrescriptionRequest,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

type AppState = State<Arc<ModuleRegistry>>;

fn doctor_id(doctor: &Doctor) -> Result<Uuid> {
    doctor
        .id
        .ok_or_else(|| ClinicError::Internal("authenticated doctor has no id".to_string()))
}

// ---- Appointments ----

async fn create_appointment(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    Payload(request): Payload<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>)> {
    let appointment = registry.appointments().create(doctor_id(&doctor)?, request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn list_appointments(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    Params(page): Params<PageParams>,
    Params(search): Params<AppointmentSearch>,
) -> Result<Json<Page<Appointment>>> {
    let scope = Scope::Doctor(doctor_id(&doctor)?);
    Ok(Json(registry.appointments().find_all(scope, page, search).await?))
}

async fn get_appointment(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Appointment>> {
    let scope = Scope::Doctor(doctor_id(&doctor)?);
    Ok(Json(registry.appointments().get_scoped(id, scope).await?))
}

async fn update_appointment(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
    Payload(request): Payload<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>> {
    Ok(Json(registry.appointments().update(doctor_id(&doctor)?, id, request).await?))
}

async fn delete_appointment(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Appointment>> {
    Ok(Json(registry.appointments().delete(doctor_id(&doctor)?, id).await?))
}

async fn cancel_appointment(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Appointment>> {
    let scope = Scope::Doctor(doctor_id(&doctor)?);
    Ok(Json(registry.appointments().cancel(id, scope).await?))
}

// ---- Prescriptions ----

async fn create_prescription(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    Payload(request): Payload<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Prescription>)> {
    let prescription = registry.prescriptions().create(doctor_id(&doctor)?, request).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

async fn list_prescriptions(
    State(registry): AppState,
    _: AuthDoctor,
    Params(page): Params<PageParams>,
    Params(search): Params<PrescriptionSearch>,
) -> Result<Json<Page<Prescription>>> {
    Ok(Json(registry.prescriptions().find_all(Scope::All, page, search).await?))
}

async fn get_prescription(
    State(registry): AppState,
    _: AuthDoctor,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Prescription>> {
    Ok(Json(registry.prescriptions().get(id).await?))
}

async fn update_prescription(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
    Payload(request): Payload<UpdatePrescriptionRequest>,
) -> Result<Json<Prescription>> {
    Ok(Json(registry.prescriptions().update(doctor_id(&doctor)?, id, request).await?))
}

async fn delete_prescription(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Prescription>> {
    Ok(Json(registry.prescriptions().delete(doctor_id(&doctor)?, id).await?))
}

// ---- Medical histories ----

async fn create_medical_history(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    Payload(request): Payload<CreateMedicalHistoryRequest>,
) -> Result<(StatusCode, Json<MedicalHistory>)> {
    let history = registry.medical_histories().create(doctor_id(&doctor)?, request).await?;
    Ok((StatusCode::CREATED, Json(history)))
}

async fn list_medical_histories(
    State(registry): AppState,
    _: AuthDoctor,
    Params(page): Params<PageParams>,
    Params(search): Params<MedicalHistorySearch>,
) -> Result<Json<Page<MedicalHistory>>> {
    Ok(Json(registry.medical_histories().find_all(Scope::All, page, search).await?))
}

async fn get_medical_history(
    State(registry): AppState,
    _: AuthDoctor,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<MedicalHistory>> {
    Ok(Json(registry.medical_histories().get(id).await?))
}

async fn update_medical_history(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
    Payload(request): Payload<UpdateMedicalHistoryRequest>,
) -> Result<Json<MedicalHistory>> {
    Ok(Json(registry.medical_histories().update(doctor_id(&doctor)?, id, request).await?))
}

async fn delete_medical_history(
    State(registry): AppState,
    Auth(doctor): AuthDoctor,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<MedicalHistory>> {
    Ok(Json(registry.medical_histories().delete(doctor_id(&doctor)?, id).await?))
}

// ---- Patients (read only) ----

async fn list_patients(
    State(registry): AppState,
    _: AuthDoctor,
    Params(page): Params<PageParams>,
    Params(search): Params<PatientSearch>,
) -> Result<Sanitized<Page<Patient>>> {
    Ok(Sanitized(registry.patients().find_all(page, search).await?))
}

async fn get_patient(State(registry): AppState, _: AuthDoctor, PathParam(id): PathParam<Uuid>) -> Result<Sanitized<Value>> {
    Ok(Sanitized(registry.patients().get_detail(id).await?))
}

pub fn routes() -> Router<Arc<ModuleRegistry>> {
    let appointments = Router::new()
        .route("/", post(create_appointment).get(list_appointments))
        .route("/:id", get(get_appointment).patch(update_appointment).delete(delete_appointment))
        .route("/:id/cancel", post(cancel_appointment));

    let prescriptions = Router::new()
        .route("/", post(create_prescription).get(list_prescriptions))
        .route("/:id", get(get_prescription).patch(update_prescription).delete(delete_prescription));

    let histories = Router::new()
        .route("/", post(create_medical_history).get(list_medical_histories))
        .route(
            "/:id",
            get(get_medical_history).patch(update_medical_history).delete(delete_medical_history),
        );

    let patients = Router::new()
        .route("/", get(list_patients))
        .route("/:id", get(get_patient));

    Router::new()
        .nest("/account", account::routes::<Doctor>())
        .nest("/appointment", appointments)
        .nest("/prescription", prescriptions)
        .nest("/medical-history", histories)
        .nest("/patient", patients)
}
