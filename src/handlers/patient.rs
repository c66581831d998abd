//! Routes for patients under `/patient`. Everything here is scoped to the
//! authenticated patient's own records.

use crate::app::{ModuleRegistry, Scope};
use crate::auth::{Auth, AuthPatient};
use crate::domain::{Appointment, MedicalHistory, Patient, Prescription};
use crate::error::{ClinicError, Result};
use crate::handlers::account;
use crate::handlers::extract::{Params, PathParam};
use crate::repository::Page;
use crate::types::{AppointmentSearch, MedicalHistorySearch, PageParams, PrescriptionSearch};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

type AppState = State<Arc<ModuleRegistry>>;

fn own_scope(patient: &Patient) -> Result<Scope> {
    patient
        .id
        .map(Scope::Patient)
        .ok_or_else(|| ClinicError::Internal("authenticated patient has no id".to_string()))
}

async fn list_appointments(
    State(registry): AppState,
    Auth(patient): AuthPatient,
    Params(page): Params<PageParams>,
    Params(search): Params<AppointmentSearch>,
) -> Result<Json<Page<Appointment>>> {
    Ok(Json(registry.appointments().find_all(own_scope(&patient)?, page, search).await?))
}

async fn get_appointment(
    State(registry): AppState,
    Auth(patient): AuthPatient,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Appointment>> {
    Ok(Json(registry.appointments().get_scoped(id, own_scope(&patient)?).await?))
}

async fn cancel_appointment(
    State(registry): AppState,
    Auth(patient): AuthPatient,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Appointment>> {
    Ok(Json(registry.appointments().cancel(id, own_scope(&patient)?).await?))
}

async fn list_prescriptions(
    State(registry): AppState,
    Auth(patient): AuthPatient,
    Params(page): Params<PageParams>,
    Params(search): Params<PrescriptionSearch>,
) -> Result<Json<Page<Prescription>>> {
    Ok(Json(registry.prescriptions().find_all(own_scope(&patient)?, page, search).await?))
}

async fn get_prescription(
    State(registry): AppState,
    Auth(patient): AuthPatient,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Prescription>> {
    Ok(Json(registry.prescriptions().get_scoped(id, own_scope(&patient)?).await?))
}

async fn list_medical_histories(
    State(registry): AppState,
    Auth(patient): AuthPatient,
    Params(page): Params<PageParams>,
    Params(search): Params<MedicalHistorySearch>,
) -> Result<Json<Page<MedicalHistory>>> {
    Ok(Json(registry.medical_histories().find_all(own_scope(&patient)?, page, search).await?))
}

async fn get_medical_history(
    State(registry): AppState,
    Auth(patient): AuthPatient,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<MedicalHistory>> {
    Ok(Json(registry.medical_histories().get_scoped(id, own_scope(&patient)?).await?))
}

pub fn routes() -> Router<Arc<ModuleRegistry>> {
    let appointments = Router::new()
        .route("/", get(list_appointments))
        .route("/:id", get(get_appointment))
        .route("/:id/cancel", post(cancel_appointment));

    let prescriptions = Router::new()
        .route("/", get(list_prescriptions))
        .route("/:id", get(get_prescription));

    let histories = Router::new()
        .route("/", get(list_medical_histories))
        .route("/:id", get(get_medical_history));

    Router::new()
        .nest("/account", account::routes::<Patient>())
        .nest("/appointment", appointments)
        .nest("/prescription", prescriptions)
        .nest("/medical-history", histories)
}
