//! Routes for clinic staff under `/administrative`.

use crate::app::{ModuleRegistry, Scope};
use crate::auth::{require_role, Auth, AuthStaff};
use crate::domain::{Appointment, Doctor, Patient, Staff, StaffRole};
use crate::error::Result;
use crate::handlers::account;
use crate::handlers::extract::{Payload, Params, PathParam};
use crate::handlers::response::{Created, Sanitized};
use crate::repository::Page;
use crate::types::{
    AppointmentSearch, CreateStaffRequest, DoctorSearch, PageParams, PatientSearch, RegisterDoctorRequest,
    RegisterPatientRequest, UpdateDoctorRequest, UpdatePatientRequest,
};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

type AppState = State<Arc<ModuleRegistry>>;

// ---- Staff ----

async fn create_staff(
    State(registry): AppState,
    Auth(staff): AuthStaff,
    Payload(request): Payload<CreateStaffRequest>,
) -> Result<Created<Staff>> {
    require_role(&staff, StaffRole::SuperAdmin)?;
    Ok(Created(registry.staff().create(request).await?))
}

// ---- Doctors ----

async fn list_doctors(
    State(registry): AppState,
    _: AuthStaff,
    Params(page): Params<PageParams>,
    Params(search): Params<DoctorSearch>,
) -> Result<Sanitized<Page<Doctor>>> {
    Ok(Sanitized(registry.doctors().find_all(page, search).await?))
}

async fn get_doctor(State(registry): AppState, _: AuthStaff, PathParam(id): PathParam<Uuid>) -> Result<Sanitized<Doctor>> {
    Ok(Sanitized(registry.doctors().get(id).await?))
}

async fn register_doctor(
    State(registry): AppState,
    Auth(staff): AuthStaff,
    Payload(request): Payload<RegisterDoctorRequest>,
) -> Result<Created<Doctor>> {
    require_role(&staff, StaffRole::Admin)?;
    Ok(Created(registry.doctors().register(request).await?))
}

async fn update_doctor(
    State(registry): AppState,
    Auth(staff): AuthStaff,
    PathParam(id): PathParam<Uuid>,
    Payload(request): Payload<UpdateDoctorRequest>,
) -> Result<Sanitized<Doctor>> {
    require_role(&staff, StaffRole::Admin)?;
    Ok(Sanitized(registry.doctors().update(id, request).await?))
}

async fn delete_doctor(
    State(registry): AppState,
    Auth(staff): AuthStaff,
    PathParam(id): PathParam<Uuid>,
) -> Result<Sanitized<Doctor>> {
    require_role(&staff, StaffRole::Admin)?;
    Ok(Sanitized(registry.doctors().delete(id).await?))
}

// ---- Patients ----

async fn list_patients(
    State(registry): AppState,
    _: AuthStaff,
    Params(page): Params<PageParams>,
    Params(search): Params<PatientSearch>,
) -> Result<Sanitized<Page<Patient>>> {
    Ok(Sanitized(registry.patients().find_all(page, search).await?))
}

async fn get_patient(State(registry): AppState, _: AuthStaff, PathParam(id): PathParam<Uuid>) -> Result<Sanitized<Value>> {
    Ok(Sanitized(registry.patients().get_detail(id).await?))
}

async fn register_patient(
    State(registry): AppState,
    Auth(staff): AuthStaff,
    Payload(request): Payload<RegisterPatientRequest>,
) -> Result<Created<Patient>> {
    require_role(&staff, StaffRole::Admin)?;
    Ok(Created(registry.patients().register(request).await?))
}

async fn update_patient(
    State(registry): AppState,
    _: AuthStaff,
    PathParam(id): PathParam<Uuid>,
    Payload(request): Payload<UpdatePatientRequest>,
) -> Result<Sanitized<Patient>> {
    Ok(Sanitized(registry.patients().update(id, request).await?))
}

async fn delete_patient(
    State(registry): AppState,
    Auth(staff): AuthStaff,
    PathParam(id): PathParam<Uuid>,
) -> Result<Sanitized<Patient>> {
    require_role(&staff, StaffRole::Admin)?;
    Ok(Sanitized(registry.patients().delete(id).await?))
}

// ---- Appointments ----

async fn list_appointments(
    State(registry): AppState,
    _: AuthStaff,
    Params(page): Params<PageParams>,
    Params(search): Params<AppointmentSearch>,
) -> Result<Json<Page<Appointment>>> {
    Ok(Json(registry.appointments().find_all(Scope::All, page, search).await?))
}

async fn get_appointment(
    State(registry): AppState,
    _: AuthStaff,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Appointment>> {
    Ok(Json(registry.appointments().get(id).await?))
}

pub fn routes() -> Router<Arc<ModuleRegistry>> {
    let account = account::routes::<Staff>().route("/staff", post(create_staff));

    let doctors = Router::new()
        .route("/", get(list_doctors))
        .route("/register", post(register_doctor))
        .route("/:id", get(get_doctor).patch(update_doctor).delete(delete_doctor));

    let patients = Router::new()
        .route("/", get(list_patients))
        .route("/register", post(register_patient))
        .route("/:id", get(get_patient).patch(update_patient).delete(delete_patient));

    let appointments = Router::new()
        .route("/", get(list_appointments))
        .route("/:id", get(get_appointment));

    Router::new()
        .nest("/account", account)
        .nest("/doctor", doctors)
        .nest("/patient", patients)
        .nest("/appointment", appointments)
}
