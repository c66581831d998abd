use crate::app::accounts::AccountWorkflow;
use crate::app::registry::ModuleRef;
use crate::auth::TokenService;
use crate::constants;
use crate::domain::{push_unique, Doctor};
use crate::error::{ClinicError, Result};
use crate::repository::{Page, Repository};
use crate::types::{DoctorSearch, PageParams, RegisterDoctorRequest, UpdateDoctorRequest};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

pub struct DoctorService {
    repo: Repository<Doctor>,
    tokens: TokenService,
    account: AccountWorkflow<Doctor>,
    modules: ModuleRef,
}

impl DoctorService {
    pub fn new(repo: Repository<Doctor>, tokens: TokenService, modules: ModuleRef) -> Self {
        let account = AccountWorkflow::new(repo.clone(), tokens.clone());
        Self { repo, tokens, account, modules }
    }

    pub fn account(&self) -> &AccountWorkflow<Doctor> {
        &self.account
    }

    /// True if another doctor already uses `username` or `email`
    async fn is_taken(&self, username: &str, email: &str, exclude: Option<Uuid>) -> Result<bool> {
        let email = email.to_lowercase();
        self.repo
            .exists(|d| d.id != exclude && (d.username == username || d.email.to_lowercase() == email))
            .await
    }

    pub async fn register(&self, request: RegisterDoctorRequest) -> Result<Doctor> {
        request.validate()?;
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();
        if self.is_taken(&username, &email, None).await? {
            return Err(ClinicError::Conflict(constants::DOCTOR_ALREADY_EXISTS));
        }

        let now = Utc::now();
        let mut doctor = Doctor {
            id: None,
            username,
            email,
            password: self.tokens.hash(&request.password).await?,
            first_name: request.first_name,
            last_name: request.last_name,
            phone_number: request.phone_number,
            specialization: request.specialization,
            patients: Vec::new(),
            appointments: Vec::new(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&mut doctor).await?;

        info!("Registered doctor {}", doctor.username);
        Ok(doctor)
    }

    pub async fn get(&self, id: Uuid) -> Result<Doctor> {
        self.repo.find_by_id(id).await?.ok_or(ClinicError::NotFound(constants::DOCTOR_NOT_FOUND))
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.repo.find_by_id(id).await?.is_some())
    }

    pub async fn find_all(&self, page: PageParams, search: DoctorSearch) -> Result<Page<Doctor>> {
        let query = page.into_query()?.filter(move |d: &Doctor| search.matches(d));
        self.repo.find_and_count(query).await
    }

    pub async fn update(&self, id: Uuid, request: UpdateDoctorRequest) -> Result<Doctor> {
        request.validate()?;
        let mut doctor = self.get(id).await?;

        let username = request.username.as_deref().map(str::trim).unwrap_or(&doctor.username).to_string();
        let email = request.email.as_deref().map(str::trim).unwrap_or(&doctor.email).to_string();
        if self.is_taken(&username, &email, Some(id)).await? {
            return Err(ClinicError::Conflict(constants::DOCTOR_ALREADY_EXISTS));
        }

        request.apply(&mut doctor);
        doctor.username = username;
        doctor.email = email;
        self.repo.update(&mut doctor).await?;
        Ok(doctor)
    }

    /// Removes the doctor. Their appointments and prescriptions stay on
    /// record.
    pub async fn delete(&self, id: Uuid) -> Result<Doctor> {
        let doctor = self
            .repo
            .delete_by_id(id)
            .await?
            .ok_or(ClinicError::NotFound(constants::DOCTOR_NOT_FOUND))?;

        let patients = self.modules.get()?.patients();
        for patient_id in &doctor.patients {
            patients.unlink_doctor(*patient_id, id).await?;
        }

        info!("Deleted doctor {}", doctor.username);
        Ok(doctor)
    }

    /// Records a new appointment with `patient_id` on the doctor
    pub async fn link_appointment(&self, doctor_id: Uuid, appointment_id: Uuid, patient_id: Uuid) -> Result<()> {
        let mut doctor = self.get(doctor_id).await?;
        push_unique(&mut doctor.appointments, appointment_id);
        push_unique(&mut doctor.patients, patient_id);
        self.repo.update(&mut doctor).await
    }

    pub async fn unlink_appointment(&self, doctor_id: Uuid, appointment_id: Uuid) -> Result<()> {
        let Some(mut doctor) = self.repo.find_by_id(doctor_id).await? else {
            return Ok(());
        };
        doctor.appointments.retain(|id| *id != appointment_id);
        self.repo.update(&mut doctor).await
    }

    pub async fn unlink_patient(&self, doctor_id: Uuid, patient_id: Uuid) -> Result<()> {
        let Some(mut doctor) = self.repo.find_by_id(doctor_id).await? else {
            return Ok(());
        };
        doctor.patients.retain(|id| *id != patient_id);
        self.repo.update(&mut doctor).await
    }
}
