use crate::app::accounts::AccountWorkflow;
use crate::app::registry::ModuleRef;
use crate::auth::TokenService;
use crate::constants;
use crate::domain::{push_unique, Appointment, Doctor, MedicalHistory, Patient, Prescription};
use crate::error::{ClinicError, Result};
use crate::repository::{Page, Repository};
use crate::types::{PageParams, PatientSearch, RegisterPatientRequest, UpdatePatientRequest};
use chrono::Utc;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

pub struct PatientService {
    repo: Repository<Patient>,
    tokens: TokenService,
    account: AccountWorkflow<Patient>,
    modules: ModuleRef,
}

impl PatientService {
    pub fn new(repo: Repository<Patient>, tokens: TokenService, modules: ModuleRef) -> Self {
        let account = AccountWorkflow::new(repo.clone(), tokens.clone());
        Self { repo, tokens, account, modules }
    }

    pub fn account(&self) -> &AccountWorkflow<Patient> {
        &self.account
    }

    async fn is_taken(&self, username: &str, email: &str, exclude: Option<Uuid>) -> Result<bool> {
        let email = email.to_lowercase();
        self.repo
            .exists(|p| p.id != exclude && (p.username == username || p.email.to_lowercase() == email))
            .await
    }

    pub async fn register(&self, request: RegisterPatientRequest) -> Result<Patient> {
        request.validate()?;
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();
        if self.is_taken(&username, &email, None).await? {
            return Err(ClinicError::Conflict(constants::PATIENT_ALREADY_EXISTS));
        }

        let now = Utc::now();
        let mut patient = Patient {
            id: None,
            username,
            email,
            password: self.tokens.hash(&request.password).await?,
            first_name: request.first_name,
            last_name: request.last_name,
            phone_number: request.phone_number,
            date_of_birth: request.date_of_birth,
            address: request.address,
            doctors: Vec::new(),
            appointments: Vec::new(),
            prescriptions: Vec::new(),
            medical_history: Vec::new(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&mut patient).await?;

        info!("Registered patient {}", patient.username);
        Ok(patient)
    }

    pub async fn get(&self, id: Uuid) -> Result<Patient> {
        self.repo.find_by_id(id).await?.ok_or(ClinicError::NotFound(constants::PATIENT_NOT_FOUND))
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.repo.find_by_id(id).await?.is_some())
    }

    /// Fails with `400 PATIENT_NOT_FOUND` when another area references an
    /// unknown patient
    pub async fn ensure_exists(&self, id: Uuid) -> Result<()> {
        if self.exists(id).await? {
            Ok(())
        } else {
            Err(ClinicError::bad_request(constants::PATIENT_NOT_FOUND))
        }
    }

    /// The patient record with its id lists replaced by the referenced
    /// records. Missing references are skipped.
    pub async fn get_detail(&self, id: Uuid) -> Result<Value> {
        let patient = self.get(id).await?;
        let modules = self.modules.get()?;

        let appointments: Repository<Appointment> = modules.repository();
        let prescriptions: Repository<Prescription> = modules.repository();
        let histories: Repository<MedicalHistory> = modules.repository();
        let doctors: Repository<Doctor> = modules.repository();

        let mut detail = serde_json::to_value(&patient)?;
        detail["appointments"] = serde_json::to_value(load_all(&appointments, &patient.appointments).await?)?;
        detail["prescriptions"] = serde_json::to_value(load_all(&prescriptions, &patient.prescriptions).await?)?;
        detail["medical_history"] = serde_json::to_value(load_all(&histories, &patient.medical_history).await?)?;
        detail["doctors"] = serde_json::to_value(load_all(&doctors, &patient.doctors).await?)?;
        Ok(detail)
    }

    pub async fn find_all(&self, page: PageParams, search: PatientSearch) -> Result<Page<Patient>> {
        let query = page.into_query()?.filter(move |p: &Patient| search.matches(p));
        self.repo.find_and_count(query).await
    }

    pub async fn update(&self, id: Uuid, request: UpdatePatientRequest) -> Result<Patient> {
        request.validate()?;
        let mut patient = self.get(id).await?;

        let username = request.username.as_deref().map(str::trim).unwrap_or(&patient.username).to_string();
        let email = request.email.as_deref().map(str::trim).unwrap_or(&patient.email).to_string();
        if self.is_taken(&username, &email, Some(id)).await? {
            return Err(ClinicError::Conflict(constants::PATIENT_ALREADY_EXISTS));
        }

        request.apply(&mut patient);
        patient.username = username;
        patient.email = email;
        self.repo.update(&mut patient).await?;
        Ok(patient)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Patient> {
        let patient = self
            .repo
            .delete_by_id(id)
            .await?
            .ok_or(ClinicError::NotFound(constants::PATIENT_NOT_FOUND))?;

        let doctors = self.modules.get()?.doctors();
        for doctor_id in &patient.doctors {
            doctors.unlink_patient(*doctor_id, id).await?;
        }

        info!("Deleted patient {}", patient.username);
        Ok(patient)
    }

    async fn modify(&self, id: Uuid, change: impl FnOnce(&mut Patient)) -> Result<()> {
        let Some(mut patient) = self.repo.find_by_id(id).await? else {
            return Ok(());
        };
        change(&mut patient);
        self.repo.update(&mut patient).await
    }

    pub async fn link_appointment(&self, patient_id: Uuid, appointment_id: Uuid, doctor_id: Uuid) -> Result<()> {
        self.modify(patient_id, |p| {
            push_unique(&mut p.appointments, appointment_id);
            push_unique(&mut p.doctors, doctor_id);
        })
        .await
    }

    pub async fn unlink_appointment(&self, patient_id: Uuid, appointment_id: Uuid) -> Result<()> {
        self.modify(patient_id, |p| p.appointments.retain(|id| *id != appointment_id)).await
    }

    pub async fn unlink_doctor(&self, patient_id: Uuid, doctor_id: Uuid) -> Result<()> {
        self.modify(patient_id, |p| p.doctors.retain(|id| *id != doctor_id)).await
    }

    pub async fn add_prescription(&self, patient_id: Uuid, prescription_id: Uuid) -> Result<()> {
        self.modify(patient_id, |p| push_unique(&mut p.prescriptions, prescription_id)).await
    }

    pub async fn remove_prescription(&self, patient_id: Uuid, prescription_id: Uuid) -> Result<()> {
        self.modify(patient_id, |p| p.prescriptions.retain(|id| *id != prescription_id)).await
    }

    pub async fn add_medical_history(&self, patient_id: Uuid, history_id: Uuid) -> Result<()> {
        self.modify(patient_id, |p| push_unique(&mut p.medical_history, history_id)).await
    }

    pub async fn remove_medical_history(&self, patient_id: Uuid, history_id: Uuid) -> Result<()> {
        self.modify(patient_id, |p| p.medical_history.retain(|id| *id != history_id)).await
    }
}

async fn load_all<T: crate::domain::Document>(repo: &Repository<T>, ids: &[Uuid]) -> Result<Vec<T>> {
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(record) = repo.find_by_id(*id).await? {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use crate::app::ModuleRegistry;
    use crate::config::test_config;
    use crate::constants;
    use crate::error::ClinicError;
    use crate::storage::InMemoryStore;
    use crate::types::{PageParams, PatientSearch, RegisterPatientRequest, UpdatePatientRequest};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use uuid::Uuid;

    fn patient_request(username: &str) -> RegisterPatientRequest {
        RegisterPatientRequest {
            username: username.to_string(),
            email: format!("{username}@mail.org"),
            password: "patient123".to_string(),
            confirm_password: "patient123".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: None,
            phone_number: "+447700900123".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            address: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_conflicts() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let patients = registry.patients();
        patients.register(patient_request("jane")).await.unwrap();

        let err = patients.register(patient_request("jane")).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(constants::PATIENT_ALREADY_EXISTS)));

        let mismatch = RegisterPatientRequest { confirm_password: "patient124".to_string(), ..patient_request("john") };
        assert!(patients.register(mismatch).await.is_err());
    }

    #[tokio::test]
    async fn test_search_on_optional_names() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let patients = registry.patients();
        patients.register(patient_request("jane")).await.unwrap();
        let john = patients.register(RegisterPatientRequest { first_name: None, ..patient_request("john") }).await.unwrap();

        let search = PatientSearch { first_name: Some("JA".to_string()), ..Default::default() };
        let page = patients.find_all(PageParams::default(), search).await.unwrap();
        assert_eq!(page.count, 1);

        let update = UpdatePatientRequest { first_name: Some("Jack".to_string()), ..Default::default() };
        patients.update(john.id.unwrap(), update).await.unwrap();
        let search = PatientSearch { first_name: Some("ja".to_string()), ..Default::default() };
        assert_eq!(patients.find_all(PageParams::default(), search).await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_detail_populates_references() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let patients = registry.patients();
        let jane = patients.register(patient_request("jane")).await.unwrap();
        let id = jane.id.unwrap();

        // Dangling ids are skipped
        patients.link_appointment(id, Uuid::new_v4(), Uuid::new_v4()).await.unwrap();

        let detail = patients.get_detail(id).await.unwrap();
        assert_eq!(detail["username"], "jane");
        assert_eq!(detail["appointments"].as_array().unwrap().len(), 0);
        assert_eq!(detail["doctors"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_ensure_exists_is_bad_request() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let err = registry.patients().ensure_exists(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), constants::PATIENT_NOT_FOUND);
    }
}
