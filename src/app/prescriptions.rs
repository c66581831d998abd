use crate::app::registry::ModuleRef;
use crate::app::Scope;
use crate::constants;
use crate::domain::Prescription;
use crate::error::{ClinicError, Result};
use crate::metrics::SchedulingMetrics;
use crate::repository::{Page, Repository};
use crate::types::{validate_date_range, CreatePrescriptionRequest, PageParams, PrescriptionSearch, UpdatePrescriptionRequest};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

pub struct PrescriptionService {
    repo: Repository<Prescription>,
    modules: ModuleRef,
}

impl PrescriptionService {
    pub fn new(repo: Repository<Prescription>, modules: ModuleRef) -> Self {
        Self { repo, modules }
    }

    /// Issues a prescription against one of today's scheduled appointments
    /// and marks that appointment completed.
    pub async fn create(&self, doctor_id: Uuid, request: CreatePrescriptionRequest) -> Result<Prescription> {
        request.validate()?;
        let modules = self.modules.get()?;
        modules.patients().ensure_exists(request.patient_id).await?;

        let appointments = modules.appointments();
        let appointment = appointments
            .find_open_today(request.appointment_id, doctor_id, request.patient_id)
            .await?
            .ok_or_else(|| ClinicError::bad_request(constants::APPOINTMENT_NOT_FOUND))?;

        let now = Utc::now();
        let mut prescription = Prescription {
            id: None,
            patient_id: request.patient_id,
            doctor_id,
            appointment_id: request.appointment_id,
            medications: request.medications,
            start_date: request.start_date,
            end_date: request.end_date,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&mut prescription).await?;

        let id = prescription
            .id
            .ok_or_else(|| ClinicError::Internal("prescription saved without an id".to_string()))?;
        if let Some(appointment_id) = appointment.id {
            appointments.complete(appointment_id).await?;
        }
        modules.patients().add_prescription(prescription.patient_id, id).await?;

        SchedulingMetrics::record_prescription_issued();
        info!("Doctor {} issued prescription {} for patient {}", doctor_id, id, prescription.patient_id);
        Ok(prescription)
    }

    pub async fn get(&self, id: Uuid) -> Result<Prescription> {
        self.get_scoped(id, Scope::All).await
    }

    pub async fn get_scoped(&self, id: Uuid, scope: Scope) -> Result<Prescription> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|p| scope.permits(p.doctor_id, p.patient_id))
            .ok_or(ClinicError::NotFound(constants::PRESCRIPTION_NOT_FOUND))
    }

    /// Loads a prescription for modification by `doctor_id`
    async fn get_owned(&self, doctor_id: Uuid, id: Uuid) -> Result<Prescription> {
        let prescription = self.get(id).await?;
        if prescription.doctor_id != doctor_id {
            return Err(ClinicError::Forbidden(constants::YOU_ARE_NOT_ALLOWED_TO_MANAGE_THIS_RESOURCE));
        }
        Ok(prescription)
    }

    pub async fn find_all(&self, scope: Scope, page: PageParams, search: PrescriptionSearch) -> Result<Page<Prescription>> {
        let query = page
            .into_query()?
            .filter(move |p: &Prescription| scope.permits(p.doctor_id, p.patient_id) && search.matches(p));
        self.repo.find_and_count(query).await
    }

    pub async fn update(&self, doctor_id: Uuid, id: Uuid, request: UpdatePrescriptionRequest) -> Result<Prescription> {
        request.validate()?;
        let mut prescription = self.get_owned(doctor_id, id).await?;
        let modules = self.modules.get()?;

        let previous_patient = prescription.patient_id;
        if let Some(patient_id) = request.patient_id.filter(|p| *p != previous_patient) {
            modules.patients().ensure_exists(patient_id).await?;
        }

        request.apply(&mut prescription);
        validate_date_range(prescription.start_date, prescription.end_date)?;
        self.repo.update(&mut prescription).await?;

        if prescription.patient_id != previous_patient {
            let patients = modules.patients();
            patients.remove_prescription(previous_patient, id).await?;
            patients.add_prescription(prescription.patient_id, id).await?;
        }

        info!("Updated prescription {}", id);
        Ok(prescription)
    }

    pub async fn delete(&self, doctor_id: Uuid, id: Uuid) -> Result<Prescription> {
        let prescription = self.get_owned(doctor_id, id).await?;
        self.repo.delete_by_id(id).await?;
        self.modules
            .get()?
            .patients()
            .remove_prescription(prescription.patient_id, id)
            .await?;

        info!("Deleted prescription {}", id);
        Ok(prescription)
    }
}
