use crate::app::registry::ModuleRef;
use crate::app::Scope;
use crate::constants;
use crate::domain::{MedicalHistory, Prescription};
use crate::error::{ClinicError, Result};
use crate::repository::{Page, Repository};
use crate::types::{CreateMedicalHistoryRequest, MedicalHistorySearch, PageParams, UpdateMedicalHistoryRequest};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

pub struct MedicalHistoryService {
    repo: Repository<MedicalHistory>,
    modules: ModuleRef,
}

impl MedicalHistoryService {
    pub fn new(repo: Repository<MedicalHistory>, modules: ModuleRef) -> Self {
        Self { repo, modules }
    }

    async fn ensure_unrecorded(&self, prescription_id: Uuid, exclude: Option<Uuid>) -> Result<()> {
        if self
            .repo
            .exists(|h| h.id != exclude && h.prescription_id == prescription_id)
            .await?
        {
            return Err(ClinicError::Conflict(constants::MEDICAL_HISTORY_RECORD_ALREADY_EXISTS));
        }
        Ok(())
    }

    /// The prescription must be the doctor's own and written for this patient
    async fn ensure_prescription(&self, prescription_id: Uuid, doctor_id: Uuid, patient_id: Uuid) -> Result<Prescription> {
        let prescriptions = self.modules.get()?.prescriptions();
        match prescriptions.get(prescription_id).await {
            Ok(p) if p.doctor_id == doctor_id && p.patient_id == patient_id => Ok(p),
            Ok(_) | Err(ClinicError::NotFound(_)) => Err(ClinicError::bad_request(constants::PRESCRIPTION_NOT_FOUND)),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, doctor_id: Uuid, request: CreateMedicalHistoryRequest) -> Result<MedicalHistory> {
        request.validate()?;
        self.ensure_unrecorded(request.prescription_id, None).await?;

        let modules = self.modules.get()?;
        modules.patients().ensure_exists(request.patient_id).await?;
        self.ensure_prescription(request.prescription_id, doctor_id, request.patient_id)
            .await?;

        let now = Utc::now();
        let mut history = MedicalHistory {
            id: None,
            patient_id: request.patient_id,
            doctor_id,
            prescription_id: request.prescription_id,
            diagnosis: request.diagnosis,
            treatment: request.treatment,
            notes: request.notes.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&mut history).await?;

        let id = history
            .id
            .ok_or_else(|| ClinicError::Internal("medical history saved without an id".to_string()))?;
        modules.patients().add_medical_history(history.patient_id, id).await?;

        info!("Doctor {} recorded medical history {} for patient {}", doctor_id, id, history.patient_id);
        Ok(history)
    }

    pub async fn get(&self, id: Uuid) -> Result<MedicalHistory> {
        self.get_scoped(id, Scope::All).await
    }

    pub async fn get_scoped(&self, id: Uuid, scope: Scope) -> Result<MedicalHistory> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|h| scope.permits(h.doctor_id, h.patient_id))
            .ok_or(ClinicError::NotFound(constants::MEDICAL_HISTORY_NOT_FOUND))
    }

    async fn get_owned(&self, doctor_id: Uuid, id: Uuid) -> Result<MedicalHistory> {
        let history = self.get(id).await?;
        if history.doctor_id != doctor_id {
            return Err(ClinicError::Forbidden(constants::YOU_ARE_NOT_ALLOWED_TO_MANAGE_THIS_RESOURCE));
        }
        Ok(history)
    }

    pub async fn find_all(
        &self,
        scope: Scope,
        page: PageParams,
        search: MedicalHistorySearch,
    ) -> Result<Page<MedicalHistory>> {
        let query = page
            .into_query()?
            .filter(move |h: &MedicalHistory| scope.permits(h.doctor_id, h.patient_id) && search.matches(h));
        self.repo.find_and_count(query).await
    }

    pub async fn update(&self, doctor_id: Uuid, id: Uuid, request: UpdateMedicalHistoryRequest) -> Result<MedicalHistory> {
        request.validate()?;
        let mut history = self.get_owned(doctor_id, id).await?;
        let modules = self.modules.get()?;

        let previous_patient = history.patient_id;
        let previous_prescription = history.prescription_id;
        request.apply(&mut history);

        if history.prescription_id != previous_prescription {
            self.ensure_unrecorded(history.prescription_id, Some(id)).await?;
        }
        if history.patient_id != previous_patient {
            modules.patients().ensure_exists(history.patient_id).await?;
        }
        if history.prescription_id != previous_prescription || history.patient_id != previous_patient {
            self.ensure_prescription(history.prescription_id, doctor_id, history.patient_id)
                .await?;
        }
        self.repo.update(&mut history).await?;

        if history.patient_id != previous_patient {
            let patients = modules.patients();
            patients.remove_medical_history(previous_patient, id).await?;
            patients.add_medical_history(history.patient_id, id).await?;
        }

        info!("Updated medical history {}", id);
        Ok(history)
    }

    pub async fn delete(&self, doctor_id: Uuid, id: Uuid) -> Result<MedicalHistory> {
        let history = self.get_owned(doctor_id, id).await?;
        self.repo.delete_by_id(id).await?;
        self.modules
            .get()?
            .patients()
            .remove_medical_history(history.patient_id, id)
            .await?;

        info!("Deleted medical history {}", id);
        Ok(history)
    }
}
