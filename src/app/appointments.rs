use crate::app::registry::ModuleRef;
use crate::app::Scope;
use crate::constants;
use crate::domain::{Appointment, AppointmentStatus};
use crate::error::{ClinicError, Result};
use crate::metrics::SchedulingMetrics;
use crate::repository::{Page, Repository};
use crate::types::{AppointmentSearch, CreateAppointmentRequest, PageParams, UpdateAppointmentRequest};
use crate::validation;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// The instant an appointment starts, reading `time` as UTC
pub fn slot_instant(date: NaiveDate, time: &str) -> Result<DateTime<Utc>> {
    let time = validation::time_of_day(time)?;
    Ok(date.and_time(time).and_utc())
}

fn ensure_future(date: NaiveDate, time: &str) -> Result<()> {
    if slot_instant(date, time)? <= Utc::now() {
        return Err(ClinicError::bad_request(constants::APPOINTMENT_DATE_TIME_MUST_BE_IN_FUTURE));
    }
    Ok(())
}

pub struct AppointmentService {
    repo: Repository<Appointment>,
    modules: ModuleRef,
}

impl AppointmentService {
    pub fn new(repo: Repository<Appointment>, modules: ModuleRef) -> Self {
        Self { repo, modules }
    }

    /// True if a non-cancelled appointment other than `exclude` already
    /// holds this date and time for the patient or the doctor.
    ///
    /// The check and the following write are separate store calls, so two
    /// concurrent bookings of one slot can both pass.
    pub async fn has_conflict(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        self.repo
            .exists(|a| a.id != exclude && a.occupies_slot(patient_id, doctor_id, date, time))
            .await
    }

    async fn ensure_slot_free(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        exclude: Option<Uuid>,
    ) -> Result<()> {
        if self.has_conflict(patient_id, doctor_id, date, time, exclude).await? {
            SchedulingMetrics::record_conflict();
            warn!("Slot {} {} already taken for doctor {} or patient {}", date, time, doctor_id, patient_id);
            return Err(ClinicError::Conflict(constants::APPOINTMENT_ALREADY_SCHEDULED_FOR_THIS_TIME));
        }
        Ok(())
    }

    pub async fn create(&self, doctor_id: Uuid, request: CreateAppointmentRequest) -> Result<Appointment> {
        request.validate()?;
        let modules = self.modules.get()?;
        let patients = modules.patients();
        let doctors = modules.doctors();

        patients.ensure_exists(request.patient_id).await?;
        if !doctors.exists(doctor_id).await? {
            return Err(ClinicError::NotFound(constants::DOCTOR_NOT_FOUND));
        }
        ensure_future(request.date, &request.time)?;
        self.ensure_slot_free(request.patient_id, doctor_id, request.date, &request.time, None)
            .await?;

        let now = Utc::now();
        let mut appointment = Appointment {
            id: None,
            patient_id: request.patient_id,
            doctor_id,
            date: request.date,
            time: request.time,
            reason: request.reason,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&mut appointment).await?;

        let id = appointment
            .id
            .ok_or_else(|| ClinicError::Internal("appointment saved without an id".to_string()))?;
        patients.link_appointment(appointment.patient_id, id, doctor_id).await?;
        doctors.link_appointment(doctor_id, id, appointment.patient_id).await?;

        SchedulingMetrics::record_booked();
        info!(
            "Booked appointment {} for patient {} with doctor {} on {} at {}",
            id, appointment.patient_id, doctor_id, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    pub async fn update(&self, doctor_id: Uuid, id: Uuid, request: UpdateAppointmentRequest) -> Result<Appointment> {
        request.validate()?;
        let mut appointment = self.get_scoped(id, Scope::Doctor(doctor_id)).await?;
        if appointment.status != AppointmentStatus::Scheduled {
            return Err(ClinicError::bad_request(constants::APPOINTMENT_NOT_EDITABLE));
        }

        let modules = self.modules.get()?;
        let previous_patient = appointment.patient_id;
        if let Some(patient_id) = request.patient_id.filter(|p| *p != previous_patient) {
            modules.patients().ensure_exists(patient_id).await?;
        }

        let moves = request.changes_slot(&appointment);
        request.apply(&mut appointment);
        if moves {
            ensure_future(appointment.date, &appointment.time)?;
            self.ensure_slot_free(appointment.patient_id, doctor_id, appointment.date, &appointment.time, Some(id))
                .await?;
        }
        self.repo.update(&mut appointment).await?;

        if appointment.patient_id != previous_patient {
            let patients = modules.patients();
            patients.unlink_appointment(previous_patient, id).await?;
            patients.link_appointment(appointment.patient_id, id, doctor_id).await?;
            modules.doctors().link_appointment(doctor_id, id, appointment.patient_id).await?;
        }

        info!("Updated appointment {}", id);
        Ok(appointment)
    }

    async fn transition(&self, mut appointment: Appointment, next: AppointmentStatus) -> Result<Appointment> {
        if !appointment.status.can_transition_to(next) {
            return Err(ClinicError::bad_request(constants::INVALID_APPOINTMENT_STATUS_TRANSITION));
        }
        appointment.status = next;
        self.repo.update(&mut appointment).await?;
        Ok(appointment)
    }

    /// Cancels an appointment visible to `scope`
    pub async fn cancel(&self, id: Uuid, scope: Scope) -> Result<Appointment> {
        let appointment = self.get_scoped(id, scope).await?;
        let cancelled = self.transition(appointment, AppointmentStatus::Cancelled).await?;

        SchedulingMetrics::record_cancelled(scope.label());
        info!("Appointment {} cancelled by {}", id, scope.label());
        Ok(cancelled)
    }

    pub async fn complete(&self, id: Uuid) -> Result<Appointment> {
        let appointment = self.get(id).await?;
        self.transition(appointment, AppointmentStatus::Completed).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Appointment> {
        self.get_scoped(id, Scope::All).await
    }

    /// Appointments outside `scope` are reported as missing
    pub async fn get_scoped(&self, id: Uuid, scope: Scope) -> Result<Appointment> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|a| scope.permits(a.doctor_id, a.patient_id))
            .ok_or(ClinicError::NotFound(constants::APPOINTMENT_NOT_FOUND))
    }

    pub async fn find_all(&self, scope: Scope, page: PageParams, search: AppointmentSearch) -> Result<Page<Appointment>> {
        let query = page
            .into_query()?
            .filter(move |a: &Appointment| scope.permits(a.doctor_id, a.patient_id) && search.matches(a));
        self.repo.find_and_count(query).await
    }

    pub async fn delete(&self, doctor_id: Uuid, id: Uuid) -> Result<Appointment> {
        let appointment = self.get_scoped(id, Scope::Doctor(doctor_id)).await?;
        self.repo.delete_by_id(id).await?;

        let modules = self.modules.get()?;
        modules.patients().unlink_appointment(appointment.patient_id, id).await?;
        modules.doctors().unlink_appointment(doctor_id, id).await?;

        info!("Deleted appointment {}", id);
        Ok(appointment)
    }

    /// A scheduled appointment dated today between this doctor and patient.
    /// Prescriptions can only be written against one of these.
    pub async fn find_open_today(&self, id: Uuid, doctor_id: Uuid, patient_id: Uuid) -> Result<Option<Appointment>> {
        let today = Utc::now().date_naive();
        Ok(self.repo.find_by_id(id).await?.filter(|a| {
            a.doctor_id == doctor_id
                && a.patient_id == patient_id
                && a.date == today
                && a.status == AppointmentStatus::Scheduled
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ModuleRegistry;
    use crate::config::test_config;
    use crate::domain::Patient;
    use crate::storage::InMemoryStore;
    use crate::types::{RegisterDoctorRequest, RegisterPatientRequest};
    use std::sync::Arc;

    struct Fixture {
        registry: Arc<ModuleRegistry>,
        doctor_id: Uuid,
        patient_id: Uuid,
    }

    async fn register_patient(registry: &ModuleRegistry, username: &str) -> Uuid {
        let request = RegisterPatientRequest {
            username: username.to_string(),
            email: format!("{username}@mail.org"),
            password: "patient123".to_string(),
            confirm_password: "patient123".to_string(),
            first_name: None,
            last_name: None,
            phone_number: "+15555550001".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
            address: None,
        };
        registry.patients().register(request).await.unwrap().id.unwrap()
    }

    async fn register_doctor(registry: &ModuleRegistry, username: &str) -> Uuid {
        let request = RegisterDoctorRequest {
            username: username.to_string(),
            email: format!("{username}@clinic.org"),
            password: "doctor123".to_string(),
            confirm_password: "doctor123".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: "+15555550002".to_string(),
            specialization: "General".to_string(),
        };
        registry.doctors().register(request).await.unwrap().id.unwrap()
    }

    async fn fixture() -> Fixture {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let doctor_id = register_doctor(&registry, "ada").await;
        let patient_id = register_patient(&registry, "bob").await;
        Fixture { registry, doctor_id, patient_id }
    }

    fn future_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 3, 15).unwrap()
    }

    fn booking(patient_id: Uuid, time: &str) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id,
            date: future_date(),
            time: time.to_string(),
            reason: "Annual checkup".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_links_both_parties() {
        let f = fixture().await;
        let appointments = f.registry.appointments();

        let appointment = appointments.create(f.doctor_id, booking(f.patient_id, "10:00")).await.unwrap();
        let id = appointment.id.unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);

        let patient: Patient = f.registry.patients().get(f.patient_id).await.unwrap();
        assert_eq!(patient.appointments, vec![id]);
        assert_eq!(patient.doctors, vec![f.doctor_id]);

        let doctor = f.registry.doctors().get(f.doctor_id).await.unwrap();
        assert_eq!(doctor.appointments, vec![id]);
        assert_eq!(doctor.patients, vec![f.patient_id]);

        // A second booking with the same doctor does not duplicate the link
        appointments.create(f.doctor_id, booking(f.patient_id, "11:00")).await.unwrap();
        let patient = f.registry.patients().get(f.patient_id).await.unwrap();
        assert_eq!(patient.doctors.len(), 1);
        assert_eq!(patient.appointments.len(), 2);
    }

    #[tokio::test]
    async fn test_same_slot_conflicts_for_doctor_and_patient() {
        let f = fixture().await;
        let appointments = f.registry.appointments();
        appointments.create(f.doctor_id, booking(f.patient_id, "10:00")).await.unwrap();

        // Same doctor, another patient
        let other_patient = register_patient(&f.registry, "carol").await;
        let err = appointments.create(f.doctor_id, booking(other_patient, "10:00")).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(constants::APPOINTMENT_ALREADY_SCHEDULED_FOR_THIS_TIME)));

        // Same patient, another doctor
        let other_doctor = register_doctor(&f.registry, "grace").await;
        let err = appointments.create(other_doctor, booking(f.patient_id, "10:00")).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        // Different time is fine
        appointments.create(other_doctor, booking(f.patient_id, "10:30")).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_appointment_frees_the_slot() {
        let f = fixture().await;
        let appointments = f.registry.appointments();
        let first = appointments.create(f.doctor_id, booking(f.patient_id, "09:00")).await.unwrap();

        appointments.cancel(first.id.unwrap(), Scope::Patient(f.patient_id)).await.unwrap();
        appointments.create(f.doctor_id, booking(f.patient_id, "09:00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_past_slot_is_rejected() {
        let f = fixture().await;
        let request = CreateAppointmentRequest {
            date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            ..booking(f.patient_id, "10:00")
        };
        let err = f.registry.appointments().create(f.doctor_id, request).await.unwrap_err();
        assert_eq!(err.public_message(), constants::APPOINTMENT_DATE_TIME_MUST_BE_IN_FUTURE);
    }

    #[tokio::test]
    async fn test_unknown_patient_is_bad_request() {
        let f = fixture().await;
        let err = f
            .registry
            .appointments()
            .create(f.doctor_id, booking(Uuid::new_v4(), "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::BadRequest(ref code) if code == constants::PATIENT_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_bad_time_format() {
        let f = fixture().await;
        let err = f
            .registry
            .appointments()
            .create(f.doctor_id, booking(f.patient_id, "25:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation { field: "time", .. }));
    }

    #[tokio::test]
    async fn test_update_does_not_conflict_with_itself() {
        let f = fixture().await;
        let appointments = f.registry.appointments();
        let appointment = appointments.create(f.doctor_id, booking(f.patient_id, "10:00")).await.unwrap();
        let id = appointment.id.unwrap();

        let same_slot = UpdateAppointmentRequest {
            time: Some("10:00".to_string()),
            date: Some(future_date()),
            reason: Some("Rescheduled reason".to_string()),
            ..Default::default()
        };
        let updated = appointments.update(f.doctor_id, id, same_slot).await.unwrap();
        assert_eq!(updated.reason, "Rescheduled reason");

        // Moving onto an occupied slot is rejected
        appointments.create(f.doctor_id, booking(f.patient_id, "12:00")).await.unwrap();
        let onto_taken = UpdateAppointmentRequest { time: Some("12:00".to_string()), ..Default::default() };
        assert!(matches!(
            appointments.update(f.doctor_id, id, onto_taken).await,
            Err(ClinicError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_moves_patient_links() {
        let f = fixture().await;
        let appointments = f.registry.appointments();
        let appointment = appointments.create(f.doctor_id, booking(f.patient_id, "10:00")).await.unwrap();
        let id = appointment.id.unwrap();
        let carol = register_patient(&f.registry, "carol").await;

        let update = UpdateAppointmentRequest { patient_id: Some(carol), ..Default::default() };
        appointments.update(f.doctor_id, id, update).await.unwrap();

        assert!(f.registry.patients().get(f.patient_id).await.unwrap().appointments.is_empty());
        assert_eq!(f.registry.patients().get(carol).await.unwrap().appointments, vec![id]);
    }

    #[tokio::test]
    async fn test_status_machine() {
        let f = fixture().await;
        let appointments = f.registry.appointments();
        let appointment = appointments.create(f.doctor_id, booking(f.patient_id, "10:00")).await.unwrap();
        let id = appointment.id.unwrap();

        // Another doctor cannot see it
        let stranger = register_doctor(&f.registry, "grace").await;
        assert!(matches!(
            appointments.cancel(id, Scope::Doctor(stranger)).await,
            Err(ClinicError::NotFound(constants::APPOINTMENT_NOT_FOUND))
        ));

        let cancelled = appointments.cancel(id, Scope::Doctor(f.doctor_id)).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let err = appointments.cancel(id, Scope::Doctor(f.doctor_id)).await.unwrap_err();
        assert_eq!(err.public_message(), constants::INVALID_APPOINTMENT_STATUS_TRANSITION);
        assert!(appointments.complete(id).await.is_err());

        let edit = UpdateAppointmentRequest { reason: Some("x".to_string()), ..Default::default() };
        let err = appointments.update(f.doctor_id, id, edit).await.unwrap_err();
        assert_eq!(err.public_message(), constants::APPOINTMENT_NOT_EDITABLE);
    }

    #[tokio::test]
    async fn test_find_all_is_scoped() {
        let f = fixture().await;
        let appointments = f.registry.appointments();
        let grace = register_doctor(&f.registry, "grace").await;
        appointments.create(f.doctor_id, booking(f.patient_id, "08:00")).await.unwrap();
        appointments.create(grace, booking(f.patient_id, "09:00")).await.unwrap();

        let mine = appointments
            .find_all(Scope::Doctor(grace), PageParams::default(), AppointmentSearch::default())
            .await
            .unwrap();
        assert_eq!(mine.count, 1);

        let patient_view = appointments
            .find_all(Scope::Patient(f.patient_id), PageParams::default(), AppointmentSearch::default())
            .await
            .unwrap();
        assert_eq!(patient_view.count, 2);

        let sorted = PageParams { sort_by: Some("time".to_string()), order: Some(-1), ..Default::default() };
        let all = appointments.find_all(Scope::All, sorted, AppointmentSearch::default()).await.unwrap();
        assert_eq!(all.results[0].time, "09:00");
    }

    #[tokio::test]
    async fn test_delete_pulls_references() {
        let f = fixture().await;
        let appointments = f.registry.appointments();
        let appointment = appointments.create(f.doctor_id, booking(f.patient_id, "10:00")).await.unwrap();
        let id = appointment.id.unwrap();

        appointments.delete(f.doctor_id, id).await.unwrap();
        assert!(f.registry.patients().get(f.patient_id).await.unwrap().appointments.is_empty());
        assert!(f.registry.doctors().get(f.doctor_id).await.unwrap().appointments.is_empty());
        assert!(appointments.get(id).await.is_err());
    }
}
