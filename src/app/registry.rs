use crate::app::{
    AppointmentService, DoctorService, MedicalHistoryService, PatientService, PrescriptionService, StaffService,
};
use crate::auth::TokenService;
use crate::config::Config;
use crate::domain::Document;
use crate::error::{ClinicError, Result};
use crate::repository::Repository;
use crate::storage::DocumentStore;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Weak};

/// Owns the store and builds each service on first use.
///
/// Services never hold each other directly. They keep a [`ModuleRef`] and
/// ask the registry for a peer when they need one, so areas that depend on
/// each other (appointments and patients, say) can be constructed in any
/// order.
pub struct ModuleRegistry {
    this: Weak<ModuleRegistry>,
    store: Arc<dyn DocumentStore>,
    config: Arc<Config>,
    tokens: TokenService,
    staff: OnceCell<Arc<StaffService>>,
    doctors: OnceCell<Arc<DoctorService>>,
    patients: OnceCell<Arc<PatientService>>,
    appointments: OnceCell<Arc<AppointmentService>>,
    prescriptions: OnceCell<Arc<PrescriptionService>>,
    medical_histories: OnceCell<Arc<MedicalHistoryService>>,
}

/// Weak handle to the registry held by every service
#[derive(Clone)]
pub struct ModuleRef(Weak<ModuleRegistry>);

impl ModuleRef {
    pub fn get(&self) -> Result<Arc<ModuleRegistry>> {
        self.0
            .upgrade()
            .ok_or_else(|| ClinicError::Internal("module registry has been dropped".to_string()))
    }
}

impl ModuleRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Arc<Self> {
        let tokens = TokenService::new(config.auth.clone());
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            store,
            config: Arc::new(config),
            tokens,
            staff: OnceCell::new(),
            doctors: OnceCell::new(),
            patients: OnceCell::new(),
            appointments: OnceCell::new(),
            prescriptions: OnceCell::new(),
            medical_histories: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn repository<T: Document>(&self) -> Repository<T> {
        Repository::new(Arc::clone(&self.store))
    }

    fn handle(&self) -> ModuleRef {
        ModuleRef(self.this.clone())
    }

    pub fn staff(&self) -> Arc<StaffService> {
        Arc::clone(
            self.staff
                .get_or_init(|| Arc::new(StaffService::new(self.repository(), self.tokens.clone()))),
        )
    }

    pub fn doctors(&self) -> Arc<DoctorService> {
        Arc::clone(self.doctors.get_or_init(|| {
            Arc::new(DoctorService::new(self.repository(), self.tokens.clone(), self.handle()))
        }))
    }

    pub fn patients(&self) -> Arc<PatientService> {
        Arc::clone(self.patients.get_or_init(|| {
            Arc::new(PatientService::new(self.repository(), self.tokens.clone(), self.handle()))
        }))
    }

    pub fn appointments(&self) -> Arc<AppointmentService> {
        Arc::clone(
            self.appointments
                .get_or_init(|| Arc::new(AppointmentService::new(self.repository(), self.handle()))),
        )
    }

    pub fn prescriptions(&self) -> Arc<PrescriptionService> {
        Arc::clone(
            self.prescriptions
                .get_or_init(|| Arc::new(PrescriptionService::new(self.repository(), self.handle()))),
        )
    }

    pub fn medical_histories(&self) -> Arc<MedicalHistoryService> {
        Arc::clone(
            self.medical_histories
                .get_or_init(|| Arc::new(MedicalHistoryService::new(self.repository(), self.handle()))),
        )
    }
}
