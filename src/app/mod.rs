//! Services holding the business rules of each area, plus the registry
//! that wires them together.

pub mod accounts;
pub mod appointments;
pub mod doctors;
pub mod medical_histories;
pub mod patients;
pub mod prescriptions;
pub mod registry;
pub mod staff;

pub use accounts::{AccountArea, AccountWorkflow, LoginResponse, RefreshResponse};
pub use appointments::AppointmentService;
pub use doctors::DoctorService;
pub use medical_histories::MedicalHistoryService;
pub use patients::PatientService;
pub use prescriptions::PrescriptionService;
pub use registry::{ModuleRef, ModuleRegistry};
pub use staff::StaffService;

use uuid::Uuid;

/// Which records a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Administrative staff: everything
    All,
    Doctor(Uuid),
    Patient(Uuid),
}

impl Scope {
    pub fn permits(&self, doctor_id: Uuid, patient_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Doctor(id) => *id == doctor_id,
            Scope::Patient(id) => *id == patient_id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Scope::All => "administrative",
            Scope::Doctor(_) => "doctor",
            Scope::Patient(_) => "patient",
        }
    }
}
