//! Counters for account and scheduling activity.
//!
//! Counters are recorded through the `metrics` facade and are no-ops until
//! a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

const LOGINS_TOTAL: &str = "clinic_account_logins_total";
const LOGIN_FAILURES_TOTAL: &str = "clinic_account_login_failures_total";
const APPOINTMENTS_BOOKED_TOTAL: &str = "clinic_appointments_booked_total";
const APPOINTMENT_CONFLICTS_TOTAL: &str = "clinic_appointments_conflicts_total";
const APPOINTMENTS_CANCELLED_TOTAL: &str = "clinic_appointments_cancelled_total";
const PRESCRIPTIONS_ISSUED_TOTAL: &str = "clinic_prescriptions_issued_total";

/// Installs the Prometheus exporter on `port`. Idempotent. A failed
/// install is logged and otherwise ignored.
pub fn init_metrics(port: u16) {
    INIT.call_once(|| {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => {
                info!("Prometheus exporter listening on http://{}/metrics", addr);
                describe_metrics();
            }
            Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
        }
    });
}

fn describe_metrics() {
    ::metrics::describe_counter!(LOGINS_TOTAL, "Successful logins by actor class");
    ::metrics::describe_counter!(LOGIN_FAILURES_TOTAL, "Rejected logins by actor class");
    ::metrics::describe_counter!(APPOINTMENTS_BOOKED_TOTAL, "Appointments created");
    ::metrics::describe_counter!(APPOINTMENT_CONFLICTS_TOTAL, "Bookings rejected because the slot was taken");
    ::metrics::describe_counter!(APPOINTMENTS_CANCELLED_TOTAL, "Appointments cancelled by actor class");
    ::metrics::describe_counter!(PRESCRIPTIONS_ISSUED_TOTAL, "Prescriptions created");
}

/// Metrics for the login and token workflow
pub struct AccountMetrics;

impl AccountMetrics {
    pub fn record_login(actor: &'static str) {
        ::metrics::counter!(LOGINS_TOTAL, "actor" => actor).increment(1);
    }

    pub fn record_login_failure(actor: &'static str) {
        ::metrics::counter!(LOGIN_FAILURES_TOTAL, "actor" => actor).increment(1);
    }
}

/// Metrics for appointments and the prescriptions that complete them
pub struct SchedulingMetrics;

impl SchedulingMetrics {
    pub fn record_booked() {
        ::metrics::counter!(APPOINTMENTS_BOOKED_TOTAL).increment(1);
    }

    pub fn record_conflict() {
        ::metrics::counter!(APPOINTMENT_CONFLICTS_TOTAL).increment(1);
    }

    pub fn record_cancelled(actor: &'static str) {
        ::metrics::counter!(APPOINTMENTS_CANCELLED_TOTAL, "actor" => actor).increment(1);
    }

    pub fn record_prescription_issued() {
        ::metrics::counter!(PRESCRIPTIONS_ISSUED_TOTAL).increment(1);
    }
}
