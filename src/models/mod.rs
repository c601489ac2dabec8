pub mod alert;
pub mod consultation;
pub mod doctor;

pub use alert::{parse_alert_webhook, AlertSummary};
pub use consultation::{
    BookedConsultation, Consultation, ConsultationList, ConsultationRow, NewConsultation,
    CONSULTATION_TYPES,
};
pub use doctor::{Doctor, DoctorList, DoctorRow};
