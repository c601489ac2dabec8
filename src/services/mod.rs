pub mod connection_provider;
pub mod consultation_service;
pub mod doctor_service;
pub mod payment_service;
pub mod simulation;

pub use connection_provider::ConnectionProvider;
pub use consultation_service::{BookingRequest, ConsultationService, RECENT_LIMIT};
pub use doctor_service::DoctorService;
pub use payment_service::{PaymentReceipt, PaymentService};
pub use simulation::{draw_failure, simulate_latency, RandomSource, SeededRandom, ThreadRandom};
