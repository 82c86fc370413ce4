pub mod audit_service;
pub mod impersonation_service;

pub use audit_service::AuditLogger;
pub use impersonation_service::{EndOutcome, ImpersonationService, StartError, StartedImpersonation};
