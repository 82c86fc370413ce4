pub mod admin;
pub mod event;
pub mod practitioner;
pub mod session;

pub use admin::AdminAccount;
pub use event::{ActorType, AdminEvent, AdminEventType, NewAdminEvent};
pub use practitioner::{PractitionerIdentity, PractitionerRecord};
pub use session::ImpersonationSession;
