use std::sync::Arc;

use crate::database::models::NewAdminEvent;
use crate::database::AuditStore;

/// Appends admin audit events.
///
/// Recording never fails the caller: a write error is logged and dropped so
/// the primary state change (login, session start/end) still completes.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, event: NewAdminEvent) {
        let event_type = event.event_type.as_str();
        let actor_id = event.actor_id;

        match self.store.append(event).await {
            Ok(stored) => tracing::debug!("Recorded audit event {} ({})", event_type, stored.id),
            Err(e) => tracing::error!(
                "Failed to record audit event {} for actor {:?}: {}",
                event_type,
                actor_id,
                e
            ),
        }
    }
}
