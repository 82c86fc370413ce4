use std::sync::Arc;
use uuid::Uuid;

use super::ResolutionFallback;
use crate::database::models::PractitionerIdentity;
use crate::database::PractitionerDirectory;

/// Resolves a practitioner's underlying account through the service-role store.
///
/// Fails closed: an error, a missing row, or a row without a linked account
/// all yield a [`ResolutionFallback`], never a partial identity.
#[derive(Clone)]
pub struct PrivilegedLookup {
    directory: Arc<dyn PractitionerDirectory>,
}

impl PrivilegedLookup {
    pub fn new(directory: Arc<dyn PractitionerDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, practitioner_id: Uuid) -> Result<PractitionerIdentity, ResolutionFallback> {
        let record = match self.directory.lookup(practitioner_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(ResolutionFallback::PractitionerNotFound),
            Err(e) => {
                tracing::warn!("Privileged lookup of practitioner {} failed: {}", practitioner_id, e);
                return Err(ResolutionFallback::LookupFailed);
            }
        };

        record.into_identity().ok_or(ResolutionFallback::AccountNotLinked)
    }
}
