use crate::model::*;

use super::status::{Status, classify};
use super::{Engine, EngineError};

impl Engine {
    /// Snapshot of a resource's reservations in commit order. Unknown
    /// resources simply have none.
    pub async fn list_for_resource(&self, resource_id: ResourceId) -> Vec<Reservation> {
        match self.get_resource(&resource_id) {
            Some(rs) => rs.read().await.reservations.clone(),
            None => Vec::new(),
        }
    }

    /// Every reservation made by `owner_id`, across all resources.
    pub async fn list_for_owner(&self, owner_id: &str) -> Vec<Reservation> {
        let resources: Vec<_> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for rs in resources {
            let guard = rs.read().await;
            out.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| r.owner_id == owner_id)
                    .cloned(),
            );
        }
        out
    }

    pub async fn get(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let resource_id = self
            .get_resource_for_reservation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let guard = rs.read().await;
        guard.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Status as of the engine clock's today.
    pub async fn status(&self, id: ReservationId) -> Result<(Reservation, Status), EngineError> {
        let reservation = self.get(id).await?;
        let status = classify(&reservation, self.today());
        Ok((reservation, status))
    }

    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.state.iter().map(|e| *e.key()).collect()
    }
}
