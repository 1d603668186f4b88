use async_trait::async_trait;
use flat_registry::listings::{HouseId, RepositoryError};
use flat_registry::notifications::{
    ContactAddress, Notification, NotificationError, NotificationSender, SubscriberDirectory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// House subscriptions kept in process memory.
#[derive(Default, Clone)]
pub(crate) struct InMemorySubscriptions {
    houses: Arc<Mutex<HashMap<HouseId, Vec<ContactAddress>>>>,
}

impl InMemorySubscriptions {
    fn guard(&self) -> Result<MutexGuard<'_, HashMap<HouseId, Vec<ContactAddress>>>, RepositoryError> {
        self.houses
            .lock()
            .map_err(|_| RepositoryError::Unavailable("subscription lock poisoned".to_string()))
    }

    /// Append `contact` to the house's subscriber list. Returns false when it
    /// was already subscribed.
    pub(crate) fn subscribe(
        &self,
        house: HouseId,
        contact: ContactAddress,
    ) -> Result<bool, RepositoryError> {
        let mut houses = self.guard()?;
        let subscribers = houses.entry(house).or_default();
        if subscribers.contains(&contact) {
            return Ok(false);
        }
        subscribers.push(contact);
        Ok(true)
    }
}

impl SubscriberDirectory for InMemorySubscriptions {
    fn subscribers(&self, house: HouseId) -> Result<Vec<ContactAddress>, RepositoryError> {
        Ok(self.guard()?.get(&house).cloned().unwrap_or_default())
    }
}

/// Stand-in mail gateway that writes each outbound message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingMailSender;

#[async_trait]
impl NotificationSender for TracingMailSender {
    async fn send(
        &self,
        contact: &ContactAddress,
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        info!(
            %contact,
            house_id = %notification.house_id,
            listing_id = %notification.listing_id,
            subject = %notification.subject,
            body = %notification.body,
            "outbound mail"
        );
        Ok(())
    }
}
