use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::domain::{Notification, NotificationSender, SubscriberDirectory};
use crate::listings::Listing;

/// Unit of work handed from the request path to the delivery workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCreated {
    pub listing: Listing,
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// False when subscriber resolution failed and nothing was attempted.
    pub resolved: bool,
    pub delivered: usize,
    pub failed: usize,
}

/// Submit side of the notification queue. Cheap to clone; never blocks.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<ListingCreated>,
}

/// Receive side of the notification queue, consumed by [`DeliveryQueue::start`].
#[derive(Debug)]
pub struct DeliveryQueue {
    rx: mpsc::Receiver<ListingCreated>,
}

/// Build a bounded queue holding at most `capacity` pending creation events.
pub fn notification_channel(capacity: usize) -> (NotificationDispatcher, DeliveryQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (NotificationDispatcher { tx }, DeliveryQueue { rx })
}

impl NotificationDispatcher {
    /// Enqueue a notification for `listing`. Returns false when the event was
    /// dropped because the queue is full or the workers are gone.
    pub fn submit(&self, listing: &Listing) -> bool {
        let event = ListingCreated {
            listing: listing.clone(),
        };

        match self.tx.try_send(event) {
            Ok(()) => {
                debug!(listing_id = %listing.id, house_id = %listing.house_id, "notification queued");
                true
            }
            Err(TrySendError::Full(event)) => {
                warn!(
                    listing_id = %event.listing.id,
                    house_id = %event.listing.house_id,
                    "notification queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    listing_id = %event.listing.id,
                    house_id = %event.listing.house_id,
                    "notification workers stopped, dropping event"
                );
                false
            }
        }
    }
}

impl DeliveryQueue {
    /// Spawn `workers` tasks draining the queue until every dispatcher is dropped.
    pub fn start<D, N>(
        self,
        workers: usize,
        directory: Arc<D>,
        sender: Arc<N>,
    ) -> Vec<JoinHandle<()>>
    where
        D: SubscriberDirectory + ?Sized + 'static,
        N: NotificationSender + ?Sized + 'static,
    {
        let rx = Arc::new(Mutex::new(self.rx));

        (0..workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let directory = Arc::clone(&directory);
                let sender = Arc::clone(&sender);

                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(event) = next else {
                            break;
                        };
                        deliver(&event, directory.as_ref(), sender.as_ref()).await;
                    }
                    debug!(worker, "notification worker stopped");
                })
            })
            .collect()
    }

    /// Take the next pending event without waiting.
    pub fn try_next(&mut self) -> Option<ListingCreated> {
        self.rx.try_recv().ok()
    }
}

/// Resolve subscribers of the listing's house and attempt every delivery
/// independently. Failures are logged and counted, never propagated.
pub async fn deliver<D, N>(event: &ListingCreated, directory: &D, sender: &N) -> DeliveryReport
where
    D: SubscriberDirectory + ?Sized,
    N: NotificationSender + ?Sized,
{
    let listing = &event.listing;

    let contacts = match directory.subscribers(listing.house_id) {
        Ok(contacts) => contacts,
        Err(err) => {
            error!(
                listing_id = %listing.id,
                house_id = %listing.house_id,
                error = %err,
                "failed to resolve subscribers, abandoning notification"
            );
            return DeliveryReport::default();
        }
    };

    let notification = Notification::listing_created(listing);
    let notification = &notification;

    // A panicking sender counts as a failed delivery for that contact only.
    let outcomes = join_all(contacts.iter().map(|contact| async move {
        let outcome = AssertUnwindSafe(sender.send(contact, notification))
            .catch_unwind()
            .await;
        (contact, outcome)
    }))
    .await;

    let mut report = DeliveryReport {
        resolved: true,
        ..DeliveryReport::default()
    };

    for (contact, outcome) in outcomes {
        match outcome {
            Ok(Ok(())) => {
                report.delivered += 1;
                info!(listing_id = %listing.id, %contact, "notification delivered");
            }
            Ok(Err(err)) => {
                report.failed += 1;
                warn!(listing_id = %listing.id, %contact, error = %err, "notification delivery failed");
            }
            Err(_) => {
                report.failed += 1;
                error!(listing_id = %listing.id, %contact, "notification sender panicked");
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserId;
    use crate::listings::{HouseId, ListingId, ListingStatus, RepositoryError};
    use crate::notifications::{ContactAddress, NotificationError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn listing(house: i64) -> Listing {
        Listing {
            id: ListingId(42),
            house_id: HouseId(house),
            owner_id: UserId::generate(),
            number: 197,
            price: 8_900_000,
            rooms: 3,
            status: ListingStatus::Created,
            moderator_id: None,
        }
    }

    fn contact(raw: &str) -> ContactAddress {
        ContactAddress::parse(raw).expect("valid contact")
    }

    #[derive(Default)]
    struct Directory {
        houses: HashMap<HouseId, Vec<ContactAddress>>,
    }

    impl SubscriberDirectory for Directory {
        fn subscribers(&self, house: HouseId) -> Result<Vec<ContactAddress>, RepositoryError> {
            Ok(self.houses.get(&house).cloned().unwrap_or_default())
        }
    }

    struct BrokenDirectory;

    impl SubscriberDirectory for BrokenDirectory {
        fn subscribers(&self, _house: HouseId) -> Result<Vec<ContactAddress>, RepositoryError> {
            Err(RepositoryError::Unavailable("subscriptions offline".to_string()))
        }
    }

    #[derive(Default)]
    struct Outbox {
        failing: Vec<ContactAddress>,
        sent: StdMutex<Vec<(ContactAddress, Notification)>>,
    }

    impl Outbox {
        fn sent_to(&self) -> Vec<ContactAddress> {
            self.sent
                .lock()
                .expect("outbox mutex poisoned")
                .iter()
                .map(|(contact, _)| contact.clone())
                .collect()
        }
    }

    #[async_trait]
    impl NotificationSender for Outbox {
        async fn send(
            &self,
            contact: &ContactAddress,
            notification: &Notification,
        ) -> Result<(), NotificationError> {
            if self.failing.contains(contact) {
                return Err(NotificationError::Rejected(contact.clone()));
            }
            self.sent
                .lock()
                .expect("outbox mutex poisoned")
                .push((contact.clone(), notification.clone()));
            Ok(())
        }
    }

    fn house_seven() -> Directory {
        let mut directory = Directory::default();
        directory.houses.insert(
            HouseId(7),
            vec![contact("a@x.ru"), contact("b@x.ru")],
        );
        directory
    }

    #[tokio::test]
    async fn failed_delivery_does_not_block_siblings() {
        let outbox = Outbox {
            failing: vec![contact("a@x.ru")],
            ..Outbox::default()
        };
        let event = ListingCreated { listing: listing(7) };

        let report = deliver(&event, &house_seven(), &outbox).await;

        assert_eq!(
            report,
            DeliveryReport {
                resolved: true,
                delivered: 1,
                failed: 1
            }
        );
        assert_eq!(outbox.sent_to(), vec![contact("b@x.ru")]);
    }

    #[tokio::test]
    async fn message_describes_the_listing() {
        let outbox = Outbox::default();
        deliver(&ListingCreated { listing: listing(7) }, &house_seven(), &outbox).await;

        let sent = outbox.sent.lock().expect("outbox mutex poisoned");
        let (_, notification) = sent.first().expect("at least one send");
        assert_eq!(
            notification.body,
            "New flat added in house 7: number 197, price 8900000, rooms 3, status created"
        );
    }

    #[tokio::test]
    async fn unresolved_subscribers_abandon_dispatch() {
        let outbox = Outbox::default();
        let report = deliver(&ListingCreated { listing: listing(7) }, &BrokenDirectory, &outbox).await;

        assert!(!report.resolved);
        assert!(outbox.sent_to().is_empty());
    }

    #[tokio::test]
    async fn houses_without_subscribers_send_nothing() {
        let outbox = Outbox::default();
        let report = deliver(&ListingCreated { listing: listing(8) }, &house_seven(), &outbox).await;

        assert_eq!(
            report,
            DeliveryReport {
                resolved: true,
                delivered: 0,
                failed: 0
            }
        );
    }

    /// Sender that panics for one address and records the rest.
    #[derive(Default)]
    struct PanickyOutbox {
        fatal: Option<ContactAddress>,
        sent: StdMutex<Vec<ContactAddress>>,
    }

    #[async_trait]
    impl NotificationSender for PanickyOutbox {
        async fn send(
            &self,
            contact: &ContactAddress,
            _notification: &Notification,
        ) -> Result<(), NotificationError> {
            if self.fatal.as_ref() == Some(contact) {
                panic!("mail gateway client crashed");
            }
            self.sent
                .lock()
                .expect("outbox mutex poisoned")
                .push(contact.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn panicking_sender_only_fails_its_own_contact() {
        let outbox = PanickyOutbox {
            fatal: Some(contact("a@x.ru")),
            ..PanickyOutbox::default()
        };

        let report = deliver(&ListingCreated { listing: listing(7) }, &house_seven(), &outbox).await;

        assert_eq!(
            report,
            DeliveryReport {
                resolved: true,
                delivered: 1,
                failed: 1
            }
        );
        assert_eq!(
            *outbox.sent.lock().expect("outbox mutex poisoned"),
            vec![contact("b@x.ru")]
        );
    }

    #[tokio::test]
    async fn worker_survives_a_panicking_sender() {
        let (dispatcher, queue) = notification_channel(8);
        let outbox = Arc::new(PanickyOutbox {
            fatal: Some(contact("a@x.ru")),
            ..PanickyOutbox::default()
        });
        let handles = queue.start(1, Arc::new(house_seven()), Arc::clone(&outbox));

        assert!(dispatcher.submit(&listing(7)));
        assert!(dispatcher.submit(&listing(7)));
        drop(dispatcher);

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("worker finishes")
                .expect("worker does not panic");
        }

        assert_eq!(
            *outbox.sent.lock().expect("outbox mutex poisoned"),
            vec![contact("b@x.ru"), contact("b@x.ru")]
        );
    }

    #[test]
    fn submit_drops_events_when_queue_is_full() {
        let (dispatcher, mut queue) = notification_channel(1);
        assert!(dispatcher.submit(&listing(7)));
        assert!(!dispatcher.submit(&listing(7)));
        assert!(queue.try_next().is_some());
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn submit_reports_stopped_workers() {
        let (dispatcher, queue) = notification_channel(4);
        drop(queue);
        assert!(!dispatcher.submit(&listing(7)));
    }

    #[tokio::test]
    async fn workers_drain_submitted_events() {
        let (dispatcher, queue) = notification_channel(8);
        let outbox = Arc::new(Outbox::default());
        let handles = queue.start(2, Arc::new(house_seven()), Arc::clone(&outbox));

        assert!(dispatcher.submit(&listing(7)));
        drop(dispatcher);

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("worker finishes")
                .expect("worker does not panic");
        }

        let mut delivered = outbox.sent_to();
        delivered.sort_by(|left, right| left.as_str().cmp(right.as_str()));
        assert_eq!(delivered, vec![contact("a@x.ru"), contact("b@x.ru")]);
    }
}
