//! In-process domain events.
//!
//! Services publish through [`EventSender`]; a single [`process_events`] task
//! consumes them. Delivery is best effort: a full or closed channel only logs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::OrderStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    OrderPlaced {
        order_id: Uuid,
        wilaya: String,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    DeliveryPricesUpdated {
        count: usize,
    },
    ImageUploaded {
        path: String,
    },
    AdminSignedIn {
        user_id: Uuid,
        at: DateTime<Utc>,
    },
}

/// Cloneable handle for publishing events.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Channel pair with the given capacity.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Publishes without waiting; drops the event with a warning when the channel is full or closed.
    pub fn send_or_log(&self, event: Event) {
        if let Err(err) = self.sender.try_send(event) {
            warn!("Dropping domain event: {}", err);
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPlaced {
                order_id,
                wilaya,
                total,
            } => {
                metrics::counter!("mobistore.orders.placed", 1);
                info!(%order_id, %wilaya, %total, "New order received");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "Order status changed");
            }
            other => info!("Received event: {:?}", other),
        }
    }

    info!("Event channel closed; stopping event processing loop");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_the_receiver() {
        let (sender, mut rx) = EventSender::channel(4);
        let id = Uuid::new_v4();
        sender.send_or_log(Event::ProductCreated(id));
        assert_eq!(rx.recv().await, Some(Event::ProductCreated(id)));
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let (sender, mut rx) = EventSender::channel(1);
        sender.send_or_log(Event::ProductDeleted(Uuid::nil()));
        sender.send_or_log(Event::ProductDeleted(Uuid::nil()));
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
