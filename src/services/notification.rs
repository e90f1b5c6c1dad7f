//! Notification queue
//!
//! Replies that are not answers to an inbound message (payment results) are
//! queued here and delivered by whichever transport drains the receiver.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::handlers::Reply;

/// A reply addressed to a user outside the request/response cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub tenant_id: String,
    pub user_id: String,
    pub reply: Reply,
}

/// Sending half of the outbound queue
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<OutboundMessage>,
}

impl NotificationQueue {
    /// Create a queue and the receiver the transport drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a reply for delivery.
    ///
    /// Returns false when the transport side has shut down; the message is
    /// dropped in that case.
    pub fn enqueue(&self, tenant_id: &str, user_id: &str, reply: Reply) -> bool {
        let message = OutboundMessage {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            reply,
        };

        match self.sender.send(message) {
            Ok(()) => {
                debug!(tenant_id = tenant_id, user_id = user_id, "Outbound message queued");
                true
            }
            Err(_) => {
                warn!(tenant_id = tenant_id, user_id = user_id, "Outbound queue closed, message dropped");
                false
            }
        }
    }
}
