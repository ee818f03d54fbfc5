//! Fire-and-forget notification dispatch.
//!
//! Request handlers enqueue notifications and move on; a small pool of
//! worker tasks delivers them with one retry. The channel is bounded, and
//! overflow drops the notification with a warning rather than slowing the
//! request path down.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::chat::ChatNotifier;
use crate::error::Result;
use crate::mailer::Mailer;

/// Backlog the channel holds before enqueues start dropping.
const QUEUE_CAPACITY: usize = 64;

/// Delivery worker tasks.
const WORKERS: usize = 3;

/// One queued notification.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A comment is waiting for review. Goes to the moderators.
    Pending {
        to: Vec<String>,
        comment_id: i64,
        article_id: String,
        author_name: String,
        content: String,
    },
    /// A submission was auto-flagged as spam. Goes to the moderators.
    SpamFlagged {
        to: Vec<String>,
        article_id: String,
        author_name: String,
        reasons: Vec<String>,
        content: String,
    },
    /// A comment went live. Goes to its author.
    Approved {
        to: String,
        author_name: String,
        article_id: String,
        content: String,
    },
    /// Someone answered a comment. Goes to the parent comment's author.
    Replied {
        to: String,
        parent_author: String,
        reply_author: String,
        article_id: String,
        reply_content: String,
    },
    /// Plain-text chat ping.
    Chat { text: String },
}

/// Handle for enqueueing notifications. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Notification>,
}

impl Dispatcher {
    /// Start the worker tasks and return the enqueue handle.
    ///
    /// Workers exit when every handle has been dropped and the backlog is
    /// drained.
    pub fn spawn(mailer: Mailer, chat: ChatNotifier) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..WORKERS {
            let rx = Arc::clone(&rx);
            let mailer = mailer.clone();
            let chat = chat.clone();

            tokio::spawn(async move {
                loop {
                    // Hold the lock only while waiting; deliveries run in
                    // parallel across workers.
                    let notification = { rx.lock().await.recv().await };
                    let Some(notification) = notification else { break };
                    deliver_with_retry(&mailer, &chat, &notification, worker).await;
                }
                debug!("Notification worker {} exiting", worker);
            });
        }

        Self { tx }
    }

    /// Enqueue a notification without waiting. Overflow is logged and the
    /// notification dropped.
    pub fn enqueue(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            warn!("Notification dropped: {}", e);
        }
    }
}

async fn deliver_with_retry(
    mailer: &Mailer,
    chat: &ChatNotifier,
    notification: &Notification,
    worker: usize,
) {
    if let Err(first) = deliver(mailer, chat, notification).await {
        debug!("Worker {}: delivery failed ({}), retrying", worker, first);
        if let Err(second) = deliver(mailer, chat, notification).await {
            warn!(
                "Worker {}: notification delivery failed after retry: {}",
                worker, second
            );
        }
    }
}

async fn deliver(mailer: &Mailer, chat: &ChatNotifier, notification: &Notification) -> Result<()> {
    match notification {
        Notification::Pending {
            to,
            comment_id,
            article_id,
            author_name,
            content,
        } => {
            mailer
                .send_pending_alert(to, *comment_id, article_id, author_name, content)
                .await
        }
        Notification::SpamFlagged {
            to,
            article_id,
            author_name,
            reasons,
            content,
        } => {
            mailer
                .send_spam_alert(to, article_id, author_name, reasons, content)
                .await
        }
        Notification::Approved {
            to,
            author_name,
            article_id,
            content,
        } => {
            mailer
                .send_approval_notice(to, author_name, article_id, content)
                .await
        }
        Notification::Replied {
            to,
            parent_author,
            reply_author,
            article_id,
            reply_content,
        } => {
            mailer
                .send_reply_notice(to, parent_author, reply_author, article_id, reply_content)
                .await
        }
        Notification::Chat { text } => chat.send(text).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riposte_core::TokenSigner;

    fn quiet_mailer() -> Mailer {
        Mailer::new(
            None,
            "Comments <no-reply@example.com>".to_string(),
            "https://blog.example".to_string(),
            TokenSigner::new("test-secret"),
        )
    }

    fn quiet_chat() -> ChatNotifier {
        ChatNotifier::new(None, None)
    }

    #[tokio::test]
    async fn test_deliver_handles_every_variant_unconfigured() {
        let mailer = quiet_mailer();
        let chat = quiet_chat();

        let notifications = vec![
            Notification::Pending {
                to: vec!["mod@example.com".to_string()],
                comment_id: 1,
                article_id: "post".to_string(),
                author_name: "Ada".to_string(),
                content: "<p>hi</p>".to_string(),
            },
            Notification::SpamFlagged {
                to: vec!["mod@example.com".to_string()],
                article_id: "post".to_string(),
                author_name: "Bot".to_string(),
                reasons: vec!["too_many_links".to_string()],
                content: "<p>buy</p>".to_string(),
            },
            Notification::Approved {
                to: "ada@example.com".to_string(),
                author_name: "Ada".to_string(),
                article_id: "post".to_string(),
                content: "<p>hi</p>".to_string(),
            },
            Notification::Replied {
                to: "ada@example.com".to_string(),
                parent_author: "Ada".to_string(),
                reply_author: "Bea".to_string(),
                article_id: "post".to_string(),
                reply_content: "<p>welcome</p>".to_string(),
            },
            Notification::Chat {
                text: "new comment".to_string(),
            },
        ];

        for notification in &notifications {
            deliver(&mailer, &chat, notification).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_enqueue_never_blocks() {
        let dispatcher = Dispatcher::spawn(quiet_mailer(), quiet_chat());

        for i in 0..100 {
            dispatcher.enqueue(Notification::Chat {
                text: format!("ping {}", i),
            });
        }
    }
}
