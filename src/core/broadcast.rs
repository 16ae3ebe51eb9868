use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::core::store::types::{Communication, Feedback, Message, new_record_id};
use crate::core::store::{Collection, RecordStore, StoreError};

/// Newest-first message log and feedback log, both kept in `agent-messages.json`.
#[derive(Clone)]
pub struct Broadcaster {
    store: Arc<RecordStore>,
}

impl Broadcaster {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Stamp `message` with an id and the current time, then prepend it.
    pub async fn broadcast(&self, mut message: Message) -> Result<Message, StoreError> {
        let now = Utc::now();
        message.id = new_record_id("msg");
        message.timestamp = now;

        let stored = message.clone();
        self.store
            .update(Collection::Messages, |doc: &mut Communication| {
                doc.messages.insert(0, stored);
                doc.updated_at = Some(now);
                Ok::<_, StoreError>(())
            })
            .await?;
        debug!("Broadcast {} ({:?}) from {}", message.id, message.kind, message.from);
        Ok(message)
    }

    pub async fn record_feedback(&self, mut feedback: Feedback) -> Result<Feedback, StoreError> {
        let now = Utc::now();
        if feedback.id.is_empty() {
            feedback.id = new_record_id("fb");
        }
        feedback.timestamp = now;

        let stored = feedback.clone();
        self.store
            .update(Collection::Messages, |doc: &mut Communication| {
                doc.feedbacks.insert(0, stored);
                doc.updated_at = Some(now);
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_store;
    use crate::core::store::types::MessageKind;

    fn feedback(about: &str) -> Feedback {
        Feedback {
            id: String::new(),
            from: "Debugger".to_string(),
            to: "Explorer Agent".to_string(),
            about_task: about.to_string(),
            feedback: "Solid work".to_string(),
            rating: 4,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn broadcast_prepends_and_stamps() {
        let (_tmp, store) = test_store().await;
        let broadcaster = Broadcaster::new(store.clone());

        let first = broadcaster
            .broadcast(Message::new("system", MessageKind::System, "one"))
            .await
            .unwrap();
        let second = broadcaster
            .broadcast(Message::new("system", MessageKind::System, "two"))
            .await
            .unwrap();

        assert!(first.id.starts_with("msg_"));
        assert_ne!(first.id, second.id);

        let comm = store.communication().await;
        let contents: Vec<&str> = comm.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "one"]);
        assert!(comm.updated_at.is_some());
    }

    #[tokio::test]
    async fn message_and_feedback_logs_do_not_clobber_each_other() {
        let (_tmp, store) = test_store().await;
        let broadcaster = Broadcaster::new(store.clone());

        broadcaster.record_feedback(feedback("task_a")).await.unwrap();
        broadcaster
            .broadcast(Message::new("Debugger", MessageKind::Feedback, "Solid work"))
            .await
            .unwrap();
        let fb = broadcaster.record_feedback(feedback("task_b")).await.unwrap();
        assert!(fb.id.starts_with("fb_"));

        let comm = store.communication().await;
        assert_eq!(comm.messages.len(), 1);
        assert_eq!(comm.feedbacks.len(), 2);
        assert_eq!(comm.feedbacks[0].about_task, "task_b");
    }

    #[tokio::test]
    async fn concurrent_broadcasts_are_all_kept() {
        let (_tmp, store) = test_store().await;
        let broadcaster = Broadcaster::new(store.clone());
        let mut handles = Vec::new();
        for i in 0..10 {
            let b = broadcaster.clone();
            handles.push(tokio::spawn(async move {
                b.broadcast(Message::new("system", MessageKind::System, format!("n{}", i)))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.communication().await.messages.len(), 10);
    }
}
