use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::notify::{dispatch, Notification, NotificationKind, Notifier};
use super::{not_found_as, ServiceError, ServiceResult};
use crate::database::{patch, ElementMatch, Filter, Repository};
use crate::models::{ChatMessage, FormResponse};

const MAX_MESSAGE_CHARS: usize = 4000;

/// Free-text conversation attached to a response.
#[derive(Clone)]
pub struct ChatService {
    responses: Repository<FormResponse>,
    notifier: Arc<dyn Notifier>,
}

impl ChatService {
    pub fn new(responses: Repository<FormResponse>, notifier: Arc<dyn Notifier>) -> Self {
        Self { responses, notifier }
    }

    /// Append a message. Timestamp is assigned here. The append is a single
    /// storage write, so concurrent posts to one response are all kept.
    pub async fn add_message(&self, response_id: &str, author: &str, text: &str) -> ServiceResult<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::validation("Message text is required"));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ServiceError::validation(format!(
                "Message exceeds {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let message = ChatMessage::new(author, text);
        let updated = self
            .responses
            .push_element(
                Filter::by_id(response_id),
                "messages",
                &message,
                patch(json!({"updated_at": Utc::now()})),
            )
            .await?;
        if updated == 0 {
            return Err(ServiceError::not_found("Response not found"));
        }

        dispatch(
            &self.notifier,
            Notification::new(
                NotificationKind::MessagePosted,
                response_id,
                format!("Nuevo mensaje de {}", message.author),
            ),
        );
        Ok(message)
    }

    pub async fn list(&self, response_id: &str) -> ServiceResult<Vec<ChatMessage>> {
        let response = self
            .responses
            .select_404(Filter::by_id(response_id))
            .await
            .map_err(not_found_as("Response not found"))?;
        Ok(response.messages)
    }

    /// Mark unread messages as read. With no scope this touches every
    /// response in the store. Returns the number of responses changed.
    pub async fn mark_all_read(&self, scope: Option<&str>) -> ServiceResult<u64> {
        let filter = match scope {
            Some(response_id) => Filter::by_id(response_id),
            None => Filter::all(),
        };
        let touched = self
            .responses
            .update_elements(filter, "messages", ElementMatch::by("read", false), patch(json!({"read": true})))
            .await?;
        info!(
            "Marked messages read in {} response(s) (scope: {})",
            touched,
            scope.unwrap_or("all")
        );
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResponseStatus;
    use crate::services::fixtures::Fixture;

    #[tokio::test]
    async fn messages_are_appended_unread() {
        let fx = Fixture::new();
        let r = fx.response(ResponseStatus::Pendiente).await;

        fx.chat.add_message(&r.id, "revisor", "Falta el RUT").await.unwrap();
        fx.chat.add_message(&r.id, "cliente", "  Ya lo agregué ").await.unwrap();
        let messages = fx.chat.list(&r.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "Ya lo agregué");
        assert!(messages.iter().all(|m| !m.read));

        assert!(matches!(
            fx.chat.add_message(&r.id, "x", "   ").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            fx.chat.add_message("missing", "x", "hola").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn mark_all_read_is_global_unless_scoped() {
        let fx = Fixture::new();
        let a = fx.response(ResponseStatus::Pendiente).await;
        let b = fx.response(ResponseStatus::Pendiente).await;
        fx.chat.add_message(&a.id, "x", "uno").await.unwrap();
        fx.chat.add_message(&b.id, "x", "dos").await.unwrap();

        assert_eq!(fx.chat.mark_all_read(Some(&a.id)).await.unwrap(), 1);
        assert!(fx.chat.list(&a.id).await.unwrap()[0].read);
        assert!(!fx.chat.list(&b.id).await.unwrap()[0].read);

        assert_eq!(fx.chat.mark_all_read(None).await.unwrap(), 1);
        assert!(fx.chat.list(&b.id).await.unwrap()[0].read);
        assert_eq!(fx.chat.mark_all_read(None).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_posts_are_all_kept() {
        let fx = Fixture::new();
        let r = fx.response(ResponseStatus::Pendiente).await;

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let chat = fx.chat.clone();
                let id = r.id.clone();
                tokio::spawn(async move { chat.add_message(&id, "revisor", &format!("mensaje {}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let messages = fx.chat.list(&r.id).await.unwrap();
        assert_eq!(messages.len(), 50);
        for i in 0..50 {
            let text = format!("mensaje {}", i);
            assert!(messages.iter().any(|m| m.text == text), "lost {}", text);
        }
    }
}
