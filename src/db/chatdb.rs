// db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::{DBClient, PgTx};
use crate::models::chatmodel::*;

#[async_trait]
pub trait ChatExt {
    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, Error>;

    async fn get_conversation_by_project(&self, project_id: Uuid) -> Result<Option<Conversation>, Error>;

    /// Messages in chronological order. Blocked records only show up for their sender.
    async fn get_messages(
        &self,
        conversation_id: Uuid,
        viewer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error>;

    async fn get_message_flags(&self, message_id: Uuid) -> Result<Vec<MessageFlag>, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_conversation_by_project(&self, project_id: Uuid) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        viewer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
              AND (is_blocked = FALSE OR sender_id = $2)
            ORDER BY created_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(conversation_id)
        .bind(viewer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_message_flags(&self, message_id: Uuid) -> Result<Vec<MessageFlag>, Error> {
        sqlx::query_as::<_, MessageFlag>(
            "SELECT * FROM message_flags WHERE message_id = $1 ORDER BY created_at",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
    }
}

pub async fn upsert_conversation(
    tx: &mut PgTx<'_>,
    project_id: Uuid,
    client_id: Uuid,
    freelancer_id: Uuid,
) -> Result<Conversation, Error> {
    sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (project_id, client_id, freelancer_id, escrow_active)
        VALUES ($1, $2, $3, FALSE)
        ON CONFLICT (project_id) DO UPDATE SET freelancer_id = EXCLUDED.freelancer_id
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(client_id)
    .bind(freelancer_id)
    .fetch_one(&mut **tx)
    .await
}

/// Unlocks the full chat for a project once its escrow is paid.
pub async fn activate_conversation(tx: &mut PgTx<'_>, project_id: Uuid) -> Result<u64, Error> {
    let result = sqlx::query("UPDATE conversations SET escrow_active = TRUE WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_message(
    tx: &mut PgTx<'_>,
    conversation_id: Uuid,
    sender_id: Uuid,
    message_type: MessageType,
    content: &str,
    original_content: Option<&str>,
    is_blocked: bool,
) -> Result<Message, Error> {
    sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (
            conversation_id, sender_id, message_type, content, original_content, is_blocked
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(conversation_id)
    .bind(sender_id)
    .bind(message_type)
    .bind(content)
    .bind(original_content)
    .bind(is_blocked)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_message_flag(
    tx: &mut PgTx<'_>,
    message_id: Uuid,
    flag_type: FlagType,
    matched_content: &str,
) -> Result<MessageFlag, Error> {
    sqlx::query_as::<_, MessageFlag>(
        r#"
        INSERT INTO message_flags (message_id, flag_type, matched_content)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(message_id)
    .bind(flag_type)
    .bind(matched_content)
    .fetch_one(&mut **tx)
    .await
}

pub async fn touch_conversation(tx: &mut PgTx<'_>, conversation_id: Uuid) -> Result<(), Error> {
    sqlx::query("UPDATE conversations SET last_message_at = NOW() WHERE id = $1")
        .bind(conversation_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
