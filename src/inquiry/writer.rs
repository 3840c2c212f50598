//! Single-writer actor for serialized SQLite inquiry writes.
//!
//! All mutations flow through this actor via an [`mpsc`] channel, and each
//! runs inside one transaction. Because only one write is in flight at a
//! time, the `pending -> processing` check-and-set on an admin reply can
//! never be observed or applied twice. Every op carries a [`oneshot`] reply
//! so callers see the outcome.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, trace};

use super::sqlite::{now_micros, parse_time, to_db_time};
use super::{
    AppendOutcome, Inquiry, InquiryError, InquiryStatus, Message, Sender, TerminalPolicy,
};

/// Reply half carried by each [`WriteOp`].
pub type Reply<T> = oneshot::Sender<Result<T, InquiryError>>;

/// Operations that can be sent to the write actor.
#[derive(Debug)]
pub enum WriteOp {
    /// Insert a fully built inquiry and its opening message.
    CreateInquiry {
        /// Inquiry with exactly one message.
        inquiry: Box<Inquiry>,
        /// Completion signal.
        reply: Reply<()>,
    },

    /// Append a message, applying the admin-reply status side effect.
    AppendMessage {
        /// Target inquiry.
        inquiry_id: String,
        /// Pre-assigned message id.
        message_id: String,
        /// Validated content.
        content: String,
        /// Authoring party.
        sender: Sender,
        /// Whether closed inquiries refuse the message.
        policy: TerminalPolicy,
        /// Receives the stored message.
        reply: Reply<AppendOutcome>,
    },

    /// Overwrite an inquiry's status.
    SetStatus {
        /// Target inquiry.
        inquiry_id: String,
        /// New status.
        status: InquiryStatus,
        /// Completion signal.
        reply: Reply<()>,
    },
}

/// Run the single-writer actor loop.
///
/// Processes [`WriteOp`] messages until the sender half is dropped. A write
/// that commits stays committed even if its caller has gone away.
pub async fn run_writer(db: SqlitePool, mut rx: mpsc::Receiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::CreateInquiry { inquiry, reply } => {
                let result = create_inquiry(&db, &inquiry).await;
                log_failure("create", &result);
                let _ = reply.send(result);
            }
            WriteOp::AppendMessage {
                inquiry_id,
                message_id,
                content,
                sender,
                policy,
                reply,
            } => {
                let pending = PendingMessage {
                    inquiry_id,
                    message_id,
                    content,
                    sender,
                };
                let result = append_message(&db, pending, policy).await;
                log_failure("append", &result);
                let _ = reply.send(result);
            }
            WriteOp::SetStatus {
                inquiry_id,
                status,
                reply,
            } => {
                let result = set_status(&db, &inquiry_id, status).await;
                log_failure("set_status", &result);
                let _ = reply.send(result);
            }
        }
    }
    trace!("inquiry writer actor stopped");
}

fn log_failure<T>(op: &'static str, result: &Result<T, InquiryError>) {
    if let Err(err @ (InquiryError::Database(_) | InquiryError::InvalidTimestamp { .. })) = result {
        error!(op, error = %err, "inquiry write failed");
    }
}

async fn create_inquiry(db: &SqlitePool, inquiry: &Inquiry) -> Result<(), InquiryError> {
    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO inquiries (id, name, email, product_id, quantity, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&inquiry.id)
    .bind(&inquiry.name)
    .bind(&inquiry.email)
    .bind(&inquiry.product_id)
    .bind(i64::from(inquiry.quantity))
    .bind(inquiry.status.as_str())
    .bind(to_db_time(inquiry.created_at))
    .bind(to_db_time(inquiry.updated_at))
    .execute(&mut *tx)
    .await?;

    for message in &inquiry.messages {
        insert_message(&mut tx, message).await?;
    }

    tx.commit().await?;
    trace!(inquiry_id = %inquiry.id, "inquiry created");
    Ok(())
}

async fn insert_message(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    message: &Message,
) -> Result<(), InquiryError> {
    sqlx::query(
        "INSERT INTO messages (id, inquiry_id, content, sender, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&message.id)
    .bind(&message.inquiry_id)
    .bind(&message.content)
    .bind(message.sender.as_str())
    .bind(to_db_time(message.created_at))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Message fields fixed before the write transaction starts.
struct PendingMessage {
    inquiry_id: String,
    message_id: String,
    content: String,
    sender: Sender,
}

async fn append_message(
    db: &SqlitePool,
    pending: PendingMessage,
    policy: TerminalPolicy,
) -> Result<AppendOutcome, InquiryError> {
    let PendingMessage {
        inquiry_id,
        message_id,
        content,
        sender,
    } = pending;
    let mut tx = db.begin().await?;

    let row: Option<(String, Option<String>)> = sqlx::query_as(
        "SELECT i.status, (SELECT max(m.created_at) FROM messages m WHERE m.inquiry_id = i.id) \
         FROM inquiries i WHERE i.id = ?1",
    )
    .bind(&inquiry_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((status, newest)) = row else {
        return Err(InquiryError::NotFound);
    };
    let status = InquiryStatus::parse(&status)?;
    if policy == TerminalPolicy::Locked && status.is_terminal() {
        return Err(InquiryError::Closed { status });
    }

    let floor: Option<DateTime<Utc>> = newest.as_deref().map(parse_time).transpose()?;
    let now = now_micros();
    let created_at = match floor {
        Some(floor) if floor > now => floor,
        _ => now,
    };

    let message = Message {
        id: message_id,
        inquiry_id,
        content,
        sender,
        created_at,
    };
    insert_message(&mut tx, &message).await?;

    let mut transitioned = false;
    if sender == Sender::Admin && status == InquiryStatus::Pending {
        let result = sqlx::query(
            "UPDATE inquiries SET status = 'processing', updated_at = ?2 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(&message.inquiry_id)
        .bind(to_db_time(created_at))
        .execute(&mut *tx)
        .await?;
        transitioned = result.rows_affected() == 1;
    }

    tx.commit().await?;
    trace!(
        inquiry_id = %message.inquiry_id,
        sender = sender.as_str(),
        transitioned,
        "message appended"
    );
    Ok(AppendOutcome {
        message,
        transitioned,
    })
}

async fn set_status(
    db: &SqlitePool,
    inquiry_id: &str,
    status: InquiryStatus,
) -> Result<(), InquiryError> {
    let result = sqlx::query("UPDATE inquiries SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(inquiry_id)
        .bind(status.as_str())
        .bind(to_db_time(now_micros()))
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(InquiryError::NotFound);
    }
    trace!(inquiry_id, status = status.as_str(), "status set");
    Ok(())
}
