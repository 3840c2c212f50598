//! SQLite-backed [`InquiryStore`].
//!
//! Reads go straight to the connection pool, each inside a read transaction
//! so a detail view never mixes two snapshots. Writes are funnelled through
//! the single-writer actor in [`super::writer`].
//!
//! Timestamps are stored as RFC 3339 UTC text with microsecond precision,
//! which sorts lexicographically in time order.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::store::InquiryStore;
use super::writer::{self, WriteOp};
use super::{
    new_id, validate_content, AppendOutcome, Inquiry, InquiryDraft, InquiryError, InquiryFilter,
    InquiryStatus, InquirySummary, Message, Page, PageRequest, Sender, StatusCounts,
    TerminalPolicy,
};

/// Writer channel capacity.
const WRITER_CHANNEL_CAPACITY: usize = 256;

/// Durable inquiry store.
pub struct SqliteInquiryStore {
    /// Connection pool for reads.
    db: SqlitePool,
    /// Channel to the single-writer actor.
    writer_tx: mpsc::Sender<WriteOp>,
    /// Writer actor join handle (held so we can await on shutdown).
    writer_handle: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for SqliteInquiryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteInquiryStore")
            .field("writer_closed", &self.writer_tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl SqliteInquiryStore {
    /// Wrap a migrated pool and spawn the writer actor.
    pub fn new(db: SqlitePool) -> Self {
        let (writer_tx, writer_rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(writer::run_writer(db.clone(), writer_rx));
        info!("sqlite inquiry store initialised");
        Self {
            db,
            writer_tx,
            writer_handle,
        }
    }

    /// Gracefully shut down the writer actor.
    ///
    /// Drops the sender channel and awaits the writer task to drain.
    pub async fn shutdown(self) {
        drop(self.writer_tx);
        let _ = self.writer_handle.await;
        info!("sqlite inquiry store shut down");
    }

    async fn submit<T>(
        &self,
        build: impl FnOnce(writer::Reply<T>) -> WriteOp,
    ) -> Result<T, InquiryError> {
        let (reply, rx) = oneshot::channel();
        self.writer_tx
            .send(build(reply))
            .await
            .map_err(|_| InquiryError::WriterClosed)?;
        rx.await.map_err(|_| InquiryError::WriterClosed)?
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Raw row tuple from the `inquiries` table.
type InquiryRow = (String, String, String, String, i64, String, String, String);

/// Raw row tuple from the `messages` table.
type MessageRow = (String, String, String, String, String);

/// Inquiry columns followed by the nullable columns of its newest message.
type SummaryRow = (
    String,
    String,
    String,
    String,
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

const INQUIRY_COLUMNS: &str =
    "id, name, email, product_id, quantity, status, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, inquiry_id, content, sender, created_at";

/// Current time truncated to the stored precision.
pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage.
pub(crate) fn to_db_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub(crate) fn parse_time(value: &str) -> Result<DateTime<Utc>, InquiryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| InquiryError::InvalidTimestamp {
            value: value.to_owned(),
            source,
        })
}

fn parse_quantity(raw: i64) -> Result<u32, InquiryError> {
    u32::try_from(raw)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| InquiryError::InvalidValue {
            field: "quantity",
            value: raw.to_string(),
        })
}

fn message_from_row(row: MessageRow) -> Result<Message, InquiryError> {
    let (id, inquiry_id, content, sender, created_at) = row;
    Ok(Message {
        id,
        inquiry_id,
        content,
        sender: Sender::parse(&sender)?,
        created_at: parse_time(&created_at)?,
    })
}

fn inquiry_from_row(row: InquiryRow, messages: Vec<Message>) -> Result<Inquiry, InquiryError> {
    let (id, name, email, product_id, quantity, status, created_at, updated_at) = row;
    Ok(Inquiry {
        id,
        name,
        email,
        product_id,
        quantity: parse_quantity(quantity)?,
        status: InquiryStatus::parse(&status)?,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
        messages,
    })
}

fn summary_from_row(row: SummaryRow) -> Result<InquirySummary, InquiryError> {
    let (
        id,
        name,
        email,
        product_id,
        quantity,
        status,
        created_at,
        updated_at,
        msg_id,
        msg_content,
        msg_sender,
        msg_created_at,
    ) = row;

    let latest_message = match (msg_id, msg_content, msg_sender, msg_created_at) {
        (Some(msg_id), Some(content), Some(sender), Some(msg_created_at)) => {
            Some(message_from_row((
                msg_id,
                id.clone(),
                content,
                sender,
                msg_created_at,
            ))?)
        }
        _ => None,
    };

    Ok(InquirySummary {
        id,
        name,
        email,
        product_id,
        quantity: parse_quantity(quantity)?,
        status: InquiryStatus::parse(&status)?,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
        latest_message,
    })
}

async fn fetch_messages(
    conn: &mut sqlx::SqliteConnection,
    inquiry_id: &str,
) -> Result<Vec<Message>, InquiryError> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE inquiry_id = ?1 ORDER BY created_at ASC, seq ASC"
    );
    let rows: Vec<MessageRow> = sqlx::query_as(&sql)
        .bind(inquiry_id)
        .fetch_all(conn)
        .await?;
    rows.into_iter().map(message_from_row).collect()
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl InquiryStore for SqliteInquiryStore {
    async fn create(&self, draft: InquiryDraft) -> Result<Inquiry, InquiryError> {
        let draft = draft.normalize()?;
        let now = now_micros();
        let id = new_id();
        let inquiry = Inquiry {
            id: id.clone(),
            name: draft.name,
            email: draft.email,
            product_id: draft.product_id,
            quantity: draft.quantity,
            status: InquiryStatus::Pending,
            created_at: now,
            updated_at: now,
            messages: vec![Message {
                id: new_id(),
                inquiry_id: id,
                content: draft.message,
                sender: Sender::Customer,
                created_at: now,
            }],
        };

        let to_store = Box::new(inquiry.clone());
        self.submit(|reply| WriteOp::CreateInquiry {
            inquiry: to_store,
            reply,
        })
        .await?;
        Ok(inquiry)
    }

    async fn get(&self, id: &str) -> Result<Option<Inquiry>, InquiryError> {
        let mut tx = self.db.begin().await?;

        let sql = format!("SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE id = ?1");
        let row: Option<InquiryRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let messages = fetch_messages(&mut tx, id).await?;
        tx.commit().await?;

        inquiry_from_row(row, messages).map(Some)
    }

    async fn list(
        &self,
        filter: InquiryFilter,
        page: PageRequest,
    ) -> Result<Page<InquirySummary>, InquiryError> {
        let status = filter.status.map(|s| s.as_str());
        let limit = i64::from(page.page_size());
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let mut tx = self.db.begin().await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT count(*) FROM inquiries WHERE (?1 IS NULL OR status = ?1)")
                .bind(status)
                .fetch_one(&mut *tx)
                .await?;

        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT i.id, i.name, i.email, i.product_id, i.quantity, i.status, \
                    i.created_at, i.updated_at, \
                    m.id, m.content, m.sender, m.created_at \
             FROM inquiries i \
             LEFT JOIN messages m ON m.seq = ( \
                 SELECT seq FROM messages \
                 WHERE inquiry_id = i.id \
                 ORDER BY created_at DESC, seq DESC \
                 LIMIT 1) \
             WHERE (?1 IS NULL OR i.status = ?1) \
             ORDER BY i.created_at DESC, i.id DESC \
             LIMIT ?2 OFFSET ?3",
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let items = rows
            .into_iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        // count(*) is always non-negative.
        Ok(Page::new(items, total.cast_unsigned(), page))
    }

    async fn append_message_with_policy(
        &self,
        inquiry_id: &str,
        content: &str,
        sender: Sender,
        policy: TerminalPolicy,
    ) -> Result<AppendOutcome, InquiryError> {
        validate_content(content)?;
        self.submit(|reply| WriteOp::AppendMessage {
            inquiry_id: inquiry_id.to_owned(),
            message_id: new_id(),
            content: content.to_owned(),
            sender,
            policy,
            reply,
        })
        .await
    }

    async fn set_status(&self, id: &str, status: InquiryStatus) -> Result<Inquiry, InquiryError> {
        self.submit(|reply| WriteOp::SetStatus {
            inquiry_id: id.to_owned(),
            status,
            reply,
        })
        .await?;
        self.get(id).await?.ok_or(InquiryError::NotFound)
    }

    async fn messages(&self, inquiry_id: &str) -> Result<Option<Vec<Message>>, InquiryError> {
        let mut tx = self.db.begin().await?;
        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM inquiries WHERE id = ?1")
            .bind(inquiry_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }
        let messages = fetch_messages(&mut tx, inquiry_id).await?;
        tx.commit().await?;
        Ok(Some(messages))
    }

    async fn count_by_status(&self) -> Result<StatusCounts, InquiryError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, count(*) FROM inquiries GROUP BY status")
                .fetch_all(&self.db)
                .await?;
        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(InquiryStatus::parse(&status)?, n.cast_unsigned());
        }
        Ok(counts)
    }
}
