//! Inquiry lifecycle and messaging.
//!
//! An [`Inquiry`] is a customer's pricing request for one product. It owns an
//! append-only thread of [`Message`]s authored by either side of the
//! conversation and moves through a small status machine:
//!
//! ```text
//! create ──► pending ──(first admin message)──► processing
//!               │                                   │
//!               └────── admin status update ────────┴──► completed | cancelled
//! ```
//!
//! Persistence lives behind [`store::InquiryStore`]; authorization in
//! [`access`]; orchestration in [`service::InquiryService`].

pub mod access;
pub mod memory;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod writer;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum message length, counted in Unicode scalar values.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Maximum submitter name length, counted in Unicode scalar values.
pub const MAX_NAME_CHARS: usize = 100;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of an inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    /// Submitted, no admin has answered yet.
    Pending,
    /// An admin is working on it.
    Processing,
    /// Closed successfully.
    Completed,
    /// Closed without a deal.
    Cancelled,
}

impl InquiryStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Returns the string representation stored in SQLite and used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from a text value.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::InvalidValue`] if the value is not a recognised status.
    pub fn parse(s: &str) -> Result<Self, InquiryError> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(InquiryError::InvalidValue {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }

    /// `completed` and `cancelled` end the explicit state machine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to appends once an inquiry is `completed` or `cancelled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalPolicy {
    /// Threads stay writable in every state.
    #[default]
    Open,
    /// Terminal inquiries reject new messages from both sides. Admins can
    /// still change the status, which reopens the thread.
    Locked,
}

/// Which side of the conversation authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Back-office staff.
    Admin,
    /// The person who submitted the inquiry.
    Customer,
}

impl Sender {
    /// Returns the string representation stored in SQLite and used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
        }
    }

    /// Parse from a text value.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::InvalidValue`] if the value is not a recognised sender.
    pub fn parse(s: &str) -> Result<Self, InquiryError> {
        match s {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            other => Err(InquiryError::InvalidValue {
                field: "sender",
                value: other.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single entry in an inquiry's conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque message id.
    pub id: String,
    /// Owning inquiry.
    pub inquiry_id: String,
    /// Message text (1..=1000 chars).
    pub content: String,
    /// Authoring party.
    pub sender: Sender,
    /// Creation time; never earlier than the previous message in the thread.
    pub created_at: DateTime<Utc>,
}

/// An inquiry with its full, chronologically ordered thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    /// Opaque inquiry id.
    pub id: String,
    /// Submitter name.
    pub name: String,
    /// Submitter email; the only ownership proof anonymous callers have.
    pub email: String,
    /// Referenced catalog product.
    pub product_id: String,
    /// Requested quantity, at least 1.
    pub quantity: u32,
    /// Current lifecycle status.
    pub status: InquiryStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change (or creation).
    pub updated_at: DateTime<Utc>,
    /// Thread in non-decreasing `created_at` order.
    pub messages: Vec<Message>,
}

/// List row: inquiry header plus the most recent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquirySummary {
    /// Opaque inquiry id.
    pub id: String,
    /// Submitter name.
    pub name: String,
    /// Submitter email.
    pub email: String,
    /// Referenced catalog product.
    pub product_id: String,
    /// Requested quantity.
    pub quantity: u32,
    /// Current lifecycle status.
    pub status: InquiryStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change (or creation).
    pub updated_at: DateTime<Utc>,
    /// Newest message in the thread.
    pub latest_message: Option<Message>,
}

impl InquirySummary {
    /// Build a list row from a full inquiry.
    pub fn from_inquiry(inquiry: &Inquiry) -> Self {
        Self {
            id: inquiry.id.clone(),
            name: inquiry.name.clone(),
            email: inquiry.email.clone(),
            product_id: inquiry.product_id.clone(),
            quantity: inquiry.quantity,
            status: inquiry.status,
            created_at: inquiry.created_at,
            updated_at: inquiry.updated_at,
            latest_message: inquiry.messages.last().cloned(),
        }
    }
}

/// Caller-supplied fields for a new inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InquiryDraft {
    /// Submitter name.
    pub name: String,
    /// Submitter email.
    pub email: String,
    /// Referenced catalog product.
    pub product_id: String,
    /// Requested quantity.
    pub quantity: u32,
    /// Opening customer message.
    pub message: String,
}

impl InquiryDraft {
    /// Trim contact fields and check every field against its rule.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::Validation`] naming the first offending field.
    pub fn normalize(self) -> Result<Self, InquiryError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(InquiryError::validation("name", "name is required"));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(InquiryError::validation(
                "name",
                format!("name must be at most {MAX_NAME_CHARS} characters"),
            ));
        }

        let email = self.email.trim().to_owned();
        if !is_valid_email(&email) {
            return Err(InquiryError::validation(
                "email",
                "a valid email address is required",
            ));
        }

        let product_id = self.product_id.trim().to_owned();
        if product_id.is_empty() {
            return Err(InquiryError::validation("productId", "productId is required"));
        }

        if self.quantity == 0 {
            return Err(InquiryError::validation(
                "quantity",
                "quantity must be at least 1",
            ));
        }

        validate_content(&self.message).map_err(|err| match err {
            InquiryError::Validation { message, .. } => InquiryError::Validation {
                field: "message",
                message,
            },
            other => other,
        })?;

        Ok(Self {
            name,
            email,
            product_id,
            quantity: self.quantity,
            message: self.message,
        })
    }
}

/// Optional list filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InquiryFilter {
    /// Only return inquiries in this status.
    pub status: Option<InquiryStatus>,
}

/// Validated 1-based page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Build a page request.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::Validation`] when `page` is zero or `page_size`
    /// is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Result<Self, InquiryError> {
        if page == 0 {
            return Err(InquiryError::validation("page", "page must be at least 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(InquiryError::validation(
                "limit",
                format!("limit must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        Ok(Self { page, page_size })
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Items per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)).saturating_mul(u64::from(self.page_size))
    }
}

/// One page of results plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Count of all items matching the filter.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// `ceil(total / page_size)`.
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page, deriving `total_pages`.
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            page_size: request.page_size(),
            total_pages: total.div_ceil(u64::from(request.page_size())),
        }
    }

    /// Transform the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Number of inquiries in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Inquiries awaiting a first admin reply.
    pub pending: u64,
    /// Inquiries being worked.
    pub processing: u64,
    /// Closed successfully.
    pub completed: u64,
    /// Closed without a deal.
    pub cancelled: u64,
}

impl StatusCounts {
    /// Add `n` to the bucket for `status`.
    pub fn add(&mut self, status: InquiryStatus, n: u64) {
        let slot = match status {
            InquiryStatus::Pending => &mut self.pending,
            InquiryStatus::Processing => &mut self.processing,
            InquiryStatus::Completed => &mut self.completed,
            InquiryStatus::Cancelled => &mut self.cancelled,
        };
        *slot = slot.saturating_add(n);
    }

    /// Sum over all statuses.
    pub fn total(&self) -> u64 {
        self.pending
            .saturating_add(self.processing)
            .saturating_add(self.completed)
            .saturating_add(self.cancelled)
    }
}

/// Result of appending a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The stored message.
    pub message: Message,
    /// `true` if this append moved the inquiry from `pending` to `processing`.
    pub transitioned: bool,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Check message content: non-blank and at most [`MAX_MESSAGE_CHARS`].
///
/// # Errors
///
/// Returns [`InquiryError::Validation`] for field `content`.
pub fn validate_content(content: &str) -> Result<(), InquiryError> {
    if content.trim().is_empty() {
        return Err(InquiryError::validation(
            "content",
            "message content must not be empty",
        ));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(InquiryError::validation(
            "content",
            format!("message content must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

/// Fresh opaque identifier.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from inquiry store operations.
#[derive(Debug, thiserror::Error)]
pub enum InquiryError {
    /// Caller input failed a field rule.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field (wire name).
        field: &'static str,
        /// Human-readable reason.
        message: String,
    },

    /// The referenced inquiry does not exist.
    #[error("inquiry not found")]
    NotFound,

    /// The thread is locked because the inquiry is closed.
    #[error("inquiry is {status} and no longer accepts messages")]
    Closed {
        /// Terminal status the inquiry was in.
        status: InquiryStatus,
    },

    /// A stored or supplied value is outside its domain.
    #[error("invalid {field} value: {value:?}")]
    InvalidValue {
        /// Which field contained the bad value.
        field: &'static str,
        /// The unexpected value.
        value: String,
    },

    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        /// Raw stored value.
        value: String,
        /// Parse failure.
        source: chrono::ParseError,
    },

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Write channel is closed (writer actor stopped).
    #[error("inquiry writer channel closed")]
    WriterClosed,
}

impl InquiryError {
    /// Shorthand for [`InquiryError::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
