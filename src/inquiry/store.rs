//! Storage contract for inquiries and their message threads.
//!
//! Both backends ([`SqliteInquiryStore`](super::sqlite::SqliteInquiryStore)
//! and [`InMemoryInquiryStore`](super::memory::InMemoryInquiryStore)) satisfy
//! the same contract:
//!
//! - `create` always yields `status = pending` and exactly one customer message.
//! - Threads are returned in non-decreasing `created_at` order.
//! - `list` orders by `created_at` descending (ties by id) and reports the
//!   unpaginated `total`.
//! - `append_message` by an admin on a `pending` inquiry moves it to
//!   `processing` atomically with the insert. No other append changes status.
//! - `append_message_with_policy` under [`TerminalPolicy::Locked`] refuses
//!   closed inquiries inside the same atomic step as the insert, so a
//!   concurrent status change cannot slip a message past the lock.
//! - `set_status` accepts any target status; transition policy is the caller's.

use async_trait::async_trait;

use super::{
    AppendOutcome, Inquiry, InquiryDraft, InquiryError, InquiryFilter, InquiryStatus,
    InquirySummary, Message, Page, PageRequest, Sender, StatusCounts, TerminalPolicy,
};

/// Persistent record of inquiries and messages.
#[async_trait]
pub trait InquiryStore: Send + Sync {
    /// Create a `pending` inquiry with one customer message.
    ///
    /// The draft is normalized before insertion. Product existence is the
    /// caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::Validation`] for an invalid draft.
    async fn create(&self, draft: InquiryDraft) -> Result<Inquiry, InquiryError>;

    /// Fetch an inquiry with its full thread, or `None` if it does not exist.
    async fn get(&self, id: &str) -> Result<Option<Inquiry>, InquiryError>;

    /// One page of inquiries, newest first.
    async fn list(
        &self,
        filter: InquiryFilter,
        page: PageRequest,
    ) -> Result<Page<InquirySummary>, InquiryError>;

    /// Append a message to an inquiry's thread.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::NotFound`] if the inquiry does not exist, or
    /// [`InquiryError::Validation`] if `content` is blank or too long. On
    /// error nothing is written.
    async fn append_message(
        &self,
        inquiry_id: &str,
        content: &str,
        sender: Sender,
    ) -> Result<AppendOutcome, InquiryError> {
        self.append_message_with_policy(inquiry_id, content, sender, TerminalPolicy::Open)
            .await
    }

    /// [`Self::append_message`], refusing closed inquiries under
    /// [`TerminalPolicy::Locked`].
    ///
    /// # Errors
    ///
    /// As [`Self::append_message`], plus [`InquiryError::Closed`] when the
    /// policy is `Locked` and the inquiry is `completed` or `cancelled`.
    async fn append_message_with_policy(
        &self,
        inquiry_id: &str,
        content: &str,
        sender: Sender,
        policy: TerminalPolicy,
    ) -> Result<AppendOutcome, InquiryError>;

    /// Overwrite the status and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`InquiryError::NotFound`] if the inquiry does not exist.
    async fn set_status(&self, id: &str, status: InquiryStatus) -> Result<Inquiry, InquiryError>;

    /// Thread only, or `None` if the inquiry does not exist.
    async fn messages(&self, inquiry_id: &str) -> Result<Option<Vec<Message>>, InquiryError>;

    /// Inquiry counts per status.
    async fn count_by_status(&self) -> Result<StatusCounts, InquiryError>;
}
