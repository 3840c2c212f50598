//! In-process [`InquiryStore`] backend.
//!
//! One [`RwLock`] guards the whole map, so an append and its automatic
//! status transition are observed together or not at all. Reads take the
//! shared lock and clone out, never handing out partially written records.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::trace;

use super::store::InquiryStore;
use super::{
    new_id, validate_content, AppendOutcome, Inquiry, InquiryDraft, InquiryError, InquiryFilter,
    InquiryStatus, InquirySummary, Message, Page, PageRequest, Sender, StatusCounts,
    TerminalPolicy,
};

/// Inquiry store held entirely in memory. Contents vanish on drop.
#[derive(Debug, Default)]
pub struct InMemoryInquiryStore {
    inquiries: RwLock<HashMap<String, Inquiry>>,
}

impl InMemoryInquiryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Current time, clamped to be no earlier than `floor`.
fn now_at_least(floor: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match floor {
        Some(floor) if floor > now => floor,
        _ => now,
    }
}

#[async_trait]
impl InquiryStore for InMemoryInquiryStore {
    async fn create(&self, draft: InquiryDraft) -> Result<Inquiry, InquiryError> {
        let draft = draft.normalize()?;
        let now = Utc::now();
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
                inquiry_id: id.clone(),
                content: draft.message,
                sender: Sender::Customer,
                created_at: now,
            }],
        };

        self.inquiries.write().await.insert(id, inquiry.clone());
        trace!(inquiry_id = %inquiry.id, "inquiry created");
        Ok(inquiry)
    }

    async fn get(&self, id: &str) -> Result<Option<Inquiry>, InquiryError> {
        Ok(self.inquiries.read().await.get(id).cloned())
    }

    async fn list(
        &self,
        filter: InquiryFilter,
        page: PageRequest,
    ) -> Result<Page<InquirySummary>, InquiryError> {
        let guard = self.inquiries.read().await;
        let mut matching: Vec<&Inquiry> = guard
            .values()
            .filter(|inquiry| filter.status.is_none_or(|status| inquiry.status == status))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.page_size()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(InquirySummary::from_inquiry)
            .collect();

        Ok(Page::new(items, total, page))
    }

    async fn append_message_with_policy(
        &self,
        inquiry_id: &str,
        content: &str,
        sender: Sender,
        policy: TerminalPolicy,
    ) -> Result<AppendOutcome, InquiryError> {
        validate_content(content)?;

        let mut guard = self.inquiries.write().await;
        let inquiry = guard.get_mut(inquiry_id).ok_or(InquiryError::NotFound)?;
        if policy == TerminalPolicy::Locked && inquiry.status.is_terminal() {
            return Err(InquiryError::Closed {
                status: inquiry.status,
            });
        }

        let created_at = now_at_least(inquiry.messages.last().map(|m| m.created_at));
        let message = Message {
            id: new_id(),
            inquiry_id: inquiry.id.clone(),
            content: content.to_owned(),
            sender,
            created_at,
        };
        inquiry.messages.push(message.clone());

        let transitioned = sender == Sender::Admin && inquiry.status == InquiryStatus::Pending;
        if transitioned {
            inquiry.status = InquiryStatus::Processing;
            inquiry.updated_at = created_at;
        }

        trace!(inquiry_id, sender = sender.as_str(), transitioned, "message appended");
        Ok(AppendOutcome {
            message,
            transitioned,
        })
    }

    async fn set_status(&self, id: &str, status: InquiryStatus) -> Result<Inquiry, InquiryError> {
        let mut guard = self.inquiries.write().await;
        let inquiry = guard.get_mut(id).ok_or(InquiryError::NotFound)?;
        inquiry.status = status;
        inquiry.updated_at = now_at_least(Some(inquiry.updated_at));
        trace!(inquiry_id = id, status = status.as_str(), "status set");
        Ok(inquiry.clone())
    }

    async fn messages(&self, inquiry_id: &str) -> Result<Option<Vec<Message>>, InquiryError> {
        Ok(self
            .inquiries
            .read()
            .await
            .get(inquiry_id)
            .map(|inquiry| inquiry.messages.clone()))
    }

    async fn count_by_status(&self) -> Result<StatusCounts, InquiryError> {
        let mut counts = StatusCounts::default();
        for inquiry in self.inquiries.read().await.values() {
            counts.add(inquiry.status, 1);
        }
        Ok(counts)
    }
}
