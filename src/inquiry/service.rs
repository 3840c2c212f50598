//! Inquiry orchestration: validation, access checks, terminal-state policy.
//!
//! Handlers talk only to [`InquiryService`]. It never retries; every error is
//! final for the call and surfaces as a [`ServiceError`] kind.
//!
//! Non-admin callers get [`ServiceError::Unauthorized`] both when the
//! inquiry is missing and when their email does not match, so a caller
//! cannot tell the two apart. Admins get [`ServiceError::NotFound`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::access::{self, Caller, Denied};
use super::store::InquiryStore;
pub use super::TerminalPolicy;
use super::{
    validate_content, Inquiry, InquiryDraft, InquiryError, InquiryFilter, InquiryStatus,
    InquirySummary, Message, Page, PageRequest, Sender,
};
use crate::catalog::{CatalogError, ProductCatalog, ProductSummary};
use crate::stats::{self, DashboardStats};

/// Errors surfaced to callers of the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller input failed a field rule.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field (wire name).
        field: &'static str,
        /// Human-readable reason.
        message: String,
    },

    /// The inquiry or product does not exist.
    #[error("not found")]
    NotFound,

    /// Missing admin session and missing or wrong email proof.
    #[error("unauthorized")]
    Unauthorized,

    /// The inquiry's state forbids the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store failure.
    #[error(transparent)]
    Store(InquiryError),

    /// Catalog failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<InquiryError> for ServiceError {
    fn from(err: InquiryError) -> Self {
        match err {
            InquiryError::Validation { field, message } => Self::Validation { field, message },
            InquiryError::NotFound => Self::NotFound,
            InquiryError::Closed { status } => Self::Conflict(format!(
                "inquiry is {status} and no longer accepts messages"
            )),
            other => Self::Store(other),
        }
    }
}

impl From<Denied> for ServiceError {
    fn from(_: Denied) -> Self {
        Self::Unauthorized
    }
}

/// Inquiry with its product resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryDetail {
    /// The inquiry and its thread.
    #[serde(flatten)]
    pub inquiry: Inquiry,
    /// Product summary; `None` if it has since left the catalog.
    pub product: Option<ProductSummary>,
}

/// List row with its product resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryListItem {
    /// Inquiry header and newest message.
    #[serde(flatten)]
    pub summary: InquirySummary,
    /// Product summary; `None` if it has since left the catalog.
    pub product: Option<ProductSummary>,
}

/// Fields of a message append request, before parsing.
#[derive(Debug, Clone, Copy)]
pub struct AppendRequest<'a> {
    /// Message text.
    pub content: &'a str,
    /// Claimed sender tag (`admin` or `customer`).
    pub sender: &'a str,
    /// Ownership proof for non-admin callers.
    pub email: Option<&'a str>,
}

/// Entry point for every inquiry operation.
#[derive(Clone)]
pub struct InquiryService {
    store: Arc<dyn InquiryStore>,
    catalog: Arc<dyn ProductCatalog>,
    terminal_policy: TerminalPolicy,
}

impl std::fmt::Debug for InquiryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InquiryService")
            .field("terminal_policy", &self.terminal_policy)
            .finish_non_exhaustive()
    }
}

impl InquiryService {
    /// Build a service over a store and a catalog.
    pub fn new(
        store: Arc<dyn InquiryStore>,
        catalog: Arc<dyn ProductCatalog>,
        terminal_policy: TerminalPolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            terminal_policy,
        }
    }

    /// Active terminal-state policy.
    pub fn terminal_policy(&self) -> TerminalPolicy {
        self.terminal_policy
    }

    /// Submit a new inquiry. Public; not idempotent.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for bad fields, [`ServiceError::NotFound`]
    /// if the product is not in the catalog.
    pub async fn create(&self, draft: InquiryDraft) -> Result<InquiryDetail, ServiceError> {
        let draft = draft.normalize()?;
        let Some(product) = self.catalog.get(&draft.product_id).await? else {
            debug!(product_id = %draft.product_id, "inquiry for unknown product");
            return Err(ServiceError::NotFound);
        };

        let inquiry = self.store.create(draft).await?;
        info!(
            inquiry_id = %inquiry.id,
            product_id = %inquiry.product_id,
            quantity = inquiry.quantity,
            "inquiry created"
        );
        Ok(InquiryDetail {
            inquiry,
            product: Some(product),
        })
    }

    /// Page through inquiries, newest first. Admin only.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Unauthorized`] for non-admin callers.
    pub async fn list(
        &self,
        caller: Caller,
        filter: InquiryFilter,
        page: PageRequest,
    ) -> Result<Page<InquiryListItem>, ServiceError> {
        access::require_admin(caller)?;
        let page = self.store.list(filter, page).await?;

        let mut products: HashMap<String, Option<ProductSummary>> = HashMap::new();
        for item in &page.items {
            if !products.contains_key(&item.product_id) {
                let product = self.catalog.get(&item.product_id).await?;
                products.insert(item.product_id.clone(), product);
            }
        }

        debug!(
            status = filter.status.map(|s| s.as_str()),
            page = page.page,
            total = page.total,
            "inquiries listed"
        );
        Ok(page.map(|summary| {
            let product = products.get(&summary.product_id).cloned().flatten();
            InquiryListItem { summary, product }
        }))
    }

    /// Inquiry detail with its ordered thread.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Unauthorized`] without admin session or matching
    /// email; [`ServiceError::NotFound`] for admins when the id is unknown.
    pub async fn get(
        &self,
        caller: Caller,
        id: &str,
        email: Option<&str>,
    ) -> Result<InquiryDetail, ServiceError> {
        let inquiry = self.load(caller, id, email).await?;
        access::authorize_read(caller, email, &inquiry.email)?;
        let product = self.catalog.get(&inquiry.product_id).await?;
        Ok(InquiryDetail { inquiry, product })
    }

    /// Thread only, oldest first. Same access rule as [`Self::get`].
    ///
    /// # Errors
    ///
    /// As [`Self::get`].
    pub async fn messages(
        &self,
        caller: Caller,
        id: &str,
        email: Option<&str>,
    ) -> Result<Vec<Message>, ServiceError> {
        let inquiry = self.load(caller, id, email).await?;
        access::authorize_read(caller, email, &inquiry.email)?;
        Ok(inquiry.messages)
    }

    /// Set any of the four statuses. Admin only.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Unauthorized`] for non-admins,
    /// [`ServiceError::Validation`] for an unknown status,
    /// [`ServiceError::NotFound`] for an unknown id.
    pub async fn update_status(
        &self,
        caller: Caller,
        id: &str,
        status: &str,
    ) -> Result<InquiryDetail, ServiceError> {
        access::require_admin(caller)?;
        let status = InquiryStatus::parse(status).map_err(|_| {
            ServiceError::validation(
                "status",
                "status must be one of pending, processing, completed, cancelled",
            )
        })?;

        let inquiry = self.store.set_status(id, status).await?;
        info!(
            inquiry_id = id,
            caller = caller.as_str(),
            status = status.as_str(),
            "inquiry status updated"
        );
        let product = self.catalog.get(&inquiry.product_id).await?;
        Ok(InquiryDetail { inquiry, product })
    }

    /// Post to an inquiry's thread.
    ///
    /// An admin message on a `pending` inquiry moves it to `processing`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for unknown sender or bad content,
    /// [`ServiceError::Unauthorized`] when the caller lacks the proof for the
    /// claimed sender, [`ServiceError::NotFound`] for admins on an unknown id,
    /// [`ServiceError::Conflict`] when the terminal policy locks the thread.
    pub async fn append_message(
        &self,
        caller: Caller,
        id: &str,
        request: AppendRequest<'_>,
    ) -> Result<Message, ServiceError> {
        let sender = Sender::parse(request.sender).map_err(|_| {
            ServiceError::validation("sender", "sender must be admin or customer")
        })?;
        validate_content(request.content)?;

        let inquiry = self.load(caller, id, request.email).await?;
        access::authorize_append(caller, request.email, &inquiry.email, sender)?;

        let outcome = match self
            .store
            .append_message_with_policy(id, request.content, sender, self.terminal_policy)
            .await
        {
            Ok(outcome) => outcome,
            Err(InquiryError::Closed { status }) => {
                warn!(
                    inquiry_id = id,
                    caller = caller.as_str(),
                    status = status.as_str(),
                    "append rejected on closed inquiry"
                );
                return Err(InquiryError::Closed { status }.into());
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            inquiry_id = id,
            caller = caller.as_str(),
            sender = sender.as_str(),
            transitioned = outcome.transitioned,
            "message appended"
        );
        Ok(outcome.message)
    }

    /// Dashboard numbers. Admin only.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Unauthorized`] for non-admin callers.
    pub async fn stats(&self, caller: Caller) -> Result<DashboardStats, ServiceError> {
        access::require_admin(caller)?;
        stats::collect(self.store.as_ref(), self.catalog.as_ref()).await
    }

    /// Fetch an inquiry, hiding existence from callers without a proof.
    async fn load(
        &self,
        caller: Caller,
        id: &str,
        email: Option<&str>,
    ) -> Result<Inquiry, ServiceError> {
        if !caller.is_admin() && email.is_none() {
            debug!(inquiry_id = id, caller = caller.as_str(), "no ownership proof supplied");
            return Err(ServiceError::Unauthorized);
        }
        match self.store.get(id).await? {
            Some(inquiry) => Ok(inquiry),
            None if caller.is_admin() => Err(ServiceError::NotFound),
            None => Err(ServiceError::Unauthorized),
        }
    }
}
