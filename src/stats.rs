//! Back-office dashboard numbers.

use serde::{Deserialize, Serialize};

use crate::catalog::ProductCatalog;
use crate::inquiry::service::ServiceError;
use crate::inquiry::store::InquiryStore;
use crate::inquiry::StatusCounts;

/// Counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// All inquiries.
    pub inquiries_count: u64,
    /// Inquiries per status.
    pub inquiries_by_status: StatusCounts,
    /// Products in the catalog.
    pub products_count: u64,
}

/// Gather dashboard counts from the store and the catalog.
///
/// # Errors
///
/// Propagates store or catalog failures.
pub async fn collect(
    store: &dyn InquiryStore,
    catalog: &dyn ProductCatalog,
) -> Result<DashboardStats, ServiceError> {
    let by_status = store.count_by_status().await?;
    let products_count = catalog.count().await?;
    Ok(DashboardStats {
        inquiries_count: by_status.total(),
        inquiries_by_status: by_status,
        products_count,
    })
}
