//! Tests for `src/inquiry/service.rs`: access, sender binding, terminal policy.

use std::sync::Arc;

use inquirydesk::catalog::StaticCatalog;
use inquirydesk::inquiry::access::Caller;
use inquirydesk::inquiry::memory::InMemoryInquiryStore;
use inquirydesk::inquiry::store::InquiryStore;
use inquirydesk::inquiry::service::{AppendRequest, InquiryService, ServiceError, TerminalPolicy};
use inquirydesk::inquiry::{InquiryDraft, InquiryFilter, InquiryStatus, PageRequest, Sender};

const OWNER: &str = "a@x.com";

fn service(policy: TerminalPolicy) -> InquiryService {
    let catalog = StaticCatalog::new([("p1", "Steel bolts"), ("p2", "Copper wire")]);
    InquiryService::new(
        Arc::new(InMemoryInquiryStore::new()),
        Arc::new(catalog),
        policy,
    )
}

fn draft() -> InquiryDraft {
    InquiryDraft {
        name: "Ada Buyer".to_owned(),
        email: OWNER.to_owned(),
        product_id: "p1".to_owned(),
        quantity: 5,
        message: "interested".to_owned(),
    }
}

async fn create(svc: &InquiryService) -> String {
    svc.create(draft()).await.expect("create").inquiry.id
}

fn as_admin(content: &str) -> AppendRequest<'_> {
    AppendRequest {
        content,
        sender: "admin",
        email: None,
    }
}

fn as_owner(content: &str) -> AppendRequest<'_> {
    AppendRequest {
        content,
        sender: "customer",
        email: Some(OWNER),
    }
}

#[tokio::test]
async fn create_resolves_product() {
    let svc = service(TerminalPolicy::Open);
    let detail = svc.create(draft()).await.expect("create");
    let product = detail.product.expect("product should be attached");
    assert_eq!(product.name, "Steel bolts");
    assert_eq!(detail.inquiry.status, InquiryStatus::Pending);
}

#[tokio::test]
async fn create_with_unknown_product_is_not_found() {
    let svc = service(TerminalPolicy::Open);
    let mut bad = draft();
    bad.product_id = "nope".to_owned();
    assert!(matches!(svc.create(bad).await, Err(ServiceError::NotFound)));

    let page = svc
        .list(
            Caller::Admin,
            InquiryFilter::default(),
            PageRequest::new(1, 10).expect("page"),
        )
        .await
        .expect("list");
    assert_eq!(page.total, 0, "nothing should be stored");
}

#[tokio::test]
async fn create_reports_field_errors() {
    let svc = service(TerminalPolicy::Open);
    let mut bad = draft();
    bad.name = "   ".to_owned();
    match svc.create(bad).await {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "name"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn example_scenario_through_service() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;

    svc.append_message(Caller::Admin, &id, as_admin("what's your target price?"))
        .await
        .expect("admin append");
    let detail = svc.get(Caller::Admin, &id, None).await.expect("get");
    assert_eq!(detail.inquiry.status, InquiryStatus::Processing);
    assert_eq!(detail.inquiry.messages.len(), 2);

    let message = svc
        .append_message(Caller::Anonymous, &id, as_owner("$10/unit"))
        .await
        .expect("owner append");
    assert_eq!(message.sender, Sender::Customer);
    let detail = svc.get(Caller::Anonymous, &id, Some(OWNER)).await.expect("get");
    assert_eq!(detail.inquiry.status, InquiryStatus::Processing);
    assert_eq!(detail.inquiry.messages.len(), 3);

    let detail = svc
        .update_status(Caller::Admin, &id, "completed")
        .await
        .expect("update status");
    assert_eq!(detail.inquiry.status, InquiryStatus::Completed);
    assert_eq!(detail.inquiry.messages.len(), 3);
}

#[tokio::test]
async fn wrong_email_is_unauthorized_for_read_and_append() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;

    for caller in [Caller::Anonymous, Caller::Customer] {
        for email in [Some("b@x.com"), Some("A@X.COM"), None] {
            assert!(matches!(
                svc.get(caller, &id, email).await,
                Err(ServiceError::Unauthorized)
            ));
            assert!(matches!(
                svc.messages(caller, &id, email).await,
                Err(ServiceError::Unauthorized)
            ));
            let request = AppendRequest {
                content: "hello",
                sender: "customer",
                email,
            };
            assert!(matches!(
                svc.append_message(caller, &id, request).await,
                Err(ServiceError::Unauthorized)
            ));
        }
    }

    let messages = svc.messages(Caller::Admin, &id, None).await.expect("messages");
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn missing_inquiry_does_not_leak_existence() {
    let svc = service(TerminalPolicy::Open);
    assert!(matches!(
        svc.get(Caller::Anonymous, "missing", Some(OWNER)).await,
        Err(ServiceError::Unauthorized)
    ));
    assert!(matches!(
        svc.append_message(Caller::Anonymous, "missing", as_owner("hi"))
            .await,
        Err(ServiceError::Unauthorized)
    ));
    assert!(matches!(
        svc.get(Caller::Admin, "missing", None).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        svc.update_status(Caller::Admin, "missing", "completed").await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn sender_tag_must_match_proof() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;

    // Email owner claiming to be admin.
    let forged = AppendRequest {
        content: "approved!",
        sender: "admin",
        email: Some(OWNER),
    };
    assert!(matches!(
        svc.append_message(Caller::Anonymous, &id, forged).await,
        Err(ServiceError::Unauthorized)
    ));

    // Admin posting under the customer tag.
    assert!(matches!(
        svc.append_message(Caller::Admin, &id, as_owner("from the buyer"))
            .await,
        Err(ServiceError::Unauthorized)
    ));

    let detail = svc.get(Caller::Admin, &id, None).await.expect("get");
    assert_eq!(detail.inquiry.status, InquiryStatus::Pending);
    assert_eq!(detail.inquiry.messages.len(), 1);
}

#[tokio::test]
async fn bad_sender_and_content_are_validation_errors() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;

    let request = AppendRequest {
        content: "hi",
        sender: "robot",
        email: None,
    };
    match svc.append_message(Caller::Admin, &id, request).await {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "sender"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let long = "x".repeat(1001);
    match svc.append_message(Caller::Admin, &id, as_admin(&long)).await {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "content"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let detail = svc.get(Caller::Admin, &id, None).await.expect("get");
    assert_eq!(detail.inquiry.status, InquiryStatus::Pending);
    assert_eq!(detail.inquiry.messages.len(), 1);
}

#[tokio::test]
async fn admin_only_operations() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;
    let page = PageRequest::new(1, 10).expect("page");

    for caller in [Caller::Anonymous, Caller::Customer] {
        assert!(matches!(
            svc.list(caller, InquiryFilter::default(), page).await,
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            svc.update_status(caller, &id, "completed").await,
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(svc.stats(caller).await, Err(ServiceError::Unauthorized)));
    }
}

#[tokio::test]
async fn unknown_status_is_validation_error() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;
    match svc.update_status(Caller::Admin, &id, "archived").await {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "status"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_attaches_products_and_latest_message() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;
    svc.append_message(Caller::Admin, &id, as_admin("quote attached"))
        .await
        .expect("append");

    let page = svc
        .list(
            Caller::Admin,
            InquiryFilter {
                status: Some(InquiryStatus::Processing),
            },
            PageRequest::new(1, 10).expect("page"),
        )
        .await
        .expect("list");
    assert_eq!(page.total, 1);
    let item = &page.items[0];
    assert_eq!(item.product.as_ref().map(|p| p.name.as_str()), Some("Steel bolts"));
    assert_eq!(
        item.summary
            .latest_message
            .as_ref()
            .map(|m| m.content.as_str()),
        Some("quote attached")
    );
}

#[tokio::test]
async fn product_missing_from_catalog_reads_as_none() {
    let store: Arc<dyn InquiryStore> = Arc::new(InMemoryInquiryStore::new());
    let stocked = InquiryService::new(
        Arc::clone(&store),
        Arc::new(StaticCatalog::new([("p1", "Steel bolts")])),
        TerminalPolicy::Open,
    );
    let emptied = InquiryService::new(
        store,
        Arc::new(StaticCatalog::new(Vec::<(&str, &str)>::new())),
        TerminalPolicy::Open,
    );
    let id = create(&stocked).await;

    let detail = emptied
        .get(Caller::Admin, &id, None)
        .await
        .expect("inquiry should still load");
    assert_eq!(detail.inquiry.id, id);
    assert_eq!(detail.inquiry.product_id, "p1");
    assert!(detail.product.is_none());

    let page = emptied
        .list(
            Caller::Admin,
            InquiryFilter::default(),
            PageRequest::new(1, 10).expect("page"),
        )
        .await
        .expect("list");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].summary.id, id);
    assert!(page.items[0].product.is_none());
}

#[tokio::test]
async fn stats_count_by_status() {
    let svc = service(TerminalPolicy::Open);
    let first = create(&svc).await;
    create(&svc).await;
    svc.update_status(Caller::Admin, &first, "cancelled")
        .await
        .expect("cancel");

    let stats = svc.stats(Caller::Admin).await.expect("stats");
    assert_eq!(stats.inquiries_count, 2);
    assert_eq!(stats.inquiries_by_status.pending, 1);
    assert_eq!(stats.inquiries_by_status.cancelled, 1);
    assert_eq!(stats.products_count, 2);
}

#[tokio::test]
async fn open_policy_accepts_messages_on_closed_inquiries() {
    let svc = service(TerminalPolicy::Open);
    let id = create(&svc).await;
    svc.update_status(Caller::Admin, &id, "completed")
        .await
        .expect("complete");

    svc.append_message(Caller::Anonymous, &id, as_owner("one more thing"))
        .await
        .expect("owner append");
    svc.append_message(Caller::Admin, &id, as_admin("sure"))
        .await
        .expect("admin append");

    let detail = svc.get(Caller::Admin, &id, None).await.expect("get");
    assert_eq!(detail.inquiry.status, InquiryStatus::Completed);
    assert_eq!(detail.inquiry.messages.len(), 3);
}

#[tokio::test]
async fn locked_policy_rejects_messages_until_reopened() {
    let svc = service(TerminalPolicy::Locked);
    assert_eq!(svc.terminal_policy(), TerminalPolicy::Locked);
    let id = create(&svc).await;
    svc.update_status(Caller::Admin, &id, "cancelled")
        .await
        .expect("cancel");

    assert!(matches!(
        svc.append_message(Caller::Anonymous, &id, as_owner("wait"))
            .await,
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        svc.append_message(Caller::Admin, &id, as_admin("closing note"))
            .await,
        Err(ServiceError::Conflict(_))
    ));

    // Status changes stay available and reopen the thread.
    svc.update_status(Caller::Admin, &id, "processing")
        .await
        .expect("reopen");
    svc.append_message(Caller::Anonymous, &id, as_owner("thanks"))
        .await
        .expect("append after reopen");

    let detail = svc.get(Caller::Admin, &id, None).await.expect("get");
    assert_eq!(detail.inquiry.messages.len(), 2);
}

#[tokio::test]
async fn locked_policy_still_checks_access_first() {
    let svc = service(TerminalPolicy::Locked);
    let id = create(&svc).await;
    svc.update_status(Caller::Admin, &id, "completed")
        .await
        .expect("complete");

    let stranger = AppendRequest {
        content: "hi",
        sender: "customer",
        email: Some("b@x.com"),
    };
    assert!(matches!(
        svc.append_message(Caller::Anonymous, &id, stranger).await,
        Err(ServiceError::Unauthorized)
    ));
}
