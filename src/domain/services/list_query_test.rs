use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;

use super::ListPhase;
use super::ListQuery;
use super::MutationOutcome;
use crate::domain::models::Api;
use crate::domain::models::ApiBox;
use crate::domain::models::ApiError;
use crate::domain::models::ApiResult;
use crate::domain::models::Event;
use crate::domain::models::ListRequest;
use crate::domain::models::LoginResponse;
use crate::domain::models::NoticeLevel;
use crate::domain::models::Page;
use crate::domain::models::Pagination;
use crate::domain::models::PasswordChange;
use crate::domain::models::Profile;
use crate::domain::models::ProfileDraft;
use crate::domain::models::Resource;
use crate::domain::models::ResourceSpec;
use crate::domain::models::Role;
use crate::domain::models::RoleDraft;
use crate::domain::models::SortDirection;
use crate::domain::models::ValidationErrors;

#[derive(Clone, Default)]
struct FakeApi {
    list_results: Arc<Mutex<VecDeque<ApiResult<Page<Value>>>>>,
    list_requests: Arc<Mutex<Vec<ListRequest>>>,
    create_failure: Arc<Mutex<Option<ApiError>>>,
    update_failure: Arc<Mutex<Option<ApiError>>>,
    delete_failure: Arc<Mutex<Option<ApiError>>>,
}

#[async_trait]
impl Api for FakeApi {
    async fn login(&self, _email: &str, _password: &str) -> ApiResult<LoginResponse> {
        return Err(ApiError::Request("not scripted".to_string()));
    }

    async fn fetch_profile(&self, _token: &str) -> ApiResult<Profile> {
        return Err(ApiError::Request("not scripted".to_string()));
    }

    async fn update_profile(&self, _token: &str, _draft: &ProfileDraft) -> ApiResult<()> {
        return Err(ApiError::Request("not scripted".to_string()));
    }

    async fn change_password(&self, _token: &str, _change: &PasswordChange) -> ApiResult<()> {
        return Err(ApiError::Request("not scripted".to_string()));
    }

    async fn list(
        &self,
        _token: &str,
        _spec: ResourceSpec,
        request: &ListRequest,
    ) -> ApiResult<Page<Value>> {
        self.list_requests.lock().unwrap().push(request.clone());
        return self
            .list_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| return Ok(page_of(&["fallback"], 1, 1)));
    }

    async fn create(&self, _token: &str, _spec: ResourceSpec, _draft: Value) -> ApiResult<()> {
        match self.create_failure.lock().unwrap().take() {
            Some(err) => return Err(err),
            None => return Ok(()),
        }
    }

    async fn update(
        &self,
        _token: &str,
        _spec: ResourceSpec,
        _id: u64,
        _draft: Value,
    ) -> ApiResult<()> {
        match self.update_failure.lock().unwrap().take() {
            Some(err) => return Err(err),
            None => return Ok(()),
        }
    }

    async fn delete(&self, _token: &str, _spec: ResourceSpec, _id: u64) -> ApiResult<()> {
        match self.delete_failure.lock().unwrap().take() {
            Some(err) => return Err(err),
            None => return Ok(()),
        }
    }
}

fn page_of(names: &[&str], current_page: u32, total_pages: u32) -> Page<Value> {
    let items = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            return json!({"id": idx as u64 + 1, "name": name, "description": ""});
        })
        .collect::<Vec<Value>>();

    return Page {
        items,
        pagination: Pagination {
            current_page,
            next_page: None,
            prev_page: None,
            total_pages,
            total_count: names.len() as u64,
        },
    };
}

fn controller() -> (ListQuery<Role>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    return (ListQuery::new("abc123".to_string(), 25, tx), rx);
}

#[tokio::test]
async fn it_keeps_the_newest_generation_when_responses_cross() -> Result<()> {
    let (mut list, _rx) = controller();

    let ticket_a = list.issue();
    let ticket_b = list.issue();

    list.resolve(ticket_b, Ok(page_of(&["newest"], 1, 1)))?;
    list.resolve(ticket_a, Ok(page_of(&["stale"], 1, 1)))?;

    assert_eq!(list.items().len(), 1);
    assert_eq!(list.items()[0].name, "newest");
    assert_eq!(list.phase(), ListPhase::Loaded);
    return Ok(());
}

#[tokio::test]
async fn it_applies_only_the_final_query_of_a_burst() -> Result<()> {
    let (mut list, _rx) = controller();

    // Search submitted, then a sort lands before the search resolves.
    list.set_filter(Some("clerk".to_string()));
    let search_ticket = list.issue();
    list.set_sort("name", SortDirection::Desc);
    let sort_ticket = list.issue();

    assert_eq!(search_ticket.request.filters.sort_field, None);
    assert_eq!(
        sort_ticket.request.filters.search.as_deref(),
        Some("clerk")
    );

    list.resolve(sort_ticket, Ok(page_of(&["sorted"], 1, 1)))?;
    list.resolve(search_ticket, Ok(page_of(&["unsorted"], 1, 1)))?;

    assert_eq!(list.items()[0].name, "sorted");
    return Ok(());
}

#[tokio::test]
async fn it_rejects_out_of_range_pages() -> Result<()> {
    let (mut list, _rx) = controller();

    let ticket = list.issue();
    list.resolve(ticket, Ok(page_of(&["only"], 1, 3)))?;

    assert!(!list.go_to_page(0));
    assert!(!list.go_to_page(4));
    assert_eq!(list.page(), 1);
    assert_eq!(list.items()[0].name, "only");

    assert!(list.go_to_page(3));
    assert_eq!(list.page(), 3);
    return Ok(());
}

#[tokio::test]
async fn it_rejects_pages_beyond_one_before_the_first_load() {
    let (mut list, _rx) = controller();

    assert!(!list.go_to_page(2));
    assert!(list.go_to_page(1));
}

#[tokio::test]
async fn it_resets_the_page_on_filter_and_sort() -> Result<()> {
    let (mut list, _rx) = controller();

    let ticket = list.issue();
    list.resolve(ticket, Ok(page_of(&["row"], 1, 5)))?;
    assert!(list.go_to_page(4));

    list.set_filter(Some("clerk".to_string()));
    assert_eq!(list.page(), 1);

    assert!(list.go_to_page(4));
    list.set_sort("name", SortDirection::Asc);
    assert_eq!(list.page(), 1);
    return Ok(());
}

#[tokio::test]
async fn it_refetches_the_current_page_after_an_update() -> Result<()> {
    let (mut list, mut rx) = controller();
    let fake = FakeApi::default();
    let api: ApiBox = Box::new(fake.clone());

    list.set_filter(Some("clerk".to_string()));
    let ticket = list.issue();
    list.resolve(ticket, Ok(page_of(&["row"], 1, 5)))?;
    assert!(list.go_to_page(3));

    let outcome = list
        .update(&api, 7, &RoleDraft {
            name: "Clerk".to_string(),
            description: "".to_string(),
        })
        .await?;

    assert_eq!(outcome, MutationOutcome::Saved);

    let requests = fake.list_requests.lock().unwrap();
    let refetch = requests.last().unwrap();
    assert_eq!(refetch.page, 3);
    assert_eq!(refetch.filters.search.as_deref(), Some("clerk"));

    let event = rx.try_recv()?;
    match event {
        Event::Notice(notice) => assert_eq!(notice.level, NoticeLevel::Success),
        other => panic!("unexpected event {other:?}"),
    }
    return Ok(());
}

#[tokio::test]
async fn it_resets_to_the_first_page_after_a_create() -> Result<()> {
    let (mut list, _rx) = controller();
    let fake = FakeApi::default();
    let api: ApiBox = Box::new(fake.clone());

    let ticket = list.issue();
    list.resolve(ticket, Ok(page_of(&["row"], 1, 5)))?;
    assert!(list.go_to_page(3));

    let outcome = list
        .create(&api, &RoleDraft {
            name: "Auditor".to_string(),
            description: "".to_string(),
        })
        .await?;

    assert_eq!(outcome, MutationOutcome::Saved);
    assert_eq!(list.page(), 1);

    let requests = fake.list_requests.lock().unwrap();
    assert_eq!(requests.last().unwrap().page, 1);
    return Ok(());
}

#[tokio::test]
async fn it_returns_field_buckets_on_validation_failure() -> Result<()> {
    let (mut list, mut rx) = controller();

    let fake = FakeApi::default();
    *fake.create_failure.lock().unwrap() = Some(ApiError::Validation(
        ValidationErrors::Messages(vec!["Name can't be blank".to_string()]),
    ));
    let api: ApiBox = Box::new(fake);

    let outcome = list
        .create(&api, &RoleDraft::default())
        .await?;

    let MutationOutcome::Invalid(errors) = outcome else {
        panic!("expected a validation outcome");
    };
    assert_eq!(errors.fields["name"], vec!["Name can't be blank".to_string()]);
    assert!(errors.general.is_empty());

    // No notice, no refetch.
    assert!(rx.try_recv().is_err());
    return Ok(());
}

#[tokio::test]
async fn it_notifies_on_a_failed_delete_without_refetching() -> Result<()> {
    let (mut list, mut rx) = controller();
    let fake = FakeApi::default();
    *fake.delete_failure.lock().unwrap() =
        Some(ApiError::Request("service unavailable".to_string()));
    let api: ApiBox = Box::new(fake.clone());

    let outcome = list.delete(&api, 7).await?;

    assert_eq!(outcome, MutationOutcome::Failed);
    assert!(fake.list_requests.lock().unwrap().is_empty());
    match rx.try_recv()? {
        Event::Notice(notice) => assert_eq!(notice.level, NoticeLevel::Error),
        other => panic!("unexpected event {other:?}"),
    }
    return Ok(());
}

#[tokio::test]
async fn it_surfaces_update_validation_from_a_field_map() -> Result<()> {
    let (mut list, _rx) = controller();
    let fake = FakeApi::default();
    let mut fields = std::collections::BTreeMap::new();
    fields.insert("name".to_string(), vec!["has already been taken".to_string()]);
    *fake.update_failure.lock().unwrap() = Some(ApiError::Validation(
        ValidationErrors::Fields(fields),
    ));
    let api: ApiBox = Box::new(fake);

    let outcome = list
        .update(&api, 7, &RoleDraft {
            name: "Clerk".to_string(),
            description: "".to_string(),
        })
        .await?;

    let MutationOutcome::Invalid(errors) = outcome else {
        panic!("expected a validation outcome");
    };
    assert_eq!(
        errors.fields["name"],
        vec!["has already been taken".to_string()]
    );
    return Ok(());
}

#[tokio::test]
async fn it_expires_the_session_when_a_refetch_is_unauthorized() -> Result<()> {
    let (mut list, mut rx) = controller();
    let fake = FakeApi::default();
    fake.list_results
        .lock()
        .unwrap()
        .push_back(Err(ApiError::Unauthorized));
    let api: ApiBox = Box::new(fake);

    let outcome = list.delete(&api, 7).await?;

    assert_eq!(outcome, MutationOutcome::Saved);
    match rx.try_recv()? {
        Event::Notice(notice) => assert_eq!(notice.level, NoticeLevel::Success),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(rx.try_recv()?, Event::SessionExpired);
    return Ok(());
}

#[tokio::test]
async fn it_emits_session_expired_on_unauthorized() -> Result<()> {
    let (mut list, mut rx) = controller();

    let ticket = list.issue();
    list.resolve(ticket, Ok(page_of(&["kept"], 1, 1)))?;

    let ticket = list.issue();
    list.resolve(ticket, Err(ApiError::Unauthorized))?;

    assert_eq!(rx.try_recv()?, Event::SessionExpired);
    assert_eq!(list.phase(), ListPhase::Error);
    // The last loaded page is left as-is.
    assert_eq!(list.items()[0].name, "kept");
    return Ok(());
}

#[tokio::test]
async fn it_notifies_and_keeps_state_on_a_generic_failure() -> Result<()> {
    let (mut list, mut rx) = controller();

    let ticket = list.issue();
    list.resolve(ticket, Ok(page_of(&["kept"], 1, 1)))?;

    let ticket = list.issue();
    list.resolve(
        ticket,
        Err(ApiError::Request("connection reset".to_string())),
    )?;

    match rx.try_recv()? {
        Event::Notice(notice) => {
            assert_eq!(notice.level, NoticeLevel::Error);
            assert!(notice.message.contains("connection reset"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(list.items()[0].name, "kept");
    return Ok(());
}
