#[cfg(test)]
#[path = "list_query_test.rs"]
mod tests;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::mpsc;

use super::field_errors;
use super::field_errors::FieldErrors;
use crate::domain::models::ApiBox;
use crate::domain::models::ApiError;
use crate::domain::models::ApiResult;
use crate::domain::models::Event;
use crate::domain::models::ListFilters;
use crate::domain::models::ListRequest;
use crate::domain::models::Notice;
use crate::domain::models::Page;
use crate::domain::models::Pagination;
use crate::domain::models::Resource;
use crate::domain::models::SortDirection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListPhase {
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Snapshot of one issued query. Holds the generation it was issued under so
/// a response that arrives after a newer query has been issued can be told
/// apart and dropped.
pub struct QueryTicket {
    generation: u64,
    pub request: ListRequest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    Saved,
    /// The server rejected the draft field-by-field. The caller renders the
    /// buckets inline and keeps the draft.
    Invalid(FieldErrors),
    Failed,
}

/// Per-screen list state machine: filter/sort/page inputs on one side, the
/// fetched page on the other. One instance per entity screen; the entity
/// only contributes its [`ResourceSpec`](crate::domain::models::ResourceSpec)
/// and draft type.
pub struct ListQuery<R: Resource> {
    credential: String,
    events: mpsc::UnboundedSender<Event>,
    filters: ListFilters,
    page: u32,
    page_size: u32,
    generation: u64,
    phase: ListPhase,
    current: Option<Page<R>>,
}

impl<R: Resource> ListQuery<R> {
    pub fn new(
        credential: String,
        page_size: u32,
        events: mpsc::UnboundedSender<Event>,
    ) -> ListQuery<R> {
        return ListQuery {
            credential,
            events,
            filters: ListFilters::default(),
            page: 1,
            page_size,
            generation: 0,
            phase: ListPhase::Idle,
            current: None,
        };
    }

    pub fn phase(&self) -> ListPhase {
        return self.phase;
    }

    pub fn page(&self) -> u32 {
        return self.page;
    }

    pub fn filters(&self) -> &ListFilters {
        return &self.filters;
    }

    pub fn items(&self) -> &[R] {
        match &self.current {
            Some(page) => return page.items.as_slice(),
            None => return &[],
        }
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        return self.current.as_ref().map(|page| return &page.pagination);
    }

    /// Merges a search term into the filters and rewinds to the first page.
    pub fn set_filter(&mut self, search: Option<String>) {
        self.filters.search = search;
        self.page = 1;
    }

    /// Replaces both sort halves together and rewinds to the first page.
    pub fn set_sort(&mut self, field: &str, direction: SortDirection) {
        self.filters.sort_field = Some(field.to_string());
        self.filters.sort_direction = Some(direction);
        self.page = 1;
    }

    /// Moves to page `n`, or refuses without touching any state when `n` is
    /// outside the known page range.
    pub fn go_to_page(&mut self, n: u32) -> bool {
        if n < 1 {
            return false;
        }

        match self.pagination() {
            Some(pagination) if n > pagination.total_pages => return false,
            None if n != 1 => return false,
            _ => {}
        }

        self.page = n;
        return true;
    }

    /// Starts a new query generation and snapshots the request for it.
    /// Whatever is in flight for earlier generations is superseded from this
    /// point on.
    pub fn issue(&mut self) -> QueryTicket {
        self.generation += 1;
        self.phase = ListPhase::Loading;

        return QueryTicket {
            generation: self.generation,
            request: ListRequest {
                filters: self.filters.clone(),
                page: self.page,
                per_page: self.page_size,
            },
        };
    }

    /// Lands a response. Items and pagination are replaced together, and only
    /// when the ticket still belongs to the newest generation; a stale result
    /// is dropped without touching any state.
    pub fn resolve(&mut self, ticket: QueryTicket, result: ApiResult<Page<Value>>) -> Result<()> {
        if ticket.generation != self.generation {
            tracing::debug!(
                entity = R::SPEC.plural,
                stale = ticket.generation,
                current = self.generation,
                "dropping superseded list response"
            );
            return Ok(());
        }

        match result {
            Ok(raw) => {
                let rows = raw
                    .items
                    .into_iter()
                    .map(serde_json::from_value::<R>)
                    .collect::<Result<Vec<R>, serde_json::Error>>();

                match rows {
                    Ok(items) => {
                        self.current = Some(Page {
                            items,
                            pagination: raw.pagination,
                        });
                        self.phase = ListPhase::Loaded;
                    }
                    Err(err) => {
                        self.events.send(Event::Notice(Notice::error(format!(
                            "Failed to load {}: {err}",
                            R::SPEC.plural
                        ))))?;
                        self.phase = ListPhase::Error;
                    }
                }
            }
            Err(ApiError::Unauthorized) => {
                self.events.send(Event::SessionExpired)?;
                self.phase = ListPhase::Error;
            }
            Err(err) => {
                self.events.send(Event::Notice(Notice::error(format!(
                    "Failed to load {}: {err}",
                    R::SPEC.plural
                ))))?;
                self.phase = ListPhase::Error;
            }
        }

        return Ok(());
    }

    /// Fetches the current filters+page. The await is the only suspension
    /// point, so issue and resolve bracket exactly one outstanding request.
    pub async fn refresh(&mut self, api: &ApiBox) -> Result<()> {
        let ticket = self.issue();
        let result = api.list(&self.credential, R::SPEC, &ticket.request).await;
        return self.resolve(ticket, result);
    }

    pub async fn search(&mut self, api: &ApiBox, search: Option<String>) -> Result<()> {
        self.set_filter(search);
        return self.refresh(api).await;
    }

    pub async fn sort(&mut self, api: &ApiBox, field: &str, direction: SortDirection) -> Result<()> {
        self.set_sort(field, direction);
        return self.refresh(api).await;
    }

    pub async fn open_page(&mut self, api: &ApiBox, n: u32) -> Result<()> {
        if !self.go_to_page(n) {
            return Ok(());
        }
        return self.refresh(api).await;
    }

    /// Creates a row, then refetches from the first page. Validation
    /// failures come back to the caller as buckets; anything else resolves
    /// to a notice.
    pub async fn create(&mut self, api: &ApiBox, draft: &R::Draft) -> Result<MutationOutcome> {
        let payload = serde_json::to_value(draft)?;
        let res = api.create(&self.credential, R::SPEC, payload).await;

        match res {
            Ok(()) => {
                self.events.send(Event::Notice(Notice::success(format!(
                    "Created {}",
                    R::SPEC.singular
                ))))?;
                self.page = 1;
                self.refresh(api).await?;
                return Ok(MutationOutcome::Saved);
            }
            Err(err) => return self.handle_mutation_failure("save", err),
        }
    }

    /// Updates a row, then refetches at the current page and filters, not
    /// back at page one.
    pub async fn update(
        &mut self,
        api: &ApiBox,
        id: u64,
        draft: &R::Draft,
    ) -> Result<MutationOutcome> {
        let payload = serde_json::to_value(draft)?;
        let res = api.update(&self.credential, R::SPEC, id, payload).await;

        match res {
            Ok(()) => {
                self.events.send(Event::Notice(Notice::success(format!(
                    "Updated {} {id}",
                    R::SPEC.singular
                ))))?;
                self.refresh(api).await?;
                return Ok(MutationOutcome::Saved);
            }
            Err(err) => return self.handle_mutation_failure("save", err),
        }
    }

    pub async fn delete(&mut self, api: &ApiBox, id: u64) -> Result<MutationOutcome> {
        let res = api.delete(&self.credential, R::SPEC, id).await;

        match res {
            Ok(()) => {
                self.events.send(Event::Notice(Notice::success(format!(
                    "Deleted {} {id}",
                    R::SPEC.singular
                ))))?;
                self.refresh(api).await?;
                return Ok(MutationOutcome::Saved);
            }
            Err(err) => return self.handle_mutation_failure("delete", err),
        }
    }

    fn handle_mutation_failure(&mut self, action: &str, err: ApiError) -> Result<MutationOutcome> {
        match err {
            ApiError::Validation(errors) => {
                return Ok(MutationOutcome::Invalid(field_errors::from_server(
                    &errors,
                    R::SPEC.known_fields,
                )));
            }
            ApiError::Unauthorized => {
                self.events.send(Event::SessionExpired)?;
                return Ok(MutationOutcome::Failed);
            }
            err => {
                self.events.send(Event::Notice(Notice::error(format!(
                    "Failed to {action} {}: {err}",
                    R::SPEC.singular
                ))))?;
                return Ok(MutationOutcome::Failed);
            }
        }
    }
}
