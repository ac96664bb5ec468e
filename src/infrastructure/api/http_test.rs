use anyhow::Result;
use mockito::Matcher;

use super::HttpApi;
use crate::domain::models::Api;
use crate::domain::models::ApiError;
use crate::domain::models::ListFilters;
use crate::domain::models::ListRequest;
use crate::domain::models::Role;
use crate::domain::models::Resource;
use crate::domain::models::SortDirection;
use crate::domain::models::ValidationErrors;

fn api(url: String) -> HttpApi {
    return HttpApi::new(url, "1000".to_string());
}

fn full_request() -> ListRequest {
    return ListRequest {
        filters: ListFilters {
            search: Some("clerk".to_string()),
            sort_field: Some("name".to_string()),
            sort_direction: Some(SortDirection::Desc),
        },
        page: 2,
        per_page: 25,
    };
}

#[tokio::test]
async fn it_logs_in_with_the_header_credential() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/v1/auth/login")
        .match_body(Matcher::JsonString(
            "{\"email\": \"a@b.com\", \"password\": \"pw\"}".to_string(),
        ))
        .with_status(200)
        .with_header("Authorization", "Bearer abc123")
        .with_body("{\"user\": {\"id\": 1, \"name\": \"Ana\", \"email\": \"a@b.com\"}}")
        .create();

    let res = api(server.url()).login("a@b.com", "pw").await;

    mock.assert();
    let login = res.unwrap();
    assert_eq!(login.token, "abc123");
    assert_eq!(login.identity.email, "a@b.com");
    return Ok(());
}

#[tokio::test]
async fn it_rejects_a_login_without_the_header() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/v1/auth/login")
        .with_status(200)
        .with_body("{\"user\": {\"id\": 1, \"name\": \"Ana\", \"email\": \"a@b.com\"}, \"token\": \"body-token\"}")
        .create();

    let res = api(server.url()).login("a@b.com", "pw").await;

    mock.assert();
    assert!(matches!(res, Err(ApiError::Request(_))));
}

#[tokio::test]
async fn it_surfaces_the_message_on_a_rejected_login() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/v1/auth/login")
        .with_status(401)
        .with_body("{\"message\": \"Invalid email or password\"}")
        .create();

    let res = api(server.url()).login("a@b.com", "pw").await;

    mock.assert();
    match res {
        Err(ApiError::Request(message)) => assert_eq!(message, "Invalid email or password"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn it_lists_with_the_full_query() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/roles")
        .match_header("Authorization", "Bearer abc123")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".to_string(), "2".to_string()),
            Matcher::UrlEncoded("per_page".to_string(), "25".to_string()),
            Matcher::UrlEncoded("search".to_string(), "clerk".to_string()),
            Matcher::UrlEncoded("sort_by".to_string(), "name".to_string()),
            Matcher::UrlEncoded("order".to_string(), "desc".to_string()),
        ]))
        .with_status(200)
        .with_body(
            "{\"roles\": [{\"id\": 1, \"name\": \"Clerk\"}], \"pagination\": {\"current_page\": 2, \"next_page\": null, \"prev_page\": 1, \"total_pages\": 4, \"total_count\": 80}}",
        )
        .create();

    let page = api(server.url())
        .list("abc123", Role::SPEC, &full_request())
        .await
        .unwrap();

    mock.assert();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(page.pagination.total_pages, 4);
    assert_eq!(page.pagination.total_count, 80);
    return Ok(());
}

#[tokio::test]
async fn it_maps_unauthorized_statuses() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/roles")
        .match_query(Matcher::Any)
        .with_status(401)
        .create();

    let res = api(server.url())
        .list("stale", Role::SPEC, &full_request())
        .await;

    mock.assert();
    assert!(matches!(res, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn it_treats_an_unparsable_success_body_as_expired() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/roles")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>gateway sign-in</html>")
        .create();

    let res = api(server.url())
        .list("abc123", Role::SPEC, &full_request())
        .await;

    mock.assert();
    assert!(matches!(res, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn it_wraps_drafts_under_the_singular_key() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/v1/roles")
        .match_header("Authorization", "Bearer abc123")
        .match_body(Matcher::JsonString(
            "{\"role\": {\"name\": \"Clerk\", \"description\": \"front desk\"}}".to_string(),
        ))
        .with_status(201)
        .with_body("{}")
        .create();

    let draft = serde_json::json!({"name": "Clerk", "description": "front desk"});
    api(server.url())
        .create("abc123", Role::SPEC, draft)
        .await
        .unwrap();

    mock.assert();
    return Ok(());
}

#[tokio::test]
async fn it_parses_flat_validation_errors() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/v1/roles")
        .with_status(422)
        .with_body("{\"errors\": [\"Name can't be blank\"]}")
        .create();

    let res = api(server.url())
        .create("abc123", Role::SPEC, serde_json::json!({"name": ""}))
        .await;

    mock.assert();
    match res {
        Err(ApiError::Validation(ValidationErrors::Messages(messages))) => {
            assert_eq!(messages, vec!["Name can't be blank".to_string()]);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn it_parses_field_keyed_validation_errors() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PATCH", "/api/v1/roles/7")
        .with_status(422)
        .with_body("{\"errors\": {\"name\": [\"has already been taken\"]}}")
        .create();

    let res = api(server.url())
        .update("abc123", Role::SPEC, 7, serde_json::json!({"name": "Clerk"}))
        .await;

    mock.assert();
    match res {
        Err(ApiError::Validation(ValidationErrors::Fields(fields))) => {
            assert_eq!(fields["name"], vec!["has already been taken".to_string()]);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn it_deletes_a_row() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("DELETE", "/api/v1/roles/7")
        .match_header("Authorization", "Bearer abc123")
        .with_status(204)
        .create();

    let res = api(server.url()).delete("abc123", Role::SPEC, 7).await;

    mock.assert();
    assert!(res.is_ok());
}

#[tokio::test]
async fn it_surfaces_server_messages_on_other_failures() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("DELETE", "/api/v1/roles/7")
        .with_status(500)
        .with_body("{\"message\": \"boom\"}")
        .create();

    let res = api(server.url()).delete("abc123", Role::SPEC, 7).await;

    mock.assert();
    match res {
        Err(ApiError::Request(message)) => assert_eq!(message, "boom"),
        other => panic!("unexpected result {other:?}"),
    }
}
