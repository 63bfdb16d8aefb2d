//! RestClient against a mock PostgREST server

use httpmock::prelude::*;
use routehub_admin::cli::ReconcileArgs;
use routehub_admin::commands::reconcile;
use routehub_admin::RestClient;
use routehub_common::config::{AdminConfig, BackendConfig, ResourceNames};
use routehub_common::models::{
    AssociationStatus, NewAssociation, ParentStatus, RecordId, StatusFilter,
};
use routehub_common::store::{
    AssociationQuery, AssociationTypeLookup, AssociationWriter, ParentActivation, ParentQuery,
};
use routehub_common::{Error, ReconciliationJob};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn client(server: &MockServer, page_size: usize) -> RestClient {
    let backend = BackendConfig {
        url: server.base_url(),
        api_key: "test-key".to_string(),
        page_size,
        ..Default::default()
    };
    RestClient::new(&backend, ResourceNames::default()).expect("Should build client")
}

fn company(id: &str) -> serde_json::Value {
    json!({ "id": id, "name": format!("Company {}", id), "status": "active", "lat": 41.7, "lng": 44.8 })
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_parents_follows_content_range() {
    // Given: 3 active companies served 2 per page
    let server = MockServer::start_async().await;
    let page1 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/companies")
                .query_param("status", "eq.active")
                .query_param("order", "id.asc")
                .header("prefer", "count=exact")
                .header("apikey", "test-key")
                .header("authorization", "Bearer test-key")
                .header("range", "0-1");
            then.status(206)
                .header("content-range", "0-1/3")
                .json_body(json!([company("c1"), company("c2")]));
        })
        .await;
    let page2 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/companies")
                .header("range", "2-3");
            then.status(206)
                .header("content-range", "2-2/3")
                .json_body(json!([company("c3")]));
        })
        .await;

    // When: listing active companies
    let parents = client(&server, 2)
        .list_parents(StatusFilter::Only(ParentStatus::Active))
        .await
        .expect("Should list companies");

    // Then: both pages were read in order
    page1.assert_async().await;
    page2.assert_async().await;
    let ids: Vec<&str> = parents.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert_eq!(parents[0].status, Some(ParentStatus::Active));
}

#[tokio::test]
async fn test_range_past_end_stops_paging() {
    // Given: a full first page with no row total, then 416
    let server = MockServer::start_async().await;
    let page1 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/companies")
                .header("range", "0-1");
            then.status(200)
                .header("content-range", "0-1/*")
                .json_body(json!([company("c1"), company("c2")]));
        })
        .await;
    let past_end = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/companies")
                .header("range", "2-3");
            then.status(416)
                .header("content-range", "*/2")
                .json_body(json!({ "message": "Requested range not satisfiable" }));
        })
        .await;

    // When: listing without a status filter
    let parents = client(&server, 2)
        .list_parents(StatusFilter::Any)
        .await
        .expect("416 ends the listing");

    // Then: both rows kept, no status filter sent
    page1.assert_async().await;
    past_end.assert_async().await;
    assert_eq!(parents.len(), 2);
}

#[tokio::test]
async fn test_server_row_cap_below_page_size_keeps_paging() {
    // Given: the server caps pages at 2 rows while the client asks for 3,
    // and reports no total
    let server = MockServer::start_async().await;
    let page1 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/company_services")
                .header("range", "0-2");
            then.status(200)
                .header("content-range", "0-1/*")
                .json_body(json!([
                    { "parent_id": "c1", "association_type_id": "labor" },
                    { "parent_id": "c2", "association_type_id": "labor" }
                ]));
        })
        .await;
    let page2 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/company_services")
                .header("range", "2-4");
            then.status(200)
                .header("content-range", "2-2/*")
                .json_body(json!([{ "parent_id": "c3", "association_type_id": "labor" }]));
        })
        .await;
    let past_end = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/company_services")
                .header("range", "3-5");
            then.status(416);
        })
        .await;

    // When
    let links = client(&server, 3)
        .list_associations(StatusFilter::Any)
        .await
        .expect("Should list links");

    // Then: the short first page did not end the listing
    page1.assert_async().await;
    page2.assert_async().await;
    past_end.assert_async().await;
    let parents: Vec<&str> = links.iter().map(|l| l.parent_id.as_str()).collect();
    assert_eq!(parents, vec!["c1", "c2", "c3"]);
}

#[tokio::test]
async fn test_list_associations_maps_configured_columns() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/company_services")
                .query_param("select", "parent_id:company_id,association_type_id:service_type_id")
                .query_param("status", "eq.active");
            then.status(200)
                .header("content-range", "0-1/2")
                .json_body(json!([
                    { "parent_id": 7, "association_type_id": 3 },
                    { "parent_id": "c2", "association_type_id": "labor" }
                ]));
        })
        .await;

    let links = client(&server, 100)
        .list_associations(StatusFilter::Only(AssociationStatus::Active))
        .await
        .expect("Should list links");

    mock.assert_async().await;
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].parent_id, RecordId::from("7"));
    assert_eq!(links[1].association_type_id, RecordId::from("labor"));
}

#[tokio::test]
async fn test_find_association_type_by_name() {
    let server = MockServer::start_async().await;
    let found = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/service_types")
                .query_param("name_ka", "eq.შრომის უსაფრთხოება")
                .query_param("limit", "1");
            then.status(200)
                .json_body(json!([{ "id": "labor", "name": "შრომის უსაფრთხოება" }]));
        })
        .await;
    let absent = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/service_types")
                .query_param("name_ka", "eq.Missing");
            then.status(200).json_body(json!([]));
        })
        .await;

    let client = client(&server, 100);
    let labor = client
        .find_association_type_by_name("შრომის უსაფრთხოება")
        .await
        .expect("Lookup should succeed")
        .expect("Type should exist");
    let missing = client
        .find_association_type_by_name("Missing")
        .await
        .expect("Lookup should succeed");

    found.assert_async().await;
    absent.assert_async().await;
    assert_eq!(labor.id, RecordId::from("labor"));
    assert!(missing.is_none());
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_associations_posts_one_array() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/company_services")
                .header("prefer", "return=minimal")
                .json_body(json!([
                    { "company_id": "c1", "service_type_id": "labor", "priority": "medium", "status": "active" },
                    { "company_id": "c2", "service_type_id": "labor", "priority": "medium", "status": "active" }
                ]));
            then.status(201);
        })
        .await;

    let batch = vec![
        NewAssociation::default_for(RecordId::from("c1"), RecordId::from("labor")),
        NewAssociation::default_for(RecordId::from("c2"), RecordId::from("labor")),
    ];
    client(&server, 100)
        .create_associations(&batch)
        .await
        .expect("Batch should be accepted");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_batch_keeps_response_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/company_services");
            then.status(409).body(
                r#"{"code":"23503","message":"violates foreign key constraint"}"#,
            );
        })
        .await;

    let batch = vec![NewAssociation::default_for(
        RecordId::from("deleted"),
        RecordId::from("labor"),
    )];
    let err = client(&server, 100)
        .create_associations(&batch)
        .await
        .unwrap_err();

    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 409);
            assert!(body.contains("foreign key"));
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_activation_counts_changed_rows() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/companies")
                .query_param("or", "(status.neq.active,status.is.null)")
                .header("prefer", "return=representation")
                .json_body(json!({ "status": "active" }));
            then.status(200)
                .json_body(json!([{ "id": "c1" }, { "id": "c4" }, { "id": "c9" }]));
        })
        .await;

    let activated = client(&server, 100)
        .activate_non_active_parents()
        .await
        .expect("Activation should succeed");

    mock.assert_async().await;
    assert_eq!(activated, 3);
}

// ── Whole job ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_job_writes_only_uncovered_companies() {
    // Given: c1 has a service, c2 and c3 have none
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/service_types");
            then.status(200)
                .json_body(json!([{ "id": "labor", "name": "შრომის უსაფრთხოება" }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/companies");
            then.status(200)
                .header("content-range", "0-2/3")
                .json_body(json!([company("c1"), company("c2"), company("c3")]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/company_services");
            then.status(200)
                .header("content-range", "0-0/1")
                .json_body(json!([{ "parent_id": "c1", "association_type_id": "other" }]));
        })
        .await;
    let write = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/company_services")
                .json_body(json!([
                    { "company_id": "c2", "service_type_id": "labor", "priority": "medium", "status": "active" },
                    { "company_id": "c3", "service_type_id": "labor", "priority": "medium", "status": "active" }
                ]));
            then.status(201);
        })
        .await;

    // When: running the default job
    let report = ReconciliationJob::new("შრომის უსაფრთხოება")
        .run(&client(&server, 100))
        .await
        .expect("Job should run");

    // Then: one batch with the two uncovered companies
    write.assert_async().await;
    let result = report.result.expect("Not a dry run");
    assert_eq!(result.attempted, 2);
    assert_eq!(result.succeeded, 2);
    assert!(result.is_complete());
}

// ── reconcile command ───────────────────────────────────────────────

fn admin_config(server: &MockServer) -> AdminConfig {
    let mut config = AdminConfig::default();
    config.backend.url = server.base_url();
    config.backend.api_key = "test-key".to_string();
    config
}

#[tokio::test]
async fn test_missing_type_blocks_activation() {
    // Given: the default service type does not exist
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/service_types");
            then.status(200).json_body(json!([]));
        })
        .await;
    let activation = server
        .mock_async(|when, then| {
            when.method(PATCH).path("/rest/v1/companies");
            then.status(200).json_body(json!([{ "id": "c1" }]));
        })
        .await;
    let writes = server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/company_services");
            then.status(201);
        })
        .await;

    // When: reconciling with activation first
    let args = ReconcileArgs {
        activate_first: true,
        ..Default::default()
    };
    let outcome = reconcile::run(&admin_config(&server), &args, true).await;

    // Then: the run fails and nothing was written
    assert!(outcome.is_err());
    activation.assert_calls_async(0).await;
    writes.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_interrupted_run_skips_final_verification() {
    let server = MockServer::start_async().await;
    let listing = server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/companies");
            then.status(200).json_body(json!([company("c1")]));
        })
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let coverage = reconcile::final_verification(
        &client(&server, 100),
        StatusFilter::Only(ParentStatus::Active),
        StatusFilter::Any,
        &cancel,
    )
    .await
    .expect("Cancellation is not an error");

    assert!(coverage.is_none());
    listing.assert_calls_async(0).await;
}
