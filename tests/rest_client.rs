//! HTTP content-server client against a mock server.

use chrono::Utc;
use permit_ecm_core::category::Metadata;
use permit_ecm_core::ecm::ContentServer;
use permit_ecm_core::models::{FileAttributes, FileContent};
use permit_ecm_core::Error;
use permit_ecm_sync::config::EcmConfig;
use permit_ecm_sync::ecm_rest::RestContentServer;
use serde_json::json;
use tokio::io::AsyncReadExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connected(mock_server: &MockServer) -> RestContentServer {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(body_partial_json(json!({ "username": "loader", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ticket": "tkt-1" })))
        .expect(1)
        .mount(mock_server)
        .await;

    let config = EcmConfig {
        base_url: format!("{}/", mock_server.uri()),
        username: "loader".to_string(),
        password: None,
        timeout_secs: 10,
        workspace_root_id: 2000,
    };
    RestContentServer::connect(&config, "secret").await.unwrap()
}

#[tokio::test]
async fn test_connect_failure_is_transport_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&mock_server)
        .await;

    let config = EcmConfig {
        base_url: mock_server.uri(),
        username: "loader".to_string(),
        password: None,
        timeout_secs: 10,
        workspace_root_id: 2000,
    };
    let err = RestContentServer::connect(&config, "wrong").await.err().unwrap();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("bad credentials"));
}

#[tokio::test]
async fn test_ticket_sent_and_missing_node_is_none() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/nodes/42"))
        .and(header("OTCSTicket", "tkt-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 42, "name": "Permits", "parent_id": 2000 })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nodes/43"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let node = server.node(42).await.unwrap().unwrap();
    assert_eq!(node.name, "Permits");
    assert_eq!(node.parent_id, Some(2000));
    assert!(server.node(43).await.unwrap().is_none());
}

#[tokio::test]
async fn test_node_by_path_sends_segments() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/nodes/2000/path"))
        .and(query_param("segment", "Permits"))
        .and(query_param("segment", "No Tax Account"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 3001, "name": "No Tax Account", "parent_id": 3000 })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let node = server
        .node_by_path(2000, &["Permits".to_string(), "No Tax Account".to_string()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node.id, 3001);
}

#[tokio::test]
async fn test_child_lookup_and_folder_create() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/nodes/3001/children"))
        .and(query_param("name", "P-100"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/nodes/3001/folders"))
        .and(body_partial_json(json!({
            "name": "P-100",
            "comment": "Folder Loaded by AMANDA-PRISM-Loader",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 4000, "name": "P-100", "parent_id": 3001 })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    assert!(server.child_by_name(3001, "P-100").await.unwrap().is_none());
    let created = server
        .create_folder(
            3001,
            "P-100",
            "Folder Loaded by AMANDA-PRISM-Loader",
            &Metadata::new(),
        )
        .await
        .unwrap();
    assert_eq!(created.id, 4000);
}

#[tokio::test]
async fn test_template_failure_is_template_error() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/categories/31002/template"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let err = server.category_template(31002).await.unwrap_err();
    match &err {
        Error::Template { category_id, .. } => assert_eq!(*category_id, 31002),
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("HTTP 500"));
}

#[tokio::test]
async fn test_template_decodes() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/categories/31001/template"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 31001,
            "name": "Document Info",
            "fields": [
                { "key": "31001_2", "name": "Document Source" },
                { "key": "31001_3", "name": "Description" },
                { "key": "31001_4", "name": "Attachment Type" }
            ]
        })))
        .mount(&mock_server)
        .await;

    let template = server.category_template(31001).await.unwrap();
    assert_eq!(template.fields.len(), 3);
    assert_eq!(template.fields[2].key, "31001_4");
}

#[tokio::test]
async fn test_document_context_and_streamed_upload() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/nodes/4000/documents"))
        .and(body_partial_json(json!({
            "name": "8801_plan.pdf",
            "advanced_versioning": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "context_id": "ctx-1" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/contexts/ctx-1/content"))
        .and(header("X-File-Name", "plan.pdf"))
        .and(header("X-File-Size", "25000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 5000 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = server
        .create_document_context(
            4000,
            "8801_plan.pdf",
            "Uploaded by AMANDA EDMS Adaptor",
            true,
            &Metadata::new(),
        )
        .await
        .unwrap();
    assert_eq!(context, "ctx-1");

    let bytes: Vec<u8> = (0..25_000u32).map(|i| (i % 251) as u8).collect();
    let content = FileContent::from_bytes("plan.pdf", bytes.clone());
    let now = Utc::now();
    let id = server
        .upload_content(
            &context,
            FileAttributes {
                file_name: "plan.pdf".to_string(),
                size: 25_000,
                created: now,
                modified: now,
            },
            content.reader,
            10_240,
        )
        .await
        .unwrap();
    assert_eq!(id, 5000);

    let requests = mock_server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/contexts/ctx-1/content")
        .unwrap();
    assert_eq!(upload.body, bytes);
}

#[tokio::test]
async fn test_version_context() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/nodes/5000/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "context_id": "ctx-2" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = server
        .add_major_version_context(5000, &Metadata::new())
        .await
        .unwrap();
    assert_eq!(context, "ctx-2");
}

#[tokio::test]
async fn test_download_into_temp_file() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/nodes/5000/content"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-File-Name", "8801_plan.pdf")
                .set_body_raw(b"%PDF-1.7 body".to_vec(), "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let mut content = server.download_content(5000).await.unwrap();
    assert_eq!(content.file_name, "8801_plan.pdf");
    assert_eq!(content.mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(content.size, 13);
    let mut buf = Vec::new();
    content.reader.read_to_end(&mut buf).await.unwrap();
    assert_eq!(buf, b"%PDF-1.7 body");
}

#[tokio::test]
async fn test_close_deletes_session() {
    let mock_server = MockServer::start().await;
    let server = connected(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path("/auth"))
        .and(header("OTCSTicket", "tkt-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    server.close().await.unwrap();
}
