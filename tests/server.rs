use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use tempfile::TempDir;

use common::api::{NewTable, RequestStatus, TableStatus};
use common::catalog::RequestType;
use common::database::{sqlite::SQLiteConnection, Database};
use common::endpoints::create_http_router;
use common::errors::Error;
use common::http::{HttpServer, Response};
use common::qr::QrGenerator;
use common::remote::{ApiClient, TableSession};
use common::service::TableService;
use common::status::RequestFilter;
use common::storage::LocalPhotoStore;

/// Start a server on a free port, backed by an in-memory SQLite database and a temporary photo
/// directory. The server thread lives until the test process exits.
fn start_server(allow_bulk_clear: bool) -> (TempDir, ApiClient) {
    let dir = TempDir::new().unwrap();
    let server = HttpServer::new("127.0.0.1:0").unwrap();
    let address = server.local_addr().unwrap().to_string();

    let photos = LocalPhotoStore::new(dir.path(), &format!("http://{}", address)).unwrap();
    let service = Arc::new(Mutex::new(TableService::new(
        Box::new(SQLiteConnection::new().unwrap()),
        Box::new(photos),
        QrGenerator::new("https://order.example.com"),
        allow_bulk_clear,
    )));
    let router = Arc::new(create_http_router().unwrap());

    thread::spawn(move || {
        server
            .serve(2, move |request| {
                let mut service = service.lock().unwrap();
                router
                    .route(request, &mut service)
                    .unwrap_or_else(|err| Response::from_error(&err))
            })
            .unwrap();
    });

    let client = ApiClient::new(&address);
    client.create_restaurant("Bistro", "bistro").unwrap();
    for (label, x) in [("A1", 10), ("A2", 40)] {
        client
            .create_table(
                "bistro",
                &NewTable {
                    label: label.to_string(),
                    x_position: Some(x),
                    y_position: Some(20),
                },
            )
            .unwrap();
    }
    (dir, client)
}

fn remote_status(err: Error) -> u16 {
    match err {
        Error::Remote { status, .. } => status,
        other => panic!("Expected an error response, got {:?}", other),
    }
}

#[test]
fn test_customer_flow() {
    let (_dir, client) = start_server(false);

    let page = client.table_page("bistro", "A1").unwrap();
    assert_eq!(page.restaurant.slug, "bistro");
    assert_eq!(page.table.label, "A1");
    assert!(page.cooldowns.iter().all(|c| c.until.is_none()));

    let request = client
        .submit_request("bistro", "A1", RequestType::ReadyToOrder, None)
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.request_type, RequestType::ReadyToOrder);

    match client.submit_request("bistro", "A1", RequestType::ReadyToOrder, None) {
        Err(Error::Remote { status, message }) => {
            assert_eq!(status, 429);
            assert!(message.starts_with("Please wait"), "{}", message);
        }
        other => panic!("Expected a cooldown refusal, got {:?}", other),
    }

    // Cooldowns are per table and per type
    client
        .submit_request("bistro", "A2", RequestType::ReadyToOrder, None)
        .unwrap();
    client
        .submit_request("bistro", "A1", RequestType::RequestSauces, None)
        .unwrap();

    let page = client.table_page("bistro", "A1").unwrap();
    let cooling: Vec<_> = page
        .cooldowns
        .iter()
        .filter(|c| c.until.is_some())
        .map(|c| c.request_type)
        .collect();
    assert_eq!(cooling.len(), 2);
    assert!(cooling.contains(&RequestType::ReadyToOrder));
    assert!(cooling.contains(&RequestType::RequestSauces));

    let err = client.table_page("bistro", "Z9").unwrap_err();
    assert_eq!(remote_status(err), 404);
    let err = client
        .submit_request("nowhere", "A1", RequestType::TableClean, None)
        .unwrap_err();
    assert_eq!(remote_status(err), 404);
}

#[test]
fn test_toilet_request_needs_photo() {
    let (_dir, client) = start_server(false);

    let err = client
        .submit_request("bistro", "A1", RequestType::ToiletClean, None)
        .unwrap_err();
    assert_eq!(remote_status(err), 400);

    let bytes: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();
    let uploaded = client.upload_photo("mess.PNG", &bytes).unwrap();
    assert!(uploaded.path.starts_with("toilet-photos/toilet-"));
    assert!(uploaded.path.ends_with(".png"));
    assert!(uploaded.url.starts_with(&format!("http://{}/api/v1/photos/", client.address())));

    let request = client
        .submit_request(
            "bistro",
            "A1",
            RequestType::ToiletClean,
            Some(uploaded.url.clone()),
        )
        .unwrap();
    assert_eq!(request.photo_url, Some(uploaded.url));

    assert_eq!(client.photo(&uploaded.path).unwrap(), bytes);
    let err = client.photo("toilet-photos/missing.jpg").unwrap_err();
    assert_eq!(remote_status(err), 404);
}

#[test]
fn test_staff_flow() {
    let (_dir, client) = start_server(false);

    let urgent = client
        .submit_request("bistro", "A1", RequestType::ReadyToOrder, None)
        .unwrap();
    client
        .submit_request("bistro", "A2", RequestType::ReplaceCutlery, None)
        .unwrap();

    let dashboard = client.dashboard(&RequestFilter::default()).unwrap();
    assert_eq!(dashboard.requests.len(), 2);
    assert_eq!(dashboard.stats.pending, 2);
    assert_eq!(dashboard.stats.urgent, 1);
    let status_of = |label: &str| {
        dashboard
            .tables
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.status)
            .unwrap()
    };
    assert_eq!(status_of("A1"), TableStatus::Urgent);
    assert_eq!(status_of("A2"), TableStatus::Pending);

    let updated = client
        .update_status(urgent.id, RequestStatus::InProgress)
        .unwrap();
    assert_eq!(updated.status, RequestStatus::InProgress);
    // Still open, so still urgent
    let dashboard = client.dashboard(&RequestFilter::default()).unwrap();
    assert_eq!(dashboard.stats.urgent, 1);
    assert_eq!(dashboard.stats.in_progress, 1);

    client
        .update_status(urgent.id, RequestStatus::Completed)
        .unwrap();
    let filter = RequestFilter {
        status: Some(RequestStatus::Completed),
        table_id: None,
    };
    let dashboard = client.dashboard(&filter).unwrap();
    assert_eq!(dashboard.requests.len(), 1);
    assert_eq!(dashboard.requests[0].id, urgent.id);
    assert_eq!(dashboard.stats.total, 2);
    assert_eq!(dashboard.stats.urgent, 0);

    let err = client
        .update_status(9999, RequestStatus::Completed)
        .unwrap_err();
    assert_eq!(remote_status(err), 404);

    let err = client.clear_requests().unwrap_err();
    assert_eq!(remote_status(err), 403);
    assert_eq!(client.requests(&RequestFilter::default()).unwrap().len(), 2);
}

#[test]
fn test_bulk_clear_when_enabled() {
    let (_dir, client) = start_server(true);

    client
        .submit_request("bistro", "A1", RequestType::TableClean, None)
        .unwrap();
    assert_eq!(client.clear_requests().unwrap(), 1);
    assert!(client
        .requests(&RequestFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn test_catalog_and_qr_codes() {
    let (_dir, client) = start_server(false);

    let types = client.request_types().unwrap();
    assert_eq!(types.len(), RequestType::ALL.len());
    assert!(types
        .iter()
        .any(|info| info.request_type == RequestType::ToiletClean && info.requires_photo));

    let codes = client.qr_codes("bistro", &[]).unwrap();
    assert_eq!(codes.len(), 2);
    assert_eq!(codes[0].url, "https://order.example.com/u/bistro/A1");

    let codes = client.qr_codes("bistro", &["A2".to_string()]).unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].table_label, "A2");
    assert!(codes[0].image_url.contains("size=200x200"));
}

#[test]
fn test_table_session_flow() {
    let (dir, client) = start_server(false);
    let stored_photos = dir.path().join("toilet-photos");
    let camera = TempDir::new().unwrap();
    let photo = camera.path().join("stall.jpg");
    fs::write(&photo, b"\xff\xd8\xff\xe0").unwrap();

    let mut session = TableSession::open(&client, "bistro", "A1", Utc::now()).unwrap();
    assert!(session.tracker.is_empty());

    // A photo given to a type that doesn't take one is never uploaded
    session
        .submit(RequestType::ReplaceCutlery, Some(photo.as_path()), Utc::now())
        .unwrap();
    assert!(!stored_photos.exists());
    assert!(session.tracker.is_active(RequestType::ReplaceCutlery));
    assert!(session
        .tracker
        .remaining(RequestType::ReplaceCutlery)
        .is_some());

    // Refused locally, the server only ever saw one request
    match session.submit(RequestType::ReplaceCutlery, None, Utc::now()) {
        Err(Error::CooldownActive { remaining }) => assert!(remaining.ends_with('s')),
        other => panic!("Expected a local cooldown refusal, got {:?}", other),
    }
    assert_eq!(client.requests(&RequestFilter::default()).unwrap().len(), 1);

    assert!(matches!(
        session.submit(RequestType::ToiletClean, None, Utc::now()),
        Err(Error::PhotoRequired(_))
    ));
    assert!(!stored_photos.exists());

    let request = session
        .submit(RequestType::ToiletClean, Some(photo.as_path()), Utc::now())
        .unwrap();
    assert!(request.photo_url.is_some());
    assert_eq!(fs::read_dir(&stored_photos).unwrap().count(), 1);
    assert!(session.tracker.is_active(RequestType::ToiletClean));

    // Another device opening the same table sees the cooldowns from the server
    let other = TableSession::open(&client, "bistro", "A1", Utc::now()).unwrap();
    assert!(other.tracker.is_active(RequestType::ReplaceCutlery));
    assert!(other.tracker.is_active(RequestType::ToiletClean));
    assert!(!other.tracker.is_active(RequestType::TableClean));
}
