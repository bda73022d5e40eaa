use arlula::{ApiError, Client, ListRequest};
use mockito::{Matcher, Server, ServerGuard};
use reqwest::StatusCode;
use serde_json::json;
use std::io::{Read, Write};
use std::net::TcpListener;

// base64("key:secret")
const AUTH: &str = "Basic a2V5OnNlY3JldA==";

fn client(server: &ServerGuard) -> Client {
    client_at(server.url())
}

fn client_at(url: String) -> Client {
    Client::new(
        Some(url),
        Some("key".to_string()),
        Some("secret".to_string()),
        Some(true),
    )
    .unwrap()
    .with_progress(false)
}

fn resource(id: &str, name: &str, size: u64) -> serde_json::Value {
    json!({
        "id": id,
        "createdAt": "2021-10-18T22:38:10.123456Z",
        "updatedAt": "not a timestamp",
        "dataset": "ds-1",
        "name": name,
        "type": "img_geotiff",
        "format": "image/tiff",
        "roles": ["data"],
        "size": size,
        "checksum": "sha256:\"abc\""
    })
}

fn dataset(id: &str, resources: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "id": id,
        "createdAt": "2021-10-18T22:38:10Z",
        "updatedAt": "2021-10-18T22:38:10-04:45",
        "type": "archive",
        "status": "complete",
        "supplier": "landsat",
        "orderingID": "ord-xyz",
        "sceneID": "LC08_L1TP",
        "bundle": "default",
        "eula": "https://example.com/eula",
        "total": 12000,
        "discount": 0,
        "tax": 1200,
        "order": "order-1",
        "resources": resources
    })
}

fn campaign(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "createdAt": "2021-10-18T22:38:10Z",
        "updatedAt": "2021-10-18T22:38:10Z",
        "status": "pending",
        "orderingID": "ord-abc",
        "bundle": "default",
        "license": "standard",
        "priority": "standard",
        "total": 50000,
        "discount": 0,
        "tax": 5000,
        "order": "order-1",
        "start": "2021-11-01T00:00:00Z",
        "end": "2021-11-30T00:00:00Z",
        "aoi": [[[151.0, -33.0], [151.1, -33.0], [151.0, -33.0]]],
        "cloud": 20,
        "offNadir": 30.0,
        "supplier": "maxar",
        "platforms": ["WV03"],
        "gsd": 0.3
    })
}

fn order(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "createdAt": "2021-10-18T22:38:10Z",
        "updatedAt": "2021-10-18T22:38:10Z",
        "status": "complete",
        "total": 62000,
        "discount": 0,
        "tax": 6200,
        "paymentMethod": "invoice"
    })
}

fn unpaged(content: Vec<serde_json::Value>) -> String {
    let count = content.len();
    json!({ "content": content, "page": 0, "length": count, "count": count }).to_string()
}

/// Answers one request with headers promising more body than it sends.
fn truncated_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"id\":",
        );
    });
    format!("http://{addr}")
}

fn page_query(page: u32, size: u32) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("page".into(), page.to_string()),
        Matcher::UrlEncoded("size".into(), size.to_string()),
    ])
}

#[test]
fn validate_credentials_sends_headers() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/test")
        .match_header("authorization", AUTH)
        .match_header("x-api-version", "2020-12")
        .match_header("user-agent", Matcher::Regex("^arlula-rs/".into()))
        .with_status(200)
        .with_body("ok")
        .create();

    client(&server).validate_credentials().unwrap();
    mock.assert();
}

#[test]
fn invalid_credentials_are_reported() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/test")
        .with_status(401)
        .with_body(r#"{"message": "invalid api key"}"#)
        .create();

    let err = client(&server).validate_credentials().unwrap_err();
    let api = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api.status, StatusCode::UNAUTHORIZED);
    assert_eq!(api.message, "invalid api key");
    assert!(err.to_string().contains("HTTP 401"));
}

#[test]
fn validate_credentials_requires_ok() {
    let mut server = Server::new();
    let _mock = server.mock("GET", "/api/test").with_status(204).create();

    let err = client(&server).validate_credentials().unwrap_err();
    let api = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api.status, StatusCode::NO_CONTENT);
}

#[test]
fn truncated_body_is_an_error() {
    let err = client_at(truncated_body_server())
        .get_resource("r-1")
        .unwrap_err();
    assert!(
        err.to_string().starts_with("failed to read response body from"),
        "{err:#}"
    );
}

#[test]
fn get_resource_parses_timestamps_softly() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/resource/r-1")
        .match_header("authorization", AUTH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resource("r-1", "scene.tif", 3).to_string())
        .create();

    let r = client(&server).get_resource("r-1").unwrap();
    assert_eq!(r.name, "scene.tif");
    assert!(r.created_at.is_some());
    assert!(r.updated_at.is_none());
}

#[test]
fn missing_entity_is_not_found() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/dataset/nope")
        .with_status(404)
        .with_body("dataset not found")
        .create();

    let err = client(&server).get_dataset("nope").unwrap_err();
    let api = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api.status, StatusCode::NOT_FOUND);
    assert!(api.url.ends_with("/api/dataset/nope"));
}

#[test]
fn list_datasets_sends_page_query() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/datasets")
        .match_query(page_query(1, 5))
        .with_status(200)
        .with_body(
            json!({
                "content": [dataset("ds-6", Vec::new())],
                "page": 1,
                "length": 5,
                "count": 6
            })
            .to_string(),
        )
        .create();

    let page = client(&server)
        .list_datasets(Some(ListRequest::new(Some(1), Some(5))))
        .unwrap();
    mock.assert();
    assert_eq!(page.count, 6);
    assert_eq!(page.content[0].id, "ds-6");
    assert!(!page.has_next());
}

#[test]
fn list_datasets_without_content() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/datasets")
        .match_query(page_query(0, 20))
        .with_status(200)
        .with_body(r#"{"page": 0, "length": 20, "count": 0}"#)
        .create();

    let page = client(&server).list_datasets(None).unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.count, 0);
}

#[test]
fn datasets_walks_pages() {
    let mut server = Server::new();
    let first = server
        .mock("GET", "/api/datasets")
        .match_query(page_query(0, 2))
        .with_status(200)
        .with_body(
            json!({
                "content": [dataset("a", Vec::new()), dataset("b", Vec::new())],
                "page": 0,
                "length": 2,
                "count": 3
            })
            .to_string(),
        )
        .create();
    let second = server
        .mock("GET", "/api/datasets")
        .match_query(page_query(1, 2))
        .with_status(200)
        .with_body(
            json!({
                "content": [dataset("c", Vec::new())],
                "page": 1,
                "length": 2,
                "count": 3
            })
            .to_string(),
        )
        .create();

    let client = client(&server);
    let ids: Vec<String> = client
        .datasets(Some(2))
        .map(|d| d.map(|d| d.id))
        .collect::<anyhow::Result<_>>()
        .unwrap();
    assert_eq!(ids, vec!["a", "b", "c"]);
    first.assert();
    second.assert();
}

#[test]
fn list_orders_sends_page_query() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/orders")
        .match_header("authorization", AUTH)
        .match_query(page_query(2, 10))
        .with_status(200)
        .with_body(
            json!({
                "content": [order("order-21")],
                "page": 2,
                "length": 10,
                "count": 21
            })
            .to_string(),
        )
        .create();

    let page = client(&server)
        .list_orders(Some(ListRequest::new(Some(2), Some(10))))
        .unwrap();
    mock.assert();
    assert_eq!(page.content[0].id, "order-21");
    assert_eq!(page.content[0].payment_method.as_deref(), Some("invoice"));
    assert!(page.content[0].campaigns.is_empty());
}

#[test]
fn get_order_and_its_children() {
    let mut server = Server::new();
    let mut full = order("order-1");
    full["campaigns"] = json!([campaign("camp-1")]);
    full["datasets"] = json!([dataset("ds-1", Vec::new())]);
    let _order = server
        .mock("GET", "/api/order/order-1")
        .with_status(200)
        .with_body(full.to_string())
        .create();
    let _campaigns = server
        .mock("GET", "/api/order/order-1/campaigns")
        .match_query(Matcher::Missing)
        .with_status(200)
        .with_body(unpaged(vec![campaign("camp-1"), campaign("camp-2")]))
        .create();
    let _datasets = server
        .mock("GET", "/api/order/order-1/datasets")
        .match_query(Matcher::Missing)
        .with_status(200)
        .with_body(unpaged(vec![dataset("ds-1", Vec::new())]))
        .create();

    let client = client(&server);
    let order = client.get_order("order-1").unwrap();
    assert_eq!(order.campaigns[0].id, "camp-1");
    assert_eq!(order.datasets[0].id, "ds-1");

    let campaigns = client.list_order_campaigns(&order).unwrap();
    let ids: Vec<&str> = campaigns.content.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["camp-1", "camp-2"]);

    let datasets = client.list_order_datasets(&order).unwrap();
    assert_eq!(datasets.count, 1);
    assert_eq!(datasets.content[0].scene_id, "LC08_L1TP");
}

#[test]
fn orders_walks_pages() {
    let mut server = Server::new();
    let _first = server
        .mock("GET", "/api/orders")
        .match_query(page_query(0, 1))
        .with_status(200)
        .with_body(json!({"content": [order("o-1")], "page": 0, "length": 1, "count": 2}).to_string())
        .create();
    let _second = server
        .mock("GET", "/api/orders")
        .match_query(page_query(1, 1))
        .with_status(200)
        .with_body(json!({"content": [order("o-2")], "page": 1, "length": 1, "count": 2}).to_string())
        .create();

    let client = client(&server);
    let ids: Vec<String> = client
        .orders(Some(1))
        .map(|o| o.map(|o| o.id))
        .collect::<anyhow::Result<_>>()
        .unwrap();
    assert_eq!(ids, vec!["o-1", "o-2"]);
}

#[test]
fn campaigns_endpoints() {
    let mut server = Server::new();
    let list = server
        .mock("GET", "/api/campaigns")
        .match_query(page_query(0, 20))
        .with_status(200)
        .with_body(json!({"content": [campaign("camp-1")], "page": 0, "length": 20, "count": 1}).to_string())
        .create();
    let _one = server
        .mock("GET", "/api/campaign/camp-1")
        .match_header("authorization", AUTH)
        .with_status(200)
        .with_body(campaign("camp-1").to_string())
        .create();
    let _datasets = server
        .mock("GET", "/api/campaign/camp-1/datasets")
        .with_status(200)
        .with_body(unpaged(vec![dataset("ds-7", Vec::new())]))
        .create();

    let client = client(&server);
    let all: Vec<String> = client
        .campaigns(None)
        .map(|c| c.map(|c| c.id))
        .collect::<anyhow::Result<_>>()
        .unwrap();
    assert_eq!(all, vec!["camp-1"]);
    list.assert();

    let page = client.list_campaigns(None).unwrap();
    assert_eq!(page.content[0].platforms, vec!["WV03"]);

    let campaign = client.get_campaign("camp-1").unwrap();
    assert_eq!(campaign.gsd, 0.3);
    assert!(campaign.start.is_some());

    let datasets = client.list_campaign_datasets(&campaign).unwrap();
    assert_eq!(datasets.content[0].id, "ds-7");
}

#[test]
fn missing_campaign_is_not_found() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/campaign/nope")
        .with_status(404)
        .with_body(r#"{"message": "campaign not found"}"#)
        .create();

    let err = client(&server).get_campaign("nope").unwrap_err();
    let api = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api.status, StatusCode::NOT_FOUND);
    assert_eq!(api.message, "campaign not found");
}

#[test]
fn download_follows_redirect_and_names_file() {
    let mut api = Server::new();
    let mut storage = Server::new();
    let body = vec![7u8; 4096];

    let _redirect = api
        .mock("GET", "/api/resource/r-1/data")
        .match_header("authorization", AUTH)
        .with_status(302)
        .with_header("location", &format!("{}/bucket/obj?sig=1", storage.url()))
        .with_header("content-disposition", r#"attachment; filename="scene.tif""#)
        .create();
    let blob = storage
        .mock("GET", "/bucket/obj")
        .match_query(Matcher::UrlEncoded("sig".into(), "1".into()))
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(&body)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let mut fractions = Vec::new();
    let path = client(&api)
        .download_resource_with_progress("r-1", None, Some(dir.path()), |f| fractions.push(f))
        .unwrap();

    blob.assert();
    assert_eq!(path, dir.path().join("scene.tif"));
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert_eq!(fractions.last().copied(), Some(1.0));
}

#[test]
fn download_to_explicit_path() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/resource/r-1/data")
        .with_status(200)
        .with_header("content-disposition", r#"attachment; filename="ignored.tif""#)
        .with_body("pixels")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("out.tif");
    let path = client(&server)
        .download_resource_as_file("r-1", Some(target.as_path()), None)
        .unwrap();
    assert_eq!(path, target);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "pixels");
}

#[test]
fn download_without_disposition_uses_resource_id() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/resource/r-9/data")
        .with_status(200)
        .with_body("pixels")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let path = client(&server)
        .download_resource_as_file("r-9", None, Some(dir.path()))
        .unwrap();
    assert_eq!(path, dir.path().join("r-9"));
}

#[test]
fn download_failure_is_api_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/resource/r-1/data")
        .with_status(403)
        .with_body(r#"{"error": "dataset expired"}"#)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let err = client(&server)
        .download_resource_as_file("r-1", None, Some(dir.path()))
        .unwrap_err();
    let api = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api.status, StatusCode::FORBIDDEN);
    assert_eq!(api.message, "dataset expired");
}

#[test]
fn redirect_loop_is_an_error() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/resource/r-1/data")
        .with_status(302)
        .with_header("location", "/api/resource/r-1/data")
        .expect(11)
        .create();

    let err = client(&server)
        .download_resource_as_memory("r-1")
        .unwrap_err();
    mock.assert();
    assert_eq!(err.to_string(), "too many redirects downloading resource r-1");
}

#[test]
fn redirect_without_location_is_an_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/resource/r-1/data")
        .with_status(302)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let err = client(&server)
        .download_resource_as_file("r-1", None, Some(dir.path()))
        .unwrap_err();
    assert!(err.to_string().ends_with("without a Location header"), "{err:#}");
    assert!(!dir.path().join("r-1").exists());
}

#[test]
fn download_as_memory() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/resource/r-1/data")
        .with_status(200)
        .with_body("in memory")
        .create();

    let bytes = client(&server).download_resource_as_memory("r-1").unwrap();
    assert_eq!(bytes, b"in memory");
}

#[test]
fn download_dataset_fetches_every_resource() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/dataset/ds-1")
        .with_status(200)
        .with_body(
            dataset(
                "ds-1",
                vec![resource("r-1", "a.tif", 1), resource("r-2", "b.xml", 1)],
            )
            .to_string(),
        )
        .create();
    let mut _data = Vec::new();
    for (id, name) in [("r-1", "a.tif"), ("r-2", "b.xml")] {
        let mock = server
            .mock("GET", format!("/api/resource/{id}/data").as_str())
            .with_status(200)
            .with_header(
                "content-disposition",
                &format!(r#"attachment; filename="{name}""#),
            )
            .with_body(id)
            .create();
        _data.push(mock);
    }

    let dir = tempfile::tempdir().unwrap();
    let paths = client(&server)
        .download_dataset("ds-1", Some(dir.path()))
        .unwrap();
    assert_eq!(
        paths,
        vec![dir.path().join("a.tif"), dir.path().join("b.xml")]
    );
    assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "r-2");
}
