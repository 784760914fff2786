use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use sunquote::models::content::{ContentBlock, Page, SiteSettings};
use sunquote::models::product::{PhaseCategory, Product, ProductSpecifications, SystemType};
use sunquote::models::quote::Quote;
use sunquote::notify::{IntegrationError, LeadChannel, Outbox, RetryPolicy};
use sunquote::state::AppState;
use sunquote::store::MemoryStore;
use sunquote::submission::{PhotoStore, SubmissionPipeline};
use sunquote::wizard::WizardSessions;

fn product(id: i64, system: SystemType, category: PhaseCategory, price: Decimal, rebate: Option<Decimal>) -> Product {
    let specifications = match system {
        SystemType::Solar => ProductSpecifications::Solar {
            panel_count: 16,
            panel_wattage: 415,
            inverter: "Fronius Primo 5.0".to_string(),
        },
        SystemType::Battery => ProductSpecifications::Battery {
            usable_kwh: dec!(13.5),
            chemistry: "LFP".to_string(),
            inverter: None,
        },
        SystemType::EvCharger => ProductSpecifications::EvCharger {
            kw_rating: dec!(7.4),
            connector: "Type 2".to_string(),
        },
    };
    Product {
        id,
        name: format!("{system} #{id}"),
        product_type: system,
        category,
        capacity: "6.6kW".to_string(),
        price,
        rebate_eligible: rebate.is_some(),
        rebate_amount: rebate,
        specifications,
        warranty: "10 years".to_string(),
        popular: id == 1,
        active: id != 5,
        created_at: None,
    }
}

fn catalog() -> Vec<Product> {
    vec![
        product(1, SystemType::Solar, PhaseCategory::SinglePhase, dec!(7000), Some(dec!(2000))),
        product(2, SystemType::Battery, PhaseCategory::SinglePhase, dec!(11000), Some(dec!(1000))),
        product(3, SystemType::EvCharger, PhaseCategory::SinglePhase, dec!(1800), None),
        product(4, SystemType::Solar, PhaseCategory::ThreePhase, dec!(15000), Some(dec!(3000))),
        product(5, SystemType::Solar, PhaseCategory::SinglePhase, dec!(5000), None),
    ]
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

fn test_app() -> TestApp {
    test_app_with(Vec::new())
}

fn test_app_with(channels: Vec<Arc<dyn LeadChannel>>) -> TestApp {
    let store = Arc::new(MemoryStore::with_products(catalog()));
    store.insert_page(Page {
        slug: "home".to_string(),
        title: "Solar for Perth homes".to_string(),
        description: None,
        blocks: vec![ContentBlock::ProductShowcase { system: SystemType::Battery, heading: Some("Batteries".to_string()) }],
        updated_at: None,
    });

    let retry = RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1) };
    let (outbox, _worker) = Outbox::start(16, channels, retry);
    let upload_dir = std::env::temp_dir().join(format!("sunquote-test-{}", Uuid::new_v4()));
    let pipeline = SubmissionPipeline::new(store.clone(), PhotoStore::new(upload_dir, 64 * 1024), outbox);
    let state = AppState::new(store.clone(), store.clone(), pipeline, WizardSessions::new(Duration::from_secs(600)));

    TestApp { router: sunquote::app(state), store }
}

async fn send(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    read(app.router.clone().oneshot(request).await.unwrap()).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn money(value: &Value) -> Decimal {
    value.as_str().expect("money is serialized as a string").parse().unwrap()
}

fn contact() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Nguyen",
        "email": "ada@example.com.au",
        "phone": "0400 000 000",
        "address": "12 Sunny St",
        "suburb": "Fremantle",
        "postcode": "6160",
        "state": "WA"
    })
}

fn solar_and_battery() -> Value {
    json!({
        "selectedSystems": ["solar", "battery"],
        "solarPackage": 1,
        "batterySystem": 2,
        "powerSupply": "single"
    })
}

#[tokio::test]
async fn health_check_answers_ok() {
    let app = test_app();
    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn lists_active_products_popular_first() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/api/products", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body.as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 3, 2, 4]);
    assert_eq!(body[0]["type"], "solar");
    assert_eq!(body[0]["rebateEligible"], true);
}

#[tokio::test]
async fn filters_products_by_type_and_category() {
    let app = test_app();

    let (_, batteries) = send(&app, Method::GET, "/api/products?type=battery", None).await;
    let (_, three_phase_solar) =
        send(&app, Method::GET, "/api/products?type=solar&category=three_phase", None).await;

    assert_eq!(batteries.as_array().unwrap().len(), 1);
    assert_eq!(three_phase_solar[0]["id"], 4);
}

#[tokio::test]
async fn unknown_product_type_is_rejected() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/api/products?type=wind", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["type"].is_string());
}

#[tokio::test]
async fn missing_and_inactive_products_are_not_found() {
    let app = test_app();

    let (missing, body) = send(&app, Method::GET, "/api/products/99", None).await;
    let (inactive, _) = send(&app, Method::GET, "/api/products/5", None).await;

    assert_eq!(missing, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
    assert_eq!(inactive, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn calculates_pricing_with_rebates() {
    let app = test_app();

    let (status, body) = send(&app, Method::POST, "/api/pricing/calculate", Some(solar_and_battery())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["totalPrice"]), dec!(18000));
    assert_eq!(money(&body["rebateAmount"]), dec!(3000));
    assert_eq!(money(&body["finalPrice"]), dec!(15000));
    assert_eq!(body["breakdown"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn pricing_rejects_products_for_the_wrong_phase() {
    let app = test_app();
    let body = json!({ "selectedSystems": ["solar"], "solarPackage": 4, "powerSupply": "single" });

    let (status, body) = send(&app, Method::POST, "/api/pricing/calculate", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["solarPackage"].is_string());
}

#[tokio::test]
async fn pricing_rejects_unknown_products() {
    let app = test_app();
    let body = json!({ "selectedSystems": ["ev"], "evCharger": 42, "powerSupply": "unknown" });

    let (status, body) = send(&app, Method::POST, "/api/pricing/calculate", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["evCharger"].is_string());
}

#[tokio::test]
async fn creates_a_pending_quote_from_json() {
    let app = test_app();
    let body = json!({ "selection": solar_and_battery(), "contact": contact() });

    let (status, body) = send(&app, Method::POST, "/api/quotes", Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "id": 1, "status": "pending" }));
    let stored = app.store.quotes();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].final_price, dec!(15000));
    assert_eq!(stored[0].contact.email, "ada@example.com.au");
}

#[tokio::test]
async fn quote_without_email_is_rejected_and_not_stored() {
    let app = test_app();
    let mut details = contact();
    details["email"] = json!("");
    let body = json!({ "selection": solar_and_battery(), "contact": details });

    let (status, body) = send(&app, Method::POST, "/api/quotes", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["email"], "Email is required");
    assert!(app.store.quotes().is_empty());
}

#[tokio::test]
async fn quote_fails_when_the_database_is_down() {
    let app = test_app();
    app.store.set_unavailable(true);
    let body = json!({ "selection": solar_and_battery(), "contact": contact() });

    let (status, body) = send(&app, Method::POST, "/api/quotes", Some(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Database error occurred");
}

/// A CRM that refuses every lead.
#[derive(Default)]
struct DownCrm {
    attempts: AtomicU32,
}

#[async_trait]
impl LeadChannel for DownCrm {
    fn name(&self) -> &'static str {
        "crm"
    }

    async fn deliver(&self, _quote: &Quote) -> Result<(), IntegrationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(IntegrationError::Crm("503 Service Unavailable".into()))
    }
}

#[tokio::test]
async fn quote_is_created_even_when_the_crm_is_down() {
    let crm = Arc::new(DownCrm::default());
    let app = test_app_with(vec![crm.clone()]);
    let body = json!({ "selection": solar_and_battery(), "contact": contact() });

    let (status, body) = send(&app, Method::POST, "/api/quotes", Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "id": 1, "status": "pending" }));
    assert_eq!(app.store.quotes().len(), 1);
    for _ in 0..100 {
        if crm.attempts.load(Ordering::SeqCst) == 2 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("CRM delivery was not retried");
}

fn multipart(boundary: &str, quote: &Value, photo: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"quote\"\r\n\
             Content-Type: application/json\r\n\r\n{quote}\r\n"
        )
        .as_bytes(),
    );
    if let Some((content_type, bytes)) = photo {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"roof.jpg\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

async fn send_multipart(app: &TestApp, body: Vec<u8>, boundary: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/quotes")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    read(app.router.clone().oneshot(request).await.unwrap()).await
}

#[tokio::test]
async fn multipart_quote_saves_the_photo() {
    let app = test_app();
    let quote = json!({ "selection": solar_and_battery(), "contact": contact() });
    let body = multipart("XBOUNDARY", &quote, Some(("image/jpeg", b"\xff\xd8\xff\xe0fake-jpeg")));

    let (status, _) = send_multipart(&app, body, "XBOUNDARY").await;

    assert_eq!(status, StatusCode::CREATED);
    let stored = app.store.quotes();
    let path = stored[0].photo_path.as_ref().expect("photo path recorded");
    assert!(path.ends_with(".jpg"));
    assert!(std::path::Path::new(path).exists());
}

#[tokio::test]
async fn multipart_quote_rejects_non_image_photo() {
    let app = test_app();
    let quote = json!({ "selection": solar_and_battery(), "contact": contact() });
    let body = multipart("XBOUNDARY", &quote, Some(("application/pdf", b"%PDF-1.7")));

    let (status, body) = send_multipart(&app, body, "XBOUNDARY").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["photo"], "Photo must be an image");
    assert!(app.store.quotes().is_empty());
}

#[tokio::test]
async fn multipart_quote_without_photo_is_accepted() {
    let app = test_app();
    let quote = json!({ "selection": solar_and_battery(), "contact": contact() });

    let (status, _) = send_multipart(&app, multipart("XBOUNDARY", &quote, None), "XBOUNDARY").await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(app.store.quotes()[0].photo_path.is_none());
}

async fn wait_for_pricing(app: &TestApp, id: &str) -> Value {
    for _ in 0..100 {
        let (_, body) = send(app, Method::GET, &format!("/api/wizard/{id}"), None).await;
        if body["pricing"]["status"] != "pending" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pricing never finished");
}

#[tokio::test]
async fn wizard_walks_through_to_a_submitted_quote() {
    let app = test_app();
    let (status, created) = send(&app, Method::POST, "/api/wizard", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["step"], 1);
    let id = created["id"].as_str().unwrap().to_string();
    let path = |suffix: &str| format!("/api/wizard/{id}{suffix}");

    // Step 1 cannot be left without requirements.
    let (status, body) = send(&app, Method::POST, &path("/next"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["systems"].is_string());
    assert!(body["fields"]["powerSupply"].is_string());

    let requirements = json!({ "systems": ["solar", "battery"], "powerSupply": "single" });
    let (status, _) = send(&app, Method::PUT, &path("/requirements"), Some(requirements)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::POST, &path("/next"), None).await;
    assert_eq!(body["step"], 2);

    let products = json!({ "solarPackage": 1, "batterySystem": 2 });
    let (status, _) = send(&app, Method::PUT, &path("/products"), Some(products)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::POST, &path("/next"), None).await;
    assert_eq!(body["step"], 3);

    let body = wait_for_pricing(&app, &id).await;
    assert_eq!(body["pricing"]["status"], "ready");
    assert_eq!(money(&body["pricing"]["result"]["finalPrice"]), dec!(15000));

    // Selections are frozen once pricing has been requested.
    let (status, _) = send(&app, Method::PUT, &path("/products"), Some(json!({ "solarPackage": 1 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, Method::POST, &path("/goto/4"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::PUT, &path("/contact"), Some(contact())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::POST, &path("/submit"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 4);
    assert_eq!(body["receipt"], json!({ "id": 1, "status": "pending" }));
    assert_eq!(app.store.quotes()[0].final_price, dec!(15000));

    let (status, _) = send(&app, Method::POST, &path("/next"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::DELETE, &path(""), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 1);
    assert_eq!(body["pricing"]["status"], "idle");
}

async fn wizard_on_property_details(app: &TestApp, products: Value) -> String {
    let (_, created) = send(app, Method::POST, "/api/wizard", None).await;
    let id = created["id"].as_str().unwrap().to_string();
    let requirements = json!({ "systems": ["solar"], "powerSupply": "single" });
    send(app, Method::PUT, &format!("/api/wizard/{id}/requirements"), Some(requirements)).await;
    send(app, Method::POST, &format!("/api/wizard/{id}/next"), None).await;
    send(app, Method::PUT, &format!("/api/wizard/{id}/products"), Some(products)).await;
    let (_, body) = send(app, Method::POST, &format!("/api/wizard/{id}/next"), None).await;
    assert_eq!(body["step"], 3);
    id
}

#[tokio::test]
async fn wizard_pricing_failure_names_the_product_field() {
    let app = test_app();
    let id = wizard_on_property_details(&app, json!({ "solarPackage": 5 })).await;

    let body = wait_for_pricing(&app, &id).await;

    assert_eq!(body["pricing"]["status"], "failed");
    assert_eq!(body["pricing"]["error"], "Invalid product selection");
    assert!(body["pricing"]["fields"]["solarPackage"].is_string());
}

#[tokio::test]
async fn wizard_submit_can_be_retried_after_a_database_outage() {
    let app = test_app();
    let id = wizard_on_property_details(&app, json!({ "solarPackage": 1 })).await;
    assert_eq!(wait_for_pricing(&app, &id).await["pricing"]["status"], "ready");
    send(&app, Method::PUT, &format!("/api/wizard/{id}/contact"), Some(contact())).await;

    app.store.set_unavailable(true);
    let (status, _) = send(&app, Method::POST, &format!("/api/wizard/{id}/submit"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    app.store.set_unavailable(false);
    let (status, body) = send(&app, Method::POST, &format!("/api/wizard/{id}/submit"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 4);
    assert_eq!(app.store.quotes().len(), 1);
}

#[tokio::test]
async fn wizard_back_and_goto_move_to_reached_steps() {
    let app = test_app();
    let (_, created) = send(&app, Method::POST, "/api/wizard", None).await;
    let id = created["id"].as_str().unwrap().to_string();
    let requirements = json!({ "systems": ["ev"], "powerSupply": "unknown" });
    send(&app, Method::PUT, &format!("/api/wizard/{id}/requirements"), Some(requirements)).await;
    send(&app, Method::POST, &format!("/api/wizard/{id}/next"), None).await;

    let (status, body) = send(&app, Method::POST, &format!("/api/wizard/{id}/back"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 1);

    let (status, _) = send(&app, Method::POST, &format!("/api/wizard/{id}/back"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::POST, &format!("/api/wizard/{id}/goto/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 1);
}

#[tokio::test]
async fn wizard_submit_before_property_details_is_a_conflict() {
    let app = test_app();
    let (_, created) = send(&app, Method::POST, "/api/wizard", None).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(&app, Method::POST, &format!("/api/wizard/{id}/submit"), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.store.quotes().is_empty());
}

#[tokio::test]
async fn unknown_wizard_session_is_not_found() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, &format!("/api/wizard/{}", Uuid::new_v4()), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Wizard session not found");
}

#[tokio::test]
async fn serves_published_pages() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/api/pages/home", None).await;
    let (missing, _) = send(&app, Method::GET, "/api/pages/nope", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Solar for Perth homes");
    assert_eq!(body["blocks"][0]["type"], "product_showcase");
    assert_eq!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_site_settings() {
    let app = test_app();
    let settings = SiteSettings::parse(
        json!({ "logoUrl": "/logo.svg", "nav": [] }),
        json!({ "primaryColor": "#f5a623", "secondaryColor": "#1b3a5c", "fontFamily": "Inter" }),
    )
    .unwrap();
    app.store.set_site_settings(settings);

    let (status, body) = send(&app, Method::GET, "/api/site", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"]["primaryColor"], "#f5a623");
    assert_eq!(body["header"]["logoUrl"], "/logo.svg");
}
