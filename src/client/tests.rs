//! Client tests against the mock driver

use std::time::{Duration, Instant};

use super::*;
use crate::dom::{Form, FormValue, Link, StaticLink, StaticPage};
use crate::process::shared;
use crate::webdriver::mock::{MockDriverManager, MockResponse, MockSite, MockWebDriver, MOCK_PNG};
use crate::webdriver::Cookie;
use crate::Error;

const HOME: &str = r#"<html><head><title>Home</title></head><body>
    <a id="about" href="/about">About us</a>
    <form id="login" action="/login" method="post">
        <input type="text" name="user" value="guest">
        <input type="checkbox" name="remember" value="1">
        <button type="submit" name="go" value="1">Sign in</button>
    </form>
</body></html>"#;

const DELAYED: &str = r#"<html><head><title>Delayed</title></head><body>
    <p id="late" data-appear-after="200">Late</p>
    <p id="never" data-appear-after="600000">Never</p>
    <p id="fading" data-hide-after="200">Fading</p>
    <p id="status" data-text-after="200" data-text="Done">Loading</p>
    <div id="box" class="busy" data-attr-after="200" data-attr-name="class" data-attr-value="idle">Box</div>
    <button id="go" disabled data-enable-after="200">Go</button>
    <span id="gone" data-remove-after="200">Gone</span>
</body></html>"#;

fn site() -> MockSite {
    MockSite::new()
        .page("/", HOME)
        .page("/about", "<html><head><title>About</title></head><body><h1>About</h1></body></html>")
        .page("/delayed", DELAYED)
        .route("/login", |request| {
            let user = request.param("user").unwrap_or_default();
            let remember = request.param("remember").unwrap_or_else(|| "0".to_string());
            MockResponse::html(format!(
                "<html><head><title>Welcome</title></head><body><p id=\"user\">{}</p><p id=\"remember\">{}</p></body></html>",
                user, remember
            ))
        })
        .route("/search", |request| {
            let query = request.query("q").unwrap_or_default();
            MockResponse::html(format!("<html><body><p id=\"q\">{}</p></body></html>", query))
        })
}

fn client() -> (Client, MockDriverManager) {
    let manager = MockDriverManager::new(MockWebDriver::new(site()));
    let options = ClientOptions {
        wait_timeout: Duration::from_secs(2),
        wait_interval: Duration::from_millis(20),
        ..ClientOptions::default().with_base_uri("http://localhost")
    };
    (Client::new(shared(manager.clone()), options), manager)
}

#[tokio::test]
async fn test_get_resolves_against_base_uri() {
    let (client, manager) = client();
    assert!(!client.is_started().await);

    let crawler = client.get("/about").await.unwrap();
    assert_eq!(crawler.uri(), "http://localhost/about");
    assert_eq!(crawler.filter("h1").await.unwrap().text().await.unwrap(), "About");
    assert_eq!(client.current_url().await.unwrap(), "http://localhost/about");
    assert!(client.is_started().await);
    assert_eq!(manager.process_starts(), 1);

    let absolute = client.get("http://localhost/").await.unwrap();
    assert_eq!(absolute.uri(), "http://localhost/");
}

#[tokio::test]
async fn test_relative_uri_needs_base() {
    let manager = MockDriverManager::new(MockWebDriver::new(site()));
    let client = Client::new(shared(manager), ClientOptions::default());
    assert!(matches!(client.get("/about").await, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_request_only_navigates_with_get() {
    let (client, _) = client();
    let crawler = client.request(Request::get("/about")).await.unwrap();
    assert_eq!(crawler.uri(), "http://localhost/about");

    let err = client.request(Request::new("POST", "/login")).await.unwrap_err();
    assert!(err.is_unsupported());
}

#[tokio::test]
async fn test_click_links() {
    let (client, _) = client();
    client.get("/").await.unwrap();

    let crawler = client.click_link("About").await.unwrap();
    assert_eq!(crawler.uri(), "http://localhost/about");

    let link = Link::Static(StaticLink::new("http://localhost/", "Home"));
    let crawler = client.click(&link).await.unwrap();
    assert_eq!(crawler.uri(), "http://localhost/");
}

#[tokio::test]
async fn test_submit_form_with_overrides() {
    let (client, _) = client();
    client.get("/").await.unwrap();

    let values = vec![
        ("user".to_string(), FormValue::from("ada")),
        ("remember".to_string(), FormValue::from(true)),
    ];
    let crawler = client.submit_form("Sign in", &values).await.unwrap();
    assert_eq!(crawler.uri(), "http://localhost/login");
    assert_eq!(crawler.filter("#user").await.unwrap().text().await.unwrap(), "ada");
    assert_eq!(crawler.filter("#remember").await.unwrap().text().await.unwrap(), "1");
}

#[tokio::test]
async fn test_submit_static_forms() {
    let (client, _) = client();
    let page = StaticPage::new(
        "http://localhost/",
        r#"<form id="search" action="/search"><input name="q" value=""></form>
           <form id="post" action="/login" method="post"><input name="user"></form>"#,
    )
    .unwrap();

    let form = Form::Static(page.form("#search").unwrap());
    let crawler = client
        .submit(form, &[("q".to_string(), FormValue::from("rust"))])
        .await
        .unwrap();
    assert_eq!(crawler.filter("#q").await.unwrap().text().await.unwrap(), "rust");

    let form = Form::Static(page.form("#post").unwrap());
    assert!(client.submit(form, &[]).await.unwrap_err().is_unsupported());
}

#[tokio::test]
async fn test_history() {
    let (client, _) = client();
    client.get("/").await.unwrap();
    client.get("/about").await.unwrap();

    assert_eq!(client.back().await.unwrap().uri(), "http://localhost/");
    assert_eq!(client.forward().await.unwrap().uri(), "http://localhost/about");
    assert_eq!(client.reload().await.unwrap().uri(), "http://localhost/about");

    assert!(client.follow_redirect().unwrap_err().is_unsupported());
    assert!(client.follow_redirects(true).is_ok());
    assert!(client.follow_redirects(false).unwrap_err().is_unsupported());
    assert!(client.history().unwrap_err().is_unsupported());
    assert!(client.internal_request().unwrap_err().is_unsupported());
    assert!(client.internal_response().unwrap_err().is_unsupported());
}

#[tokio::test]
async fn test_crawler_tracks_navigation() {
    let (client, _) = client();
    client.get("/").await.unwrap();
    assert_eq!(client.crawler().await.unwrap().uri(), "http://localhost/");

    client.get("/about").await.unwrap();
    assert_eq!(client.crawler().await.unwrap().uri(), "http://localhost/about");
    assert_eq!(client.refresh_crawler().await.unwrap().uri(), "http://localhost/about");
}

#[tokio::test]
async fn test_scripts_and_screenshots() {
    let (client, _) = client();
    client.get("/about").await.unwrap();

    let title = client.execute_script("return document.title", vec![]).await.unwrap();
    assert_eq!(title, serde_json::json!("About"));
    let echoed = client
        .execute_async_script("arguments[0]", vec![serde_json::json!(42)])
        .await
        .unwrap();
    assert_eq!(echoed, serde_json::json!(42));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shots").join("about.png");
    let png = client.take_screenshot(Some(&path)).await.unwrap();
    assert_eq!(png, MOCK_PNG.to_vec());
    assert_eq!(std::fs::read(&path).unwrap(), MOCK_PNG.to_vec());
}

#[tokio::test]
async fn test_cookie_jar() {
    let (client, _) = client();
    client.get("/").await.unwrap();

    client.set_cookie(Cookie::new("theme", "dark")).await.unwrap();
    client.set_cookie(Cookie::new("lang", "en")).await.unwrap();
    assert_eq!(client.cookie("theme").await.unwrap().map(|c| c.value), Some("dark".to_string()));
    assert_eq!(client.cookies().await.unwrap().len(), 2);

    client.delete_cookie("theme").await.unwrap();
    assert!(client.cookie("theme").await.unwrap().is_none());

    client.clear_cookies().await.unwrap();
    assert!(client.cookies().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restart_opens_a_clean_session() {
    let (client, manager) = client();
    client.get("/").await.unwrap();
    client.set_cookie(Cookie::new("theme", "dark")).await.unwrap();

    client.restart().await.unwrap();
    assert!(client.cookies().await.unwrap().is_empty());
    assert_eq!(manager.webdriver().session_count(), 2);
    assert_eq!(manager.process_starts(), 1);
}

#[tokio::test]
async fn test_quit() {
    let (client, manager) = client();
    client.get("/").await.unwrap();
    assert!(client.ping().await);

    client.quit(false).await.unwrap();
    assert!(!client.ping().await);
    assert!(matches!(client.get("/").await, Err(Error::SessionClosed(_))));
    assert!(manager.webdriver().is_alive());

    client.restart().await.unwrap();
    assert!(client.ping().await);

    client.quit(true).await.unwrap();
    assert!(!manager.webdriver().is_alive());
    assert!(matches!(client.current_url().await, Err(Error::SessionClosed(_))));
}

#[tokio::test]
async fn test_wait_conditions() {
    let (client, _) = client();
    client.get("/delayed").await.unwrap();

    client.wait_for("#late", None, None).await.unwrap();
    client.wait_for_visibility("#late", None).await.unwrap();
    client.wait_for_invisibility("#fading", None).await.unwrap();
    client.wait_for_element_to_contain("#status", "Done", None).await.unwrap();
    client.wait_for_element_to_not_contain("#status", "Loading", None).await.unwrap();
    client.wait_for_attribute_to_contain("#box", "class", "idle", None).await.unwrap();
    client.wait_for_attribute_to_not_contain("#box", "class", "busy", None).await.unwrap();
    client.wait_for_enabled("#go", None).await.unwrap();
    client.wait_for_staleness("#gone", None).await.unwrap();
    client.wait_for_staleness("#missing", None).await.unwrap();

    let crawler = client.wait_for_disabled("//p", Some(Duration::from_millis(100))).await;
    assert!(crawler.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_wait_timeout_message() {
    let (client, _) = client();
    client.get("/delayed").await.unwrap();

    let started = Instant::now();
    let err = client
        .wait_for_visibility("#never", Some(Duration::from_secs(1)))
        .await
        .unwrap_err();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Element \"#never\" not visible within 1 seconds.");

    let err = client
        .wait_for("#missing", Some(Duration::from_millis(50)), Some(Duration::from_millis(10)))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Element \"#missing\" not found within 0.05 seconds.");
}
