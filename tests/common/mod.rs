//! Common test utilities
//!
//! Shared fixtures for the integration tests: a small mock application and a
//! suite context wired to the mock driver.

#![allow(dead_code)]

use browserkit_oxide::config::Config;
use browserkit_oxide::process::shared;
use browserkit_oxide::webdriver::mock::{MockDriverManager, MockResponse, MockSite, MockWebDriver};
use browserkit_oxide::{LifecycleMode, SuiteContext};
use std::sync::Arc;

pub const BASE_URI: &str = "http://localhost";

/// Mock application: pages, a counter cookie endpoint, a form echo and delayed content
pub fn app_site() -> MockSite {
    MockSite::new()
        .page(
            "/a",
            r#"<html><head><title>Page A</title></head><body><a id="to-b" href="/b?from=a">Go to B</a></body></html>"#,
        )
        .page(
            "/b",
            r#"<html><head><title>Page B</title></head><body><h1>B</h1></body></html>"#,
        )
        .page(
            "/delayed",
            r#"<html><body><div id="soon" data-appear-after="300">Ready</div></body></html>"#,
        )
        .page(
            "/contact",
            r#"<html><body>
                <form action="/echo" method="post">
                    <input type="text" name="name" value="Ada">
                    <input type="email" name="email" value="ada@example.com">
                    <textarea name="message">Hello</textarea>
                    <select name="topic"><option value="sales">Sales</option><option value="support" selected>Support</option></select>
                    <button type="submit">Send</button>
                </form>
            </body></html>"#,
        )
        .route("/echo", |request| {
            let mut body = String::from("<html><body><dl>");
            for (name, value) in &request.form {
                body.push_str(&format!("<dt>{}</dt><dd class=\"{}\">{}</dd>", name, name, value));
            }
            body.push_str("</dl></body></html>");
            MockResponse::html(body)
        })
        .route("/counter", |request| {
            let count = request
                .cookie("counter")
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(0)
                + 1;
            MockResponse::html(format!("<html><body><span id=\"count\">{}</span></body></html>", count))
                .with_cookie("counter", count.to_string())
        })
}

/// Suite context against the mock application, plus a handle on its driver
pub fn mock_suite(mode: LifecycleMode) -> (SuiteContext, MockDriverManager) {
    let webdriver = MockWebDriver::new(app_site());
    let manager = MockDriverManager::new(webdriver.clone());
    let config = Config {
        external_base_uri: Some(BASE_URI.to_string()),
        ..Config::default()
    };
    let context = SuiteContext::new(config, Arc::new(webdriver))
        .with_mode(mode)
        .with_manager(shared(manager.clone()));
    (context, manager)
}
