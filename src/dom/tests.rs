//! Crawler and form tests against the mock driver

use std::sync::Arc;

use super::*;
use crate::webdriver::mock::{MockResponse, MockSite, MockWebDriver};
use crate::webdriver::{Locator, RemoteSession};
use crate::Error;

const PAGE: &str = r#"<html><head><title>Catalog</title></head><body>
    <nav id="menu">
        <a id="first" href="/one" class="item">One</a>
        <a id="second" href="two" class="item">Two  items</a>
        <a id="third" href="/three" class="item"><img alt="Third picture" src="/3.png"></a>
    </nav>
    <ul id="list">
        <li class="a">Alpha</li>
        <li class="b" data-id="2">Beta</li>
        <li class="c">Gamma</li>
    </ul>
    <form id="profile" action="/save" method="post">
        <input type="text" name="username" value="ada">
        <textarea name="bio">Mathematician</textarea>
        <input type="checkbox" name="newsletter" value="yes">
        <input type="radio" name="plan" value="free" checked>
        <input type="radio" name="plan" value="pro">
        <select name="country"><option value="uk">UK</option><option value="fr">France</option></select>
        <select name="tags" multiple><option value="math" selected>Math</option><option value="code">Code</option></select>
        <input type="file" name="avatar">
        <input type="text" name="locked" value="x" disabled>
        <button type="submit" name="action" value="save">Save profile</button>
        <input type="submit" id="publish" value="Publish now">
    </form>
</body></html>"#;

async fn crawler() -> Crawler {
    let site = MockSite::new()
        .page("/catalog", PAGE)
        .route("/save", |request| {
            MockResponse::html(format!("<html><body>{:?}</body></html>", request.form))
        });
    let driver = MockWebDriver::new(site);
    let session: Arc<dyn RemoteSession> = Arc::new(driver.open_session().unwrap());
    session.goto("http://localhost/catalog").await.unwrap();

    let root = session.find_all(&Locator::xpath("/html")).await.unwrap();
    let uri = session.current_url().await.unwrap();
    Crawler::new(root, uri, session)
}

#[tokio::test]
async fn test_positional() {
    let items = crawler().await.filter("li").await.unwrap();
    assert_eq!(items.count(), 3);
    assert_eq!(items.first().text().await.unwrap(), "Alpha");
    assert_eq!(items.last().text().await.unwrap(), "Gamma");
    assert_eq!(items.eq(1).attr("data-id").await.unwrap().as_deref(), Some("2"));
    assert!(items.eq(7).is_empty());
    assert_eq!(items.slice(1, None).count(), 2);
    assert_eq!(items.slice(0, Some(1)).texts().await.unwrap(), vec!["Alpha"]);
    assert_eq!(items.each().len(), 3);

    let reduced = items
        .reduce(|index, _| async move { Ok(index != 1) })
        .await
        .unwrap();
    assert_eq!(reduced.texts().await.unwrap(), vec!["Alpha", "Gamma"]);
}

#[tokio::test]
async fn test_chained_filters_match_the_elements_themselves() {
    let root = crawler().await;
    assert_eq!(root.filter("html").await.unwrap().count(), 1);

    let items = root.filter("li").await.unwrap();
    let beta = items.filter(".b").await.unwrap();
    assert_eq!(beta.count(), 1);
    assert_eq!(beta.text().await.unwrap(), "Beta");

    let menu = root.filter("#menu").await.unwrap();
    assert_eq!(menu.filter("nav, a").await.unwrap().count(), 4);
    assert!(items.filter("a").await.unwrap().is_empty());
    assert_eq!(root.filter_xpath("//li").await.unwrap().filter(".c").await.unwrap().texts().await.unwrap(), vec!["Gamma"]);
}

#[tokio::test]
async fn test_traversal() {
    let root = crawler().await;
    let beta = root.filter("li.b").await.unwrap();

    assert_eq!(beta.siblings().await.unwrap().texts().await.unwrap(), vec!["Alpha", "Gamma"]);
    assert_eq!(beta.next_all().await.unwrap().texts().await.unwrap(), vec!["Gamma"]);
    assert_eq!(beta.previous_all().await.unwrap().texts().await.unwrap(), vec!["Alpha"]);

    let ancestors = beta.ancestors().await.unwrap();
    assert_eq!(ancestors.node_name().await.unwrap(), "ul");
    assert_eq!(ancestors.last().node_name().await.unwrap(), "html");
    assert_eq!(beta.parents().await.unwrap().count(), ancestors.count());

    let list = root.filter("#list").await.unwrap();
    assert_eq!(list.children(None).await.unwrap().count(), 3);
    assert_eq!(list.children(Some(".c")).await.unwrap().texts().await.unwrap(), vec!["Gamma"]);

    assert_eq!(beta.closest("ul").await.unwrap().attr("id").await.unwrap().as_deref(), Some("list"));
    assert!(beta.closest("form").await.unwrap().is_empty());
    assert!(beta.matches(".b").await.unwrap());
    assert!(!beta.matches(".a").await.unwrap());

    let xpath = root.filter_xpath("//li").await.unwrap();
    assert_eq!(xpath.count(), 3);
}

#[tokio::test]
async fn test_empty_crawler() {
    let empty = crawler().await.filter(".missing").await.unwrap();
    assert!(empty.is_empty());
    assert!(matches!(empty.text().await, Err(Error::ElementNotFound(_))));
    assert!(matches!(empty.siblings().await, Err(Error::ElementNotFound(_))));
    assert_eq!(empty.text_or("none").await.unwrap(), "none");
    assert!(!empty.matches("li").await.unwrap());
}

#[tokio::test]
async fn test_extraction() {
    let root = crawler().await;
    let items = root.filter("li").await.unwrap();
    assert_eq!(
        items.extract(&["_text", "class", "data-id"]).await.unwrap(),
        vec![
            vec!["Alpha", "a", ""],
            vec!["Beta", "b", "2"],
            vec!["Gamma", "c", ""],
        ]
    );

    let list = root.filter("#list").await.unwrap();
    assert!(list.html().await.unwrap().contains("<li class=\"a\">Alpha</li>"));
    assert!(list.outer_html().await.unwrap().starts_with("<ul id=\"list\">"));
}

#[tokio::test]
async fn test_links() {
    let root = crawler().await;
    let links = root.filter("a.item").await.unwrap().links().await.unwrap();
    let uris: Vec<_> = links.iter().map(Link::uri).collect();
    assert_eq!(
        uris,
        vec!["http://localhost/one", "http://localhost/two", "http://localhost/three"]
    );

    assert_eq!(root.select_link("Two").await.unwrap().attr("id").await.unwrap().as_deref(), Some("second"));
    assert_eq!(
        root.select_link("picture").await.unwrap().attr("id").await.unwrap().as_deref(),
        Some("third")
    );
    assert!(root.select_link("Tw").await.unwrap().is_empty());

    let not_a_link = root.filter("li").await.unwrap().link().await;
    assert!(matches!(not_a_link, Err(Error::InvalidFieldValue(_))));
}

#[tokio::test]
async fn test_select_button() {
    let root = crawler().await;
    assert_eq!(root.select_button("Save").await.unwrap().count(), 1);
    assert_eq!(root.select_button("action").await.unwrap().count(), 1);
    assert_eq!(root.select_button("Publish").await.unwrap().count(), 1);
    assert_eq!(root.select_button("publish").await.unwrap().count(), 1);
    assert!(root.select_button("username").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_form_fields() {
    let root = crawler().await;
    let Form::Remote(form) = root.select_button("Save").await.unwrap().form(None).await.unwrap() else {
        panic!("expected a remote form");
    };

    assert_eq!(form.method().await.unwrap(), "POST");
    assert_eq!(form.uri().await.unwrap(), "http://localhost/save");

    let names: Vec<_> = form.fields().iter().map(FormField::name).collect();
    assert_eq!(
        names,
        vec!["username", "bio", "newsletter", "plan", "country", "tags", "avatar", "locked"]
    );

    let plan = form.get("plan").unwrap().as_choice().unwrap();
    assert_eq!(plan.kind(), ChoiceKind::Radio);
    assert_eq!(plan.available_options().await.unwrap(), vec!["free", "pro"]);

    let values = form.values().await.unwrap();
    assert_eq!(
        values,
        vec![
            ("username".to_string(), FormValue::from("ada")),
            ("bio".to_string(), FormValue::from("Mathematician")),
            ("plan".to_string(), FormValue::from("free")),
            ("country".to_string(), FormValue::from("uk")),
            ("tags".to_string(), FormValue::from(vec!["math"])),
            ("avatar".to_string(), FormValue::from("")),
            ("action".to_string(), FormValue::from("save")),
        ]
    );
}

#[tokio::test]
async fn test_form_write_through() {
    let root = crawler().await;
    let Form::Remote(form) = root.filter("#profile").await.unwrap().form(None).await.unwrap() else {
        panic!("expected a remote form");
    };
    assert!(form.button().is_none());

    form.set("username", &"grace".into()).await.unwrap();
    form.set("newsletter", &true.into()).await.unwrap();
    form.set("plan", &"pro".into()).await.unwrap();
    form.set("country", &"fr".into()).await.unwrap();
    form.set("tags", &vec!["code"].into()).await.unwrap();

    let username = root.filter("input[name=username]").await.unwrap();
    assert_eq!(username.elements()[0].prop("value").await.unwrap().as_deref(), Some("grace"));

    let newsletter = form.get("newsletter").unwrap().as_choice().unwrap();
    assert!(newsletter.is_ticked().await.unwrap());
    newsletter.untick().await.unwrap();
    assert!(!newsletter.is_ticked().await.unwrap());
    newsletter.tick().await.unwrap();

    assert_eq!(form.get("plan").unwrap().value().await.unwrap(), Some(FormValue::from("pro")));
    assert_eq!(form.get("country").unwrap().value().await.unwrap(), Some(FormValue::from("fr")));
    assert_eq!(form.get("tags").unwrap().value().await.unwrap(), Some(FormValue::from(vec!["code"])));

    form.submit().await.unwrap();
    let source = root.session().source().await.unwrap();
    assert!(source.contains("(\"username\", \"grace\")"));
    assert!(source.contains("(\"newsletter\", \"yes\")"));
    assert!(source.contains("(\"plan\", \"pro\")"));
    assert!(!source.contains("locked"));
}

#[tokio::test]
async fn test_invalid_field_values() {
    let root = crawler().await;
    let Form::Remote(form) = root.filter("#profile").await.unwrap().form(None).await.unwrap() else {
        panic!("expected a remote form");
    };

    let invalid = |result: crate::Result<()>| matches!(result, Err(Error::InvalidFieldValue(_)));
    assert!(invalid(form.set("username", &true.into()).await));
    assert!(invalid(form.set("newsletter", &vec!["yes"].into()).await));
    assert!(invalid(form.set("newsletter", &"no".into()).await));
    assert!(invalid(form.set("plan", &"enterprise".into()).await));
    assert!(invalid(form.set("country", &vec!["uk", "fr"].into()).await));
    assert!(invalid(form.set("tags", &vec!["math", "art"].into()).await));
    assert!(invalid(form.set("avatar", &false.into()).await));
    assert!(invalid(form.set("missing", &"x".into()).await));
}

#[tokio::test]
async fn test_static_only_operations() {
    let root = crawler().await;
    assert!(root.add_html_content("<p>").unwrap_err().is_unsupported());
    assert!(root.add_node("<p>").unwrap_err().is_unsupported());
    assert!(root.register_namespace("x", "urn:x").unwrap_err().is_unsupported());
    assert!(root.set_default_namespace("urn:x").unwrap_err().is_unsupported());
    assert!(root.evaluate("count(//li)").unwrap_err().is_unsupported());
}

#[tokio::test]
async fn test_static_form_values() {
    let page = StaticPage::new("http://localhost/catalog", PAGE).unwrap();
    let mut form = Form::Static(page.form("#profile").unwrap());
    form.set_values(&[("username".to_string(), "grace".into())]).await.unwrap();
    assert_eq!(form.method().await.unwrap(), "POST");

    let result = form.set_values(&[("newsletter".to_string(), true.into())]).await;
    assert!(matches!(result, Err(Error::InvalidFieldValue(_))));
}
