//! Crawler over live remote elements
//!
//! A `Crawler` is an immutable, ordered list of element handles plus the URI
//! of the page they belong to. Filtering and traversal return new crawlers;
//! structural traversal is relative to the first element and is expressed as
//! an XPath axis query rooted there.

use futures::future::try_join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use url::Url;

use super::field::FormValue;
use super::form::{Form, RemoteForm};
use super::link::{Link, RemoteLink};
use super::static_page::contains_words;
use crate::webdriver::{Locator, RemoteElement, RemoteSession};
use crate::{Error, Result};

/// Pseudo attribute of `extract` returning the element text
pub const TEXT_ATTRIBUTE: &str = "_text";

/// Immutable view over remote elements
#[derive(Debug, Clone)]
pub struct Crawler {
    elements: Vec<Arc<dyn RemoteElement>>,
    uri: String,
    session: Arc<dyn RemoteSession>,
}

impl Crawler {
    pub fn new<S: Into<String>>(
        elements: Vec<Arc<dyn RemoteElement>>,
        uri: S,
        session: Arc<dyn RemoteSession>,
    ) -> Self {
        Self {
            elements,
            uri: uri.into(),
            session,
        }
    }

    fn derive(&self, elements: Vec<Arc<dyn RemoteElement>>) -> Self {
        Self {
            elements,
            uri: self.uri.clone(),
            session: self.session.clone(),
        }
    }

    /// URI of the page the elements belong to
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn elements(&self) -> &[Arc<dyn RemoteElement>] {
        &self.elements
    }

    pub fn session(&self) -> &Arc<dyn RemoteSession> {
        &self.session
    }

    pub fn count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn first_element(&self) -> Result<&Arc<dyn RemoteElement>> {
        self.elements
            .first()
            .ok_or_else(|| Error::element_not_found("The current node list is empty."))
    }

    /// One crawler per element
    pub fn each(&self) -> Vec<Crawler> {
        self.elements.iter().map(|e| self.derive(vec![e.clone()])).collect()
    }

    /// Element at `position`, or an empty crawler
    pub fn eq(&self, position: usize) -> Crawler {
        self.derive(self.elements.get(position).cloned().into_iter().collect())
    }

    pub fn first(&self) -> Crawler {
        self.eq(0)
    }

    pub fn last(&self) -> Crawler {
        match self.elements.len() {
            0 => self.derive(Vec::new()),
            len => self.eq(len - 1),
        }
    }

    pub fn slice(&self, offset: usize, length: Option<usize>) -> Crawler {
        let elements = self
            .elements
            .iter()
            .skip(offset)
            .take(length.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        self.derive(elements)
    }

    /// Keep the elements for which `predicate` holds
    pub async fn reduce<F, Fut>(&self, mut predicate: F) -> Result<Crawler>
    where
        F: FnMut(usize, Crawler) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let mut kept = Vec::new();
        for (index, element) in self.elements.iter().enumerate() {
            if predicate(index, self.derive(vec![element.clone()])).await? {
                kept.push(element.clone());
            }
        }
        Ok(self.derive(kept))
    }

    /// Query below every element; results deduplicated in query order.
    /// With `own`, a context element in that id set is kept ahead of its descendants.
    async fn query(&self, locator: &Locator, own: Option<&HashSet<String>>) -> Result<Crawler> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for element in &self.elements {
            if own.map(|ids| ids.contains(element.id())).unwrap_or(false)
                && seen.insert(element.id().to_string())
            {
                found.push(element.clone());
            }
            for child in element.find_all(locator).await? {
                if seen.insert(child.id().to_string()) {
                    found.push(child);
                }
            }
        }
        Ok(self.derive(found))
    }

    /// CSS selector, passed to the browser unchanged.
    ///
    /// Matches the elements themselves as well as their descendants, so
    /// `filter("li").filter(".b")` narrows the list items.
    pub async fn filter(&self, selector: &str) -> Result<Crawler> {
        if self.elements.is_empty() {
            return Ok(self.derive(Vec::new()));
        }
        let locator = Locator::css(selector);
        let own = self.matching_ids(&locator).await?;
        self.query(&locator, Some(&own)).await
    }

    /// XPath evaluated with each element as the context node
    pub async fn filter_xpath(&self, expression: &str) -> Result<Crawler> {
        self.query(&Locator::xpath(expression), None).await
    }

    /// Axis query rooted at the first element
    async fn axis(&self, axis: &str) -> Result<Vec<Arc<dyn RemoteElement>>> {
        self.first_element()?
            .find_all(&Locator::xpath(format!("./{}::*", axis)))
            .await
    }

    /// Ids of the elements of the whole page matching `locator`
    async fn matching_ids(&self, locator: &Locator) -> Result<HashSet<String>> {
        Ok(self
            .session
            .find_all(locator)
            .await?
            .iter()
            .map(|e| e.id().to_string())
            .collect())
    }

    pub async fn children(&self, selector: Option<&str>) -> Result<Crawler> {
        let children = self.axis("child").await?;
        let children = match selector {
            Some(selector) => {
                let ids = self.matching_ids(&Locator::parse(selector)).await?;
                children.into_iter().filter(|c| ids.contains(c.id())).collect()
            }
            None => children,
        };
        Ok(self.derive(children))
    }

    /// Siblings of the first element, in document order
    pub async fn siblings(&self) -> Result<Crawler> {
        let mut siblings = self.axis("preceding-sibling").await?;
        siblings.extend(self.axis("following-sibling").await?);
        Ok(self.derive(siblings))
    }

    pub async fn next_all(&self) -> Result<Crawler> {
        Ok(self.derive(self.axis("following-sibling").await?))
    }

    /// Preceding siblings, nearest first
    pub async fn previous_all(&self) -> Result<Crawler> {
        let mut siblings = self.axis("preceding-sibling").await?;
        siblings.reverse();
        Ok(self.derive(siblings))
    }

    /// Ancestors, nearest first
    pub async fn ancestors(&self) -> Result<Crawler> {
        let mut ancestors = self.axis("ancestor").await?;
        ancestors.reverse();
        Ok(self.derive(ancestors))
    }

    pub async fn parents(&self) -> Result<Crawler> {
        self.ancestors().await
    }

    /// First element matching `selector`, starting with the first element itself
    pub async fn closest(&self, selector: &str) -> Result<Crawler> {
        let first = self.first_element()?.clone();
        let ids = self.matching_ids(&Locator::parse(selector)).await?;

        let mut candidates = vec![first];
        candidates.extend(self.ancestors().await?.elements);
        Ok(self.derive(candidates.into_iter().find(|c| ids.contains(c.id())).into_iter().collect()))
    }

    /// Whether the first element matches `selector`
    pub async fn matches(&self, selector: &str) -> Result<bool> {
        let Some(first) = self.elements.first() else {
            return Ok(false);
        };
        Ok(self.matching_ids(&Locator::parse(selector)).await?.contains(first.id()))
    }

    pub async fn text(&self) -> Result<String> {
        self.first_element()?.text().await
    }

    /// Text of the first element, or `default` on an empty crawler
    pub async fn text_or(&self, default: &str) -> Result<String> {
        match self.elements.first() {
            Some(element) => element.text().await,
            None => Ok(default.to_string()),
        }
    }

    pub async fn texts(&self) -> Result<Vec<String>> {
        try_join_all(self.elements.iter().map(|e| e.text())).await
    }

    /// Inner HTML of the first element
    pub async fn html(&self) -> Result<String> {
        self.first_element()?.html(true).await
    }

    pub async fn outer_html(&self) -> Result<String> {
        self.first_element()?.html(false).await
    }

    pub async fn attr(&self, name: &str) -> Result<Option<String>> {
        self.first_element()?.attr(name).await
    }

    pub async fn node_name(&self) -> Result<String> {
        Ok(self.first_element()?.tag_name().await?.to_ascii_lowercase())
    }

    /// One row per element; `_text` stands for the element text, missing
    /// attributes yield an empty string
    pub async fn extract(&self, attributes: &[&str]) -> Result<Vec<Vec<String>>> {
        let rows = self.elements.iter().map(|element| async move {
            let mut row = Vec::with_capacity(attributes.len());
            for attribute in attributes {
                let value = if *attribute == TEXT_ATTRIBUTE {
                    element.text().await?
                } else {
                    element.attr(attribute).await?.unwrap_or_default()
                };
                row.push(value);
            }
            Ok::<_, Error>(row)
        });
        try_join_all(rows).await
    }

    fn resolve(&self, href: &str) -> Result<String> {
        Ok(Url::parse(&self.uri)?.join(href)?.to_string())
    }

    async fn make_link(&self, element: &Arc<dyn RemoteElement>) -> Result<Link> {
        let tag = element.tag_name().await?.to_ascii_lowercase();
        if !matches!(tag.as_str(), "a" | "area" | "link") {
            return Err(Error::invalid_field_value(format!(
                "Unable to navigate from a \"{}\" tag",
                tag
            )));
        }
        let href = element.attr("href").await?.unwrap_or_default();
        let uri = self.resolve(&href)?;
        Ok(Link::Remote(RemoteLink::new(element.clone(), uri)))
    }

    /// Link for the first element
    pub async fn link(&self) -> Result<Link> {
        self.make_link(self.first_element()?).await
    }

    pub async fn links(&self) -> Result<Vec<Link>> {
        let mut links = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            links.push(self.make_link(element).await?);
        }
        Ok(links)
    }

    /// Form owning the first element, optionally with values applied
    pub async fn form(&self, values: Option<&[(String, FormValue)]>) -> Result<Form> {
        let form = RemoteForm::from_element(self.first_element()?.clone(), &self.uri, &self.session).await?;
        if let Some(values) = values {
            form.set_values(values).await?;
        }
        Ok(Form::Remote(form))
    }

    /// Links whose text, or whose image `alt`, contains `value` as whole words
    pub async fn select_link(&self, value: &str) -> Result<Crawler> {
        let candidates = self.filter("a, area").await?;
        let mut kept = Vec::new();
        for element in candidates.elements {
            let text = element.text().await?;
            let alt = match element.find_all(&Locator::css("img")).await?.first() {
                Some(img) => img.attr("alt").await?.unwrap_or_default(),
                None => String::new(),
            };
            if contains_words(&text, value) || contains_words(&alt, value) {
                kept.push(element);
            }
        }
        Ok(self.derive(kept))
    }

    /// Buttons whose text, value, id, name or `alt` matches `value`
    pub async fn select_button(&self, value: &str) -> Result<Crawler> {
        let candidates = self.filter("button, input").await?;
        let mut kept = Vec::new();
        for element in candidates.elements {
            if Self::button_matches(&element, value).await? {
                kept.push(element);
            }
        }
        Ok(self.derive(kept))
    }

    async fn button_matches(element: &Arc<dyn RemoteElement>, value: &str) -> Result<bool> {
        let is_exact = |attr: Option<String>| attr.as_deref() == Some(value);
        let tag = element.tag_name().await?.to_ascii_lowercase();

        if tag == "input" {
            let kind = element.attr("type").await?.unwrap_or_default().to_ascii_lowercase();
            if !matches!(kind.as_str(), "submit" | "button" | "image") {
                return Ok(false);
            }
            let shown = element.attr("value").await?.unwrap_or_default();
            let alt = element.attr("alt").await?.unwrap_or_default();
            return Ok(contains_words(&shown, value)
                || contains_words(&alt, value)
                || is_exact(element.attr("id").await?)
                || is_exact(element.attr("name").await?));
        }

        Ok(contains_words(&element.text().await?, value)
            || is_exact(element.attr("value").await?)
            || is_exact(element.attr("id").await?)
            || is_exact(element.attr("name").await?))
    }

    pub fn add_html_content(&self, _content: &str) -> Result<()> {
        Err(static_only("add_html_content"))
    }

    pub fn add_node(&self, _node: &str) -> Result<()> {
        Err(static_only("add_node"))
    }

    pub fn register_namespace(&self, _prefix: &str, _namespace: &str) -> Result<()> {
        Err(static_only("register_namespace"))
    }

    pub fn set_default_namespace(&self, _namespace: &str) -> Result<()> {
        Err(static_only("set_default_namespace"))
    }

    pub fn evaluate(&self, _expression: &str) -> Result<Crawler> {
        Err(static_only("evaluate"))
    }
}

fn static_only(operation: &str) -> Error {
    Error::unsupported(format!(
        "{} requires a static document; this crawler is backed by a live browser",
        operation
    ))
}
