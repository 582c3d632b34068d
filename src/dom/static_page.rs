//! Links and forms parsed from a static HTML document
//!
//! A `StaticPage` is the offline counterpart of a live crawler: it never talks
//! to a browser, it only extracts what the client needs to navigate.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{Error, Result};

/// Link target taken from a parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct StaticLink {
    uri: String,
    text: String,
}

impl StaticLink {
    pub fn new<U: Into<String>, T: Into<String>>(uri: U, text: T) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
        }
    }

    /// Absolute target URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Form taken from a parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct StaticForm {
    method: String,
    action: String,
    values: Vec<(String, String)>,
}

impl StaticForm {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Absolute action URI, without the form values
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.iter().any(|(key, _)| key == name)
    }

    /// Replace every value of `name`, adding the field if missing
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        let value = value.into();
        match self.values.iter().position(|(key, _)| *key == name) {
            Some(index) => {
                self.values[index].1 = value;
                let mut seen = false;
                self.values.retain(|(key, _)| {
                    if *key != name {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.values.push((name, value)),
        }
    }

    /// URI a GET submission navigates to
    pub fn uri(&self) -> Result<String> {
        let mut url = Url::parse(&self.action)?;
        if self.method == "GET" {
            url.set_query(None);
            if !self.values.is_empty() {
                url.query_pairs_mut().extend_pairs(self.values.iter());
            }
        }
        Ok(url.to_string())
    }
}

/// Offline HTML document with the URI it was served from
#[derive(Debug, Clone)]
pub struct StaticPage {
    uri: Url,
    html: String,
}

impl StaticPage {
    pub fn new<S: Into<String>>(uri: &str, html: S) -> Result<Self> {
        Ok(Self {
            uri: Url::parse(uri)?,
            html: html.into(),
        })
    }

    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::internal(format!("Invalid selector {}: {:?}", css, e)))
    }

    /// Every `a[href]` or `area[href]` matching `css`
    pub fn links(&self, css: &str) -> Result<Vec<StaticLink>> {
        let selector = Self::selector(css)?;
        let document = Html::parse_document(&self.html);

        document
            .select(&selector)
            .filter(|e| matches!(e.value().name(), "a" | "area"))
            .filter_map(|e| e.value().attr("href").map(|href| (e, href)))
            .map(|(e, href)| -> Result<StaticLink> {
                Ok(StaticLink {
                    uri: self.uri.join(href)?.to_string(),
                    text: normalize(&e.text().collect::<String>()),
                })
            })
            .collect()
    }

    pub fn link(&self, css: &str) -> Result<StaticLink> {
        self.links(css)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(format!("No link matches \"{}\"", css)))
    }

    /// First link whose text contains `text`
    pub fn select_link(&self, text: &str) -> Result<StaticLink> {
        self.links("a, area")?
            .into_iter()
            .find(|link| contains_words(&link.text, text))
            .ok_or_else(|| Error::element_not_found(format!("No link with text \"{}\"", text)))
    }

    /// First form matching `css`, with its current default values
    pub fn form(&self, css: &str) -> Result<StaticForm> {
        let selector = Self::selector(css)?;
        let document = Html::parse_document(&self.html);
        let form = document
            .select(&selector)
            .find(|e| e.value().name() == "form")
            .ok_or_else(|| Error::element_not_found(format!("No form matches \"{}\"", css)))?;

        let action = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => self.uri.join(action)?,
            _ => self.uri.clone(),
        };
        let method = form.value().attr("method").unwrap_or("GET").to_ascii_uppercase();

        Ok(StaticForm {
            method,
            action: action.to_string(),
            values: default_values(form)?,
        })
    }
}

fn default_values(form: ElementRef<'_>) -> Result<Vec<(String, String)>> {
    let controls = Selector::parse("input, select, textarea")
        .map_err(|e| Error::internal(format!("Invalid selector: {:?}", e)))?;
    let options = Selector::parse("option")
        .map_err(|e| Error::internal(format!("Invalid selector: {:?}", e)))?;

    let mut values: Vec<(String, String)> = Vec::new();
    for control in form.select(&controls) {
        let attrs = control.value();
        let Some(name) = attrs.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if attrs.attr("disabled").is_some() {
            continue;
        }

        match attrs.name() {
            "input" => {
                let kind = attrs.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "image" | "button" | "reset" | "file" => {}
                    "checkbox" | "radio" => {
                        if attrs.attr("checked").is_some() {
                            values.push((name.to_string(), attrs.attr("value").unwrap_or("on").to_string()));
                        }
                    }
                    _ => values.push((name.to_string(), attrs.attr("value").unwrap_or("").to_string())),
                }
            }
            "textarea" => values.push((name.to_string(), control.text().collect::<String>())),
            "select" => {
                let all: Vec<_> = control.select(&options).collect();
                let mut chosen: Vec<_> = all.iter().filter(|o| o.value().attr("selected").is_some()).collect();
                if chosen.is_empty() && attrs.attr("multiple").is_none() {
                    chosen = all.iter().take(1).collect();
                }
                for option in chosen {
                    let value = option
                        .value()
                        .attr("value")
                        .map(String::from)
                        .unwrap_or_else(|| normalize(&option.text().collect::<String>()));
                    values.push((name.to_string(), value));
                }
            }
            _ => {}
        }
    }
    Ok(values)
}

/// Collapse runs of whitespace
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word containment on normalized text
pub(crate) fn contains_words(haystack: &str, needle: &str) -> bool {
    let haystack = format!(" {} ", normalize(haystack));
    let needle = format!(" {} ", normalize(needle));
    haystack.contains(&needle)
}
