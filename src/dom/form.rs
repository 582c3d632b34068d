//! Forms: live element with typed fields, or static values

use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::field::{ChoiceField, ChoiceKind, FileField, FormField, FormValue, TextField};
use super::static_page::StaticForm;
use crate::webdriver::{Locator, RemoteElement, RemoteSession};
use crate::{Error, Result};

/// Form backed by a live `<form>` element
#[derive(Debug, Clone)]
pub struct RemoteForm {
    form: Arc<dyn RemoteElement>,
    button: Option<Arc<dyn RemoteElement>>,
    current_uri: String,
    fields: Vec<FormField>,
}

impl RemoteForm {
    /// Build from a `<form>` or from one of its submit buttons
    pub async fn from_element(
        element: Arc<dyn RemoteElement>,
        current_uri: &str,
        session: &Arc<dyn RemoteSession>,
    ) -> Result<Self> {
        let tag = element.tag_name().await?.to_ascii_lowercase();
        let (form, button) = if tag == "form" {
            (element, None)
        } else {
            let form = Self::form_owner(&element, session).await?;
            (form, Some(element))
        };

        let fields = Self::collect_fields(&form).await?;
        debug!("Materialized form with {} fields", fields.len());
        Ok(Self {
            form,
            button,
            current_uri: current_uri.to_string(),
            fields,
        })
    }

    async fn form_owner(
        element: &Arc<dyn RemoteElement>,
        session: &Arc<dyn RemoteSession>,
    ) -> Result<Arc<dyn RemoteElement>> {
        if let Some(id) = element.attr("form").await? {
            let owners = session.find_all(&Locator::css(format!("form[id=\"{}\"]", id))).await?;
            if let Some(form) = owners.into_iter().next() {
                return Ok(form);
            }
        }

        element
            .find_all(&Locator::xpath("./ancestor::form"))
            .await?
            .pop()
            .ok_or_else(|| Error::element_not_found("The selected node does not have a form ancestor."))
    }

    async fn collect_fields(form: &Arc<dyn RemoteElement>) -> Result<Vec<FormField>> {
        let mut fields: Vec<FormField> = Vec::new();

        for control in form.find_all(&Locator::css("input, select, textarea")).await? {
            let Some(name) = control.attr("name").await?.filter(|n| !n.is_empty()) else {
                continue;
            };

            let field = match control.tag_name().await?.to_ascii_lowercase().as_str() {
                "textarea" => FormField::Text(TextField::new(name, control)),
                "select" => {
                    let kind = if control.attr("multiple").await?.is_some() {
                        ChoiceKind::SelectMultiple
                    } else {
                        ChoiceKind::Select
                    };
                    FormField::Choice(ChoiceField::new(name, kind, control))
                }
                _ => {
                    let kind = control
                        .attr("type")
                        .await?
                        .unwrap_or_else(|| "text".to_string())
                        .to_ascii_lowercase();
                    match kind.as_str() {
                        "submit" | "image" | "button" | "reset" => continue,
                        "checkbox" => FormField::Choice(ChoiceField::new(name, ChoiceKind::Checkbox, control)),
                        "radio" => {
                            let group = fields.iter_mut().find_map(|f| match f {
                                FormField::Choice(choice)
                                    if choice.kind() == ChoiceKind::Radio && choice.name() == name =>
                                {
                                    Some(choice)
                                }
                                _ => None,
                            });
                            match group {
                                Some(group) => {
                                    group.push_radio(control);
                                    continue;
                                }
                                None => FormField::Choice(ChoiceField::new(name, ChoiceKind::Radio, control)),
                            }
                        }
                        "file" => FormField::File(FileField::new(name, control)),
                        _ => FormField::Text(TextField::new(name, control)),
                    }
                }
            };
            fields.push(field);
        }
        Ok(fields)
    }

    pub fn element(&self) -> &Arc<dyn RemoteElement> {
        &self.form
    }

    pub fn button(&self) -> Option<&Arc<dyn RemoteElement>> {
        self.button.as_ref()
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name() == name)
    }

    pub fn get(&self, name: &str) -> Result<&FormField> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::invalid_field_value(format!("Unreachable field \"{}\"", name)))
    }

    /// Set one field; the browser element is updated immediately
    pub async fn set(&self, name: &str, value: &FormValue) -> Result<()> {
        self.get(name)?.set_value(value).await
    }

    pub async fn set_values(&self, values: &[(String, FormValue)]) -> Result<()> {
        for (name, value) in values {
            self.set(name, value).await?;
        }
        Ok(())
    }

    /// Values that would be submitted: enabled fields, unticked checkboxes omitted
    pub async fn values(&self) -> Result<Vec<(String, FormValue)>> {
        let mut values = Vec::new();
        for field in &self.fields {
            if field.is_disabled().await? {
                continue;
            }
            if let Some(value) = field.value().await? {
                values.push((field.name().to_string(), value));
            }
        }

        if let Some(button) = &self.button {
            if let Some(name) = button.attr("name").await?.filter(|n| !n.is_empty()) {
                let value = button.prop("value").await?.unwrap_or_default();
                values.push((name, FormValue::Single(value)));
            }
        }
        Ok(values)
    }

    /// Upper-case method, honoring the button's `formmethod`
    pub async fn method(&self) -> Result<String> {
        if let Some(button) = &self.button {
            if let Some(method) = button.attr("formmethod").await? {
                return Ok(method.to_ascii_uppercase());
            }
        }
        Ok(self
            .form
            .attr("method")
            .await?
            .unwrap_or_else(|| "GET".to_string())
            .to_ascii_uppercase())
    }

    /// Absolute action URI, honoring the button's `formaction`
    pub async fn uri(&self) -> Result<String> {
        let mut action = None;
        if let Some(button) = &self.button {
            action = button.attr("formaction").await?;
        }
        if action.is_none() {
            action = self.form.attr("action").await?;
        }

        let base = Url::parse(&self.current_uri)?;
        Ok(match action.as_deref().map(str::trim) {
            Some(action) if !action.is_empty() => base.join(action)?.to_string(),
            _ => base.to_string(),
        })
    }

    /// Submit through the browser: click the button if any, else submit natively
    pub async fn submit(&self) -> Result<()> {
        match &self.button {
            Some(button) => button.click().await,
            None => self.form.submit().await,
        }
    }
}

/// Form to submit with `Client::submit`
#[derive(Debug, Clone)]
pub enum Form {
    Remote(RemoteForm),
    Static(StaticForm),
}

impl Form {
    pub async fn method(&self) -> Result<String> {
        match self {
            Form::Remote(form) => form.method().await,
            Form::Static(form) => Ok(form.method().to_string()),
        }
    }

    pub async fn uri(&self) -> Result<String> {
        match self {
            Form::Remote(form) => form.uri().await,
            Form::Static(form) => form.uri(),
        }
    }

    /// Apply values; static forms only take single strings
    pub async fn set_values(&mut self, values: &[(String, FormValue)]) -> Result<()> {
        match self {
            Form::Remote(form) => form.set_values(values).await,
            Form::Static(form) => {
                for (name, value) in values {
                    match value {
                        FormValue::Single(text) => form.set(name.clone(), text.clone()),
                        other => {
                            return Err(Error::invalid_field_value(format!(
                                "Field \"{}\" of a static form accepts a single string, got {}",
                                name, other
                            )))
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<RemoteForm> for Form {
    fn from(form: RemoteForm) -> Self {
        Form::Remote(form)
    }
}

impl From<StaticForm> for Form {
    fn from(form: StaticForm) -> Self {
        Form::Static(form)
    }
}
