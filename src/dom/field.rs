//! Typed form fields backed by remote elements
//!
//! Every setter writes through to the live browser: typing into text fields,
//! clicking options and checkboxes, sending a path to file inputs.

use std::fmt;
use std::sync::Arc;

use crate::webdriver::{Locator, RemoteElement};
use crate::{Error, Result};

/// Value assigned to, or read from, a form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Single(String),
    Multiple(Vec<String>),
    /// Checkbox state
    Ticked(bool),
}

impl FormValue {
    /// Submitted values, in order
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            FormValue::Single(value) => vec![value.clone()],
            FormValue::Multiple(values) => values.clone(),
            FormValue::Ticked(_) => Vec::new(),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Single(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Single(value)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Ticked(value)
    }
}

impl From<Vec<&str>> for FormValue {
    fn from(values: Vec<&str>) -> Self {
        FormValue::Multiple(values.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for FormValue {
    fn from(values: Vec<String>) -> Self {
        FormValue::Multiple(values)
    }
}

impl fmt::Display for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormValue::Single(value) => write!(f, "\"{}\"", value),
            FormValue::Multiple(values) => write!(f, "{:?}", values),
            FormValue::Ticked(ticked) => write!(f, "{}", ticked),
        }
    }
}

fn rejected(name: &str, value: &FormValue, expected: &str) -> Error {
    Error::invalid_field_value(format!(
        "Field \"{}\" accepts {}, got {}",
        name, expected, value
    ))
}

/// `<input type="text">` (and other text-like inputs) or `<textarea>`
#[derive(Debug, Clone)]
pub struct TextField {
    name: String,
    element: Arc<dyn RemoteElement>,
}

impl TextField {
    pub fn new<S: Into<String>>(name: S, element: Arc<dyn RemoteElement>) -> Self {
        Self {
            name: name.into(),
            element,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn value(&self) -> Result<String> {
        Ok(self.element.prop("value").await?.unwrap_or_default())
    }

    pub async fn set_value(&self, value: &FormValue) -> Result<()> {
        match value {
            FormValue::Single(text) => {
                self.element.clear().await?;
                self.element.send_keys(text).await
            }
            other => Err(rejected(&self.name, other, "a single string")),
        }
    }
}

/// Shape of a choice field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    Select,
    SelectMultiple,
    Checkbox,
    Radio,
}

/// `<select>`, a checkbox, or a radio group
#[derive(Debug, Clone)]
pub struct ChoiceField {
    name: String,
    kind: ChoiceKind,
    /// The select element, the checkbox, or every radio of the group
    elements: Vec<Arc<dyn RemoteElement>>,
}

impl ChoiceField {
    pub fn new<S: Into<String>>(name: S, kind: ChoiceKind, element: Arc<dyn RemoteElement>) -> Self {
        Self {
            name: name.into(),
            kind,
            elements: vec![element],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChoiceKind {
        self.kind
    }

    /// Add a radio to the group
    pub(crate) fn push_radio(&mut self, element: Arc<dyn RemoteElement>) {
        self.elements.push(element);
    }

    /// `<option>` elements of a select, or the inputs themselves
    async fn choices(&self) -> Result<Vec<Arc<dyn RemoteElement>>> {
        match self.kind {
            ChoiceKind::Select | ChoiceKind::SelectMultiple => {
                self.elements[0].find_all(&Locator::css("option")).await
            }
            ChoiceKind::Checkbox | ChoiceKind::Radio => Ok(self.elements.clone()),
        }
    }

    async fn choice_value(element: &Arc<dyn RemoteElement>) -> Result<String> {
        Ok(element.prop("value").await?.unwrap_or_else(|| "on".to_string()))
    }

    /// Values the field can take
    pub async fn available_options(&self) -> Result<Vec<String>> {
        let mut values = Vec::new();
        for choice in self.choices().await? {
            values.push(Self::choice_value(&choice).await?);
        }
        Ok(values)
    }

    /// Current value; `None` for an unticked checkbox or an unset radio group
    pub async fn value(&self) -> Result<Option<FormValue>> {
        let mut selected = Vec::new();
        for choice in self.choices().await? {
            if choice.is_selected().await? {
                selected.push(Self::choice_value(&choice).await?);
            }
        }

        Ok(match self.kind {
            ChoiceKind::SelectMultiple => Some(FormValue::Multiple(selected)),
            _ => selected.into_iter().next().map(FormValue::Single),
        })
    }

    pub async fn is_ticked(&self) -> Result<bool> {
        match self.kind {
            ChoiceKind::Checkbox => self.elements[0].is_selected().await,
            _ => Err(Error::invalid_field_value(format!(
                "Field \"{}\" is not a checkbox",
                self.name
            ))),
        }
    }

    pub async fn tick(&self) -> Result<()> {
        self.set_value(&FormValue::Ticked(true)).await
    }

    pub async fn untick(&self) -> Result<()> {
        self.set_value(&FormValue::Ticked(false)).await
    }

    pub async fn select<S: Into<String>>(&self, value: S) -> Result<()> {
        self.set_value(&FormValue::Single(value.into())).await
    }

    pub async fn set_value(&self, value: &FormValue) -> Result<()> {
        match (self.kind, value) {
            (ChoiceKind::Checkbox, FormValue::Ticked(tick)) => self.set_ticked(*tick).await,
            (ChoiceKind::Checkbox, FormValue::Single(wanted)) => {
                let own = Self::choice_value(&self.elements[0]).await?;
                if own != *wanted {
                    return Err(rejected(&self.name, value, &format!("\"{}\" or a tick", own)));
                }
                self.set_ticked(true).await
            }
            (ChoiceKind::Select | ChoiceKind::Radio, FormValue::Single(wanted)) => {
                let choice = self.find_choice(wanted, value).await?;
                if !choice.is_selected().await? {
                    choice.click().await?;
                }
                Ok(())
            }
            (ChoiceKind::SelectMultiple, FormValue::Single(_) | FormValue::Multiple(_)) => {
                let wanted = value.to_vec();
                let choices = self.choices().await?;

                let mut available = Vec::with_capacity(choices.len());
                for choice in &choices {
                    available.push(Self::choice_value(choice).await?);
                }
                if let Some(missing) = wanted.iter().find(|w| !available.contains(w)) {
                    return Err(rejected(
                        &self.name,
                        value,
                        &format!("values among {:?} (\"{}\" is not one)", available, missing),
                    ));
                }

                for (choice, option_value) in choices.iter().zip(&available) {
                    if choice.is_selected().await? != wanted.contains(option_value) {
                        choice.click().await?;
                    }
                }
                Ok(())
            }
            (ChoiceKind::Checkbox, _) => Err(rejected(&self.name, value, "a tick")),
            (ChoiceKind::Select | ChoiceKind::Radio, _) => {
                Err(rejected(&self.name, value, "a single option value"))
            }
            (ChoiceKind::SelectMultiple, _) => Err(rejected(&self.name, value, "option values")),
        }
    }

    async fn set_ticked(&self, tick: bool) -> Result<()> {
        let checkbox = &self.elements[0];
        if checkbox.is_selected().await? != tick {
            checkbox.click().await?;
        }
        Ok(())
    }

    async fn find_choice(&self, wanted: &str, value: &FormValue) -> Result<Arc<dyn RemoteElement>> {
        let mut available = Vec::new();
        for choice in self.choices().await? {
            let choice_value = Self::choice_value(&choice).await?;
            if choice_value == wanted {
                return Ok(choice);
            }
            available.push(choice_value);
        }
        Err(rejected(&self.name, value, &format!("one of {:?}", available)))
    }

    pub(crate) fn first_element(&self) -> &Arc<dyn RemoteElement> {
        &self.elements[0]
    }
}

/// `<input type="file">`
#[derive(Debug, Clone)]
pub struct FileField {
    name: String,
    element: Arc<dyn RemoteElement>,
}

impl FileField {
    pub fn new<S: Into<String>>(name: S, element: Arc<dyn RemoteElement>) -> Self {
        Self {
            name: name.into(),
            element,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a local file
    pub async fn upload(&self, path: &str) -> Result<()> {
        self.set_value(&FormValue::Single(path.to_string())).await
    }

    pub async fn value(&self) -> Result<String> {
        Ok(self.element.prop("value").await?.unwrap_or_default())
    }

    pub async fn set_value(&self, value: &FormValue) -> Result<()> {
        match value {
            FormValue::Single(path) => self.element.send_keys(path).await,
            other => Err(rejected(&self.name, other, "a file path")),
        }
    }
}

/// Any form field
#[derive(Debug, Clone)]
pub enum FormField {
    Text(TextField),
    Choice(ChoiceField),
    File(FileField),
}

impl FormField {
    pub fn name(&self) -> &str {
        match self {
            FormField::Text(field) => field.name(),
            FormField::Choice(field) => field.name(),
            FormField::File(field) => field.name(),
        }
    }

    /// Current value; `None` when the field would not be submitted
    pub async fn value(&self) -> Result<Option<FormValue>> {
        match self {
            FormField::Text(field) => Ok(Some(FormValue::Single(field.value().await?))),
            FormField::Choice(field) => field.value().await,
            FormField::File(field) => Ok(Some(FormValue::Single(field.value().await?))),
        }
    }

    pub async fn set_value(&self, value: &FormValue) -> Result<()> {
        match self {
            FormField::Text(field) => field.set_value(value).await,
            FormField::Choice(field) => field.set_value(value).await,
            FormField::File(field) => field.set_value(value).await,
        }
    }

    pub async fn is_disabled(&self) -> Result<bool> {
        let element = match self {
            FormField::Text(field) => &field.element,
            FormField::Choice(field) => field.first_element(),
            FormField::File(field) => &field.element,
        };
        Ok(!element.is_enabled().await?)
    }

    pub fn as_choice(&self) -> Option<&ChoiceField> {
        match self {
            FormField::Choice(field) => Some(field),
            _ => None,
        }
    }
}
