/// Popup state: option lists, current selection and status line

use crate::anki::{NoteOptions, NoteRequest};
use crate::config::ExporterConfig;
use crate::error::ExporterError;
use crate::scrape::ScrapedItem;
use crate::settings::Settings;
use std::collections::BTreeMap;
use std::rc::Rc;
use yew::Reducible;

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Busy(String),
    Info(String),
    Success(String),
    Error(String),
}

impl From<&ExporterError> for Status {
    fn from(error: &ExporterError) -> Self {
        match error {
            ExporterError::Connection(_) => Status::Error("Failed to connect to Anki API".to_string()),
            ExporterError::NoQuestions => Status::Info(error.to_string()),
            other => Status::Error(other.to_string()),
        }
    }
}

/// Every change the popup makes to its state
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Loaded(Session),
    SelectDeck(String),
    SelectModel(String),
    SelectFrontField(String),
    SelectBackField(String),
    /// Field names for `model`; ignored if another model was chosen meanwhile
    FieldsLoaded {
        model: String,
        fields: Vec<String>,
        saved: Option<Settings>,
    },
    FieldsFailed {
        model: String,
    },
    SetStatus(Status),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub decks: Vec<String>,
    pub models: Vec<String>,
    pub fields: Vec<String>,
    pub selection: Settings,
    pub status: Status,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            decks: Vec::new(),
            models: Vec::new(),
            fields: Vec::new(),
            selection: Settings::default(),
            status: Status::Idle,
        }
    }
}

impl Reducible for Session {
    type Action = SessionAction;

    fn reduce(self: Rc<Self>, action: SessionAction) -> Rc<Self> {
        let mut next = (*self).clone();
        next.apply(action);
        next.into()
    }
}

impl Session {
    pub fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::Loaded(session) => *self = session,
            SessionAction::SelectDeck(deck) => self.select_deck(deck),
            SessionAction::SelectModel(model) => self.select_model(model),
            SessionAction::SelectFrontField(field) => self.select_front_field(field),
            SessionAction::SelectBackField(field) => self.select_back_field(field),
            SessionAction::FieldsLoaded { model, fields, saved } => {
                if self.is_current_model(&model) {
                    self.set_fields(fields, saved.as_ref());
                } else {
                    log::debug!("Dropping fields for '{}', model changed", model);
                }
            }
            SessionAction::FieldsFailed { model } => {
                if self.is_current_model(&model) {
                    self.status = Status::Error("Failed to load fields".to_string());
                }
            }
            SessionAction::SetStatus(status) => self.status = status,
        }
    }

    fn is_current_model(&self, model: &str) -> bool {
        self.selection.model.as_deref() == Some(model)
    }

    /// Fill the deck and model selectors; each falls back to its first option
    pub fn populate(&mut self, decks: Vec<String>, models: Vec<String>) {
        self.selection.deck = choose(&decks, None);
        self.selection.model = choose(&models, None);
        self.decks = decks;
        self.models = models;
    }

    /// Reapply stored choices that still exist in the live option lists
    pub fn restore(&mut self, saved: &Settings) {
        if let Some(deck) = valid(&self.decks, saved.deck.as_deref()) {
            self.selection.deck = Some(deck);
        }
        if let Some(model) = valid(&self.models, saved.model.as_deref()) {
            self.selection.model = Some(model);
        }
        self.restore_fields(saved);
    }

    /// Replace both field selectors with the same option set
    pub fn set_fields(&mut self, fields: Vec<String>, saved: Option<&Settings>) {
        self.selection.front_field = choose(&fields, None);
        self.selection.back_field = choose(&fields, None);
        self.fields = fields;

        if let Some(saved) = saved {
            self.restore_fields(saved);
        }
    }

    fn restore_fields(&mut self, saved: &Settings) {
        if let Some(front) = valid(&self.fields, saved.front_field.as_deref()) {
            self.selection.front_field = Some(front);
        }
        if let Some(back) = valid(&self.fields, saved.back_field.as_deref()) {
            self.selection.back_field = Some(back);
        }
    }

    pub fn select_deck(&mut self, deck: String) {
        self.selection.deck = Some(deck);
    }

    pub fn select_model(&mut self, model: String) {
        self.selection.model = Some(model);
    }

    pub fn select_front_field(&mut self, field: String) {
        self.selection.front_field = Some(field);
    }

    pub fn select_back_field(&mut self, field: String) {
        self.selection.back_field = Some(field);
    }

    pub fn settings(&self) -> Settings {
        self.selection.clone()
    }

    /// Build the `addNote` payload for one scraped item
    pub fn note_for(&self, item: &ScrapedItem, config: &ExporterConfig) -> Result<NoteRequest, ExporterError> {
        let deck = required(&self.selection.deck, "deck")?;
        let model = required(&self.selection.model, "model")?;
        let front = required(&self.selection.front_field, "front field")?;
        let back = required(&self.selection.back_field, "back field")?;

        let mut fields = BTreeMap::new();
        fields.insert(front.to_string(), item.question.clone());
        fields.insert(back.to_string(), item.feedback.clone());

        Ok(NoteRequest {
            deck_name: deck.to_string(),
            model_name: model.to_string(),
            fields,
            options: NoteOptions {
                allow_duplicate: config.allow_duplicate,
            },
            tags: config.tags.clone(),
        })
    }
}

fn choose(options: &[String], wanted: Option<&str>) -> Option<String> {
    valid(options, wanted).or_else(|| options.first().cloned())
}

fn valid(options: &[String], wanted: Option<&str>) -> Option<String> {
    let wanted = wanted.filter(|w| !w.is_empty())?;
    options.iter().find(|o| o.as_str() == wanted).cloned()
}

fn required<'a>(value: &'a Option<String>, what: &'static str) -> Result<&'a str, ExporterError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ExporterError::IncompleteSelection(what))
}
