/// Startup connection check and the scrape-then-submit export loop

use crate::anki::AnkiApi;
use crate::config::ExporterConfig;
use crate::error::ExporterError;
use crate::scrape::ScrapedItem;
use crate::session::{Session, SessionAction, Status};
use crate::settings::Settings;

/// Connect, list decks/models and reapply saved choices.
/// Stops after the version check when Anki is not reachable.
pub async fn initialize<A: AnkiApi>(api: &A, saved: Option<&Settings>) -> Session {
    let mut session = Session::default();

    match api.version().await {
        Ok(Some(version)) => {
            log::info!("Connected to AnkiConnect, API version {}", version);
            session.status = Status::Info(format!("Connected to Anki (API version: {})", version));
        }
        Ok(None) => {
            session.status = Status::Error("Anki API responded but with unexpected data".to_string());
            return session;
        }
        Err(e) if e.is_connection() => {
            log::warn!("AnkiConnect unreachable: {}", e);
            session.status = Status::from(&e);
            return session;
        }
        Err(e) => {
            log::warn!("AnkiConnect rejected the version check: {}", e);
            session.status = Status::from(&e);
            return session;
        }
    }

    let lists = async { Ok::<_, ExporterError>((api.deck_names().await?, api.model_names().await?)) };
    match lists.await {
        Ok((decks, models)) => session.populate(decks, models),
        Err(e) => {
            session.status = Status::from(&e);
            return session;
        }
    }

    if let Some(saved) = saved {
        session.restore(saved);
    }

    if let Some(model) = session.selection.model.clone() {
        session.apply(refresh_fields(api, &model, saved.cloned()).await);
    }

    session
}

/// Fetch the field names of `model` as an action for the session
pub async fn refresh_fields<A: AnkiApi>(api: &A, model: &str, saved: Option<Settings>) -> SessionAction {
    match api.model_field_names(model).await {
        Ok(fields) => SessionAction::FieldsLoaded {
            model: model.to_string(),
            fields,
            saved,
        },
        Err(e) => {
            log::warn!("Failed to load fields for '{}': {}", model, e);
            SessionAction::FieldsFailed {
                model: model.to_string(),
            }
        }
    }
}

/// Submit each item in order, stopping at the first failure.
/// Returns the number of notes created.
pub async fn export_items<A: AnkiApi>(
    api: &A,
    session: &Session,
    config: &ExporterConfig,
    items: &[ScrapedItem],
) -> Result<usize, ExporterError> {
    if items.is_empty() {
        return Err(ExporterError::NoQuestions);
    }

    let total = items.len();
    for (added, item) in items.iter().enumerate() {
        let result = match session.note_for(item, config) {
            Ok(note) => api.add_note(&note).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(id) => log::debug!("Added note {:?} ({}/{})", id, added + 1, total),
            Err(source) if added == 0 => return Err(source),
            Err(source) => {
                return Err(ExporterError::ExportAborted {
                    added,
                    total,
                    source: Box::new(source),
                });
            }
        }
    }

    log::info!("Exported {} cards", total);
    Ok(total)
}

pub fn export_status(result: &Result<usize, ExporterError>) -> Status {
    match result {
        Ok(1) => Status::Success("Cards added successfully (1 card)".to_string()),
        Ok(n) => Status::Success(format!("Cards added successfully ({} cards)", n)),
        Err(e) => Status::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::{Value, json};
    use std::cell::RefCell;

    /// Answers by action name; `fail_add_at` makes the nth addNote fail
    #[derive(Default)]
    struct ScriptedAnki {
        online: bool,
        version_error: bool,
        fail_add_at: Option<usize>,
        calls: RefCell<Vec<String>>,
        notes: RefCell<Vec<Value>>,
    }

    impl ScriptedAnki {
        fn online() -> Self {
            ScriptedAnki {
                online: true,
                ..Default::default()
            }
        }
    }

    impl AnkiApi for ScriptedAnki {
        async fn invoke(&self, action: &str, params: Value) -> Result<Value, ExporterError> {
            self.calls.borrow_mut().push(action.to_string());
            if !self.online {
                return Err(ExporterError::Connection("connection refused".to_string()));
            }
            let reply = match action {
                "version" if self.version_error => json!({ "result": null, "error": "permission denied" }),
                "version" => json!({ "result": 6, "error": null }),
                "deckNames" => json!({ "result": ["Default", "D1"], "error": null }),
                "modelNames" => json!({ "result": ["Basic", "M1"], "error": null }),
                "modelFieldNames" => match params["modelName"].as_str() {
                    Some("M1") => json!({ "result": ["Text", "Front", "Back"], "error": null }),
                    _ => json!({ "result": ["Front", "Back"], "error": null }),
                },
                "addNote" => {
                    let mut notes = self.notes.borrow_mut();
                    if self.fail_add_at == Some(notes.len()) {
                        json!({ "result": null, "error": "cannot create note because it is a duplicate" })
                    } else {
                        notes.push(params["note"].clone());
                        json!({ "result": 1000 + notes.len(), "error": null })
                    }
                }
                _ => json!({ "result": null, "error": "unsupported action" }),
            };
            Ok(reply)
        }
    }

    fn items(n: usize) -> Vec<ScrapedItem> {
        (1..=n)
            .map(|i| ScrapedItem::new(&format!("question {}", i), &format!("feedback {}", i)))
            .collect()
    }

    fn ready_session() -> Session {
        let mut session = Session::default();
        session.selection = Settings {
            deck: Some("D1".to_string()),
            model: Some("Basic".to_string()),
            front_field: Some("Front".to_string()),
            back_field: Some("Back".to_string()),
        };
        session
    }

    #[test]
    fn test_initialize_offline_stops_after_version_check() {
        let anki = ScriptedAnki::default();

        let session = block_on(initialize(&anki, None));

        assert_eq!(*anki.calls.borrow(), vec!["version".to_string()]);
        assert!(session.decks.is_empty());
        assert!(session.models.is_empty());
        assert_eq!(session.status, Status::Error("Failed to connect to Anki API".to_string()));
    }

    #[test]
    fn test_initialize_populates_and_restores() {
        let anki = ScriptedAnki::online();
        let saved = Settings {
            deck: Some("D1".to_string()),
            model: Some("M1".to_string()),
            front_field: Some("Front".to_string()),
            back_field: Some("Back".to_string()),
        };

        let session = block_on(initialize(&anki, Some(&saved)));

        assert_eq!(
            *anki.calls.borrow(),
            vec!["version", "deckNames", "modelNames", "modelFieldNames"]
        );
        assert_eq!(session.settings(), saved);
        assert_eq!(session.fields, vec!["Text", "Front", "Back"]);
        assert_eq!(session.status, Status::Info("Connected to Anki (API version: 6)".to_string()));
    }

    #[test]
    fn test_initialize_without_saved_settings() {
        let anki = ScriptedAnki::online();

        let session = block_on(initialize(&anki, None));

        assert_eq!(session.selection.deck.as_deref(), Some("Default"));
        assert_eq!(session.selection.model.as_deref(), Some("Basic"));
        assert_eq!(session.selection.front_field.as_deref(), Some("Front"));
        assert_eq!(session.selection.back_field.as_deref(), Some("Front"));
    }

    #[test]
    fn test_initialize_api_error_on_version_halts() {
        let anki = ScriptedAnki {
            version_error: true,
            ..ScriptedAnki::online()
        };

        let session = block_on(initialize(&anki, None));

        assert_eq!(*anki.calls.borrow(), vec!["version".to_string()]);
        assert_eq!(session.status, Status::Error("Anki API error: permission denied".to_string()));
    }

    #[test]
    fn test_refresh_fields_targets_requested_model() {
        let anki = ScriptedAnki::online();

        let action = block_on(refresh_fields(&anki, "M1", None));

        assert_eq!(
            action,
            SessionAction::FieldsLoaded {
                model: "M1".to_string(),
                fields: vec!["Text".to_string(), "Front".to_string(), "Back".to_string()],
                saved: None,
            }
        );
    }

    #[test]
    fn test_refresh_fields_failure() {
        let anki = ScriptedAnki::default();

        let action = block_on(refresh_fields(&anki, "M1", None));

        assert_eq!(action, SessionAction::FieldsFailed { model: "M1".to_string() });
    }

    #[test]
    fn test_export_empty_does_not_call_api() {
        let anki = ScriptedAnki::online();

        let result = block_on(export_items(&anki, &ready_session(), &ExporterConfig::default(), &[]));

        assert!(matches!(result, Err(ExporterError::NoQuestions)));
        assert!(anki.calls.borrow().is_empty());
        assert_eq!(export_status(&result), Status::Info("No questions found".to_string()));
    }

    #[test]
    fn test_export_submits_in_order() {
        let anki = ScriptedAnki::online();

        let result = block_on(export_items(&anki, &ready_session(), &ExporterConfig::default(), &items(3)));

        assert_eq!(result.unwrap(), 3);
        let notes = anki.notes.borrow();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0]["fields"]["Front"], "Q: question 1");
        assert_eq!(notes[2]["fields"]["Back"], "Feedback: feedback 3");
        assert_eq!(notes[0]["deckName"], "D1");
        assert_eq!(notes[0]["tags"], json!(["test-english"]));
    }

    #[test]
    fn test_export_aborts_and_reports_progress() {
        let anki = ScriptedAnki {
            fail_add_at: Some(2),
            ..ScriptedAnki::online()
        };

        let result = block_on(export_items(&anki, &ready_session(), &ExporterConfig::default(), &items(10)));

        match &result {
            Err(ExporterError::ExportAborted { added, total, .. }) => {
                assert_eq!(*added, 2);
                assert_eq!(*total, 10);
            }
            other => panic!("expected ExportAborted, got {:?}", other),
        }
        assert_eq!(anki.calls.borrow().len(), 3);
    }

    #[test]
    fn test_export_first_failure_is_not_wrapped() {
        let anki = ScriptedAnki::default();

        let result = block_on(export_items(&anki, &ready_session(), &ExporterConfig::default(), &items(2)));

        assert_eq!(export_status(&result), Status::Error("Failed to connect to Anki API".to_string()));
    }

    #[test]
    fn test_export_status_success() {
        assert_eq!(
            export_status(&Ok(4)),
            Status::Success("Cards added successfully (4 cards)".to_string())
        );
    }
}
