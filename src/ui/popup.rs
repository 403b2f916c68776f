/// Popup UI for the quiz exporter extension

use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use patternfly_yew::prelude::*;
use serde::Deserialize;
use crate::anki::AnkiConnect;
use crate::config::ExporterConfig;
use crate::error::ExporterError;
use crate::export::{export_items, export_status, initialize, refresh_fields};
use crate::scrape::{WatuProExtractor, extract_from_html};
use crate::session::{Session, SessionAction, Status};
use crate::settings::{LocalStorage, SettingsStore};
use crate::ui::components::{SelectField, StatusLine};

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getActivePage() -> Result<JsValue, JsValue>;
}

/// HTML of the active tab, captured by the bridge
#[derive(Debug, Clone, Deserialize)]
struct PageSnapshot {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    html: String,
}

#[function_component(App)]
pub fn app() -> Html {
    let config = use_state(|| ExporterConfig::load(&LocalStorage));
    let session = use_reducer(|| Session {
        status: Status::Busy("Checking Anki connection...".to_string()),
        ..Session::default()
    });

    // Connect, populate selectors and restore saved choices on mount
    {
        let session = session.clone();
        let config = (*config).clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let api = AnkiConnect::new(config.clone());
                let saved = settings_store(&config).load();
                let loaded = initialize(&api, saved.as_ref()).await;
                session.dispatch(SessionAction::Loaded(loaded));
            });
            || ()
        });
    }

    let on_deck = {
        let session = session.clone();
        let config = config.clone();

        Callback::from(move |deck: String| {
            select(&session, &config, SessionAction::SelectDeck(deck));
        })
    };

    // Model change refreshes the field lists; only the fields are replaced
    // when the reply arrives
    let on_model = {
        let session = session.clone();
        let config = config.clone();

        Callback::from(move |model: String| {
            select(&session, &config, SessionAction::SelectModel(model.clone()));

            let session = session.clone();
            let config = (*config).clone();
            spawn_local(async move {
                let api = AnkiConnect::new(config.clone());
                let saved = settings_store(&config).load();
                session.dispatch(refresh_fields(&api, &model, saved).await);
            });
        })
    };

    let on_front = {
        let session = session.clone();
        let config = config.clone();

        Callback::from(move |field: String| {
            select(&session, &config, SessionAction::SelectFrontField(field));
        })
    };

    let on_back = {
        let session = session.clone();
        let config = config.clone();

        Callback::from(move |field: String| {
            select(&session, &config, SessionAction::SelectBackField(field));
        })
    };

    // Scrape the active tab and add one note per wrong answer
    let on_add = {
        let session = session.clone();
        let config = config.clone();

        Callback::from(move |_: MouseEvent| {
            let session = session.clone();
            let config = (*config).clone();
            let snapshot = (*session).clone();

            session.dispatch(SessionAction::SetStatus(Status::Busy("Adding cards...".to_string())));

            spawn_local(async move {
                let result = run_export(&config, &snapshot).await;
                if let Err(e) = &result {
                    log::warn!("Export failed: {}", e);
                }
                session.dispatch(SessionAction::SetStatus(export_status(&result)));
            });
        })
    };

    let is_busy = matches!(session.status, Status::Busy(_));
    let is_connected = !session.decks.is_empty() || !session.models.is_empty();

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Quiz to Anki"}</h1>

            <div class="flex-column-gap">
                <SelectField
                    id="deckSelect"
                    label="Deck"
                    options={session.decks.clone()}
                    selected={session.selection.deck.clone()}
                    onchange={on_deck}
                    disabled={is_busy || !is_connected}
                />
                <SelectField
                    id="modelSelect"
                    label="Note type"
                    options={session.models.clone()}
                    selected={session.selection.model.clone()}
                    onchange={on_model}
                    disabled={is_busy || !is_connected}
                />
                <SelectField
                    id="frontField"
                    label="Front field"
                    options={session.fields.clone()}
                    selected={session.selection.front_field.clone()}
                    onchange={on_front}
                    disabled={is_busy || !is_connected}
                />
                <SelectField
                    id="backField"
                    label="Back field"
                    options={session.fields.clone()}
                    selected={session.selection.back_field.clone()}
                    onchange={on_back}
                    disabled={is_busy || !is_connected}
                />

                <Button onclick={on_add} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                    {"Add cards"}
                </Button>
            </div>

            <StatusLine status={session.status.clone()} />

            <p class="footer-popup">
                {"Quiz Anki Exporter v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

fn settings_store(config: &ExporterConfig) -> SettingsStore<LocalStorage> {
    SettingsStore::new(LocalStorage, config.settings_key.clone())
}

/// Apply a user selection and save the resulting choices
fn select(session: &UseReducerHandle<Session>, config: &ExporterConfig, action: SessionAction) {
    let mut next = (**session).clone();
    next.apply(action.clone());
    if let Err(e) = settings_store(config).save(&next.settings()) {
        log::warn!("Failed to save settings: {}", e);
    }
    session.dispatch(action);
}

async fn active_page() -> Result<PageSnapshot, ExporterError> {
    let page_js = getActivePage().await.map_err(ExporterError::browser)?;
    serde_wasm_bindgen::from_value(page_js)
        .map_err(|e| ExporterError::Browser(format!("Failed to parse page snapshot: {:?}", e)))
}

async fn run_export(config: &ExporterConfig, session: &Session) -> Result<usize, ExporterError> {
    let page = active_page().await?;
    log::info!("Scraping '{}' ({})", page.title, page.url);

    let items = extract_from_html(&WatuProExtractor, &page.html)?;
    log::info!("Found {} wrongly answered questions", items.len());

    let api = AnkiConnect::new(config.clone());
    export_items(&api, session, config, &items).await
}
