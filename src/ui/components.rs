/// Reusable UI components

use crate::session::Status;
use patternfly_yew::prelude::*;
use web_sys::HtmlSelectElement;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct SelectFieldProps {
    pub id: AttrValue,
    pub label: AttrValue,
    pub options: Vec<String>,
    #[prop_or_default]
    pub selected: Option<String>,
    pub onchange: Callback<String>,
    #[prop_or(false)]
    pub disabled: bool,
}

/// Value the `<select>` should show: the selection when it is an option, else the first option
pub fn shown_value(options: &[String], selected: Option<&str>) -> String {
    selected
        .filter(|s| options.iter().any(|o| o.as_str() == *s))
        .or_else(|| options.first().map(String::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Labelled `<select>` that reports the chosen value
#[function_component(SelectField)]
pub fn select_field(props: &SelectFieldProps) -> Html {
    let select_ref = use_node_ref();

    // `selected` attributes only steer untouched options; keep `value` in sync
    {
        let select_ref = select_ref.clone();
        let value = shown_value(&props.options, props.selected.as_deref());

        use_effect_with((props.options.clone(), value), move |(_, value)| {
            if let Some(select) = select_ref.cast::<HtmlSelectElement>() {
                select.set_value(value);
            }
            || ()
        });
    }

    let onchange = {
        let callback = props.onchange.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                callback.emit(select.value());
            }
        })
    };

    html! {
        <div class="select-field">
            <label class="select-label" for={props.id.clone()}>{props.label.clone()}</label>
            <select ref={select_ref} id={props.id.clone()} class="select-input" {onchange} disabled={props.disabled}>
                {for props.options.iter().map(|option| {
                    let selected = props.selected.as_deref() == Some(option.as_str());
                    html! {
                        <option key={option.clone()} value={option.clone()} {selected}>{option}</option>
                    }
                })}
            </select>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct StatusLineProps {
    pub status: Status,
}

#[function_component(StatusLine)]
pub fn status_line(props: &StatusLineProps) -> Html {
    match &props.status {
        Status::Idle => html! {},
        Status::Busy(msg) => html! {
            <div id="status" class="loading-text-center">
                <Spinner />
                <p class="loading-text">{msg}</p>
            </div>
        },
        Status::Info(msg) => html! {
            <p id="status" class="message-text">{msg}</p>
        },
        Status::Success(msg) => html! {
            <div id="status" class="message-top-margin">
                <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                </Alert>
            </div>
        },
        Status::Error(msg) => html! {
            <div id="status" class="message-top-margin">
                <Alert r#type={AlertType::Danger} title={msg.clone()} inline={true}>
                </Alert>
            </div>
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shown_value_follows_selection() {
        let options = strings(&["Front", "Back", "Extra"]);
        assert_eq!(shown_value(&options, Some("Extra")), "Extra");
    }

    #[test]
    fn test_shown_value_after_repopulate() {
        // The old pick is gone from the rebuilt list
        let options = strings(&["Text", "Back Extra"]);
        assert_eq!(shown_value(&options, Some("Back")), "Text");
        assert_eq!(shown_value(&options, None), "Text");
    }

    #[test]
    fn test_shown_value_empty_list() {
        assert_eq!(shown_value(&[], Some("Front")), "");
    }
}
