/// Quiz page extraction: turns wrongly answered WatuPRO questions into card text

use crate::error::ExporterError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use wasm_bindgen::JsCast;
use web_sys::{Document, DomParser, Element, Node, SupportedType};

const QUESTION_SELECTOR: &str = ".show-question-content";
const CHOICES_SELECTOR: &str = ".show-question-choices";
const CORRECT_IMAGE_SELECTOR: &str = r#"img[alt="Correct"]"#;
const CORRECT_ANSWER_SELECTOR: &str = "li.user-answer.correct-answer";
const ANSWER_OPTION_SELECTOR: &str = "span.answer";
const WRONG_GAP_CLASS: &str = "user-answer wrong-gap-answer";
const INCORRECT_FEEDBACK_SELECTOR: &str = ".watupro-main-feedback.feedback-incorrect";
const FEEDBACK_SELECTOR: &str = ".watupro-main-feedback";

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "tr", "ul",
];

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("whitespace pattern compiles"));
static ANY_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// One question/feedback pair ready to become a note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapedItem {
    pub question: String,
    pub feedback: String,
}

impl ScrapedItem {
    pub fn new(question: &str, feedback: &str) -> Self {
        ScrapedItem {
            question: format!("Q: {}", question),
            feedback: format!("Feedback: {}", feedback),
        }
    }
}

/// A direct child of the question element that contributes text
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// The learner's wrong gap-fill answer, rendered in quotes
    WrongGap(String),
    /// Inline span text or a bare text node
    Text(String),
}

/// Swappable page-specific matching rules
pub trait QuizExtractor {
    fn extract(&self, document: &Document) -> Vec<ScrapedItem>;
}

/// Rules for WatuPRO result pages
#[derive(Debug, Clone, Copy, Default)]
pub struct WatuProExtractor;

impl QuizExtractor for WatuProExtractor {
    fn extract(&self, document: &Document) -> Vec<ScrapedItem> {
        let questions = select_all(document.query_selector_all(QUESTION_SELECTOR).ok());

        questions
            .iter()
            .enumerate()
            .filter_map(|(index, question)| {
                let item = extract_question(question);
                if item.is_none() {
                    log::debug!("Skipping question {} (answered correctly)", index + 1);
                }
                item
            })
            .collect()
    }
}

fn extract_question(question: &Element) -> Option<ScrapedItem> {
    let container = question.parent_element();
    let choices = container
        .as_ref()
        .and_then(|parent| parent.query_selector(CHOICES_SELECTOR).ok().flatten());

    let has_correct_image = question
        .query_selector(CORRECT_IMAGE_SELECTOR)
        .ok()
        .flatten()
        .is_some();
    let has_correct_answer = choices
        .as_ref()
        .and_then(|c| c.query_selector(CORRECT_ANSWER_SELECTOR).ok().flatten())
        .is_some();

    if has_correct_image || has_correct_answer {
        return None;
    }

    let fragments = question_fragments(question);
    let options: Vec<String> = choices
        .as_ref()
        .map(|c| select_all(c.query_selector_all(ANSWER_OPTION_SELECTOR).ok()))
        .unwrap_or_default()
        .iter()
        .map(|span| text_of(span).trim().to_string())
        .collect();

    let feedback = container
        .as_ref()
        .and_then(|parent| {
            parent
                .query_selector(INCORRECT_FEEDBACK_SELECTOR)
                .ok()
                .flatten()
                .or_else(|| parent.query_selector(FEEDBACK_SELECTOR).ok().flatten())
        })
        .map(|el| normalize_block_text(&rendered_text(&el)))
        .unwrap_or_default();

    Some(ScrapedItem::new(&assemble_question(&fragments, &options), &feedback))
}

/// Walk immediate children in document order
fn question_fragments(question: &Element) -> Vec<Fragment> {
    let children = question.child_nodes();
    let mut fragments = Vec::new();

    for i in 0..children.length() {
        let Some(node) = children.item(i) else {
            continue;
        };

        match node.node_type() {
            Node::ELEMENT_NODE => {
                let Some(element) = node.dyn_ref::<Element>() else {
                    continue;
                };
                if element.class_name() == WRONG_GAP_CLASS {
                    fragments.push(Fragment::WrongGap(text_of(element).trim().to_string()));
                } else if element.tag_name().eq_ignore_ascii_case("span") {
                    fragments.push(Fragment::Text(text_of(element).trim().to_string()));
                }
            }
            Node::TEXT_NODE => {
                let text = node.text_content().unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    fragments.push(Fragment::Text(text.to_string()));
                }
            }
            _ => {}
        }
    }

    fragments
}

/// Join fragments with spaces, then append each answer option as a quoted line
pub fn assemble_question(fragments: &[Fragment], options: &[String]) -> String {
    let mut text = String::new();

    for fragment in fragments {
        match fragment {
            Fragment::WrongGap(answer) => {
                text.push('"');
                text.push_str(answer);
                text.push_str("\" ");
            }
            Fragment::Text(t) => {
                text.push_str(t);
                text.push(' ');
            }
        }
    }

    for option in options {
        text.push_str("<br>\"");
        text.push_str(option);
        text.push_str("\" ");
    }

    text.trim().to_string()
}

/// Approximate rendered `innerText` for a detached document
pub fn normalize_block_text(raw: &str) -> String {
    raw.lines()
        .map(|line| HORIZONTAL_WS.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a snapshot of the page's HTML into a detached document
pub fn parse_document(html: &str) -> Result<Document, ExporterError> {
    let parser = DomParser::new().map_err(ExporterError::browser)?;
    parser
        .parse_from_string(html, SupportedType::TextHtml)
        .map_err(ExporterError::browser)
}

pub fn extract_from_html<E: QuizExtractor>(extractor: &E, html: &str) -> Result<Vec<ScrapedItem>, ExporterError> {
    let document = parse_document(html)?;
    Ok(extractor.extract(&document))
}

/// Text of `element` laid out the way `innerText` would render it:
/// source whitespace collapses, `<br>` and block boundaries become line breaks,
/// script and style content is dropped.
pub fn rendered_text(element: &Element) -> String {
    let mut out = String::new();
    push_rendered(element, &mut out);
    out
}

fn push_rendered(element: &Element, out: &mut String) {
    let children = element.child_nodes();

    for i in 0..children.length() {
        let Some(node) = children.item(i) else {
            continue;
        };

        match node.node_type() {
            Node::TEXT_NODE => {
                let text = node.text_content().unwrap_or_default();
                out.push_str(&ANY_WS.replace_all(&text, " "));
            }
            Node::ELEMENT_NODE => {
                let Some(child) = node.dyn_ref::<Element>() else {
                    continue;
                };
                let tag = child.tag_name().to_ascii_lowercase();
                if SKIPPED_TAGS.contains(&tag.as_str()) {
                    continue;
                }
                if tag == "br" {
                    out.push('\n');
                    continue;
                }

                let block = BLOCK_TAGS.contains(&tag.as_str());
                if block {
                    out.push('\n');
                }
                push_rendered(child, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn text_of(element: &Element) -> String {
    element.text_content().unwrap_or_default()
}

fn select_all(list: Option<web_sys::NodeList>) -> Vec<Element> {
    let Some(list) = list else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}
