//! Extraction panel.
//!
//! The document is turned into a list of titled sections first, and only
//! then into markup, so the HTML panel and terminal output share one
//! interpretation of the provider's answer.

use serde_json::Value;
use tracing::debug;

use markdown::escape_text;
use photolens_core::{humanize_field_name, ExtractionResult};

pub const PLACEHOLDER_HTML: &str = "Structured data will appear here.";
pub const LOADING_HTML: &str = "Extracting data...";
pub const FAILED_HTML: &str = "Failed to extract data. Please try again.";

pub const ADDITIONAL_INFORMATION: &str = "Additional Information";

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    List(Vec<String>),
    Text(String),
    Swatches(Vec<String>),
    /// Label/value pairs for attributes outside the schema.
    Fields(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionView {
    Sections(Vec<Section>),
    /// The provider reported an error inside a successful response.
    Error(String),
    /// Not an object, even after a second parse.
    Raw(String),
}

type SectionFn = fn(&ExtractionResult) -> Option<SectionBody>;

fn list(items: &[String]) -> Option<SectionBody> {
    (!items.is_empty()).then(|| SectionBody::List(items.to_vec()))
}

fn text(value: &str) -> Option<SectionBody> {
    (!value.is_empty()).then(|| SectionBody::Text(value.to_string()))
}

fn objects(doc: &ExtractionResult) -> Option<SectionBody> {
    list(&doc.objects)
}

fn scene_type(doc: &ExtractionResult) -> Option<SectionBody> {
    text(&doc.scene_type)
}

fn text_content(doc: &ExtractionResult) -> Option<SectionBody> {
    text(&doc.text_content)
}

fn colors(doc: &ExtractionResult) -> Option<SectionBody> {
    (!doc.colors.is_empty()).then(|| SectionBody::Swatches(doc.colors.clone()))
}

fn crucial_elements(doc: &ExtractionResult) -> Option<SectionBody> {
    list(&doc.crucial_elements)
}

/// Recognised sections, in display order.
const SECTIONS: [(&str, SectionFn); 5] = [
    ("Objects Detected", objects),
    ("Scene Type", scene_type),
    ("Text Content", text_content),
    ("Colors", colors),
    ("Key Elements", crucial_elements),
];

/// Truthiness of an `error` attribute: present, not null/false/0/"".
fn error_message(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Interpret a received extraction document.
pub fn view_document(value: &Value) -> ExtractionView {
    if let Some(message) = error_message(value) {
        return ExtractionView::Error(message);
    }

    let reparsed;
    let value = match value {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(inner) => {
                debug!("Extraction document was double-encoded");
                reparsed = inner;
                if let Some(message) = error_message(&reparsed) {
                    return ExtractionView::Error(message);
                }
                &reparsed
            }
            Err(_) => return ExtractionView::Raw(raw.clone()),
        },
        other => other,
    };

    let Some(map) = value.as_object() else {
        return ExtractionView::Raw(value.to_string());
    };

    let doc = ExtractionResult::from_object(map);

    let mut sections: Vec<Section> = SECTIONS
        .iter()
        .filter_map(|&(title, build)| build(&doc).map(|body| Section { title, body }))
        .collect();

    if !doc.extra.is_empty() {
        sections.push(Section {
            title: ADDITIONAL_INFORMATION,
            body: SectionBody::Fields(
                doc.extra
                    .iter()
                    .map(|(name, value)| (humanize_field_name(name), value.display()))
                    .collect(),
            ),
        });
    }

    ExtractionView::Sections(sections)
}

impl ExtractionView {
    pub fn to_html(&self) -> String {
        match self {
            Self::Error(message) => format!("<p class=\"error\">{}</p>", escape_text(message)),
            Self::Raw(raw) => format!(
                "<div class=\"json-output\"><pre>{}</pre></div>",
                escape_text(raw)
            ),
            Self::Sections(sections) => {
                let mut html = String::from("<div class=\"json-output\">");
                for section in sections {
                    html.push_str("<div class=\"json-section\"><h4>");
                    html.push_str(&escape_text(section.title));
                    html.push_str("</h4>");
                    write_body(&mut html, &section.body);
                    html.push_str("</div>");
                }
                html.push_str("</div>");
                html
            }
        }
    }
}

fn write_body(html: &mut String, body: &SectionBody) {
    match body {
        SectionBody::List(items) => {
            html.push_str("<ul>");
            for item in items {
                html.push_str(&format!("<li>{}</li>", escape_text(item)));
            }
            html.push_str("</ul>");
        }
        SectionBody::Text(text) => html.push_str(&format!("<p>{}</p>", escape_text(text))),
        SectionBody::Swatches(colors) => {
            html.push_str("<div class=\"color-swatches\">");
            for color in colors {
                let color = escape_text(color);
                html.push_str(&format!(
                    "<span class=\"color-label\" data-color=\"{color}\">{color}</span>"
                ));
            }
            html.push_str("</div>");
        }
        SectionBody::Fields(fields) => {
            for (label, value) in fields {
                html.push_str(&format!(
                    "<div><strong>{}:</strong> {}</div>",
                    escape_text(label),
                    escape_text(value)
                ));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Placeholder,
    Loading,
    View(ExtractionView),
    Failed,
}

#[derive(Debug, Clone)]
pub struct ExtractionPanel {
    content: Content,
    html: String,
}

impl Default for ExtractionPanel {
    fn default() -> Self {
        Self {
            content: Content::Placeholder,
            html: PLACEHOLDER_HTML.to_string(),
        }
    }
}

impl ExtractionPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn begin(&mut self) {
        self.content = Content::Loading;
        self.html = LOADING_HTML.to_string();
    }

    pub fn show_document(&mut self, document: &Value) {
        let view = view_document(document);
        self.html = view.to_html();
        self.content = Content::View(view);
    }

    pub fn fail(&mut self) {
        self.content = Content::Failed;
        self.html = FAILED_HTML.to_string();
    }

    pub fn view(&self) -> Option<&ExtractionView> {
        match &self.content {
            Content::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.content == Content::Loading
    }

    pub fn has_failed(&self) -> bool {
        self.content == Content::Failed
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}
