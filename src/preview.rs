//! Read-only HTML preview of a template
//!
//! The preview is a visual simulation only: it performs no validation and no
//! persistence. Theme defaults are applied here, at render time.

use crate::model::{Field, FieldType, Template, DEFAULT_THEME_COLOR, DEFAULT_THEME_FONT};

const INPUT_CLASS: &str = "form-input";
const LABEL_CLASS: &str = "form-label";
const SELECT_PLACEHOLDER: &str = "Select an option";

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders the whole preview: heading, fields, submit button and usage
/// footer, inside a container styled from the template theme.
pub fn render_preview(template: &Template) -> String {
    let theme = template.effective_theme();
    let color = css_value(&theme.color).unwrap_or(DEFAULT_THEME_COLOR);
    let font = css_value(&theme.font).unwrap_or(DEFAULT_THEME_FONT);
    let declared_color = template
        .theme
        .as_ref()
        .and_then(|t| t.color.as_deref())
        .and_then(css_value);

    let mut html = format!(
        r#"<div class="preview {width}" style="--primary-color: {color}; font-family: {font};">"#,
        width = theme.layout.width_class(),
        color = escape_html(color),
        font = escape_html(font),
    );

    // Heading only takes the colour the template itself declares
    match declared_color {
        Some(color) => html.push_str(&format!(
            r#"<h2 style="color: {};">{}</h2>"#,
            escape_html(color),
            escape_html(&template.name)
        )),
        None => html.push_str(&format!("<h2>{}</h2>", escape_html(&template.name))),
    }

    if let Some(description) = template.description.as_deref().filter(|d| !d.is_empty()) {
        html.push_str(&format!("<p>{}</p>", escape_html(description)));
    }

    html.push_str("<form>");
    for field in &template.fields {
        html.push_str(&render_field(field));
    }
    html.push_str(&format!(
        r#"<button type="button" style="background-color: {};">Submit</button>"#,
        escape_html(color)
    ));
    html.push_str("</form>");

    html.push_str(&format!(
        r#"<footer>Used {} times</footer></div>"#,
        template.usage_count
    ));
    html
}

/// Theme values end up inside `style` attributes. Only characters found in
/// colour literals and font names pass; anything else is dropped for the
/// default.
fn css_value(value: &str) -> Option<&str> {
    let allowed = |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '#' | ' ' | '-' | '_' | ',' | '.' | '\'')
    };
    let value = value.trim();
    (!value.is_empty() && value.chars().all(allowed)).then_some(value)
}

/// Renders one field block.
///
/// `file` and unrecognised types render nothing. This keeps previews of
/// templates written by newer clients working.
pub fn render_field(field: &Field) -> String {
    let label = label_html(field);
    let required = if field.required { " required" } else { "" };
    let placeholder = field
        .placeholder
        .as_deref()
        .map(|p| format!(r#" placeholder="{}""#, escape_html(p)))
        .unwrap_or_default();

    let control = match field.field_type {
        FieldType::Text | FieldType::Number | FieldType::Email => format!(
            r#"<input type="{kind}" class="{INPUT_CLASS}"{placeholder}{required}>"#,
            kind = field.field_type.as_str(),
        ),
        FieldType::Date => format!(r#"<input type="date" class="{INPUT_CLASS}"{required}>"#),
        FieldType::Textarea => {
            format!(r#"<textarea class="{INPUT_CLASS}"{placeholder}{required}></textarea>"#)
        }
        FieldType::Select => render_select(field, required),
        FieldType::Checkbox => {
            return format!(
                r#"<div class="field"><input type="checkbox" id="preview-{id}"{required}><label for="preview-{id}">{label}</label></div>"#,
                id = escape_html(&field.id),
            );
        }
        FieldType::File | FieldType::Unknown => return String::new(),
    };

    format!(r#"<div class="field"><label class="{LABEL_CLASS}">{label}</label>{control}</div>"#)
}

fn label_html(field: &Field) -> String {
    let mut label = escape_html(&field.label);
    if field.required {
        label.push_str(r#" <span class="required">*</span>"#);
    }
    label
}

/// Placeholder first as a disabled, hidden, pre-selected option, then the
/// declared options in order. Duplicates are rendered as they are.
fn render_select(field: &Field, required: &str) -> String {
    let placeholder = field.placeholder.as_deref().unwrap_or(SELECT_PLACEHOLDER);

    let mut html = format!(
        r#"<select class="{INPUT_CLASS}"{required}><option value="" disabled selected hidden>{}</option>"#,
        escape_html(placeholder)
    );
    for option in field.options.iter().flatten() {
        let option = escape_html(option);
        html.push_str(&format!(r#"<option value="{option}">{option}</option>"#));
    }
    html.push_str("</select>");
    html
}
