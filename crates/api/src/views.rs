//! Server-rendered HTML pages: home, deposit form, deposit confirmation and
//! the record landing page.
//!
//! Pages are small enough to build with `format!`. Every interpolated value
//! goes through [`escape`].

use mysite_core::deposit::{FormErrors, FIELD_CONTRIBUTOR_NAME, FIELD_FORM, FIELD_TITLE};
use mysite_core::records::RecordView;
use serde_json::Value;

const SITE_NAME: &str = "My site";

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | {SITE_NAME}</title>
</head>
<body>
<header><a href="/">{SITE_NAME}</a> | <a href="/deposit/create">Create record</a></header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn home_page() -> String {
    layout(
        "Home",
        &format!(
            "<h1>Welcome to {SITE_NAME}</h1>\n\
             <p><a href=\"/deposit/create\">Deposit a new record</a></p>"
        ),
    )
}

/// Form values echoed back when the form is re-rendered.
#[derive(Debug, Clone, Default)]
pub struct DepositValues<'a> {
    pub title: &'a str,
    pub contributor_name: &'a str,
}

pub fn deposit_form_page(values: &DepositValues<'_>, errors: &FormErrors) -> String {
    let field_error = |field: &str| {
        errors
            .get(field)
            .map(|msg| format!("<span class=\"error\">{}</span>", escape(msg)))
            .unwrap_or_default()
    };
    let form_error = errors
        .get(FIELD_FORM)
        .map(|msg| format!("<p class=\"error\">{}</p>\n", escape(msg)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Create record</h1>
{form_error}<form method="post" action="/deposit/create">
<p><label for="{FIELD_TITLE}">Title</label>
<input id="{FIELD_TITLE}" name="{FIELD_TITLE}" type="text" value="{title}"> {title_error}</p>
<p><label for="{FIELD_CONTRIBUTOR_NAME}">Contributor name</label>
<input id="{FIELD_CONTRIBUTOR_NAME}" name="{FIELD_CONTRIBUTOR_NAME}" type="text" value="{name}"> {name_error}</p>
<p><button type="submit">Create</button></p>
</form>"#,
        title = escape(values.title),
        name = escape(values.contributor_name),
        title_error = field_error(FIELD_TITLE),
        name_error = field_error(FIELD_CONTRIBUTOR_NAME),
    );
    layout("Create record", &body)
}

pub fn deposit_success_page() -> String {
    layout(
        "Record created",
        "<h1>Success!</h1>\n<p>Your record has been created.</p>",
    )
}

/// Landing page of a single record.
pub fn record_page(record: &RecordView) -> String {
    let title = record
        .metadata
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Untitled");

    let contributors: String = record
        .metadata
        .get("contributors")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .map(|name| format!("<li>{}</li>", escape(name)))
                .collect()
        })
        .unwrap_or_default();

    let body = format!(
        r#"<h1>{title}</h1>
<ul class="contributors">{contributors}</ul>
<dl>
<dt>Identifier</dt><dd>{id}</dd>
<dt>Created</dt><dd>{created}</dd>
<dt>Revision</dt><dd>{revision}</dd>
</dl>
<p><a href="{api}">JSON</a></p>"#,
        title = escape(title),
        id = escape(&record.id),
        created = record.created.format("%Y-%m-%d %H:%M UTC"),
        revision = record.revision,
        api = escape(&record.links.self_link),
    );
    layout(title, &body)
}
