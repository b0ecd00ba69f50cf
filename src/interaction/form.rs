//! Interactive form: one text box in, one line of text out.

use std::sync::Arc;

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
};
use minijinja::{Environment, context};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, instrument};

use crate::base::types::Res;

use super::analysis::Analyzer;

const FORM_TEMPLATE_NAME: &str = "form.html";

const FORM_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>AI Log Analyzer – Smart Edition</title>
</head>
<body>
<main>
    <h1>AI Log Analyzer – Smart Edition</h1>
    <p>Detects log problems using Regex + AI.</p>
    <form method="post" action="/ui">
        <textarea name="text" rows="12" cols="100" placeholder="Paste log text here">{{ text }}</textarea>
        <br>
        <button type="submit">Analyze</button>
    </form>
    {% if result %}
    <h2>Result</h2>
    <p id="result">{{ result }}</p>
    {% endif %}
</main>
</body>
</html>
"#;

#[derive(Debug, Deserialize)]
pub struct FormInput {
    #[serde(default)]
    pub text: String,
}

#[derive(Clone)]
struct FormState {
    analyzer: Analyzer,
    templates: Arc<Environment<'static>>,
}

impl FormState {
    fn render(&self, text: &str, result: Option<&str>) -> Result<Html<String>, (StatusCode, String)> {
        self.templates
            .get_template(FORM_TEMPLATE_NAME)
            .and_then(|t| t.render(context! { text => text, result => result }))
            .map(Html)
            .map_err(|e| {
                error!("Failed to render form: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render form.".to_string())
            })
    }
}

/// Build the interactive form router.
pub fn router(analyzer: Analyzer) -> Res<Router> {
    let mut templates = Environment::new();
    templates.add_template(FORM_TEMPLATE_NAME, FORM_TEMPLATE)?;

    let state = FormState {
        analyzer,
        templates: Arc::new(templates),
    };

    Ok(Router::new()
        .route("/", get(form_page))
        .route("/ui", get(form_page).post(form_submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn form_page(State(state): State<FormState>) -> Result<Html<String>, (StatusCode, String)> {
    state.render("", None)
}

#[instrument(skip_all)]
async fn form_submit(State(state): State<FormState>, Form(input): Form<FormInput>) -> Result<Html<String>, (StatusCode, String)> {
    let result = state.analyzer.describe(&input.text).await;

    state.render(&input.text, Some(&result))
}
