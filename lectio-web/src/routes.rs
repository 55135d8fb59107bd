//! Route table and handlers.
//!
//! Thin presentation over the application services: handlers resolve the
//! session, call one service operation, and render a minimal page or a
//! redirect. Remote failures become messages on the page; the process
//! never terminates because of one.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{http::StatusCode, Form, Router};
use serde::Deserialize;

use lectio_application::{CallbackDestination, CallbackParams};
use lectio_core::auth::AuthUser;
use lectio_core::error::LectioError;
use lectio_core::verse::{Verse, VerseDraft, VerseId};

use crate::app::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(login_start))
        .route("/logout", post(logout))
        .route("/auth/callback", get(auth_callback))
        .route("/dashboard", get(dashboard))
        .route("/verse/{id}", get(verse_detail).post(verse_save))
        .route("/verse/{id}/delete", post(verse_delete))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn home(State(state): State<Arc<AppState>>) -> Html<String> {
    let body = if state.session.state().is_signed_in() {
        r#"<p><a href="/dashboard">Open your journal</a></p>"#.to_string()
    } else {
        r#"<p><a href="/login">Sign in</a> to start your journal.</p>"#.to_string()
    };
    Html(page("lectio", &body))
}

async fn login_page(State(state): State<Arc<AppState>>) -> Response {
    let session = state.session.state();
    if session.is_signed_in() {
        return Redirect::to("/dashboard").into_response();
    }
    let mut body = String::from(
        r#"<form method="post" action="/login"><button type="submit">Sign in with Google</button></form>"#,
    );
    if let Some(error) = &session.last_error {
        body.push_str(&format!(r#"<p class="error">{}</p>"#, escape(error)));
    }
    Html(page("Sign in", &body)).into_response()
}

async fn login_start(State(state): State<Arc<AppState>>) -> Redirect {
    let url = state.session.sign_in();
    Redirect::to(&url)
}

async fn logout(State(state): State<Arc<AppState>>) -> Redirect {
    if let Err(err) = state.session.sign_out().await {
        // Failure is recorded in session state; the login page shows it
        tracing::warn!("sign-out failed: {err}");
    }
    Redirect::to("/")
}

#[derive(Debug, Deserialize, Default)]
struct CallbackQuery {
    access_token: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    resolved: Option<String>,
}

/// The provider returns tokens in the URL fragment, which never reaches
/// the server. The first visit serves a one-line shim that re-requests
/// this route with the fragment mirrored into the query string; the
/// second visit resolves the callback exactly once.
const CALLBACK_SHIM: &str = r#"<!doctype html>
<html><body><p>Processing authentication...</p>
<script>
var frag = window.location.hash.replace(/^#/, "");
window.location.replace("/auth/callback?resolved=1" + (frag ? "&" + frag : ""));
</script></body></html>"#;

async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let has_params = query.access_token.is_some()
        || query.error_description.is_some()
        || query.error.is_some()
        || query.resolved.is_some();
    if !has_params {
        return Html(CALLBACK_SHIM.to_string()).into_response();
    }

    let params = CallbackParams {
        access_token: query.access_token,
        error_description: query.error_description.or(query.error),
    };
    let outcome = state.session.handle_callback(&params).await;
    Redirect::to(destination_path(outcome.destination)).into_response()
}

#[derive(Debug, Deserialize, Default)]
struct SearchQuery {
    q: Option<String>,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let user = match require_user(&state) {
        Ok(user) => user,
        Err(redirect) => return redirect.into_response(),
    };

    let term = query.q.unwrap_or_default();
    match state.verses.search(&term).await {
        Ok(verses) => Html(page("My verses", &render_dashboard(&user, &term, &verses)))
            .into_response(),
        Err(err) => Html(page("My verses", &render_error(&err))).into_response(),
    }
}

async fn verse_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    if require_user(&state).is_err() {
        return Redirect::to("/login").into_response();
    }

    let verse_id = match parse_verse_id(&id) {
        Ok(verse_id) => verse_id,
        Err(response) => return response,
    };

    match verse_id {
        None => Html(page("New verse", &render_form("new", &VerseDraft::default(), None)))
            .into_response(),
        Some(verse_id) => match state.verses.get(&verse_id).await {
            Ok(verse) => {
                let draft = draft_from_verse(&verse);
                Html(page("Edit verse", &render_form(&id, &draft, None))).into_response()
            }
            Err(err) if err.is_not_found() => {
                Html(page("Not found", "<p>Verse not found.</p>")).into_response()
            }
            Err(err) => Html(page("Edit verse", &render_error(&err))).into_response(),
        },
    }
}

#[derive(Debug, Deserialize, Default)]
struct VerseForm {
    #[serde(default)]
    book: String,
    #[serde(default)]
    chapter: String,
    #[serde(default)]
    verse_number: String,
    #[serde(default)]
    page_number: String,
    #[serde(default)]
    original_text: String,
    #[serde(default)]
    translation: String,
    #[serde(default)]
    reflection: String,
}

impl VerseForm {
    /// Builds a draft from the raw form fields. Numeric fields that do
    /// not parse become zero and fail draft validation with a field
    /// message, instead of failing form extraction opaquely.
    fn into_draft(self, id: Option<VerseId>) -> VerseDraft {
        VerseDraft {
            id,
            book: self.book.trim().to_string(),
            chapter: parse_number(&self.chapter).unwrap_or(0),
            verse_number: parse_number(&self.verse_number).unwrap_or(0),
            page_number: if self.page_number.trim().is_empty() {
                None
            } else {
                Some(parse_number(&self.page_number).unwrap_or(0))
            },
            original_text: self.original_text.trim().to_string(),
            translation: self.translation.trim().to_string(),
            reflection: match self.reflection.trim() {
                "" => None,
                text => Some(text.to_string()),
            },
        }
    }
}

fn parse_number(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

async fn verse_save(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<VerseForm>,
) -> Response {
    if require_user(&state).is_err() {
        return Redirect::to("/login").into_response();
    }

    let verse_id = match parse_verse_id(&id) {
        Ok(verse_id) => verse_id,
        Err(response) => return response,
    };

    let draft = form.into_draft(verse_id);
    match state.verses.save(&draft).await {
        Ok(saved) => Redirect::to(&format!("/verse/{}", saved.id)).into_response(),
        Err(err) if err.is_validation() => {
            Html(page("Edit verse", &render_form(&id, &draft, Some(&err))))
                .into_response()
        }
        Err(err) => Html(page("Edit verse", &render_error(&err))).into_response(),
    }
}

#[derive(Debug, Deserialize, Default)]
struct DeleteForm {
    #[serde(default)]
    confirm: String,
}

async fn verse_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    if require_user(&state).is_err() {
        return Redirect::to("/login").into_response();
    }

    // Deletion is gated behind an explicit confirmation step
    if !delete_confirmed(&form.confirm) {
        return (StatusCode::BAD_REQUEST, "confirmation required").into_response();
    }

    let verse_id = match parse_verse_id(&id) {
        Ok(Some(verse_id)) => verse_id,
        Ok(None) => return (StatusCode::BAD_REQUEST, "cannot delete an unsaved verse")
            .into_response(),
        Err(response) => return response,
    };

    match state.verses.delete(&verse_id).await {
        Ok(()) => Redirect::to("/dashboard").into_response(),
        Err(err) => Html(page("Delete verse", &render_error(&err))).into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves the signed-in user or the redirect to the sign-in page.
fn require_user(state: &AppState) -> Result<AuthUser, Redirect> {
    state
        .session
        .state()
        .user
        .ok_or_else(|| Redirect::to("/login"))
}

fn destination_path(destination: CallbackDestination) -> &'static str {
    match destination {
        CallbackDestination::Dashboard => "/dashboard",
        CallbackDestination::Login => "/login",
    }
}

/// `new` is the synthetic identifier for an unsaved record.
fn parse_verse_id(raw: &str) -> Result<Option<VerseId>, Response> {
    if raw == "new" {
        return Ok(None);
    }
    raw.parse::<uuid::Uuid>()
        .map(|id| Some(VerseId(id)))
        .map_err(|_| (StatusCode::NOT_FOUND, "no such verse").into_response())
}

fn delete_confirmed(confirm: &str) -> bool {
    confirm == "yes"
}

fn draft_from_verse(verse: &Verse) -> VerseDraft {
    VerseDraft {
        id: Some(verse.id),
        book: verse.book.clone(),
        chapter: verse.chapter,
        verse_number: verse.verse_number,
        page_number: verse.page_number,
        original_text: verse.original_text.clone(),
        translation: verse.translation.clone(),
        reflection: verse.reflection.clone(),
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><title>{}</title></head><body>\n{}\n</body></html>",
        escape(title),
        body
    )
}

fn render_error(err: &LectioError) -> String {
    format!(r#"<p class="error">{}</p>"#, escape(&err.to_string()))
}

fn render_dashboard(user: &AuthUser, term: &str, verses: &[Verse]) -> String {
    let mut body = String::new();
    if let Some(email) = &user.email {
        body.push_str(&format!("<p>Hello {}</p>\n", escape(email)));
    }
    body.push_str(&format!(
        r#"<form method="get" action="/dashboard"><input type="text" name="q" value="{}"><button>Search</button></form>"#,
        escape(term)
    ));
    body.push_str(r#"<p><a href="/verse/new">Add verse</a></p>"#);

    if verses.is_empty() {
        body.push_str("<p>No verses saved.</p>");
        return body;
    }

    body.push_str("<ul>\n");
    for verse in verses {
        body.push_str(&format!(
            r#"<li><a href="/verse/{id}">{reference}</a> - {text}
<form method="post" action="/verse/{id}/delete"><label><input type="checkbox" name="confirm" value="yes"> confirm</label><button>Delete</button></form></li>
"#,
            id = verse.id,
            reference = escape(&verse.reference()),
            text = escape(&verse.original_text),
        ));
    }
    body.push_str("</ul>");
    body
}

fn render_form(id: &str, draft: &VerseDraft, error: Option<&LectioError>) -> String {
    let mut body = format!(
        r#"<form method="post" action="/verse/{id}">
<label>Book <input name="book" value="{book}" required></label>
<label>Chapter <input name="chapter" type="number" min="1" value="{chapter}" required></label>
<label>Verse number <input name="verse_number" type="number" min="1" value="{verse_number}" required></label>
<label>Page number <input name="page_number" type="number" min="1" value="{page_number}"></label>
<label>Original text <textarea name="original_text" required>{original_text}</textarea></label>
<label>Translation <textarea name="translation">{translation}</textarea></label>
<label>Reflection <textarea name="reflection">{reflection}</textarea></label>
<button type="submit">Save</button>
</form>
<p><a href="/dashboard">Back</a></p>"#,
        id = escape(id),
        book = escape(&draft.book),
        chapter = if draft.chapter == 0 { String::new() } else { draft.chapter.to_string() },
        verse_number = if draft.verse_number == 0 { String::new() } else { draft.verse_number.to_string() },
        page_number = draft.page_number.map(|p| p.to_string()).unwrap_or_default(),
        original_text = escape(&draft.original_text),
        translation = escape(&draft.translation),
        reflection = escape(draft.reflection.as_deref().unwrap_or_default()),
    );
    if let Some(err) = error {
        body.push_str(&render_error(err));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verse_id_new_is_unsaved() {
        assert!(parse_verse_id("new").unwrap().is_none());
    }

    #[test]
    fn test_parse_verse_id_uuid() {
        let id = "6f2a7a6e-0a3e-4a8e-bb1f-0ef3a1c1a111";
        let parsed = parse_verse_id(id).unwrap().unwrap();
        assert_eq!(parsed.to_string(), id);
    }

    #[test]
    fn test_parse_verse_id_garbage_is_rejected() {
        assert!(parse_verse_id("not-a-uuid").is_err());
    }

    #[test]
    fn test_destination_paths() {
        assert_eq!(destination_path(CallbackDestination::Dashboard), "/dashboard");
        assert_eq!(destination_path(CallbackDestination::Login), "/login");
    }

    #[test]
    fn test_delete_requires_explicit_confirmation() {
        assert!(delete_confirmed("yes"));
        assert!(!delete_confirmed(""));
        assert!(!delete_confirmed("no"));
        assert!(!delete_confirmed("YES"));
    }

    #[test]
    fn test_form_into_draft_parses_numbers() {
        let form = VerseForm {
            book: " John ".to_string(),
            chapter: "3".to_string(),
            verse_number: "16".to_string(),
            page_number: "".to_string(),
            original_text: "text".to_string(),
            translation: "".to_string(),
            reflection: "  ".to_string(),
        };

        let draft = form.into_draft(None);
        assert_eq!(draft.book, "John");
        assert_eq!(draft.chapter, 3);
        assert_eq!(draft.verse_number, 16);
        assert_eq!(draft.page_number, None);
        assert_eq!(draft.reflection, None);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_form_with_bad_number_fails_validation_not_extraction() {
        let form = VerseForm {
            book: "John".to_string(),
            chapter: "three".to_string(),
            verse_number: "16".to_string(),
            original_text: "text".to_string(),
            ..Default::default()
        };

        let draft = form.into_draft(None);
        assert_eq!(draft.chapter, 0);
        assert!(draft.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_escape_neutralizes_markup() {
        assert_eq!(escape(r#"<b>"&"</b>"#), "&lt;b&gt;&quot;&amp;&quot;&lt;/b&gt;");
    }
}
