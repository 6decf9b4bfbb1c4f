use axum::{
    extract::{Form, FromRequest, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::AppState;
use crate::db::Database;
use crate::error::Error;
use crate::models::*;

const LOGIN_COOKIE: &str = "rsk-login";
const PROJECT_COOKIE: &str = "rsk-project";
const FLASH_COOKIE: &str = "rsk-flash";
const FLASH_COLOR_COOKIE: &str = "rsk-flash-color";

// ============================================================
// Cookies & flash
// ============================================================

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn set_cookie(res: &mut Response, name: &str, value: &str) {
    // Semicolons and control characters would break the header
    let value: String = value
        .chars()
        .filter(|c| !c.is_control() && *c != ';')
        .collect();
    if let Ok(header_value) = HeaderValue::try_from(format!("{}={}; Path=/", name, value)) {
        res.headers_mut().append(header::SET_COOKIE, header_value);
    }
}

fn clear_cookie(res: &mut Response, name: &str) {
    if let Ok(header_value) = HeaderValue::try_from(format!("{}=; Path=/; Max-Age=0", name)) {
        res.headers_mut().append(header::SET_COOKIE, header_value);
    }
}

/// Redirect with a one-shot flash message, consumed by the next HTML page.
fn flash(uri: &str, msg: &str, color: &str) -> Response {
    let mut res = Redirect::to(uri).into_response();
    set_cookie(&mut res, FLASH_COOKIE, msg);
    set_cookie(&mut res, FLASH_COLOR_COOKIE, color);
    res
}

// ============================================================
// Error handling
// ============================================================

/// Render a library error for an HTML flow. User errors come back as a
/// dark-red flash; anything else is logged and turned into a generic 503.
fn failure(e: Error) -> Response {
    if let Error::User(msg) = &e {
        return flash("/", msg, "darkred");
    }
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Html(page("error", "<p>We are sorry, something went wrong.</p>", None)),
    )
        .into_response()
}

/// Same split for JSON flows: user errors are a 400 with the message,
/// everything else a sanitized 503.
fn internal_error(e: Error) -> (StatusCode, String) {
    if let Error::User(msg) = &e {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg.clone());
    }
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "Service temporarily unavailable".to_string(),
    )
}

fn require_login(headers: &HeaderMap) -> Result<String, (StatusCode, String)> {
    cookie(headers, LOGIN_COOKIE)
        .ok_or((StatusCode::UNAUTHORIZED, "Not logged in".to_string()))
}

fn require_project(headers: &HeaderMap) -> Result<i64, (StatusCode, String)> {
    cookie(headers, PROJECT_COOKIE)
        .and_then(|v| v.parse().ok())
        .ok_or((StatusCode::BAD_REQUEST, "No project selected".to_string()))
}

/// Body extractor that takes either a urlencoded form or a JSON object,
/// decided by the request's content type.
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = (StatusCode, String);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type.starts_with("application/json") {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            Ok(Self(value))
        }
    }
}

// ============================================================
// HTML pages
// ============================================================

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str, flash: Option<(String, String)>) -> String {
    let flash_html = flash
        .map(|(msg, color)| format!("<p style='color:{}'>{}</p>", color, escape(&msg)))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html><head><meta charset='utf-8'/>\
         <title>rsk: {}</title></head><body>{}{}</body></html>",
        escape(title),
        flash_html,
        body
    )
}

/// The pending flash message and its color, if any.
fn pending_flash(headers: &HeaderMap) -> Option<(String, String)> {
    let msg = cookie(headers, FLASH_COOKIE)?;
    let color = cookie(headers, FLASH_COLOR_COOKIE).unwrap_or_else(|| "darkgreen".to_string());
    Some((msg, color))
}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if cookie(&headers, LOGIN_COOKIE).is_none() {
        return Redirect::to("/hello").into_response();
    }
    let Some(project) = cookie(&headers, PROJECT_COOKIE).and_then(|v| v.parse::<i64>().ok())
    else {
        return Redirect::to("/projects").into_response();
    };
    match state.db.ranked(project, "", 0, 10) {
        Ok(ranked) => {
            let rows: String = ranked
                .iter()
                .map(|r| {
                    format!(
                        "<li><code>R{}</code> {} <span class='{}'>{}</span></li>",
                        r.id,
                        escape(&r.text),
                        r.css_class(),
                        r.rank
                    )
                })
                .collect();
            let body = format!("<ol>{}</ol><p><a href='/add'>Add</a></p>", rows);
            let flash = pending_flash(&headers);
            let had_flash = flash.is_some();
            let mut res = Html(page("/", &body, flash)).into_response();
            if had_flash {
                clear_cookie(&mut res, FLASH_COOKIE);
                clear_cookie(&mut res, FLASH_COLOR_COOKIE);
            }
            res
        }
        Err(e) => failure(e),
    }
}

pub async fn hello(State(state): State<AppState>) -> Html<String> {
    let body = format!(
        "<p>This is rsk, a risk-management record keeper.</p>\
         <p><a href='{}'>Log in with GitHub</a> to start.</p>",
        state.auth.login_uri()
    );
    Html(page("/hello", &body, None))
}

pub async fn add_page(headers: HeaderMap) -> Response {
    if cookie(&headers, LOGIN_COOKIE).is_none() {
        return Redirect::to("/hello").into_response();
    }
    let body = "<form method='post' action='/do-add'>\
         <input name='cause' placeholder='Cause'/>\
         <input name='risk' placeholder='Risk'/>\
         <input name='probability' placeholder='Probability (0-100)'/>\
         <input name='effect' placeholder='Effect'/>\
         <input name='impact' placeholder='Impact'/>\
         <input name='plan' placeholder='Plan'/>\
         <input name='schedule' placeholder='Schedule'/>\
         <button type='submit'>Add</button></form>";
    Html(page("/add", body, None)).into_response()
}

// ============================================================
// Entry form
// ============================================================

/// The `/do-add` form. Existing parts arrive as ids (`cid`/`rid`/`eid`/`pid`),
/// new ones as texts; any combination of chain segments is allowed.
#[derive(Debug, Deserialize)]
pub struct DoAddForm {
    pub cid: Option<i64>,
    pub cause: Option<String>,
    pub rid: Option<i64>,
    pub risk: Option<String>,
    pub probability: Option<i64>,
    pub eid: Option<i64>,
    pub effect: Option<String>,
    pub impact: Option<i64>,
    pub pid: Option<i64>,
    pub plan: Option<String>,
    pub schedule: Option<String>,
}

pub async fn do_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<DoAddForm>,
) -> Response {
    if cookie(&headers, LOGIN_COOKIE).is_none() {
        return Redirect::to("/hello").into_response();
    }
    let Some(project) = cookie(&headers, PROJECT_COOKIE).and_then(|v| v.parse::<i64>().ok())
    else {
        return flash("/", "Pick a project first", "darkred");
    };
    match register_chain(&state.db, project, &form) {
        Ok(()) => flash("/", "Thanks", "darkgreen"),
        Err(e) => failure(e),
    }
}

/// Creates or reuses the submitted parts, records the links between the
/// adjacent ones, materializes the triple when the full chain is present
/// and attaches the plan to the deepest part given.
fn register_chain(db: &Database, project: i64, form: &DoAddForm) -> Result<(), Error> {
    let cid = match (form.cid, &form.cause) {
        (Some(id), _) => Some(id),
        (None, Some(text)) => Some(db.add_cause(project, text)?.id),
        (None, None) => None,
    };
    let rid = match (form.rid, &form.risk) {
        (Some(id), _) => Some(id),
        (None, Some(text)) => Some(db.add_risk(project, text)?.id),
        (None, None) => None,
    };
    let eid = match (form.eid, &form.effect) {
        (Some(id), _) => Some(id),
        (None, Some(text)) => Some(db.add_effect(project, text)?.id),
        (None, None) => None,
    };
    let pid = match (form.pid, &form.plan) {
        (Some(id), _) => Some(id),
        (None, Some(text)) => Some(db.add_plan(project, text)?.id),
        (None, None) => None,
    };

    if let (Some(c), Some(r)) = (cid, rid) {
        db.add_link(project, &chunk('C', c), &chunk('R', r))?;
    }
    if let (Some(r), Some(e)) = (rid, eid) {
        db.add_link(project, &chunk('R', r), &chunk('E', e))?;
    }
    if let (Some(c), Some(r), Some(e)) = (cid, rid, eid) {
        db.add_triple(project, c, r, e)?;
    }

    if let (Some(r), Some(probability)) = (rid, form.probability) {
        db.set_probability(project, r, probability)?;
    }
    if let (Some(e), Some(impact)) = (eid, form.impact) {
        db.set_impact(project, e, impact)?;
    }

    if let Some(p) = pid {
        let part = if let Some(e) = eid {
            chunk('E', e)
        } else if let Some(r) = rid {
            chunk('R', r)
        } else if let Some(c) = cid {
            chunk('C', c)
        } else {
            return Err(Error::user("A plan needs a cause, risk or effect to attach to"));
        };
        db.add_link(project, &part, &chunk('P', p))?;
        db.attach_plan(project, p, &part)?;
        if let Some(schedule) = form.schedule.as_deref().filter(|s| !s.trim().is_empty()) {
            db.set_schedule(project, p, Some(schedule))?;
        }
    }
    Ok(())
}

// ============================================================
// Search / autocomplete
// ============================================================

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

pub async fn ranked(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<RankedRisk>>, (StatusCode, String)> {
    let project = require_project(&headers)?;
    state
        .db
        .ranked(project, &query.q, query.offset, query.limit)
        .map(Json)
        .map_err(internal_error)
}

pub async fn causes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<CauseItem>>, (StatusCode, String)> {
    let project = require_project(&headers)?;
    state
        .db
        .fetch_causes(project, &query.q, query.offset, query.limit)
        .map(Json)
        .map_err(internal_error)
}

pub async fn risks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<RiskItem>>, (StatusCode, String)> {
    let project = require_project(&headers)?;
    state
        .db
        .fetch_risks(project, &query.q, query.offset, query.limit)
        .map(Json)
        .map_err(internal_error)
}

pub async fn effects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<EffectItem>>, (StatusCode, String)> {
    let project = require_project(&headers)?;
    state
        .db
        .fetch_effects(project, &query.q, query.offset, query.limit)
        .map(Json)
        .map_err(internal_error)
}

pub async fn plans(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<PlanItem>>, (StatusCode, String)> {
    let project = require_project(&headers)?;
    state
        .db
        .fetch_plans(project, &query.q, query.offset, query.limit)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Tasks
// ============================================================

pub async fn tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let login = require_login(&headers)?;
    // Due plans become tasks before the list is read
    state.db.promote_plans(&login).map_err(internal_error)?;
    state
        .db
        .fetch_tasks(&login, &query.q, query.offset, query.limit)
        .map(Json)
        .map_err(internal_error)
}

#[derive(Debug, Deserialize)]
pub struct PostponeQuery {
    /// How far to push the deadline, in seconds. Defaults to a day.
    pub seconds: Option<i64>,
}

pub async fn postpone_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PostponeQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let login = require_login(&headers)?;
    let seconds = query.seconds.unwrap_or(24 * 60 * 60);
    if state
        .db
        .postpone_task(&login, id, seconds)
        .map_err(internal_error)?
    {
        Ok(Json(json!({ "id": id, "status": "postponed" })))
    } else {
        Err((StatusCode::NOT_FOUND, "Task not found".to_string()))
    }
}

pub async fn done_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let login = require_login(&headers)?;
    if state.db.done_task(&login, id).map_err(internal_error)? {
        Ok(Json(json!({ "id": id, "status": "done" })))
    } else {
        Err((StatusCode::NOT_FOUND, "Task not found".to_string()))
    }
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    let login = require_login(&headers)?;
    state
        .db
        .get_projects(&login)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    FormOrJson(input): FormOrJson<CreateProjectInput>,
) -> Response {
    let Some(login) = cookie(&headers, LOGIN_COOKIE) else {
        return Redirect::to("/hello").into_response();
    };
    match state.db.create_project(&login, &input.title) {
        Ok(project) => {
            let mut res = flash("/", &format!("Project #{} registered", project.id), "darkgreen");
            set_cookie(&mut res, PROJECT_COOKIE, &project.id.to_string());
            res
        }
        Err(e) => failure(e),
    }
}

pub async fn enter_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let Some(login) = cookie(&headers, LOGIN_COOKIE) else {
        return Redirect::to("/hello").into_response();
    };
    match state.db.get_project(id) {
        Ok(Some(project)) if project.login == login => {
            let mut res = flash("/", &format!("You are in '{}' now", project.title), "darkgreen");
            set_cookie(&mut res, PROJECT_COOKIE, &project.id.to_string());
            res
        }
        Ok(_) => (StatusCode::NOT_FOUND, "Project not found".to_string()).into_response(),
        Err(e) => failure(e),
    }
}

// ============================================================
// Session
// ============================================================

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
}

pub async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match state.auth.login(&query.code).await {
        Ok(login) => {
            let mut res = flash("/", "You have been logged in", "darkgreen");
            set_cookie(&mut res, LOGIN_COOKIE, &login);
            res
        }
        Err(e) => failure(e),
    }
}

pub async fn logout() -> Response {
    let mut res = flash("/", "You have been logged out", "darkgreen");
    clear_cookie(&mut res, LOGIN_COOKIE);
    clear_cookie(&mut res, PROJECT_COOKIE);
    res
}

// ============================================================
// Plumbing
// ============================================================

pub async fn robots() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

pub async fn version() -> &'static str {
    crate::VERSION
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(page("not found", "<p>Page not found.</p>", None)),
    )
        .into_response()
}
