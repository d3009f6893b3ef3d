#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Datelike;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::auth::{AdminCredential, SessionStore};
use crate::cache::CachedStore;
use crate::chart::{self, ChartOptions};
use crate::config::Settings;
use crate::crud::{self, Submission};
use crate::dashboard::Dashboard;
use crate::error::{KpiError, Result};
use crate::gap::GapPlan;
use crate::kpi::{GroupKind, KpiRow};
use crate::records::{JournalTier, PublicationKey, YearFilter};
use crate::report;
use crate::store::ResearchStore;

const SESSION_COOKIE: &str = "kpi_session";

type SharedStore = CachedStore<Box<dyn ResearchStore>>;

pub struct AppState {
    store: Mutex<SharedStore>,
    settings: Settings,
    credential: AdminCredential,
    sessions: SessionStore,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(
        store: Box<dyn ResearchStore>,
        settings: Settings,
        credential: AdminCredential,
    ) -> Result<Self> {
        let mut templates = Handlebars::new();
        for (name, source) in [
            ("dashboard", include_str!("./static/dashboard.hbs")),
            ("manage", include_str!("./static/manage.hbs")),
            ("error", include_str!("./static/error.hbs")),
        ] {
            templates
                .register_template_string(name, source)
                .map_err(|e| KpiError::Config(format!("template `{}`: {}", name, e)))?;
        }

        if !credential.is_configured() {
            log::warn!("No admin password hash configured; submit and delete are unavailable");
        }

        Ok(AppState {
            store: Mutex::new(CachedStore::new(store, settings.store.cache_ttl())),
            sessions: SessionStore::new(settings.auth.session_ttl()),
            settings,
            credential,
            templates,
        })
    }

    /// Run `f` with the store locked; never held across an await
    fn with_store<T>(&self, f: impl FnOnce(&mut SharedStore) -> Result<T>) -> Result<T> {
        let mut store = match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut store)
    }

    fn dashboard(&self, year: YearFilter) -> Result<Dashboard> {
        let snapshot = self.with_store(|store| store.snapshot())?;
        Ok(Dashboard::build(
            &snapshot.staff,
            &snapshot.publications,
            year,
            &self.settings.kpi,
        ))
    }

    fn render(&self, template: &str, data: &Value) -> Result<Html<String>> {
        self.templates
            .render(template, data)
            .map(Html)
            .map_err(|e| KpiError::Config(format!("render `{}`: {}", template, e)))
    }

    /// Full-page error, shown instead of the requested page
    fn error_page(&self, err: &KpiError) -> Response {
        log::error!("page failed: {}", err);
        let data = json!({ "kind": err.kind(), "message": err.to_string() });
        match self.render("error", &data) {
            Ok(html) => (err.status_code(), html).into_response(),
            Err(_) => (err.status_code(), err.to_string()).into_response(),
        }
    }
}

/// Per-request view of who is asking and for which year
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub admin: bool,
    pub session: Option<String>,
    pub year: YearFilter,
}

impl RequestContext {
    fn new(state: &AppState, jar: &CookieJar, year: Option<&str>) -> Self {
        let session = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
        let admin = session
            .as_deref()
            .is_some_and(|id| state.sessions.validate(id));
        RequestContext {
            admin,
            session,
            year: YearFilter::parse(year),
        }
    }

    fn require_admin(&self) -> Result<()> {
        if self.admin {
            Ok(())
        } else {
            Err(KpiError::Unauthorized)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ViewQuery {
    year: Option<String>,
    notice: Option<String>,
    error: Option<String>,
    kind: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    password: String,
}

#[derive(Deserialize)]
struct SubmitForm {
    title: String,
    year: String,
    journal_tier: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    external_author: Option<String>,
}

#[derive(Deserialize)]
struct DeleteForm {
    entry: String,
}

#[derive(Serialize)]
struct GapResponse<'a> {
    row: &'a KpiRow,
    plan: GapPlan,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.settings.server.static_dir.clone();

    Router::new()
        .route("/", get(dashboard_page))
        .route("/health", get(health))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/manage", get(manage_page))
        .route("/manage/submit", post(manage_submit))
        .route("/manage/delete", post(manage_delete))
        .route("/api/dashboard", get(api_dashboard))
        .route("/api/kpi/:kind", get(api_kpi))
        .route("/api/gap/:kind/:name", get(api_gap))
        .route("/api/mismatches", get(api_mismatches))
        .route("/api/entries", get(api_entries))
        .route("/api/research", post(api_submit).delete(api_delete))
        .route("/chart/:kind", get(chart_svg))
        .route("/export/kpi.csv", get(export_csv))
        .route("/export/kpi.xlsx", get(export_xlsx))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

pub async fn run(state: AppState) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bind = state.settings.server.bind.clone();
    let app = build_router(Arc::new(state));

    let listener = TcpListener::bind(&bind).await?;
    log::info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn fmt2(value: f64) -> String {
    format!("{:.2}", value)
}

fn gap_text(row: &KpiRow) -> String {
    match crate::gap::plan_for(row) {
        GapPlan::Achieved { .. } => "Goal achieved".to_string(),
        GapPlan::Needed { gap, papers, .. } => {
            let counts: Vec<String> = papers
                .iter()
                .map(|p| format!("{} {}", p.papers, p.label))
                .collect();
            format!("Needs {:.2} more: {}", gap, counts.join(" or "))
        }
    }
}

fn kpi_view(rows: &[KpiRow]) -> Vec<Value> {
    let mut sorted: Vec<&KpiRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.kpi.total_cmp(&a.kpi).then_with(|| a.group.cmp(&b.group)));
    sorted
        .into_iter()
        .map(|r| {
            json!({
                "group": r.group,
                "faculty": r.faculty.clone().unwrap_or_default(),
                "headcount": r.headcount,
                "target": r.target,
                "publications": r.publications,
                "total_score": fmt2(r.total_score),
                "kpi": fmt2(r.kpi),
                "at_max": r.kpi >= crate::kpi::KPI_MAX,
                "gap": gap_text(r),
            })
        })
        .collect()
}

fn year_options(years: &[i32], selected: YearFilter) -> Vec<Value> {
    let mut options = vec![json!({
        "value": "All",
        "label": "All years",
        "selected": selected == YearFilter::All,
    })];
    for y in years {
        options.push(json!({
            "value": y.to_string(),
            "label": y.to_string(),
            "selected": selected == YearFilter::Year(*y),
        }));
    }
    options
}

async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    let ctx = RequestContext::new(&state, &jar, query.year.as_deref());
    let dashboard = match state.dashboard(ctx.year) {
        Ok(d) => d,
        Err(e) => return state.error_page(&e),
    };

    let data = json!({
        "admin": ctx.admin,
        "login_enabled": state.credential.is_configured(),
        "notice": query.notice,
        "error": query.error,
        "year_query": ctx.year.as_query(),
        "years": year_options(&dashboard.years, ctx.year),
        "summary": {
            "publications": dashboard.summary.publications,
            "total_score": fmt2(dashboard.summary.total_score),
            "staff": dashboard.summary.staff,
            "average": fmt2(dashboard.summary.average_per_staff),
        },
        "programs": kpi_view(&dashboard.programs),
        "faculties": kpi_view(&dashboard.faculties),
        "authors": dashboard.authors.iter().take(20).map(|a| json!({
            "name": a.name,
            "program": a.program,
            "publications": a.publications,
            "total_score": fmt2(a.total_score),
        })).collect::<Vec<_>>(),
        "mismatches": dashboard.mismatches.iter().map(|p| json!({
            "author": p.author_name,
            "title": p.title,
            "year": p.year,
        })).collect::<Vec<_>>(),
        "unmatched_authors": dashboard.unmatched_authors,
    });

    match state.render("dashboard", &data) {
        Ok(html) => html.into_response(),
        Err(e) => state.error_page(&e),
    }
}

async fn manage_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    let ctx = RequestContext::new(&state, &jar, None);
    if ctx.require_admin().is_err() {
        return redirect_with("/", "error", "Admin login required");
    }

    let snapshot = match state.with_store(|store| store.snapshot()) {
        Ok(s) => s,
        Err(e) => return state.error_page(&e),
    };
    let authors: BTreeSet<&str> = snapshot.staff.iter().map(|s| s.name.as_str()).collect();
    let entries: Vec<String> = crud::entries(&snapshot.publications)
        .iter()
        .map(PublicationKey::label)
        .collect();

    let data = json!({
        "notice": query.notice,
        "error": query.error,
        "default_year": chrono::Local::now().year() + 543,
        "tiers": JournalTier::ALL.iter().map(|t| json!({
            "label": t.label(),
            "score": fmt2(t.score()),
        })).collect::<Vec<_>>(),
        "authors": authors,
        "entries": entries,
    });

    match state.render("manage", &data) {
        Ok(html) => html.into_response(),
        Err(e) => state.error_page(&e),
    }
}

fn redirect_with(path: &str, key: &str, message: &str) -> Response {
    Redirect::to(&format!("{}?{}={}", path, key, urlencoding::encode(message))).into_response()
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state.credential.verify(&form.password) {
        log::warn!("Rejected admin login");
        return redirect_with("/", "error", "Invalid password");
    }

    let session_id = state.sessions.create();
    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    log::info!("Admin logged in");
    (jar.add(cookie), Redirect::to("/manage")).into_response()
}

async fn handle_logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/")).into_response()
}

async fn manage_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SubmitForm>,
) -> Response {
    let ctx = RequestContext::new(&state, &jar, None);
    if ctx.require_admin().is_err() {
        return redirect_with("/", "error", "Admin login required");
    }

    let year = match form.year.trim().parse::<i32>() {
        Ok(y) => y,
        Err(_) => return redirect_with("/manage", "error", "Year must be a number"),
    };
    let submission = Submission {
        title: form.title,
        year,
        journal_tier: form.journal_tier,
        authors: form.authors,
        external_author: form.external_author,
    };

    let policy = state.settings.kpi.duplicate_titles;
    match state.with_store(|store| crud::submit(store, submission, policy)) {
        Ok(receipt) => redirect_with(
            "/manage",
            "notice",
            &format!(
                "Saved `{}` for {} author(s)",
                receipt.title, receipt.rows_appended
            ),
        ),
        Err(e @ KpiError::Connectivity(_)) | Err(e @ KpiError::SchemaMismatch { .. }) => {
            state.error_page(&e)
        }
        Err(e) => redirect_with("/manage", "error", &e.to_string()),
    }
}

async fn manage_delete(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<DeleteForm>,
) -> Response {
    let ctx = RequestContext::new(&state, &jar, None);
    if ctx.require_admin().is_err() {
        return redirect_with("/", "error", "Admin login required");
    }

    let Some(key) = PublicationKey::from_label(&form.entry) else {
        return redirect_with("/manage", "error", "Select an entry to delete");
    };
    match state.with_store(|store| crud::delete(store, &key)) {
        Ok(removed) => redirect_with(
            "/manage",
            "notice",
            &format!("Deleted `{}` ({} rows)", key.title, removed),
        ),
        Err(e @ KpiError::Connectivity(_)) | Err(e @ KpiError::SchemaMismatch { .. }) => {
            state.error_page(&e)
        }
        Err(e) => redirect_with("/manage", "error", &e.to_string()),
    }
}

fn parse_kind(kind: &str) -> Result<GroupKind> {
    GroupKind::parse(kind).ok_or_else(|| KpiError::NotFound(format!("KPI table `{}`", kind)))
}

async fn api_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Dashboard>> {
    let year = YearFilter::parse(query.year.as_deref());
    Ok(Json(state.dashboard(year)?))
}

async fn api_kpi(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<KpiRow>>> {
    let kind = parse_kind(&kind)?;
    let dashboard = state.dashboard(YearFilter::parse(query.year.as_deref()))?;
    Ok(Json(dashboard.rows(kind).to_vec()))
}

async fn api_gap(
    State(state): State<Arc<AppState>>,
    Path((kind, name)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let kind = parse_kind(&kind)?;
    let dashboard = state.dashboard(YearFilter::parse(query.year.as_deref()))?;
    let (row, plan) = dashboard
        .gap(kind, &name)
        .ok_or_else(|| KpiError::NotFound(format!("{} `{}`", kind, name)))?;
    Ok(Json(GapResponse { row, plan }).into_response())
}

async fn api_mismatches(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let dashboard = state.dashboard(YearFilter::All)?;
    Ok(Json(json!({
        "count": dashboard.mismatches.len(),
        "unmatched_authors": dashboard.unmatched_authors,
        "mismatches": dashboard.mismatches,
    })))
}

async fn api_entries(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Vec<Value>>> {
    RequestContext::new(&state, &jar, None).require_admin()?;
    let publications = state.with_store(|store| store.publications())?;
    let entries = crud::entries(&publications)
        .into_iter()
        .map(|key| json!({ "label": key.label(), "key": key }))
        .collect();
    Ok(Json(entries))
}

async fn api_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(submission): Json<Submission>,
) -> Result<Response> {
    RequestContext::new(&state, &jar, None).require_admin()?;
    let policy = state.settings.kpi.duplicate_titles;
    let receipt = state.with_store(|store| crud::submit(store, submission, policy))?;
    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

async fn api_delete(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(key): Json<PublicationKey>,
) -> Result<Json<Value>> {
    RequestContext::new(&state, &jar, None).require_admin()?;
    let removed = state.with_store(|store| crud::delete(store, &key))?;
    Ok(Json(json!({ "status": "ok", "removed": removed })))
}

async fn chart_svg(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let year = YearFilter::parse(query.year.as_deref());
    let dashboard = state.dashboard(year)?;
    let suffix = match year {
        YearFilter::All => "all years".to_string(),
        YearFilter::Year(y) => y.to_string(),
    };

    let svg = if kind == "trend" {
        let options = ChartOptions {
            title: "Research output trend".to_string(),
            x_label: "Year (B.E.)".to_string(),
            y_label: "Total score".to_string(),
            ..ChartOptions::default()
        };
        chart::trend_chart(&dashboard.trend, &options)?
    } else {
        let kind = parse_kind(&kind)?;
        let options = ChartOptions {
            title: format!("KPI by {} ({})", kind, suffix),
            x_label: kind.to_string(),
            y_label: "KPI (0-5)".to_string(),
            ..ChartOptions::default()
        };
        chart::kpi_chart(dashboard.rows(kind), &options)?
    };

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let kind = parse_kind(query.kind.as_deref().unwrap_or("programs"))?;
    let dashboard = state.dashboard(YearFilter::parse(query.year.as_deref()))?;
    let csv = report::to_csv(dashboard.rows(kind));
    let disposition = format!("attachment; filename=\"kpi-{}.csv\"", kind.plural());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let dashboard = state.dashboard(YearFilter::parse(query.year.as_deref()))?;
    let buffer = report::to_xlsx(&dashboard)?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"kpi.xlsx\""),
        ],
        buffer,
    )
        .into_response())
}
