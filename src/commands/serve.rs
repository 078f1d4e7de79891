use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::controllers::paste::PasteService;
use crate::error::AppError;
use crate::health::HealthPinger;
use crate::models::PasteRecord;
use crate::storage::AnyStorage;
use crate::types::api::{CreatePaste, CreatedPaste, Health, PasteSummary};
use crate::App;

/// The page with the paste submission form.
const INDEX_PAGE: &str = include_str!("../../assets/index.html");

/// How many pastes the top and recent listings return.
pub const LIST_LIMIT: usize = 10;

type Pastes = PasteService<AnyStorage>;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from((app.config.bind, app.config.port));
    let server = axum::Server::try_bind(&addr).with_context(|| format!("failed to bind {addr}"))?;

    let pinger = match &app.config.health {
        Some(health) => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?;
            let period = Duration::from_secs(health.interval_secs.max(1));
            Some(HealthPinger::spawn(client, health.ping_url.clone(), period))
        }
        None => None,
    };

    let mut pastes = app.pastes.clone();

    info!("listening on {addr}");
    server
        .serve(router(app).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pinger) = pinger {
        pinger.stop().await;
    }
    pastes.close().await?;
    info!("shut down");

    Ok(())
}

pub fn router(app: App) -> Router {
    let max_upload_size = app.config.limits.max_upload_size;

    Router::new()
        .route("/", get(index))
        .route("/ping", get(ping))
        .route("/paste/:id", get(view_paste))
        .route("/api/paste", post(create_paste))
        .route("/api/paste/:id", get(get_paste))
        .route("/api/top", get(top_pastes))
        .route("/api/recent", get(recent_pastes))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {error}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn ping() -> Json<Health> {
    Json(Health { status: "alive" })
}

async fn create_paste(
    State(mut pastes): State<Pastes>,
    Form(form): Form<CreatePaste>,
) -> crate::AppResult<impl IntoResponse> {
    let new = form.into_new_paste().ok_or(AppError::MissingContent)?;
    let id = pastes.create_paste(new).await?;

    let url = format!("/paste/{id}");
    Ok(([(header::LOCATION, url.clone())], Json(CreatedPaste { url })))
}

async fn view_paste(
    State(mut pastes): State<Pastes>,
    Path(id): Path<String>,
) -> crate::AppResult<Html<String>> {
    let paste = pastes.get_live_paste(&id).await?;
    Ok(Html(render_paste(&paste)))
}

async fn get_paste(
    State(mut pastes): State<Pastes>,
    Path(id): Path<String>,
) -> crate::AppResult<Json<PasteRecord>> {
    Ok(Json(pastes.get_live_paste(&id).await?))
}

async fn top_pastes(State(mut pastes): State<Pastes>) -> crate::AppResult<Json<Vec<PasteSummary>>> {
    let top = pastes.list_top(LIST_LIMIT).await?;
    Ok(Json(top.into_iter().map(PasteSummary::from).collect()))
}

async fn recent_pastes(
    State(mut pastes): State<Pastes>,
) -> crate::AppResult<Json<Vec<PasteSummary>>> {
    let recent = pastes.list_recent(LIST_LIMIT).await?;
    Ok(Json(recent.into_iter().map(PasteSummary::from).collect()))
}

fn render_paste(paste: &PasteRecord) -> String {
    let title = escape_html(&paste.title);
    let syntax = escape_html(&paste.syntax);
    let content = escape_html(&paste.content);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <pre><code class=\"language-{syntax}\">{content}</code></pre>\n\
         <p><a href=\"/\">new paste</a></p>\n\
         </body>\n\
         </html>\n"
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
