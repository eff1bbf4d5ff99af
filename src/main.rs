mod assistant;
mod catalog;
mod clock;
mod config;
mod error;
mod export;
mod lab;
mod monitor;
mod reaction;

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, signal, time::MissedTickBehavior};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use assistant::{Analysis, Assistant, Faq, Reply, Suggestion};
use catalog::Equipment;
use clock::Sample;
use config::Args;
use error::LabError;
use lab::{Lab, Notice};
use monitor::Readings;
use reaction::{Controls, ReactionSnapshot};

#[derive(Clone)]
struct AppState {
    lab: Arc<Mutex<Lab>>,
    assistant: Arc<Assistant>,
}

impl AppState {
    fn lab(&self) -> MutexGuard<'_, Lab> {
        lock_lab(&self.lab)
    }
}

/// Take the lab lock. A holder that panicked may have left the beaker half
/// updated, so a poisoned lab goes back to its initial state.
fn lock_lab(lab: &Mutex<Lab>) -> MutexGuard<'_, Lab> {
    match lab.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("lab state poisoned by a panic, resetting the experiment");
            let mut guard = poisoned.into_inner();
            guard.reset();
            lab.clear_poison();
            guard
        }
    }
}

#[derive(Serialize)]
struct StateResponse {
    snapshot: ReactionSnapshot,
    controls: Controls,
    running: bool,
    interval_ms: u64,
    elapsed_secs: f64,
    readings: Readings,
    suggestions: Vec<Suggestion>,
}

impl StateResponse {
    fn from_lab(lab: &Lab) -> Self {
        let snapshot = lab.snapshot().clone();
        StateResponse {
            readings: Readings::from_snapshot(&snapshot),
            suggestions: assistant::suggestions(Some(&snapshot)),
            controls: lab.controls(),
            running: lab.is_running(),
            interval_ms: lab.interval().as_millis() as u64,
            elapsed_secs: lab.elapsed().as_secs_f64(),
            snapshot,
        }
    }
}

#[derive(Serialize)]
struct NoticeView {
    #[serde(flatten)]
    notice: Notice,
    message: String,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        NoticeView {
            message: notice.to_string(),
            notice,
        }
    }
}

#[derive(Serialize)]
struct ActionResponse {
    notices: Vec<NoticeView>,
    state: StateResponse,
}

fn action(lab: &Lab, notices: Vec<Notice>) -> Json<ActionResponse> {
    for notice in &notices {
        info!("{notice}");
    }
    Json(ActionResponse {
        notices: notices.into_iter().map(NoticeView::from).collect(),
        state: StateResponse::from_lab(lab),
    })
}

#[derive(Deserialize)]
struct ComponentRequest {
    label: String,
}

#[derive(Deserialize)]
struct ControlsRequest {
    concentration: Option<f64>,
    heating_power: Option<f64>,
    stirring_speed: Option<f64>,
}

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
    #[serde(default = "default_true")]
    include_state: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct QuickResponse {
    online: bool,
    greeting: &'static str,
    questions: &'static [Faq],
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Virtual Chemistry Lab</title>
    <style>
      body { margin: 0; padding: 16px; background: #0b0c10; color: #e6e6e6; font-family: "Segoe UI", sans-serif; }
      main { display: grid; grid-template-columns: 260px 1fr 320px; gap: 16px; }
      section { background: #11151b; border: 1px solid #2a2f36; border-radius: 10px; padding: 12px; }
      button { margin: 2px 0; width: 100%; background: #1b2129; color: inherit; border: 1px solid #2a2f36; border-radius: 6px; padding: 6px; cursor: pointer; }
      #beaker { height: 220px; border-radius: 0 0 40px 40px; border: 2px solid #9ca3af; display: flex; align-items: flex-end; }
      #liquid { width: 100%; transition: background 0.4s, height 0.4s; border-radius: 0 0 38px 38px; }
      #notices div, #chatlog div { font-size: 13px; margin: 3px 0; }
      #error { display: none; background: #7f1d1d; padding: 8px; border-radius: 6px; margin-bottom: 8px; }
      label { display: block; font-size: 12px; margin-top: 6px; }
      input[type=range] { width: 100%; }
    </style>
  </head>
  <body>
    <div id="error">Something went wrong. <button onclick="retry()">Retry</button> <button onclick="resetLab()">Start over</button></div>
    <main>
      <section>
        <h3>Lab Equipment</h3>
        <div id="catalog"></div>
        <label>Concentration <span id="concV"></span> M<input id="conc" type="range" min="0.1" max="5" step="0.1" value="1" /></label>
        <label>Heating <span id="heatV"></span> %<input id="heat" type="range" min="0" max="100" step="1" value="0" /></label>
        <label>Stirring <span id="stirV"></span> rpm<input id="stir" type="range" min="0" max="1000" step="10" value="0" /></label>
        <button onclick="post('/api/start')">Start</button>
        <button onclick="post('/api/pause')">Pause</button>
        <button onclick="resetLab()">Reset</button>
        <a href="/api/export.csv"><button>Export CSV</button></a>
      </section>
      <section>
        <div id="beaker"><div id="liquid"></div></div>
        <pre id="state"></pre>
        <div id="notices"></div>
      </section>
      <section>
        <h3>Dr. ChemBot</h3>
        <div id="greeting"></div>
        <div id="chatlog"></div>
        <input id="question" placeholder="Ask about chemistry..." style="width: 100%" />
        <button onclick="ask()">Send</button>
        <div id="suggestions"></div>
      </section>
    </main>
    <script>
      let lastAction = null;
      const $ = (id) => document.getElementById(id);

      function showError(on) { $("error").style.display = on ? "block" : "none"; }

      async function call(url, opts) {
        try {
          const res = await fetch(url, opts);
          const body = await res.json();
          if (!res.ok) throw new Error(body.error || res.status);
          showError(false);
          return body;
        } catch (e) {
          lastAction = () => call(url, opts);
          showError(true);
          return null;
        }
      }

      function retry() { if (lastAction) lastAction().then(render); }

      function post(url, data) {
        return call(url, { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify(data || {}) }).then(render);
      }

      function resetLab() { post("/api/reset"); }

      function render(body) {
        if (!body) return;
        const state = body.state || body;
        const s = state.snapshot;
        $("liquid").style.background = state.readings.color_hex;
        $("liquid").style.height = Math.min(100, s.volume / 5) + "%";
        $("state").textContent =
          `pH ${s.ph.toFixed(2)} (${state.readings.ph_label})\n` +
          `Temperature ${s.temperature.toFixed(1)} °C${s.is_boiling ? " BOILING" : ""}\n` +
          `Volume ${s.volume.toFixed(0)} mL  Concentration ${s.concentration.toFixed(2)} M\n` +
          `Pressure ${s.pressure.toFixed(2)} atm  Progress ${s.reaction_progress.toFixed(1)}%\n` +
          `Reaction ${s.reaction_type}${s.is_bubbling ? "  bubbling" : ""}${s.has_precipitate ? "  precipitate" : ""}\n` +
          `Components: ${s.components.join(", ") || "none"}\n` +
          (state.running ? "Recording" : "Paused");
        $("suggestions").innerHTML = "";
        for (const sug of state.suggestions) {
          const b = document.createElement("button");
          b.textContent = sug.question;
          b.onclick = () => { $("question").value = sug.question; ask(); };
          $("suggestions").appendChild(b);
        }
        for (const n of body.notices || []) {
          const d = document.createElement("div");
          d.textContent = n.message;
          $("notices").prepend(d);
        }
      }

      async function ask() {
        const question = $("question").value.trim();
        if (!question) return;
        $("question").value = "";
        const reply = await call("/api/chat", { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify({ question }) });
        if (!reply) return;
        for (const [who, text] of [["You", question], ["ChemBot", reply.text]]) {
          const d = document.createElement("div");
          d.textContent = `${who}: ${text}`;
          $("chatlog").appendChild(d);
        }
      }

      function sendControls() {
        const data = { concentration: +$("conc").value, heating_power: +$("heat").value, stirring_speed: +$("stir").value };
        $("concV").textContent = data.concentration; $("heatV").textContent = data.heating_power; $("stirV").textContent = data.stirring_speed;
        post("/api/controls", data);
      }

      for (const id of ["conc", "heat", "stir"]) $(id).addEventListener("change", sendControls);

      call("/api/catalog").then((items) => {
        for (const item of items || []) {
          const b = document.createElement("button");
          b.textContent = item.display_name;
          b.style.borderLeft = `6px solid ${item.display_color}`;
          b.onclick = () => post(`/api/equipment/${item.id}`);
          $("catalog").appendChild(b);
        }
      });
      call("/api/chat/quick").then((q) => { if (q) $("greeting").textContent = q.greeting; });
      setInterval(() => call("/api/state").then(render), 500);
    </script>
  </body>
</html>
"##;

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn get_catalog() -> Json<&'static [Equipment]> {
    Json(catalog::catalog())
}

async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse::from_lab(&state.lab()))
}

async fn add_component(
    State(state): State<AppState>,
    Json(req): Json<ComponentRequest>,
) -> Result<Json<ActionResponse>, LabError> {
    let label = req.label.trim();
    if label.is_empty() {
        return Err(LabError::EmptyLabel);
    }
    let mut lab = state.lab();
    let notices = lab.add_component(label);
    Ok(action(&lab, notices))
}

async fn drop_equipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, LabError> {
    let mut lab = state.lab();
    let notices = lab.drop_equipment(&id)?;
    Ok(action(&lab, notices))
}

async fn set_controls(
    State(state): State<AppState>,
    Json(req): Json<ControlsRequest>,
) -> Json<ActionResponse> {
    let mut lab = state.lab();
    let current = lab.controls();
    lab.set_controls(Controls {
        concentration: req.concentration.unwrap_or(current.concentration),
        heating_power: req.heating_power.unwrap_or(current.heating_power),
        stirring_speed: req.stirring_speed.unwrap_or(current.stirring_speed),
    });
    action(&lab, Vec::new())
}

async fn start(State(state): State<AppState>) -> Json<ActionResponse> {
    let mut lab = state.lab();
    let notice = lab.start();
    action(&lab, vec![notice])
}

async fn pause(State(state): State<AppState>) -> Json<ActionResponse> {
    let mut lab = state.lab();
    let notice = lab.pause();
    action(&lab, vec![notice])
}

async fn reset(State(state): State<AppState>) -> Json<ActionResponse> {
    let mut lab = state.lab();
    let notice = lab.reset();
    action(&lab, vec![notice])
}

async fn samples(State(state): State<AppState>) -> Json<Vec<Sample>> {
    Json(state.lab().samples().to_vec())
}

async fn export_csv(State(state): State<AppState>) -> Response {
    let csv = state.lab().export_csv();
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"experiment-data.csv\""),
        ],
        csv,
    )
        .into_response()
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Result<Json<Reply>, LabError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(LabError::EmptyQuestion);
    }
    // Copy the beaker out so the lock is not held across the model call
    let snapshot = if req.include_state {
        Some(state.lab().snapshot().clone())
    } else {
        None
    };
    Ok(Json(state.assistant.answer(question, snapshot.as_ref()).await))
}

async fn quick_questions(State(state): State<AppState>) -> Json<QuickResponse> {
    Json(QuickResponse {
        online: state.assistant.is_configured(),
        greeting: state.assistant.greeting(),
        questions: assistant::quick_questions(),
    })
}

async fn analysis(State(state): State<AppState>) -> Json<Analysis> {
    let snapshot = state.lab().snapshot().clone();
    Json(state.assistant.analyze(&snapshot).await)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    warn!("handler panicked: {detail}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "the lab hit an unexpected error", "retry": true })),
    )
        .into_response()
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/catalog", get(get_catalog))
        .route("/api/state", get(get_state))
        .route("/api/components", post(add_component))
        .route("/api/equipment/:id", post(drop_equipment))
        .route("/api/controls", post(set_controls))
        .route("/api/start", post(start))
        .route("/api/pause", post(pause))
        .route("/api/reset", post(reset))
        .route("/api/samples", get(samples))
        .route("/api/export.csv", get(export_csv))
        .route("/api/chat", post(chat))
        .route("/api/chat/quick", get(quick_questions))
        .route("/api/analysis", get(analysis))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Drive the experiment clock. Shares the lab lock with the HTTP handlers.
async fn run_clock(lab: Arc<Mutex<Lab>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let notices = lock_lab(&lab).tick(&mut rand::thread_rng());
        for notice in notices {
            info!("{notice}");
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let assistant = Assistant::new(args.assistant_config()).context("failed to set up assistant")?;
    let lab = Arc::new(Mutex::new(Lab::new(args.tick())));
    tokio::spawn(run_clock(lab.clone(), args.tick()));

    let app = build_app(AppState {
        lab,
        assistant: Arc::new(assistant),
    });

    let addr = args.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind listener on {addr}"))?;
    info!("serving virtual lab on http://{addr}");

    let server = axum::serve(listener, app.into_make_service());

    tokio::select! {
        result = server => result.context("server exited with error")?,
        _ = signal::ctrl_c() => {
            warn!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
