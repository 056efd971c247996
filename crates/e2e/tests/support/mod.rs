//! Synthetic MoveTrainer app and browser helpers for integration tests
#![allow(dead_code)]

use std::process::Command;
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use movetrainer_e2e::config::BrowserSettings;
use movetrainer_e2e::session::{BrowserSession, ReadyPolicy};
use movetrainer_e2e::HarnessConfig;

fn in_path(bin: &str) -> bool {
    Command::new("sh")
        .arg("-lc")
        .arg(format!("command -v {bin} >/dev/null 2>&1"))
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A Chrome/Chromium the launcher can find
pub fn chrome_available() -> bool {
    std::env::var_os("CHROME").is_some()
        || ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable", "chrome"]
            .iter()
            .any(|bin| in_path(bin))
}

/// Browser settings for tests, with a throwaway profile
pub fn browser_settings(profile: &std::path::Path) -> BrowserSettings {
    BrowserSettings {
        executable: std::env::var_os("CHROME").map(Into::into),
        user_data_dir: Some(profile.to_path_buf()),
        ..Default::default()
    }
}

/// Harness config pointed at `app`, writing artifacts and the profile under `dir`
pub fn harness_config(app: &SyntheticApp, dir: &std::path::Path) -> HarnessConfig {
    let mut config = HarnessConfig {
        base_url: app.url("/"),
        ..Default::default()
    };
    config.browser = browser_settings(&dir.join("profile"));
    config.artifacts.dir = dir.join("artifacts");
    config.settle.suggestions_ms = 1500;
    config
}

pub async fn open_at(app: &SyntheticApp, path: &str, profile: &std::path::Path) -> BrowserSession {
    let session = BrowserSession::open(&browser_settings(profile))
        .await
        .expect("launch browser");
    session
        .navigate(&app.url(path), ReadyPolicy::Load, Duration::from_secs(10))
        .await
        .expect("load fixture page");
    session
}

/// In-process server for the synthetic app and DOM fixtures
pub struct SyntheticApp {
    base_url: String,
    task: JoinHandle<()>,
}

impl SyntheticApp {
    pub async fn serve() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind app port");
        let addr = listener.local_addr().expect("app addr");

        let router = Router::new()
            .route("/", get(|| async { Html(APP_HTML) }))
            .route(
                "/lichess/masters",
                get(|| async {
                    Json(json!({
                        "white": 1000, "draws": 800, "black": 600,
                        "moves": [{ "san": "e4" }, { "san": "d4" }, { "san": "Nf3" }]
                    }))
                }),
            )
            .route("/api/other", get(|| async { Json(json!({ "ok": true })) }))
            .route("/fixtures/:name", get(fixture_page));

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for SyntheticApp {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Accepts connections and never answers
pub struct StalledOrigin {
    pub url: String,
    task: JoinHandle<()>,
}

impl StalledOrigin {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stalled port");
        let addr = listener.local_addr().expect("stalled addr");
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        Self {
            url: format!("http://{}/", addr),
            task,
        }
    }
}

impl Drop for StalledOrigin {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn fixture_page(Path(name): Path<String>) -> impl IntoResponse {
    let pieces = |style: &str| {
        format!(r#"<div id="scope">{}</div>"#, format!(r#"<piece style="{style}"></piece>"#).repeat(4))
    };
    let body = match name.as_str() {
        "empty" => r#"<div id="scope"></div>"#.to_string(),
        "collapsed" => pieces("display:block;width:0;height:40px"),
        "sized" => pieces("display:block;width:40px;height:40px"),
        "suggestions-buttons" => {
            r#"<div id="panel"><button>e4</button><button>d4</button></div>"#.to_string()
        }
        "suggestions-text" => r#"<div id="panel">No games found in the masters database</div>"#.to_string(),
        "network" => r#"<script>
            fetch('/lichess/masters?fen=start').then(() => fetch('/api/other'));
        </script>"#
            .to_string(),
        "storage" => String::new(),
        "hidden-nav" => r#"<nav style="display:none"><button id="nav-hidden">Dashboard</button></nav>
            <button id="shown">Launch</button>"#
            .to_string(),
        _ => return (StatusCode::NOT_FOUND, "no such fixture").into_response(),
    };
    Html(format!("<!doctype html><html><body>{body}</body></html>")).into_response()
}

/// Minimal stand-in for the MoveTrainer UI: same ids, classes, storage key,
/// and a same-origin "lichess" suggestion endpoint
const APP_HTML: &str = r#"<!doctype html>
<html>
<head>
<style>
  .hidden { display: none; }
  .board { display: grid; grid-template-columns: repeat(8, 40px); width: 320px; height: 320px; }
  piece { display: block; width: 40px; height: 40px; background: #999; }
  .course-card { padding: 12px; border: 1px solid #444; cursor: pointer; }
</style>
</head>
<body>
<section id="landing"><button id="btn-landing-start">Launch</button></section>
<nav id="nav" class="hidden">
  <button id="nav-build-repertoire">Build Repertoire</button>
  <button id="nav-dashboard">Dashboard</button>
</nav>
<section id="builder" class="hidden">
  <div id="builder-board" class="board"></div>
  <div id="builder-suggestions"></div>
</section>
<section id="dashboard" class="hidden"><div id="course-list"></div></section>
<section id="course" class="hidden"><button id="btn-learn">Learn</button></section>
<section id="trainer" class="hidden"><div id="board" class="board"></div></section>
<script>
  const KEY = 'chess_courses';
  const show = (id) => {
    for (const s of ['builder', 'dashboard', 'course', 'trainer']) {
      document.getElementById(s).classList.toggle('hidden', s !== id);
    }
  };
  const mount = (id) => {
    const board = document.getElementById(id);
    board.innerHTML = '';
    for (let i = 0; i < 32; i++) board.appendChild(document.createElement('piece'));
  };
  document.getElementById('btn-landing-start').onclick = () => {
    document.getElementById('landing').classList.add('hidden');
    document.getElementById('nav').classList.remove('hidden');
  };
  document.getElementById('nav-build-repertoire').onclick = async () => {
    show('builder');
    mount('builder-board');
    const res = await fetch('/lichess/masters?fen=start&moves=8');
    const data = await res.json();
    document.getElementById('builder-suggestions').innerHTML =
      data.moves.map((m) => `<button class="suggestion">${m.san}</button>`).join('');
  };
  document.getElementById('nav-dashboard').onclick = () => {
    show('dashboard');
    let courses = [];
    try { courses = JSON.parse(localStorage.getItem(KEY) || '[]'); } catch (e) {}
    const list = document.getElementById('course-list');
    list.innerHTML = '';
    for (const c of courses) {
      const card = document.createElement('div');
      card.className = 'course-card';
      card.textContent = c.title;
      card.onclick = () => show('course');
      list.appendChild(card);
    }
  };
  document.getElementById('btn-learn').onclick = () => {
    show('trainer');
    mount('board');
  };
</script>
</body>
</html>
"#;
