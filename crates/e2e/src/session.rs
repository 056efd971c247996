//! Browser session: one headless Chromium and one page, driven over CDP

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::error::{E2eError, E2eResult};

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyPolicy {
    /// The load event fired
    Load,
    /// The load event fired and the page reported `networkIdle`
    NetworkIdle,
}

/// Exclusively owned browser + page for one harness run.
///
/// Call [`BrowserSession::close`] on every exit path; dropping an unclosed
/// session only stops the CDP handler task.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<usize>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

impl BrowserSession {
    /// Launch the browser and open a page sized to the configured viewport
    pub async fn open(settings: &BrowserSettings) -> E2eResult<Self> {
        let viewport = settings.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(viewport.width, viewport.height)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(dir) = &settings.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder.build().map_err(E2eError::BrowserLaunch)?;

        info!(
            width = viewport.width,
            height = viewport.height,
            headless = settings.headless,
            "Launching browser"
        );

        let (mut browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| E2eError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(drain_cdp_events(handler));

        let page = match Self::prepare_page(&browser, viewport.width, viewport.height).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(e);
            }
        };

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    async fn prepare_page(browser: &Browser, width: u32, height: u32) -> E2eResult<Page> {
        let page = browser.new_page("about:blank").await?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(width),
            i64::from(height),
            1.0,
            false,
        ))
        .await?;
        page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
        Ok(page)
    }

    /// The underlying CDP page, for event subscriptions
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Load `url` and wait for `policy`, failing with `NavigationTimeout`
    /// when readiness takes longer than `timeout`
    pub async fn navigate(&self, url: &str, policy: ReadyPolicy, timeout: Duration) -> E2eResult<()> {
        let main_frame = self.page.mainframe().await?;
        let mut lifecycle = self.page.event_listener::<EventLifecycleEvent>().await?;

        let navigation = async {
            self.page.goto(url).await.map_err(|e| E2eError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            if policy == ReadyPolicy::NetworkIdle {
                let mut started = false;
                while let Some(event) = lifecycle.next().await {
                    if main_frame.as_ref().is_some_and(|id| *id != event.frame_id) {
                        continue;
                    }
                    match event.name.as_str() {
                        "init" => started = true,
                        "networkIdle" if started => break,
                        _ => {}
                    }
                }
            }
            Ok::<(), E2eError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => {
                result?;
                debug!(url, ?policy, "Navigation ready");
                Ok(())
            }
            Err(_) => Err(E2eError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Click the first element matching `selector`
    pub async fn click(&self, selector: &str) -> E2eResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| E2eError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        debug!(selector, "Clicked");
        Ok(())
    }

    /// Click the innermost visible element whose text contains `text`
    /// (case-insensitive). Returns the number of candidates; 0 means nothing
    /// was clicked.
    pub async fn click_text(&self, text: &str) -> E2eResult<usize> {
        let script = format!(
            r#"(() => {{
                const needle = {needle}.toLowerCase();
                const holds = (el) => (el.innerText || '').toLowerCase().includes(needle);
                const matches = Array.from(document.querySelectorAll('body *')).filter((el) =>
                    el.getClientRects().length > 0 && holds(el) &&
                    !Array.from(el.children).some(holds));
                if (matches.length === 0) return 0;
                matches[0].scrollIntoView({{ block: 'center' }});
                matches[0].click();
                return matches.length;
            }})()"#,
            needle = js_string(text)
        );
        let matched: usize = self.evaluate(&script).await?;
        debug!(text, matched, "Clicked by text");
        Ok(matched)
    }

    /// Number of elements matching `selector`
    pub async fn count(&self, selector: &str) -> E2eResult<usize> {
        self.evaluate(&format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        ))
        .await
    }

    /// The first element matching `selector` is laid out (has client rects)
    pub async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        self.evaluate(&format!(
            "((el) => !!el && el.getClientRects().length > 0)(document.querySelector({}))",
            js_string(selector)
        ))
        .await
    }

    /// Rendered text of the first match, `None` when nothing matches
    pub async fn inner_text(&self, selector: &str) -> E2eResult<Option<String>> {
        self.evaluate(&format!(
            "(document.querySelector({}) || {{ innerText: null }}).innerText",
            js_string(selector)
        ))
        .await
    }

    /// Serialized markup of the first match, `None` when nothing matches
    pub async fn inner_html(&self, selector: &str) -> E2eResult<Option<String>> {
        self.evaluate(&format!(
            "(document.querySelector({}) || {{ innerHTML: null }}).innerHTML",
            js_string(selector)
        ))
        .await
    }

    pub async fn local_storage_get(&self, key: &str) -> E2eResult<Option<String>> {
        self.evaluate(&format!("localStorage.getItem({})", js_string(key)))
            .await
    }

    pub async fn local_storage_set(&self, key: &str, value: &str) -> E2eResult<()> {
        self.evaluate::<bool>(&format!(
            "(localStorage.setItem({}, {}), true)",
            js_string(key),
            js_string(value)
        ))
        .await?;
        Ok(())
    }

    /// Evaluate a JS expression in the page and deserialize its JSON value.
    ///
    /// The expression must produce a JSON-serializable value; `undefined` is
    /// rejected, `null` maps to `None` for optional targets.
    pub async fn evaluate<T: DeserializeOwned>(&self, expression: &str) -> E2eResult<T> {
        let params = EvaluateParams::builder()
            .expression(format!("JSON.stringify({{ value: ({expression}) }})"))
            .return_by_value(true)
            .build()
            .map_err(E2eError::ScriptEvaluation)?;

        let raw: String = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| E2eError::ScriptEvaluation(e.to_string()))?
            .into_value()
            .map_err(|e| E2eError::ScriptEvaluation(e.to_string()))?;

        let envelope: Envelope<T> = serde_json::from_str(&raw)
            .map_err(|e| E2eError::ScriptEvaluation(format!("{e} in {raw}")))?;
        Ok(envelope.value)
    }

    /// Write a full-page PNG screenshot to `path`
    pub async fn save_screenshot(&self, path: &Path) -> E2eResult<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page.save_screenshot(params, path).await?;
        Ok(())
    }

    /// Shut the browser down and reap its process
    pub async fn close(mut self) {
        info!("Closing browser");
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed, killing process: {}", e);
            if let Some(Err(e)) = self.browser.kill().await {
                warn!("Browser kill failed: {}", e);
            }
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Waiting for browser exit failed: {}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Pump the CDP handler until the connection closes. Messages that fail to
/// decode surface as errors and are skipped. Returns the number skipped.
async fn drain_cdp_events<S, E>(mut events: S) -> usize
where
    S: Stream<Item = Result<(), E>> + Unpin,
    E: fmt::Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            debug!("CDP handler error, continuing: {}", e);
        }
    }
    debug!(errors, "CDP handler event loop ended");
    errors
}

/// Quote `value` as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}
