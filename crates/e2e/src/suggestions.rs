//! Opening-suggestion panel check

use tracing::{debug, warn};

use crate::error::E2eResult;
use crate::report::clip;
use crate::session::BrowserSession;

/// What the suggestion panel showed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionReport {
    /// The panel element exists
    pub present: bool,
    pub text: String,
    /// The panel offers some interactive control
    pub has_buttons: bool,
}

impl SuggestionReport {
    /// Characters of panel text shown in diagnostics
    pub const DISPLAY_LEN: usize = 200;

    pub fn display_text(&self) -> &str {
        clip(&self.text, Self::DISPLAY_LEN)
    }
}

/// Coarse structural check: the markup mentions a button, in any case
pub fn has_button_marker(html: &str) -> bool {
    html.to_lowercase().contains("button")
}

/// Read the panel's rendered text and markup. A missing panel is reported,
/// not raised.
pub async fn assert_suggestions(session: &BrowserSession, selector: &str) -> E2eResult<SuggestionReport> {
    let html = session.inner_html(selector).await?;
    let Some(html) = html else {
        warn!(selector, "Suggestion panel not found");
        return Ok(SuggestionReport {
            present: false,
            text: String::new(),
            has_buttons: false,
        });
    };
    let text = session.inner_text(selector).await?.unwrap_or_default();
    let has_buttons = has_button_marker(&html);
    debug!(selector, chars = text.len(), has_buttons, "Suggestion panel read");

    Ok(SuggestionReport {
        present: true,
        text,
        has_buttons,
    })
}
