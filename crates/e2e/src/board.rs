//! Board rendering checks: are the pieces mounted, and do they have size?

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::error::E2eResult;
use crate::session::{js_string, BrowserSession};

/// Client-space rectangle of an element, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{x: {}, y: {}, width: {}, height: {}}}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// How a board's pieces rendered.
///
/// The three outcomes point at different application bugs: nothing mounted
/// (layout or script error), mounted but collapsed (sizing/CSS), or fine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoardVerdict {
    Absent,
    ZeroSized,
    VisibleSized { width: f64, height: f64 },
}

impl BoardVerdict {
    pub fn is_visible(&self) -> bool {
        matches!(self, BoardVerdict::VisibleSized { .. })
    }
}

/// Classify a board from its piece count and the first piece's box
pub fn classify(count: usize, first_box: Option<BoundingBox>) -> BoardVerdict {
    if count == 0 {
        return BoardVerdict::Absent;
    }
    match first_box {
        Some(rect) if rect.width > 0.0 => BoardVerdict::VisibleSized {
            width: rect.width,
            height: rect.height,
        },
        _ => BoardVerdict::ZeroSized,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardReport {
    pub label: String,
    pub scope: String,
    pub count: usize,
    pub first_box: Option<BoundingBox>,
    pub verdict: BoardVerdict,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PieceProbe {
    count: usize,
    first_box: Option<BoundingBox>,
}

/// Count `piece` elements under `scope` and measure the first one.
///
/// A piece without client rects (e.g. `display: none`) has no box.
pub async fn assert_board(
    session: &BrowserSession,
    label: &str,
    scope: &str,
    piece: &str,
) -> E2eResult<BoardReport> {
    let selector = format!("{scope} {piece}");
    let script = format!(
        r#"(() => {{
            const pieces = document.querySelectorAll({selector});
            const first = pieces[0];
            if (!first || first.getClientRects().length === 0) {{
                return {{ count: pieces.length, firstBox: null }};
            }}
            const r = first.getBoundingClientRect();
            return {{ count: pieces.length, firstBox: {{ x: r.x, y: r.y, width: r.width, height: r.height }} }};
        }})()"#,
        selector = js_string(&selector)
    );

    let probe: PieceProbe = session.evaluate(&script).await?;
    let verdict = classify(probe.count, probe.first_box);
    debug!(label, selector, count = probe.count, ?verdict, "Board probed");

    Ok(BoardReport {
        label: label.to_string(),
        scope: scope.to_string(),
        count: probe.count,
        first_box: probe.first_box,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn rect(width: f64, height: f64) -> Option<BoundingBox> {
        Some(BoundingBox { x: 10.0, y: 20.0, width, height })
    }

    #[test_case(0, None => BoardVerdict::Absent ; "no pieces")]
    #[test_case(0, rect(40.0, 40.0) => BoardVerdict::Absent ; "count wins over stray box")]
    #[test_case(32, None => BoardVerdict::ZeroSized ; "mounted without box")]
    #[test_case(32, rect(0.0, 40.0) => BoardVerdict::ZeroSized ; "zero width")]
    #[test_case(32, rect(-1.0, 40.0) => BoardVerdict::ZeroSized ; "negative width")]
    #[test_case(32, rect(40.0, 40.0) => BoardVerdict::VisibleSized { width: 40.0, height: 40.0 } ; "sized")]
    fn test_classify(count: usize, first_box: Option<BoundingBox>) -> BoardVerdict {
        classify(count, first_box)
    }

    #[test]
    fn test_probe_deserializes_null_box() {
        let probe: PieceProbe = serde_json::from_str(r#"{"count":3,"firstBox":null}"#).unwrap();
        assert_eq!(probe.count, 3);
        assert!(probe.first_box.is_none());
    }

    #[test]
    fn test_bbox_display() {
        let rect = BoundingBox { x: 1.5, y: 2.0, width: 40.0, height: 40.0 };
        assert_eq!(rect.to_string(), "{x: 1.5, y: 2, width: 40, height: 40}");
    }
}
