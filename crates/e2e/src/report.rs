//! Human-readable diagnostics and screenshot artifacts

use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::board::{BoardReport, BoardVerdict};
use crate::error::E2eResult;
use crate::fixture::FixtureOutcome;
use crate::network::ResponseRecord;
use crate::session::BrowserSession;
use crate::suggestions::SuggestionReport;

/// First `max` characters of `s`, never splitting a character
pub fn clip(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Pixel size and digest of a written screenshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub sha256: String,
}

impl ArtifactInfo {
    pub fn inspect(path: &Path) -> E2eResult<Self> {
        let (width, height) = image::image_dimensions(path)?;
        let data = std::fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&data);
        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            sha256: hex::encode(hasher.finalize()),
        })
    }

    pub fn short_digest(&self) -> &str {
        clip(&self.sha256, 12)
    }
}

/// Writes one labelled block per phase to `out`
pub struct Reporter<W: Write = Stdout> {
    out: W,
    artifact_dir: PathBuf,
}

impl Reporter<Stdout> {
    pub fn stdout(artifact_dir: impl Into<PathBuf>) -> Self {
        Self::new(io::stdout(), artifact_dir)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("Failed to write diagnostics: {}", e);
        }
    }

    pub fn section(&mut self, title: &str) {
        self.emit(&format!("\n=== {} ===", title));
    }

    pub fn line(&mut self, text: &str) {
        self.emit(text);
    }

    pub fn board(&mut self, report: &BoardReport) {
        self.emit(&format!("{} pieces: {}", report.label, report.count));
        match (&report.first_box, report.count) {
            (_, 0) => {}
            (Some(rect), _) => self.emit(&format!("  First piece bbox: {}", rect)),
            (None, _) => self.emit("  First piece bbox: None"),
        }
    }

    /// Pass/fail marker for the trainer board, the board prone to collapsing
    pub fn trainer_verdict(&mut self, report: &BoardReport) {
        match report.verdict {
            BoardVerdict::VisibleSized { .. } => {
                self.emit("  ✅ MoveTrainer pieces are VISIBLE and properly sized!")
            }
            BoardVerdict::ZeroSized => self.emit("  ❌ MoveTrainer pieces have zero size or no bbox"),
            BoardVerdict::Absent => self.emit("  ❌ MoveTrainer pieces are not mounted"),
        }
    }

    pub fn suggestions(&mut self, report: &SuggestionReport) {
        if !report.present {
            self.emit("  Suggestion panel not found");
        }
        self.emit(&format!("  Suggestion text: {}", report.display_text()));
        self.emit(&format!("  Has suggestion buttons: {}", report.has_buttons));
    }

    pub fn fixture(&mut self, outcome: &FixtureOutcome) {
        match outcome {
            FixtureOutcome::Seeded => self.emit("Seeded test course"),
            FixtureOutcome::AlreadyPresent { courses } => {
                self.emit(&format!("Stored courses kept: {}", courses))
            }
            FixtureOutcome::Skipped { reason } => {
                self.emit(&format!("Course fixture not seeded: {}", reason))
            }
        }
    }

    pub fn courses(&mut self, count: usize) {
        self.emit(&format!("Courses: {}", count));
    }

    pub fn responses(&mut self, records: &[ResponseRecord], dropped: usize) {
        if records.is_empty() {
            self.emit("  (no responses observed)");
        }
        for record in records {
            self.emit(&format!("  {}", record));
        }
        if dropped > 0 {
            self.emit(&format!("  ... {} more not recorded", dropped));
        }
    }

    /// Capture a full-page screenshot into the artifact directory.
    /// Failures are reported and swallowed.
    pub async fn screenshot(&mut self, session: &BrowserSession, file_name: &str) -> Option<ArtifactInfo> {
        let path = self.artifact_dir.join(file_name);
        let written = match std::fs::create_dir_all(&self.artifact_dir) {
            Ok(()) => session.save_screenshot(&path).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            warn!(path = %path.display(), "Screenshot failed: {}", e);
            self.emit(&format!("  Screenshot {} failed: {}", file_name, e));
            return None;
        }

        match ArtifactInfo::inspect(&path) {
            Ok(info) => {
                info!(path = %path.display(), sha256 = %info.sha256, "Screenshot written");
                self.emit(&format!(
                    "  Screenshot: {} ({}x{}, sha256 {})",
                    path.display(),
                    info.width,
                    info.height,
                    info.short_digest()
                ));
                Some(info)
            }
            Err(e) => {
                warn!(path = %path.display(), "Screenshot unreadable: {}", e);
                self.emit(&format!("  Screenshot: {} (unreadable: {})", path.display(), e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoundingBox;

    fn render(f: impl FnOnce(&mut Reporter<Vec<u8>>)) -> String {
        let mut reporter = Reporter::new(Vec::new(), ".");
        f(&mut reporter);
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn trainer(count: usize, first_box: Option<BoundingBox>) -> BoardReport {
        BoardReport {
            label: "Training".into(),
            scope: "#board".into(),
            count,
            first_box,
            verdict: crate::board::classify(count, first_box),
        }
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("abcdef", 3), "abc");
        assert_eq!(clip("ab", 3), "ab");
        assert_eq!(clip("♔♕♖♗", 2), "♔♕");
    }

    #[test]
    fn test_trainer_markers() {
        let sized = Some(BoundingBox { x: 0.0, y: 0.0, width: 40.0, height: 40.0 });
        let out = render(|r| {
            let report = trainer(32, sized);
            r.board(&report);
            r.trainer_verdict(&report);
        });
        assert!(out.contains("Training pieces: 32"));
        assert!(out.contains("First piece bbox: {x: 0, y: 0, width: 40, height: 40}"));
        assert!(out.contains("✅"));

        let out = render(|r| r.trainer_verdict(&trainer(32, None)));
        assert!(out.contains("❌ MoveTrainer pieces have zero size"));

        let out = render(|r| r.trainer_verdict(&trainer(0, None)));
        assert!(out.contains("not mounted"));
    }

    #[test]
    fn test_responses_block() {
        let records = vec![ResponseRecord {
            status: 200,
            url: "https://explorer.lichess.ovh/masters?fen=x".into(),
        }];
        let out = render(|r| {
            r.section("Suggestion Service Responses");
            r.responses(&records, 2);
        });
        assert!(out.starts_with("\n=== Suggestion Service Responses ===\n"));
        assert!(out.contains("  200 https://explorer.lichess.ovh/masters?fen=x\n"));
        assert!(out.contains("2 more not recorded"));

        let out = render(|r| r.responses(&[], 0));
        assert!(out.contains("no responses observed"));
    }

    #[test]
    fn test_artifact_info_reads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        image::RgbaImage::new(4, 3).save(&path).unwrap();

        let info = ArtifactInfo::inspect(&path).unwrap();
        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!(info.sha256.len(), 64);
        assert_eq!(info.short_digest().len(), 12);
    }
}
