//! Orchestrates one harness run: session, observer, phases, assertions, report

use std::io::Write;

use tracing::{error, info};

use crate::board::{assert_board, BoardReport};
use crate::config::HarnessConfig;
use crate::error::E2eResult;
use crate::fixture::{ensure_fixture, FixtureOutcome};
use crate::flow::{NavigationFlow, OptionalClick};
use crate::network::{NetworkObserver, ResponseRecord, UrlFilter};
use crate::report::{ArtifactInfo, Reporter};
use crate::session::BrowserSession;
use crate::suggestions::{assert_suggestions, SuggestionReport};

/// Everything a run observed
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub builder: BoardReport,
    pub suggestions: SuggestionReport,
    pub fixture: FixtureOutcome,
    /// Course cards seen on the dashboard
    pub courses_seen: usize,
    pub learn_clicked: bool,
    /// Measured on every completed run; `Absent` when no course could be opened
    pub trainer: BoardReport,
    pub responses: Vec<ResponseRecord>,
    pub dropped_responses: usize,
    pub screenshots: Vec<ArtifactInfo>,
}

impl RunSummary {
    /// The trainer board rendered sized pieces
    pub fn trainer_visible(&self) -> bool {
        self.trainer.verdict.is_visible()
    }

    /// At least one suggestion-service response came back 200
    pub fn suggestions_reached(&self) -> bool {
        self.responses.iter().any(|r| r.status == 200)
    }
}

/// Main harness runner
pub struct HarnessRunner {
    config: HarnessConfig,
}

impl HarnessRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Open a browser, run every phase, and close the browser whatever happened
    pub async fn run<W: Write>(&self, reporter: &mut Reporter<W>) -> E2eResult<RunSummary> {
        self.config.validate()?;

        let session = BrowserSession::open(&self.config.browser).await?;
        let outcome = self.drive(&session, reporter).await;
        session.close().await;

        match &outcome {
            Ok(summary) => info!(
                trainer_visible = summary.trainer_visible(),
                responses = summary.responses.len(),
                "Run finished"
            ),
            Err(e) => error!("Run aborted: {}", e),
        }
        outcome
    }

    async fn drive<W: Write>(&self, session: &BrowserSession, reporter: &mut Reporter<W>) -> E2eResult<RunSummary> {
        let config = &self.config;
        let selectors = &config.selectors;
        let flow = NavigationFlow::new(config);
        let observer = NetworkObserver::attach(
            session,
            UrlFilter::contains(config.network.suggestion_host.as_str()),
            config.network.max_records,
        )
        .await?;
        let mut screenshots = Vec::new();

        reporter.section("Loading app");
        flow.load(session).await?;
        flow.enter_app(session).await?;

        reporter.section("Builder Board");
        flow.open_builder(session).await?;
        let builder = assert_board(session, "Builder", &selectors.builder_board, &selectors.piece).await?;
        reporter.board(&builder);

        reporter.section("Opening Suggestions");
        flow.settle_suggestions(session).await?;
        let suggestions = assert_suggestions(session, &selectors.suggestions).await?;
        reporter.suggestions(&suggestions);
        screenshots.extend(
            reporter
                .screenshot(session, &config.artifacts.builder_screenshot)
                .await,
        );

        reporter.section("MoveTrainer Board");
        let fixture = ensure_fixture(session, &config.fixture.storage_key, &config.fixture.course).await?;
        reporter.fixture(&fixture);

        flow.open_dashboard(session).await?;
        let course = flow.open_first_course(session).await?;
        reporter.courses(course.candidates());

        // Learn lives on the course view. The trainer board is measured
        // regardless and reports Absent when nothing mounted.
        let learn = if course.clicked() {
            flow.start_learning(session).await?
        } else {
            OptionalClick::Skipped
        };
        flow.absorb_transition(session).await?;

        let trainer = assert_board(session, "Training", &selectors.trainer_board, &selectors.piece).await?;
        reporter.board(&trainer);
        if trainer.count > 0 {
            reporter.trainer_verdict(&trainer);
        }
        screenshots.extend(
            reporter
                .screenshot(session, &config.artifacts.trainer_screenshot)
                .await,
        );

        reporter.section(&format!("Suggestion Service Responses ({})", config.network.suggestion_host));
        let responses = observer.drain();
        let dropped_responses = observer.dropped();
        reporter.responses(&responses, dropped_responses);

        Ok(RunSummary {
            builder,
            suggestions,
            fixture,
            courses_seen: course.candidates(),
            learn_clicked: learn.clicked(),
            trainer,
            responses,
            dropped_responses,
            screenshots,
        })
    }
}
