//! Course fixture seeding through the application's localStorage

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::E2eResult;
use crate::session::{js_string, BrowserSession};

/// Repertoire side of a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseColor {
    White,
    Black,
}

/// Side that plays a single move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveColor {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureMove {
    pub san: String,
    pub from: String,
    pub to: String,
    pub color: MoveColor,
}

impl FixtureMove {
    pub fn new(san: &str, from: &str, to: &str, color: MoveColor) -> Self {
        Self {
            san: san.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            color,
        }
    }
}

/// A course record in the shape the application's loader reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseFixture {
    pub id: String,
    pub title: String,
    pub color: CourseColor,
    pub lines: Vec<Vec<FixtureMove>>,
    #[serde(default)]
    pub srs: Map<String, Value>,
}

impl CourseFixture {
    /// One white Italian line: 1.e4 e5 2.Nf3 Nc6
    pub fn test_italian() -> Self {
        Self {
            id: "test-1".to_string(),
            title: "Test Italian".to_string(),
            color: CourseColor::White,
            lines: vec![vec![
                FixtureMove::new("e4", "e2", "e4", MoveColor::White),
                FixtureMove::new("e5", "e7", "e5", MoveColor::Black),
                FixtureMove::new("Nf3", "g1", "f3", MoveColor::White),
                FixtureMove::new("Nc6", "b8", "c6", MoveColor::Black),
            ]],
            srs: Map::new(),
        }
    }
}

impl Default for CourseFixture {
    fn default() -> Self {
        Self::test_italian()
    }
}

/// Script that seeds `[fixture]` under `key` unless a non-empty collection is
/// already stored, and evaluates to the number of courses it found.
///
/// Read, check, and write run in one evaluation. Missing, unparseable, or
/// non-array values count as an empty collection and are replaced.
pub fn seed_script(key: &str, fixture: &CourseFixture) -> E2eResult<String> {
    let collection = serde_json::to_string(&[fixture])?;
    Ok(format!(
        r#"(() => {{
            const key = {key};
            let existing = 0;
            try {{
                const stored = JSON.parse(localStorage.getItem(key) || 'null');
                if (Array.isArray(stored)) existing = stored.length;
            }} catch (e) {{}}
            if (existing === 0) localStorage.setItem(key, {collection});
            return existing;
        }})()"#,
        key = js_string(key),
        collection = js_string(&collection)
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureOutcome {
    Seeded,
    AlreadyPresent { courses: usize },
    /// The seeding script failed; the run continues without a fixture
    Skipped { reason: String },
}

impl FixtureOutcome {
    /// Outcome for the course count the seeding script found
    pub fn from_existing(courses: usize) -> Self {
        match courses {
            0 => FixtureOutcome::Seeded,
            courses => FixtureOutcome::AlreadyPresent { courses },
        }
    }
}

/// Seed `fixture` under `key` unless a course collection already exists
pub async fn ensure_fixture(
    session: &BrowserSession,
    key: &str,
    fixture: &CourseFixture,
) -> E2eResult<FixtureOutcome> {
    let script = seed_script(key, fixture)?;
    let outcome = match session.evaluate::<usize>(&script).await {
        Ok(existing) => FixtureOutcome::from_existing(existing),
        Err(e) => {
            warn!(key, "Seeding course fixture failed: {}", e);
            return Ok(FixtureOutcome::Skipped {
                reason: e.to_string(),
            });
        }
    };

    match &outcome {
        FixtureOutcome::AlreadyPresent { courses } => {
            info!(key, courses, "Courses already stored, fixture not injected")
        }
        _ => info!(key, id = %fixture.id, "Seeded course fixture"),
    }
    Ok(outcome)
}
