//! MoveTrainer board-check harness
//!
//! Drives a headless Chromium over the DevTools Protocol through the chess
//! app's two boards and checks that they render:
//! - navigates landing → repertoire builder → dashboard → course → trainer
//! - seeds a course into localStorage when the app has none
//! - classifies each board's pieces as absent, zero-sized, or visible
//! - checks that the opening-suggestion panel fills in, and records the
//!   suggestion service's HTTP responses
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HarnessRunner                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserSession (open → phases → close, on every path)       │
//! │    ├── NetworkObserver   responses whose URL ∋ "lichess"     │
//! │    ├── NavigationFlow    7 phases, fixed or polled settles   │
//! │    ├── ensure_fixture    chess_courses seeded if empty       │
//! │    ├── assert_board      Absent | ZeroSized | VisibleSized   │
//! │    └── assert_suggestions  text + button marker              │
//! │  Reporter  stdout blocks + two full-page screenshots         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod board;
pub mod config;
pub mod error;
pub mod fixture;
pub mod flow;
pub mod network;
pub mod report;
pub mod runner;
pub mod server;
pub mod session;
pub mod suggestions;

pub use board::{BoardReport, BoardVerdict};
pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{HarnessRunner, RunSummary};
pub use session::BrowserSession;
