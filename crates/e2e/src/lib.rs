//! Bookreader E2E Test Framework
//!
//! Drives a real browser through WebDriver against the bookreader
//! single-page application:
//! - Optionally spawns the static server as a subprocess
//! - Keeps one browser session for the whole run, resetting the page to a
//!   known baseline between cases
//! - Purges the test user's comments from the Fluidinfo data store around
//!   every case that writes to it
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── BrowserSession::launch() -> Bookreader page          │
//! │    ├── per case: purge, reset_baseline, run, purge, reset   │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cases::all()                                               │
//! │    ├── initialisation  (start state of each pane)           │
//! │    ├── session         (login / logout)                     │
//! │    ├── reader          (chapters, navigation, counters)     │
//! │    └── annotate        (comments, links, media previews)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod cases;
pub mod error;
pub mod media;
pub mod page;
pub mod runner;
pub mod server;
pub mod store;
pub mod wait;

pub use cases::{Group, TestCase};
pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, TestRunner, TestSuiteResult};
