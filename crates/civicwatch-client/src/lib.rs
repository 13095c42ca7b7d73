//! # civicwatch-client
//!
//! The application core consumed by a presentation layer: the live
//! [`Dashboard`](dashboard::Dashboard), the
//! [`SubmissionWorkflow`](workflow::SubmissionWorkflow), and the command
//! functions in [`commands`] that drive both through a shared
//! [`AppState`](state::AppState).

pub mod commands;
pub mod config;
pub mod dashboard;
pub mod events;
pub mod state;
pub mod workflow;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::{CoordinatePolicy, CoreConfig};
pub use dashboard::{Dashboard, ViewUpdate};
pub use events::{format_timestamp, IncidentCard, MarkerSpec};
pub use state::{AppState, SharedCollection};
pub use workflow::{Draft, SubmissionState, SubmissionWorkflow};

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// default filter. Calling this more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("civicwatch_client=debug,civicwatch_store=debug,civicwatch_net=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("civicwatch core starting");
    }
}
