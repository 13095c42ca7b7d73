use serde::Serialize;
use tracing::warn;

use civicwatch_shared::{Category, CategoryFilter, CivicError};
use civicwatch_store::{LiveStatus, Viewport};

use crate::dashboard::ViewUpdate;
use crate::events::{IncidentCard, MarkerSpec};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDto {
    pub revision: u64,
    /// Category code, or `None` for every category.
    pub category: Option<Category>,
    pub search: String,
    pub shown: usize,
    pub total: usize,
    pub status: LiveStatus,
    pub viewport: Viewport,
    pub cards: Vec<IncidentCard>,
    pub markers: Vec<MarkerSpec>,
}

impl From<&ViewUpdate> for ViewDto {
    fn from(update: &ViewUpdate) -> Self {
        let category = match update.query.category {
            CategoryFilter::All => None,
            CategoryFilter::Only(c) => Some(c),
        };
        Self {
            revision: update.revision,
            category,
            search: update.query.search.clone(),
            shown: update.shown(),
            total: update.total(),
            status: update.status.clone(),
            viewport: update.viewport.clone(),
            cards: update.cards(),
            markers: update.markers(),
        }
    }
}

/// Open the live incident channel.
pub async fn start_live(state: &AppState) -> Result<ViewDto, CivicError> {
    state.dashboard.start().await?;
    Ok(current_view(state))
}

pub async fn stop_live(state: &AppState) -> ViewDto {
    state.dashboard.stop().await;
    current_view(state)
}

pub fn current_view(state: &AppState) -> ViewDto {
    ViewDto::from(&state.dashboard.current())
}

/// `None`, an empty string or `all` selects every category. An unknown
/// code also falls back to every category.
pub fn set_category_filter(state: &AppState, code: Option<&str>) -> ViewDto {
    let filter = match code.map(str::trim) {
        None | Some("") => CategoryFilter::All,
        Some(c) if c.eq_ignore_ascii_case("all") => CategoryFilter::All,
        Some(c) => match Category::from_code(c) {
            Some(category) => CategoryFilter::Only(category),
            None => {
                warn!(code = c, "Unknown category filter, showing all");
                CategoryFilter::All
            }
        },
    };
    ViewDto::from(&state.dashboard.set_category_filter(filter))
}

pub fn set_search(state: &AppState, term: &str) -> ViewDto {
    ViewDto::from(&state.dashboard.set_search(term))
}

pub fn reset_filters(state: &AppState) -> ViewDto {
    ViewDto::from(&state.dashboard.reset_filters())
}
