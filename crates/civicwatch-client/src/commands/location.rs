use serde::Serialize;
use tracing::debug;

use civicwatch_shared::{CivicError, LocationError, ResolvedLocation, Suggestion};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsDto {
    pub items: Vec<Suggestion>,
    /// A newer query (or a submission) overtook this one; `items` were not applied.
    pub stale: bool,
    /// Set when the lookup failed; the form stays usable.
    pub failure: Option<String>,
}

/// Record the typed location text and look up matching places.
///
/// The workflow lock is released while the lookup is in flight, so a
/// faster later query can land first; the slower one is then discarded.
pub async fn query_suggestions(state: &AppState, text: &str) -> SuggestionsDto {
    let request = {
        let mut workflow = state.workflow.lock().await;
        workflow.set_location_label(text);
        workflow.begin_suggestions()
    };

    let batch = state.resolver.suggest(text).await;
    let failure = batch.failure.as_ref().map(ToString::to_string);
    let items = batch.items.clone();

    let applied = state.workflow.lock().await.apply_suggestions(request, batch);
    if !applied {
        debug!(query = %text, "Suggestion results superseded");
    }
    SuggestionsDto {
        items,
        stale: !applied,
        failure,
    }
}

/// Adopt suggestion `index` of the current batch as the draft location.
pub async fn choose_suggestion(state: &AppState, index: usize) -> Result<ResolvedLocation, CivicError> {
    state
        .workflow
        .lock()
        .await
        .choose_suggestion(index)
        .ok_or_else(|| LocationError::LookupFailed(format!("no suggestion at position {index}")).into())
}

/// Locate the device and put the result into the draft.
///
/// `Ok(None)` means the draft moved on while the lookup was running.
pub async fn use_my_location(state: &AppState) -> Result<Option<ResolvedLocation>, CivicError> {
    let request = state.workflow.lock().await.begin_locate();

    let resolved = state.resolver.resolve_current_position().await?;

    let applied = state
        .workflow
        .lock()
        .await
        .apply_location(request, resolved.clone());
    Ok(applied.then_some(resolved))
}
