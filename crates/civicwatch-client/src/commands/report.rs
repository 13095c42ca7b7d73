use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use civicwatch_shared::{Category, CivicError, Coordinates, Suggestion};

use crate::state::AppState;
use crate::workflow::{SubmissionState, SubmissionWorkflow};

/// Draft fields as typed in the report form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    /// Category code (`fire`, `crime`, ...). Unknown or missing codes leave
    /// the category unset.
    pub category: Option<String>,
    pub description: String,
    pub location_label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDto {
    pub state: SubmissionState,
    pub category: Option<Category>,
    pub description: String,
    pub location_label: String,
    pub coordinates: Option<Coordinates>,
    pub suggestions: Vec<Suggestion>,
    pub error: Option<String>,
    /// Field the last validation failure refers to.
    pub error_field: Option<&'static str>,
}

impl<C> From<&SubmissionWorkflow<C>> for DraftDto
where
    C: civicwatch_net::RemoteCollection,
{
    fn from(workflow: &SubmissionWorkflow<C>) -> Self {
        let draft = workflow.draft();
        let error_field = match workflow.last_error() {
            Some(CivicError::Validation(v)) => Some(v.field()),
            _ => None,
        };
        Self {
            state: workflow.state(),
            category: draft.category,
            description: draft.description.clone(),
            location_label: draft.location_label.clone(),
            coordinates: draft.coordinates,
            suggestions: draft.suggestions.clone(),
            error: workflow.last_error().map(ToString::to_string),
            error_field,
        }
    }
}

fn parse_category(code: Option<&str>) -> Option<Category> {
    let code = code?.trim();
    if code.is_empty() {
        return None;
    }
    let category = Category::from_code(code);
    if category.is_none() {
        warn!(code, "Unknown category code in report");
    }
    category
}

/// Copy the form fields into the draft and submit it.
pub async fn submit_report(state: &AppState, input: ReportInput) -> Result<SubmitReceipt, CivicError> {
    let mut workflow = state.workflow.lock().await;
    workflow.set_category(parse_category(input.category.as_deref()));
    workflow.set_description(input.description);
    workflow.set_location_label(input.location_label);

    let id = workflow.submit().await?;
    info!(incident = %id, "Report accepted");
    Ok(SubmitReceipt {
        id: id.as_str().to_string(),
    })
}

pub async fn get_draft(state: &AppState) -> DraftDto {
    DraftDto::from(&*state.workflow.lock().await)
}

/// Throw away the current draft.
pub async fn discard_draft(state: &AppState) -> DraftDto {
    let mut workflow = state.workflow.lock().await;
    workflow.reset();
    DraftDto::from(&*workflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    use civicwatch_net::StaticLocator;
    use civicwatch_shared::ValidationError;

    use crate::commands::test_support::app_state;
    use crate::config::CoreConfig;

    fn input(category: Option<&str>, description: &str, location: &str) -> ReportInput {
        ReportInput {
            category: category.map(str::to_string),
            description: description.into(),
            location_label: location.into(),
        }
    }

    #[tokio::test]
    async fn missing_location_is_reported_against_its_field() {
        let (collection, state) = app_state(CoreConfig::default(), StaticLocator::Unsupported);

        let err = submit_report(&state, input(Some("fire"), "warehouse blaze", ""))
            .await
            .unwrap_err();
        assert_eq!(err, CivicError::Validation(ValidationError::EmptyLocation));

        let draft = get_draft(&state).await;
        assert_eq!(draft.state, SubmissionState::Editing);
        assert_eq!(draft.category, Some(Category::Fire));
        assert_eq!(draft.description, "warehouse blaze");
        assert_eq!(draft.error_field, Some("locationLabel"));
        assert_eq!(collection.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_category_is_treated_as_missing() {
        let (_collection, state) = app_state(CoreConfig::default(), StaticLocator::Unsupported);
        let err = submit_report(&state, input(Some("alien"), "lights", "Lekki"))
            .await
            .unwrap_err();
        assert_eq!(err, CivicError::Validation(ValidationError::MissingCategory));
    }

    #[tokio::test]
    async fn accepted_report_clears_draft() {
        let (collection, state) = app_state(CoreConfig::default(), StaticLocator::Unsupported);

        let receipt = submit_report(&state, input(Some("medical"), "Man collapsed", "Ikeja GRA"))
            .await
            .unwrap();
        assert!(!receipt.id.is_empty());
        assert_eq!(collection.count().await.unwrap(), 1);

        let draft = get_draft(&state).await;
        assert_eq!(draft.state, SubmissionState::Done);
        assert!(draft.description.is_empty());
        assert!(draft.error.is_none());
    }

    #[tokio::test]
    async fn discard_resets_to_editing() {
        let (_collection, state) = app_state(CoreConfig::default(), StaticLocator::Unsupported);
        let _ = submit_report(&state, input(None, "half typed", "")).await;

        let draft = discard_draft(&state).await;
        assert_eq!(draft.state, SubmissionState::Editing);
        assert!(draft.description.is_empty());
        assert!(draft.error.is_none());
    }
}
