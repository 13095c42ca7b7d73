//! Incident submission workflow.
//!
//! ```text
//! Editing -> Validating -> Resolving -> Committing -> Done
//!    ^           |            |             |           |
//!    +-----------+------------+-------------+-----------+
//! ```
//!
//! Validation and coordinate checks run locally before any network call.
//! Exactly one `create_record` is issued per accepted submission; on
//! failure the draft is left intact so the reporter can retry.
//!
//! Asynchronous lookups (place suggestions, device location) are started
//! with a ticket and applied later. A ticket from an earlier draft, or one
//! superseded by a newer lookup, is discarded on arrival.

use serde::Serialize;
use tracing::{debug, info, warn};

use civicwatch_net::{LocationResolver, RemoteCollection, SuggestionBatch, SuggestionTicket, SuggestionTracker};
use civicwatch_shared::{
    Category, CivicError, Coordinates, IncidentId, NewIncident, ResolvedLocation, Suggestion,
    ValidationError,
};

use crate::config::CoordinatePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionState {
    Editing,
    Validating,
    Resolving,
    Committing,
    Done,
}

/// The report being composed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub category: Option<Category>,
    pub description: String,
    pub location_label: String,
    pub coordinates: Option<Coordinates>,
    /// Latest place suggestions for `location_label`.
    pub suggestions: Vec<Suggestion>,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.description.trim().is_empty()
            && self.location_label.trim().is_empty()
            && self.coordinates.is_none()
    }

    /// The suggestion whose label is the current location text, if any.
    fn matching_suggestion(&self) -> Option<&Suggestion> {
        let label = self.location_label.trim();
        self.suggestions
            .iter()
            .find(|s| s.label.trim().eq_ignore_ascii_case(label))
    }

    fn validate(&self) -> Result<(Category, &str, &str), ValidationError> {
        let category = self.category.ok_or(ValidationError::MissingCategory)?;
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        let location = self.location_label.trim();
        if location.is_empty() {
            return Err(ValidationError::EmptyLocation);
        }
        Ok((category, description, location))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionRequest {
    generation: u64,
    ticket: SuggestionTicket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateRequest {
    generation: u64,
    seq: u64,
}

pub struct SubmissionWorkflow<C> {
    collection: C,
    policy: CoordinatePolicy,
    state: SubmissionState,
    draft: Draft,
    // Bumped whenever the draft is replaced.
    generation: u64,
    suggestions: SuggestionTracker,
    locate_seq: u64,
    last_error: Option<CivicError>,
    last_committed: Option<IncidentId>,
}

impl<C: RemoteCollection> SubmissionWorkflow<C> {
    pub fn new(collection: C, policy: CoordinatePolicy) -> Self {
        Self {
            collection,
            policy,
            state: SubmissionState::Editing,
            draft: Draft::default(),
            generation: 0,
            suggestions: SuggestionTracker::new(),
            locate_seq: 0,
            last_error: None,
            last_committed: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn policy(&self) -> CoordinatePolicy {
        self.policy
    }

    pub fn last_error(&self) -> Option<&CivicError> {
        self.last_error.as_ref()
    }

    pub fn last_committed(&self) -> Option<&IncidentId> {
        self.last_committed.as_ref()
    }

    /// Editing after `Done` starts a fresh report.
    fn edit(&mut self) -> &mut Draft {
        if self.state == SubmissionState::Done {
            self.state = SubmissionState::Editing;
        }
        self.last_error = None;
        &mut self.draft
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.edit().category = category;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.edit().description = description.into();
    }

    /// Typed location text. A point resolved for a different label no longer applies.
    pub fn set_location_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        let draft = self.edit();
        if draft.location_label != label {
            draft.coordinates = None;
        }
        draft.location_label = label;
    }

    /// Adopt a resolved location as both label and point.
    pub fn apply_resolved(&mut self, resolved: ResolvedLocation) {
        let draft = self.edit();
        draft.location_label = resolved.label;
        draft.coordinates = Some(resolved.coordinates);
        draft.suggestions.clear();
    }

    /// Pick one of the current suggestions. No network call.
    pub fn choose_suggestion(&mut self, index: usize) -> Option<ResolvedLocation> {
        let suggestion = self.draft.suggestions.get(index)?;
        let resolved = LocationResolver::from_suggestion(suggestion);
        self.suggestions.invalidate();
        self.apply_resolved(resolved.clone());
        Some(resolved)
    }

    /// Abandon the current draft. Outstanding lookups for it become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.suggestions.invalidate();
        self.draft = Draft::default();
        self.state = SubmissionState::Editing;
        self.last_error = None;
        debug!(generation = self.generation, "Draft reset");
    }

    /// Starting a lookup after `Done` starts a fresh report, like any edit.
    pub fn begin_suggestions(&mut self) -> SuggestionRequest {
        self.edit();
        SuggestionRequest {
            generation: self.generation,
            ticket: self.suggestions.issue(),
        }
    }

    /// Store a suggestion batch if its request is still current. Returns
    /// whether it was applied.
    pub fn apply_suggestions(&mut self, request: SuggestionRequest, batch: SuggestionBatch) -> bool {
        if !self.accepts(request.generation) {
            return false;
        }
        match self.suggestions.accept(request.ticket, batch) {
            Some(batch) => {
                self.draft.suggestions = batch.items;
                true
            }
            None => false,
        }
    }

    pub fn begin_locate(&mut self) -> LocateRequest {
        self.edit();
        self.locate_seq += 1;
        LocateRequest {
            generation: self.generation,
            seq: self.locate_seq,
        }
    }

    /// Store a device location if its request is still current.
    pub fn apply_location(&mut self, request: LocateRequest, resolved: ResolvedLocation) -> bool {
        if !self.accepts(request.generation) || request.seq != self.locate_seq {
            debug!(seq = request.seq, latest = self.locate_seq, "Discarding stale location");
            return false;
        }
        self.apply_resolved(resolved);
        true
    }

    fn accepts(&self, generation: u64) -> bool {
        generation == self.generation && self.state == SubmissionState::Editing
    }

    /// Validate, settle coordinates, and commit the draft.
    pub async fn submit(&mut self) -> Result<IncidentId, CivicError> {
        self.state = SubmissionState::Validating;
        let validated = self
            .draft
            .validate()
            .map(|(c, d, l)| (c, d.to_string(), l.to_string()));
        let (category, description, location) = match validated {
            Ok(fields) => fields,
            Err(e) => return Err(self.back_to_editing(e.into())),
        };

        self.state = SubmissionState::Resolving;
        let coordinates = self
            .draft
            .coordinates
            .or_else(|| self.draft.matching_suggestion().map(Suggestion::coordinates))
            .filter(Coordinates::is_valid);
        if coordinates.is_none() && self.policy == CoordinatePolicy::Required {
            return Err(self.back_to_editing(ValidationError::MissingCoordinates.into()));
        }

        self.state = SubmissionState::Committing;
        let payload = NewIncident::new(category, description, location, coordinates);
        match self.collection.create_record(payload).await {
            Ok(id) => {
                info!(incident = %id, category = category.code(), located = coordinates.is_some(), "Incident submitted");
                self.generation += 1;
                self.suggestions.invalidate();
                self.draft = Draft::default();
                self.state = SubmissionState::Done;
                self.last_error = None;
                self.last_committed = Some(id.clone());
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "Incident submission failed");
                Err(self.back_to_editing(CivicError::SubmitFailed(e.to_string())))
            }
        }
    }

    fn back_to_editing(&mut self, err: CivicError) -> CivicError {
        self.state = SubmissionState::Editing;
        self.last_error = Some(err.clone());
        err
    }
}
