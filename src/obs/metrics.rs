//! Stage counters exported through the `metrics` facade.
//!
//! Without the `metrics` feature every call compiles down to nothing, so the stages can record
//! unconditionally.

// self
use crate::obs::{StageKind, StageOutcome};

/// Counter incremented once per recorded stage outcome, labelled by `stage` and `outcome`.
pub const STAGE_COUNTER: &str = "console_client_stage_total";

/// Bumps [`STAGE_COUNTER`] for `kind`/`outcome`.
pub fn record_stage_outcome(kind: StageKind, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(STAGE_COUNTER, "stage" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
