//! Runtime types.

use chatdigest_store::Fact;

/// Result of running the importance pipeline for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// The classifier could not answer (timeout, transport or API error,
    /// malformed response). Nothing was persisted.
    Unavailable,
    /// Important facts among all the items passed in, in input order.
    Important(Vec<Fact>),
}

/// Outcome of a digest request for a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Chat has no settings record or collection is off.
    NotActive,
    /// No facts of any enabled category in the window.
    NothingFound,
    /// Every category that had facts failed to classify.
    TemporaryFailure,
    /// Facts exist, none is important.
    NothingImportant,
    /// Rendered report (Telegram HTML).
    Report(String),
}

/// Outcome of a single-category listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOutcome {
    /// No facts of the category in the window.
    Empty,
    /// The classifier could not answer.
    TemporaryFailure,
    /// Facts exist, none is important.
    NothingImportant,
    /// Rendered report (Telegram HTML).
    Report(String),
}
