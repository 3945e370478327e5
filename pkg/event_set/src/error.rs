/// Error kinds surfaced by this crate.
///
/// Per-operation failures (an individual async operation failing) are never
/// reported this way; they only ever show up via `EventSet::err_status`,
/// `err_count` and `get_err_info`. These variants are for the event set's
/// own entry points misbehaving.
#[error]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum EventSetError {
    /// The supplied identifier does not refer to a live event set.
    BadHandle,

    /// A required out-parameter was missing, or `max == 0` was passed to
    /// `get_err_info`.
    BadValue,

    /// Allocation failed while growing a list or copying diagnostics.
    Alloc,

    /// `close` was called while the active list was non-empty.
    Busy,

    /// The async runtime reported a structural failure while being polled
    /// (as opposed to a single operation failing).
    CantWait,

    /// Diagnostics extraction failed for one or more records.
    CantGet,

    /// The handle registry refused to register the new event set.
    CantRegister,
}
