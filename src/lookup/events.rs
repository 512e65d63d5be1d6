/// Outcome of background work the lookup does on its own, published on
/// [`IdentityStorageLookup::events`](super::IdentityStorageLookup::events).
///
/// Member cleanup runs detached from the code path that triggered it, so this
/// stream (alongside the `error!` log line) is where its failures surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    /// All activation records owned by `member_id` were removed.
    MemberCleaned { member_id: String, removed: usize },

    /// Removing the records owned by `member_id` failed.
    CleanupFailed {
        member_id: String,
        operation: &'static str,
        error: String,
    },
}
