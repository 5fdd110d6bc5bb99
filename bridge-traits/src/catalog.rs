//! Media catalog bridge.

/// Catalog subsystem that indexes the user's media library.
///
/// The coordinator only ever asks the catalog to (re)load itself once it
/// knows the storage permission is held. Loading happens on the catalog's own
/// schedule; nothing is awaited by the caller.
pub trait MediaItemProvider: Send + Sync {
    /// Trigger a catalog reload. Fire-and-forget.
    fn reload(&self);
}
