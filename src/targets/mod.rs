//! Page targets
//!
//! A target knows how to turn `(cursor, page_size)` into one HTTP request
//! for a cursor-paginated endpoint. The engine owns everything else.
//!
//! # Targets
//!
//! - `SearchTarget` - people search by criteria (Sales Navigator or classic)
//! - `UrlSearchTarget` - people search from a pasted search URL
//! - `RelationsTarget` - accepted connections
//! - `InvitationsSentTarget` - pending sent invitations

mod search;
mod users;

pub use search::{SearchApi, SearchTarget, UrlSearchTarget};
pub use users::{InvitationsSentTarget, RelationsTarget};

use crate::http::RequestSpec;

/// Endpoint path shared by both search targets
pub const SEARCH_PATH: &str = "/api/v1/linkedin/search";

/// Builds page requests for one paginated endpoint
pub trait PageTarget: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Largest page size the endpoint accepts
    fn max_page_size(&self) -> usize;

    /// Build the request for one page
    ///
    /// `cursor` is `None` for the first page. `page_size` is already clamped
    /// to `[1, max_page_size()]`.
    fn request(&self, cursor: Option<&str>, page_size: usize) -> RequestSpec;

    /// Alternate request tried once when the provider rejects `request`
    /// with a 400
    fn fallback_request(&self, _cursor: Option<&str>, _page_size: usize) -> Option<RequestSpec> {
        None
    }

    /// Clamp a requested page size into what this target accepts
    fn clamp_page_size(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_page_size().max(1))
    }
}

/// Query parameters every target sends
pub(crate) fn paged(
    spec: RequestSpec,
    account_id: &str,
    cursor: Option<&str>,
    page_size: usize,
) -> RequestSpec {
    let spec = spec
        .query("account_id", account_id)
        .query("limit", page_size.to_string());

    match cursor {
        Some(cursor) => spec.query("cursor", cursor),
        None => spec,
    }
}
