//! Connection list targets

use super::{paged, PageTarget};
use crate::http::RequestSpec;

/// Accepted connections
#[derive(Debug, Clone)]
pub struct RelationsTarget {
    account_id: String,
}

impl RelationsTarget {
    pub const PATH: &'static str = "/api/v1/users/relations";

    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }
}

impl PageTarget for RelationsTarget {
    fn name(&self) -> &str {
        "relations"
    }

    fn max_page_size(&self) -> usize {
        1000
    }

    fn request(&self, cursor: Option<&str>, page_size: usize) -> RequestSpec {
        paged(RequestSpec::get(Self::PATH), &self.account_id, cursor, page_size)
    }
}

/// Invitations sent and still pending
#[derive(Debug, Clone)]
pub struct InvitationsSentTarget {
    account_id: String,
}

impl InvitationsSentTarget {
    pub const PATH: &'static str = "/api/v1/users/invite/sent";

    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }
}

impl PageTarget for InvitationsSentTarget {
    fn name(&self) -> &str {
        "invitations_sent"
    }

    fn max_page_size(&self) -> usize {
        100
    }

    fn request(&self, cursor: Option<&str>, page_size: usize) -> RequestSpec {
        paged(RequestSpec::get(Self::PATH), &self.account_id, cursor, page_size)
    }
}
