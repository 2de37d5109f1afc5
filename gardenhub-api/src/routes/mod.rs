/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh and logout
/// - `profile`: Own profile, public profiles, follows, blocks, push devices
/// - `gardens`: Gardens, memberships and custom task types
/// - `tasks`: Task creation and workflow transitions
/// - `forum`: Posts, comments, likes and best answers
/// - `notifications`: Inbox and read state
/// - `badges`: Badge catalogue and awarded badges
/// - `events`: Garden events and attendance votes
/// - `moderation`: Reports and moderator actions

pub mod auth;
pub mod badges;
pub mod events;
pub mod forum;
pub mod gardens;
pub mod health;
pub mod moderation;
pub mod notifications;
pub mod profile;
pub mod tasks;

use serde::Deserialize;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// `?limit=&offset=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        let page = Pagination::default();
        assert_eq!((page.limit(), page.offset()), (20, 0));

        let page = Pagination {
            limit: Some(1000),
            offset: Some(-5),
        };
        assert_eq!((page.limit(), page.offset()), (100, 0));
    }
}
