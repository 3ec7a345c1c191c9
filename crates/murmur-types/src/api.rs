use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Privacy, ReactionKind, TargetKind, ToggleAction};

// -- JWT Claims --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims for both access and refresh tokens. `kind` stops a refresh
/// token from being replayed as an access token even if the secrets match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
}

// -- Envelope --

/// Every JSON body the API returns has this shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            pagination: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload (logout, refresh).
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
            pagination: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: Some(message.into()),
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    /// `returned` is the number of items on this page.
    pub fn new(page: u32, limit: u32, total: u64, returned: usize) -> Self {
        let limit_wide = u64::from(limit.max(1));
        let skipped = u64::from(page.saturating_sub(1)) * limit_wide;
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit_wide),
            has_more: skipped + (returned as u64) < total,
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: Option<String>,
    pub agree_to_terms: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub is_email_verified: bool,
    pub avatar: Option<String>,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserDto,
}

/// The public face of a user embedded in posts, comments and lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub avatar: Option<String>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePostRequest {
    pub content: String,
    pub privacy: Option<String>,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
    pub privacy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEntry {
    /// The reacting user, embedded under the `userId` key.
    #[serde(rename = "userId")]
    pub user: UserSummary,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub content: String,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
    pub privacy: Privacy,
    pub author: UserSummary,
    pub reactions: Vec<ReactionEntry>,
    pub reactions_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub current_user_reaction: Option<ReactionKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostResponse {
    pub post_id: Uuid,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
    /// `None` for a deleted placeholder.
    pub author: Option<UserSummary>,
    pub reactions_count: i64,
    pub replies_count: i64,
    pub is_deleted: bool,
    pub current_user_reaction: Option<ReactionKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentResponse>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentResponse {
    pub comment_id: Uuid,
    pub has_replies: bool,
    pub message: String,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub target_id: String,
    pub target_type: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionResponse {
    pub target_id: Uuid,
    pub target_type: TargetKind,
    pub action: ToggleAction,
    pub current_user_reaction: Option<ReactionKind>,
    pub reactions_count: i64,
}

/// Reacting users bucketed by kind.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReactionGroups {
    pub like: Vec<UserSummary>,
    pub haha: Vec<UserSummary>,
    pub love: Vec<UserSummary>,
    pub angry: Vec<UserSummary>,
}

impl ReactionGroups {
    pub fn push(&mut self, kind: ReactionKind, user: UserSummary) {
        self.bucket_mut(kind).push(user);
    }

    fn bucket_mut(&mut self, kind: ReactionKind) -> &mut Vec<UserSummary> {
        match kind {
            ReactionKind::Like => &mut self.like,
            ReactionKind::Haha => &mut self.haha,
            ReactionKind::Love => &mut self.love,
            ReactionKind::Angry => &mut self.angry,
        }
    }

    pub fn summary(&self) -> ReactionSummary {
        let by_type = ReactionCounts {
            like: self.like.len(),
            haha: self.haha.len(),
            love: self.love.len(),
            angry: self.angry.len(),
        };
        ReactionSummary {
            total: by_type.like + by_type.haha + by_type.love + by_type.angry,
            by_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub like: usize,
    pub haha: usize,
    pub love: usize,
    pub angry: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub total: usize,
    pub by_type: ReactionCounts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionUsersResponse {
    pub reactions: ReactionGroups,
    pub summary: ReactionSummary,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub user_id: Uuid,
}

// -- Uploads --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub public_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_reports_more_pages() {
        let p = Pagination::new(1, 10, 25, 10);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_more);

        let last = Pagination::new(3, 10, 25, 5);
        assert!(!last.has_more);
    }

    #[test]
    fn pagination_empty_result() {
        let p = Pagination::new(1, 10, 0, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_more);
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let body = serde_json::to_value(ApiResponse::done("Logout successful")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "success": true, "message": "Logout successful" })
        );
    }

    #[test]
    fn reaction_summary_counts_buckets() {
        let user = UserSummary {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            avatar: None,
        };
        let mut groups = ReactionGroups::default();
        groups.push(ReactionKind::Love, user.clone());
        groups.push(ReactionKind::Love, user.clone());
        groups.push(ReactionKind::Angry, user);

        let summary = groups.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_type.love, 2);
        assert_eq!(summary.by_type.like, 0);
        assert_eq!(groups.angry.len(), 1);
    }
}
