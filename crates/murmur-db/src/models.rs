//! Row types as read from and written to SQLite. Kept apart from the
//! murmur-types API models so the DB layer stays independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub is_email_verified: bool,
    pub last_login: Option<String>,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub is_active: bool,
    pub is_banned: bool,
    pub banned_until: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct UserSummaryRow {
    pub id: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// A post joined with its author's public fields.
pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub author_email: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
    pub privacy: String,
    pub reactions_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A comment joined with its author's public fields.
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub author_email: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
    pub reactions_count: i64,
    pub replies_count: i64,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A reaction joined with the reacting user's public fields.
pub struct ReactionRow {
    pub target_id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_avatar: Option<String>,
    pub kind: String,
}

/// A reaction joined with the reacting user.
pub struct ReactorRow {
    pub user_id: String,
    pub email: String,
    pub avatar: Option<String>,
    pub kind: String,
}

pub struct NewPost<'a> {
    pub id: &'a str,
    pub author_id: &'a str,
    pub content: &'a str,
    pub image: Option<&'a str>,
    pub image_public_id: Option<&'a str>,
    pub privacy: &'a str,
}

pub struct NewComment<'a> {
    pub id: &'a str,
    pub post_id: &'a str,
    pub parent_id: Option<&'a str>,
    pub author_id: &'a str,
    pub content: &'a str,
    pub image: Option<&'a str>,
    pub image_public_id: Option<&'a str>,
}
