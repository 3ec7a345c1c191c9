use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE,
                password            TEXT NOT NULL,
                avatar              TEXT,
                is_email_verified   INTEGER NOT NULL DEFAULT 0,
                last_login          TEXT,
                posts_count         INTEGER NOT NULL DEFAULT 0,
                followers_count     INTEGER NOT NULL DEFAULT 0,
                following_count     INTEGER NOT NULL DEFAULT 0,
                is_active           INTEGER NOT NULL DEFAULT 1,
                is_banned           INTEGER NOT NULL DEFAULT 0,
                banned_until        TEXT,
                deleted_at          TEXT,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE posts (
                id                  TEXT PRIMARY KEY,
                author_id           TEXT NOT NULL REFERENCES users(id),
                content             TEXT NOT NULL,
                image               TEXT,
                image_public_id     TEXT,
                privacy             TEXT NOT NULL DEFAULT 'public'
                                        CHECK (privacy IN ('public', 'private')),
                reactions_count     INTEGER NOT NULL DEFAULT 0,
                comments_count      INTEGER NOT NULL DEFAULT 0,
                shares_count        INTEGER NOT NULL DEFAULT 0,
                is_deleted          INTEGER NOT NULL DEFAULT 0,
                deleted_at          TEXT,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_posts_feed ON posts(is_deleted, created_at);
            CREATE INDEX idx_posts_author ON posts(author_id, created_at);

            CREATE TABLE comments (
                id                  TEXT PRIMARY KEY,
                post_id             TEXT NOT NULL REFERENCES posts(id),
                parent_id           TEXT REFERENCES comments(id),
                author_id           TEXT NOT NULL REFERENCES users(id),
                content             TEXT NOT NULL,
                image               TEXT,
                image_public_id     TEXT,
                reactions_count     INTEGER NOT NULL DEFAULT 0,
                replies_count       INTEGER NOT NULL DEFAULT 0,
                is_deleted          INTEGER NOT NULL DEFAULT 0,
                deleted_at          TEXT,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_comments_post ON comments(post_id, parent_id, created_at);
            CREATE INDEX idx_comments_parent ON comments(parent_id, created_at);

            CREATE TABLE reactions (
                target_type         TEXT NOT NULL CHECK (target_type IN ('post', 'comment')),
                target_id           TEXT NOT NULL,
                user_id             TEXT NOT NULL REFERENCES users(id),
                kind                TEXT NOT NULL,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (target_type, target_id, user_id)
            );

            CREATE TABLE follows (
                follower_id         TEXT NOT NULL REFERENCES users(id),
                followee_id         TEXT NOT NULL REFERENCES users(id),
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            );

            CREATE INDEX idx_follows_followee ON follows(followee_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
