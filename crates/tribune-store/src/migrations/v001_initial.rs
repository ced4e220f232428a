//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `templates`, `pending_messages`, `messages`,
//! `reactions`, and `validation_audit`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Templates
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS templates (
    id                   TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    title                TEXT NOT NULL,
    content              TEXT NOT NULL,
    category             TEXT NOT NULL,
    tags                 TEXT NOT NULL,              -- JSON array of strings
    target_audience      TEXT NOT NULL,              -- JSON array of strings
    estimated_engagement INTEGER NOT NULL,           -- 0-100
    is_active            INTEGER NOT NULL DEFAULT 1, -- boolean 0/1
    usage_count          INTEGER NOT NULL DEFAULT 0,
    created_by           TEXT NOT NULL,
    created_at           TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    last_used            TEXT,
    variables            TEXT NOT NULL               -- JSON array of variable schemas
);

CREATE INDEX IF NOT EXISTS idx_templates_category ON templates(category);

-- ----------------------------------------------------------------
-- Pending messages (moderation queue)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS pending_messages (
    id              TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    content         TEXT NOT NULL,
    template_id     TEXT,                            -- nullable, template-derived drafts
    template_title  TEXT,
    target_audience TEXT NOT NULL,                   -- JSON array of strings
    category        TEXT NOT NULL,
    tags            TEXT NOT NULL,                   -- JSON array of strings
    priority        TEXT NOT NULL,                   -- low|medium|high|urgent
    estimated_reach INTEGER NOT NULL,
    created_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    scheduled_for   TEXT,
    context         TEXT
);

CREATE INDEX IF NOT EXISTS idx_pending_priority ON pending_messages(priority);
CREATE INDEX IF NOT EXISTS idx_pending_created_at ON pending_messages(created_at DESC);

-- ----------------------------------------------------------------
-- Messages (delivery ledger)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id           TEXT PRIMARY KEY NOT NULL,          -- UUID v4
    sender_id    TEXT NOT NULL,
    content      TEXT NOT NULL,
    timestamp    TEXT NOT NULL,                      -- ISO-8601
    kind         TEXT NOT NULL,                      -- text|template|system|media
    status       TEXT NOT NULL,                      -- sending|sent|delivered|read
    reply_to     TEXT,                               -- nullable, advisory reference
    template_id  TEXT,
    validated_by TEXT,
    validated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);

-- ----------------------------------------------------------------
-- Reactions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reactions (
    id         TEXT PRIMARY KEY NOT NULL,            -- UUID v4
    message_id TEXT NOT NULL,                        -- FK -> messages(id)
    user_id    TEXT NOT NULL,
    emoji      TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE,
    UNIQUE (message_id, user_id, emoji)
);

CREATE INDEX IF NOT EXISTS idx_reactions_message_id ON reactions(message_id);

-- ----------------------------------------------------------------
-- Validation audit trail
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS validation_audit (
    id          TEXT PRIMARY KEY NOT NULL,           -- UUID v4
    pending_id  TEXT NOT NULL,
    action      TEXT NOT NULL,                       -- approved|rejected|edited
    message_id  TEXT,                                -- set when action = approved
    reason      TEXT,                                -- set when action = rejected
    reviewer    TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_pending_id ON validation_audit(pending_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
