//! Centralized database schema definitions for the forms store.
//!
//! All form state lives in one SQLite database:
//! - `forms`: the form container and its section fields.
//! - `pages`: ordered question pages, dense 1-based `position` per form.
//! - `conditions`: routing edges between pages of the same form.
//! - `made_live_forms`: immutable snapshots taken each time a form goes live.

pub const FORMS_DB_NAME: &str = "forms.db";
pub const AUDIT_EVENTS_NAME: &str = "audit.events.jsonl";

pub const FORMS_DB_SCHEMA_FORMS: &str = "
    CREATE TABLE IF NOT EXISTS forms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        form_slug TEXT NOT NULL,
        org TEXT,
        submission_email TEXT,
        privacy_policy_url TEXT,
        what_happens_next_text TEXT,
        support_email TEXT,
        support_phone TEXT,
        support_url TEXT,
        support_url_text TEXT,
        declaration_text TEXT,
        question_section_completed INTEGER NOT NULL DEFAULT 0,
        declaration_section_completed INTEGER NOT NULL DEFAULT 0,
        has_draft_version INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";
pub const FORMS_DB_SCHEMA_FORMS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_forms_org ON forms(org)";

pub const FORMS_DB_SCHEMA_PAGES: &str = "
    CREATE TABLE IF NOT EXISTS pages (
        id TEXT PRIMARY KEY,
        form_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        question_text TEXT NOT NULL,
        hint_text TEXT,
        answer_type TEXT NOT NULL,
        answer_settings TEXT, -- JSON object, answer-type specific
        is_optional INTEGER NOT NULL DEFAULT 0,
        page_heading TEXT,
        guidance_markdown TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(form_id, position),
        FOREIGN KEY(form_id) REFERENCES forms(id) ON DELETE CASCADE
    )
";

pub const FORMS_DB_SCHEMA_CONDITIONS: &str = "
    CREATE TABLE IF NOT EXISTS conditions (
        id TEXT PRIMARY KEY,
        form_id TEXT NOT NULL,
        check_page_id TEXT NOT NULL, -- the page whose answer is compared
        routing_page_id TEXT,        -- the page at which the route takes place
        goto_page_id TEXT,           -- the page this condition skips forwards to
        answer_value TEXT NOT NULL,
        skip_to_end INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(form_id) REFERENCES forms(id) ON DELETE CASCADE,
        FOREIGN KEY(check_page_id) REFERENCES pages(id) ON DELETE CASCADE,
        FOREIGN KEY(routing_page_id) REFERENCES pages(id) ON DELETE SET NULL,
        FOREIGN KEY(goto_page_id) REFERENCES pages(id) ON DELETE SET NULL
    )
";
pub const FORMS_DB_SCHEMA_CONDITIONS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_conditions_check_page ON conditions(check_page_id)";

pub const FORMS_DB_SCHEMA_MADE_LIVE: &str = "
    CREATE TABLE IF NOT EXISTS made_live_forms (
        id TEXT PRIMARY KEY,
        form_id TEXT NOT NULL,
        json_form_blob TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY(form_id) REFERENCES forms(id) ON DELETE CASCADE
    )
";
pub const FORMS_DB_SCHEMA_MADE_LIVE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_made_live_forms_form ON made_live_forms(form_id)";

/// Statements applied in order by `db::initialize_forms_db`.
pub const FORMS_DB_SCHEMA: &[&str] = &[
    FORMS_DB_SCHEMA_FORMS,
    FORMS_DB_SCHEMA_FORMS_INDEX,
    FORMS_DB_SCHEMA_PAGES,
    FORMS_DB_SCHEMA_CONDITIONS,
    FORMS_DB_SCHEMA_CONDITIONS_INDEX,
    FORMS_DB_SCHEMA_MADE_LIVE,
    FORMS_DB_SCHEMA_MADE_LIVE_INDEX,
];
