//! SQL schema for the campus SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── School catalogue ────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS faculties (
    faculty_id INTEGER PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS majors (
    major_id   INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    faculty_id INTEGER NOT NULL REFERENCES faculties(faculty_id)
);

CREATE TABLE IF NOT EXISTS classes (
    class_id  INTEGER PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE,
    major_id  INTEGER NOT NULL REFERENCES majors(major_id),
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS semesters (
    semester_id INTEGER PRIMARY KEY,
    code        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    starts_on   TEXT NOT NULL,   -- YYYY-MM-DD
    ends_on     TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS criteria (
    criterion_id INTEGER PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    max_point    INTEGER NOT NULL CHECK (max_point >= 0),
    is_active    INTEGER NOT NULL DEFAULT 1
);

-- ── Users and accounts ──────────────────────────────────────────────────────

-- Every user variant lives in this one table. The UNIQUE index on `code` is
-- the code -> variant lookup.
CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    code       TEXT NOT NULL UNIQUE,
    kind       TEXT NOT NULL
               CHECK (kind IN ('administrator', 'specialist', 'assistant', 'student')),
    full_name  TEXT NOT NULL,
    email      TEXT,
    faculty_id INTEGER REFERENCES faculties(faculty_id),  -- specialist | assistant
    class_id   INTEGER REFERENCES classes(class_id),      -- student
    created_at TEXT NOT NULL,
    CHECK (kind != 'student' OR class_id IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS accounts (
    account_id    TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL UNIQUE REFERENCES users(user_id),
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,   -- written only through role resolution
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS access_groups (
    name TEXT PRIMARY KEY
);

-- Replaced wholesale on every provisioning of the group's role.
CREATE TABLE IF NOT EXISTS group_permissions (
    group_name TEXT NOT NULL REFERENCES access_groups(name),
    codename   TEXT NOT NULL,
    PRIMARY KEY (group_name, codename)
);

-- Replaced wholesale on every provisioning of the account.
CREATE TABLE IF NOT EXISTS account_groups (
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    group_name TEXT NOT NULL REFERENCES access_groups(name),
    PRIMARY KEY (account_id, group_name)
);

-- ── Activities ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS activities (
    activity_id  INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    criterion_id INTEGER NOT NULL REFERENCES criteria(criterion_id),
    semester_id  INTEGER NOT NULL REFERENCES semesters(semester_id),
    point        INTEGER NOT NULL CHECK (point >= 0),
    created_at   TEXT NOT NULL
);

-- `is_point_added` only ever goes from 0 to 1.
CREATE TABLE IF NOT EXISTS activity_registrations (
    registration_id INTEGER PRIMARY KEY,
    student_id      TEXT NOT NULL REFERENCES users(user_id),
    activity_id     INTEGER NOT NULL REFERENCES activities(activity_id),
    is_point_added  INTEGER NOT NULL DEFAULT 0,
    registered_at   TEXT NOT NULL,
    UNIQUE (student_id, activity_id)
);

CREATE TABLE IF NOT EXISTS training_points (
    student_id   TEXT NOT NULL REFERENCES users(user_id),
    semester_id  INTEGER NOT NULL REFERENCES semesters(semester_id),
    criterion_id INTEGER NOT NULL REFERENCES criteria(criterion_id),
    point        INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (student_id, semester_id, criterion_id)
);

-- ── Interactions ────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS comments (
    comment_id  INTEGER PRIMARY KEY,
    activity_id INTEGER NOT NULL REFERENCES activities(activity_id),
    account_id  TEXT NOT NULL REFERENCES accounts(account_id),
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- One like per account and activity.
CREATE TABLE IF NOT EXISTS likes (
    account_id  TEXT NOT NULL REFERENCES accounts(account_id),
    activity_id INTEGER NOT NULL REFERENCES activities(activity_id),
    created_at  TEXT NOT NULL,
    PRIMARY KEY (account_id, activity_id)
);

CREATE INDEX IF NOT EXISTS users_class_idx          ON users(class_id);
CREATE INDEX IF NOT EXISTS classes_major_idx        ON classes(major_id);
CREATE INDEX IF NOT EXISTS registrations_activity_idx ON activity_registrations(activity_id);
CREATE INDEX IF NOT EXISTS comments_activity_idx    ON comments(activity_id);
CREATE INDEX IF NOT EXISTS likes_activity_idx       ON likes(activity_id);

PRAGMA user_version = 2;
";
