// omnisync/src/store/schema.rs

pub const CREATE_CASES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS cases
    (
        id               INTEGER NOT NULL CONSTRAINT cases_pk PRIMARY KEY AUTOINCREMENT,
        omni_case_id     INTEGER NOT NULL,
        case_number      TEXT,
        subject          TEXT DEFAULT '' NOT NULL,
        user_id          INTEGER,
        staff_id         INTEGER,
        group_id         INTEGER,
        status           TEXT,
        priority         TEXT DEFAULT '' NOT NULL,
        channel          TEXT,
        recipient        TEXT DEFAULT '' NOT NULL,
        cc_emails        TEXT DEFAULT '' NOT NULL,
        bcc_emails       TEXT DEFAULT '' NOT NULL,
        deleted          INTEGER,
        spam             INTEGER,
        created_at       INTEGER,
        closed_at        INTEGER,
        updated_at       INTEGER,
        last_response_at INTEGER,
        parent_case_id   INTEGER,
        closing_speed    INTEGER,
        language_id      INTEGER
    )
"#;

pub const CREATE_OMNI_CASE_ID_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS cases_omni_case_id_uindex ON cases (omni_case_id)";

/// A column written on every upsert, and what it holds when the API
/// omits the field or sends null.
#[derive(Debug, Clone, Copy)]
pub struct TrackedColumn {
    pub name: &'static str,
    pub absent_default: Option<&'static str>,
}

const fn nullable(name: &'static str) -> TrackedColumn {
    TrackedColumn { name, absent_default: None }
}

const fn text_not_null(name: &'static str) -> TrackedColumn {
    TrackedColumn { name, absent_default: Some("") }
}

/// The conflict key. Filled from the API's `case_id`.
pub const CONFLICT_COLUMN: &str = "omni_case_id";

/// Business columns copied from the API field of the same name.
pub const TRACKED_COLUMNS: &[TrackedColumn] = &[
    nullable("case_number"),
    text_not_null("subject"),
    nullable("user_id"),
    nullable("staff_id"),
    nullable("group_id"),
    nullable("status"),
    text_not_null("priority"),
    nullable("channel"),
    text_not_null("recipient"),
    text_not_null("cc_emails"),
    text_not_null("bcc_emails"),
    nullable("deleted"),
    nullable("spam"),
    nullable("created_at"),
    nullable("closed_at"),
    nullable("updated_at"),
    nullable("last_response_at"),
    nullable("parent_case_id"),
    nullable("closing_speed"),
    nullable("language_id"),
];

/// `INSERT ... ON CONFLICT(omni_case_id) DO UPDATE SET` over every tracked
/// column, so an existing row is fully overwritten.
pub fn upsert_statement() -> String {
    let columns: Vec<&str> = std::iter::once(CONFLICT_COLUMN)
        .chain(TRACKED_COLUMNS.iter().map(|c| c.name))
        .collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let assignments = TRACKED_COLUMNS
        .iter()
        .map(|c| format!("{0} = excluded.{0}", c.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO cases ({}) VALUES ({}) ON CONFLICT({}) DO UPDATE SET {}",
        columns.join(", "),
        placeholders,
        CONFLICT_COLUMN,
        assignments
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_statement_covers_every_column() {
        let sql = upsert_statement();

        assert!(sql.starts_with("INSERT INTO cases (omni_case_id, case_number, subject,"));
        assert!(sql.contains("ON CONFLICT(omni_case_id) DO UPDATE SET case_number = excluded.case_number"));
        assert!(sql.ends_with("language_id = excluded.language_id"));
        assert_eq!(sql.matches('?').count(), TRACKED_COLUMNS.len() + 1);
        assert!(!sql.contains("omni_case_id = excluded"));
    }
}
