//! Migration files on disk.
//!
//! A migration is one `*.sql` file; its file name is its identifier. The file
//! is split into sections by marker lines:
//!
//! ```sql
//! -- rambler up
//! CREATE TABLE users (id INT PRIMARY KEY);
//!
//! -- rambler down
//! DROP TABLE users;
//! ```
//!
//! Several `up` and `down` sections may appear in one file. Each section is
//! executed as one statement. Up sections run in file order, down sections in
//! reverse file order, so a file reads top-down as a sequence of reversible
//! steps.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::core::Migration;
use crate::error::Result;

const UP_MARKER: &str = "-- rambler up";
const DOWN_MARKER: &str = "-- rambler down";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// Load every `*.sql` file directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`MigrateError::Io`](crate::MigrateError::Io) if the directory or
/// one of its files cannot be read.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Migration>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut migrations = Vec::with_capacity(files.len());
    for (name, path) in files {
        let text = fs::read_to_string(&path)?;
        migrations.push(parse(name, &text));
    }
    debug!("Loaded {} migrations from {}", migrations.len(), dir.display());
    Ok(migrations)
}

/// Parse the content of one migration file.
pub fn parse(id: impl Into<String>, text: &str) -> Migration {
    let mut up = Vec::new();
    let mut down = Vec::new();
    let mut section = Section::Preamble;
    let mut current = String::new();

    let mut flush = |section: Section, body: &mut String| {
        let statement = std::mem::take(body);
        match section {
            Section::Up => up.push(statement),
            Section::Down => down.push(statement),
            Section::Preamble => {}
        }
    };

    for line in text.lines() {
        let marker = line.trim();
        if marker == UP_MARKER || marker == DOWN_MARKER {
            flush(section, &mut current);
            section = if marker == UP_MARKER {
                Section::Up
            } else {
                Section::Down
            };
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    flush(section, &mut current);

    let up = up.into_iter().map(|s| s.trim().to_string()).collect();
    let down = down.into_iter().rev().map(|s| s.trim().to_string()).collect();
    Migration::with_statements(id, up, down)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;

    #[test]
    fn test_parse_single_pair() {
        let m = parse(
            "001_init.sql",
            "-- rambler up\nCREATE TABLE a (id INT);\n\n-- rambler down\nDROP TABLE a;\n",
        );
        assert_eq!(m.id(), "001_init.sql");
        assert_eq!(m.up(), &["CREATE TABLE a (id INT);".to_string()]);
        assert_eq!(m.down(), &["DROP TABLE a;".to_string()]);
    }

    #[test]
    fn test_parse_multiple_sections_reverses_down() {
        let text = "\
-- rambler up
CREATE TABLE a (id INT);
-- rambler down
DROP TABLE a;
-- rambler up
CREATE INDEX a_id ON a (id);
-- rambler down
DROP INDEX a_id;
";
        let m = parse("002_index.sql", text);
        assert_eq!(
            m.up(),
            &[
                "CREATE TABLE a (id INT);".to_string(),
                "CREATE INDEX a_id ON a (id);".to_string()
            ]
        );
        assert_eq!(
            m.down(),
            &["DROP INDEX a_id;".to_string(), "DROP TABLE a;".to_string()]
        );
    }

    #[test]
    fn test_parse_ignores_preamble_and_blank_sections() {
        let text = "-- author: ops\nSELECT 1;\n  -- rambler up  \n\n-- rambler down\n";
        let m = parse("003_empty.sql", text);
        assert!(m.up().is_empty());
        assert!(m.down().is_empty());
    }

    #[test]
    fn test_parse_keeps_multiline_statement() {
        let text = "-- rambler up\nCREATE TABLE a (\n  id INT\n);\n";
        let m = parse("004.sql", text);
        assert_eq!(m.up(), &["CREATE TABLE a (\n  id INT\n);".to_string()]);
    }

    #[test]
    fn test_load_dir_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("002_b.sql"), "-- rambler up\nB;\n").unwrap();
        fs::write(dir.path().join("001_a.sql"), "-- rambler up\nA;\n").unwrap();
        fs::write(dir.path().join("README.md"), "notes").unwrap();
        fs::create_dir(dir.path().join("003_dir.sql")).unwrap();

        let migrations = load_dir(dir.path()).unwrap();
        let ids: Vec<&str> = migrations.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["001_a.sql", "002_b.sql"]);
        assert_eq!(migrations[0].up(), &["A;".to_string()]);
    }

    #[test]
    fn test_load_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dir(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, MigrateError::Io(_)));
    }
}
