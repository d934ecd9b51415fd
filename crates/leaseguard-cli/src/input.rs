//! Clause loading for the CLI.

use anyhow::{Context, Result};
use leaseguard_core::{parse_clause_json, split_numbered_clauses, Clause};
use std::path::Path;

/// Load clauses from a file.
///
/// `.json` files hold a clause list (`["..."]`, `[{"text": "..."}]` or
/// `{"clauses": [...]}`). Anything else is treated as a plain-text listing
/// split on numbered markers (`1. `, `2) `).
pub fn load_clauses(path: &Path) -> Result<Vec<Clause>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clause file {}", path.display()))?;

    let clauses = if is_json(path) {
        parse_clause_json(&content)
            .with_context(|| format!("Failed to parse clause file {}", path.display()))?
    } else {
        split_numbered_clauses(&content)
    };

    tracing::debug!(path = %path.display(), clauses = clauses.len(), "Loaded clauses");
    Ok(clauses)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_clauses() {
        let file = write_temp(
            ".json",
            r#"[{"text": "Rent is $1000/month."}, "Tenant may sublet freely.", 7]"#,
        );

        let clauses = load_clauses(file.path()).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1].text, "Tenant may sublet freely.");
    }

    #[test]
    fn test_load_numbered_text() {
        let file = write_temp(
            ".txt",
            "1. Rent is $1000/month.\n2. Tenant may sublet freely.\n3) No pets.\n",
        );

        let clauses = load_clauses(file.path()).unwrap();
        let texts: Vec<_> = clauses.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Rent is $1000/month.", "Tenant may sublet freely.", "No pets."]
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_clauses(Path::new("/nonexistent/lease.json")).is_err());
    }

    #[test]
    fn test_malformed_json_is_error() {
        let file = write_temp(".json", "{not json");
        assert!(load_clauses(file.path()).is_err());
    }
}
