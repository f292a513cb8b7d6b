//! Duplicate-candidate detection for create endpoints
//!
//! Before inserting a new contact-like record, existing tenant-scoped
//! rows are searched for a same-email or similar-company match and the
//! candidates surfaced to the caller, who decides via a `force` flag
//! whether to insert anyway. This is a heuristic: matching is exact
//! lowercased email or case-insensitive company substring, so typos are
//! missed and shared company names collide.

use serde::Serialize;

/// Default cap on surfaced candidates
pub const DEFAULT_CANDIDATE_CAP: usize = 3;

/// A contact-like row eligible for duplicate matching
#[derive(Debug, Clone)]
pub struct ContactRow {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
}

/// An existing row considered a possible duplicate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Which field matched: "email" or "company"
    pub matched_on: &'static str,
}

/// Search `rows` for candidates matching the given email/company.
///
/// Email matches take precedence over company matches; at most `cap`
/// candidates are returned. Rows must already be tenant-scoped by the
/// caller's query.
pub fn find_candidates(
    rows: &[ContactRow],
    email: Option<&str>,
    company: Option<&str>,
    cap: usize,
) -> Vec<DuplicateCandidate> {
    let email_needle = email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let company_needle = company
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    if email_needle.is_none() && company_needle.is_none() {
        return vec![];
    }

    let mut candidates = vec![];

    if let Some(ref needle) = email_needle {
        for row in rows {
            if candidates.len() >= cap {
                return candidates;
            }
            let matches = row
                .email
                .as_deref()
                .map(|e| e.trim().to_lowercase() == *needle)
                .unwrap_or(false);
            if matches {
                candidates.push(candidate_from(row, "email"));
            }
        }
    }

    if let Some(ref needle) = company_needle {
        for row in rows {
            if candidates.len() >= cap {
                return candidates;
            }
            if candidates.iter().any(|c| c.id == row.id) {
                continue;
            }
            let matches = row
                .company
                .as_deref()
                .map(|c| c.to_lowercase().contains(needle.as_str()))
                .unwrap_or(false);
            if matches {
                candidates.push(candidate_from(row, "company"));
            }
        }
    }

    candidates
}

fn candidate_from(row: &ContactRow, matched_on: &'static str) -> DuplicateCandidate {
    DuplicateCandidate {
        id: row.id.clone(),
        name: row.name.clone(),
        email: row.email.clone(),
        company: row.company.clone(),
        matched_on,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, name: &str, email: Option<&str>, company: Option<&str>) -> ContactRow {
        ContactRow {
            id: id.into(),
            name: name.into(),
            email: email.map(String::from),
            company: company.map(String::from),
        }
    }

    #[test]
    fn test_exact_email_match_case_insensitive() {
        let rows = vec![row("1", "Ada", Some("Ada@X.com"), None)];
        let found = find_candidates(&rows, Some("ada@x.com"), None, DEFAULT_CANDIDATE_CAP);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
        assert_eq!(found[0].matched_on, "email");
    }

    #[test]
    fn test_company_substring_match() {
        let rows = vec![
            row("1", "Ada", None, Some("Acme Holdings Ltd")),
            row("2", "Bob", None, Some("Other Corp")),
        ];
        let found = find_candidates(&rows, None, Some("acme"), DEFAULT_CANDIDATE_CAP);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
        assert_eq!(found[0].matched_on, "company");
    }

    #[test]
    fn test_cap_respected() {
        let rows: Vec<ContactRow> = (0..10)
            .map(|i| row(&i.to_string(), "Dup", Some("dup@x.com"), None))
            .collect();
        let found = find_candidates(&rows, Some("dup@x.com"), None, 3);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_email_wins_over_company_for_same_row() {
        let rows = vec![row("1", "Ada", Some("a@x.com"), Some("Acme"))];
        let found = find_candidates(&rows, Some("a@x.com"), Some("acme"), 3);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_on, "email");
    }

    #[test]
    fn test_no_criteria_returns_nothing() {
        let rows = vec![row("1", "Ada", Some("a@x.com"), Some("Acme"))];
        assert!(find_candidates(&rows, None, None, 3).is_empty());
        assert!(find_candidates(&rows, Some("  "), Some(""), 3).is_empty());
    }

    #[test]
    fn test_typos_are_missed_by_design() {
        let rows = vec![row("1", "Ada", Some("ada@x.com"), None)];
        assert!(find_candidates(&rows, Some("adaa@x.com"), None, 3).is_empty());
    }
}
