//! Default-name derivation and sanitization shared by every importer.

use std::collections::HashSet;

/// Lowercase `s`, collapse every run of non-alphanumeric characters into a single `_`, and trim
/// leading/trailing underscores.
pub fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sep = false;
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

/// `defaultName = sanitize(fileStem) + "__" + sanitize(objectName)`.
///
/// Single-object importers (CSV/TSV/JSON/Parquet) report the file stem itself as their object
/// name, since there is no sheet/table/range to distinguish — doubling it into the default name
/// would be pure noise, so in that case the default name collapses to `sanitize(fileStem)` alone.
/// Multi-object importers (Excel) pass a real object name and get the full `fileStem__objectName`
/// form, disambiguating sheets that share a name across workbooks.
pub fn default_name(file_stem: &str, object_name: &str) -> String {
    if object_name == file_stem {
        return sanitize(file_stem);
    }
    format!("{}__{}", sanitize(file_stem), sanitize(object_name))
}

/// Resolve collisions among default names produced by a single import, appending `_2`, `_3`, ...
/// in enumeration order. Names that don't collide are returned unchanged.
pub fn dedupe_within_import(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        if seen.insert(name.clone()) {
            out.push(name);
            continue;
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{name}_{n}");
            if seen.insert(candidate.clone()) {
                out.push(candidate);
                break;
            }
            n += 1;
        }
    }
    out
}

/// A valid SQL identifier per spec: `[A-Za-z_][A-Za-z0-9_]*`, and not a reserved word of the
/// embedded store.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.clone().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !RESERVED_WORDS.contains(&name.to_ascii_uppercase().as_str())
}

/// A small, non-exhaustive set of reserved words recognized by the embedded SQL store.
/// `rename` is the only operation that consults this list; it is intentionally conservative.
const RESERVED_WORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "ORDER", "BY", "JOIN", "INNER", "OUTER", "LEFT", "RIGHT",
    "ON", "AS", "AND", "OR", "NOT", "NULL", "TABLE", "VIEW", "CREATE", "DROP", "INSERT", "UPDATE",
    "DELETE", "INTO", "VALUES", "LIMIT", "OFFSET", "UNION", "ALL", "DISTINCT", "HAVING",
];
