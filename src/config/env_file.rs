//! `.env` file parsing.
//!
//! Accepts `KEY=VALUE` lines, `#` comments, an optional `export ` prefix
//! and single or double quoted values.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Reads an env file. A missing file yields no values.
pub fn read(path: &Path) -> io::Result<HashMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e),
    }
}

/// Parses env file content. Later lines override earlier ones.
#[must_use]
pub fn parse(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            continue;
        }

        values.insert(key.to_string(), parse_value(value.trim()));
    }

    values
}

fn parse_value(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return rest[..end].to_string();
            }
        }
    }

    // Inline comments need leading whitespace; '#' is legal inside passwords
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic() {
        let values = parse(
            "# Bitwarden\nBW_CLIENTID=user.abc\nexport BW_SERVER = vault.example.com\n\n",
        );
        assert_eq!(values.get("BW_CLIENTID").map(String::as_str), Some("user.abc"));
        assert_eq!(
            values.get("BW_SERVER").map(String::as_str),
            Some("vault.example.com")
        );
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_quotes_and_comments() {
        let values = parse(
            "BW_PASSWORD=\"p@ss #1\"\nA='single'\nB=pa#ss\nC=value # trailing\nBROKEN LINE\n",
        );
        assert_eq!(values["BW_PASSWORD"], "p@ss #1");
        assert_eq!(values["A"], "single");
        assert_eq!(values["B"], "pa#ss");
        assert_eq!(values["C"], "value");
        assert!(!values.contains_key("BROKEN LINE"));
    }

    #[test]
    fn test_later_lines_win() {
        let values = parse("A=1\nA=2\n");
        assert_eq!(values["A"], "2");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read(&dir.path().join(".env")).unwrap().is_empty());
    }
}
