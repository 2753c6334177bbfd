//! Links file parsing.

use anyhow::Context;
use sitewatch_core::SiteDescriptor;
use std::path::Path;

/// Parse one site URL per line.
///
/// Blank lines and lines starting with `#` are ignored. Lines that are not
/// valid site URLs are logged and skipped so one typo does not stop a batch.
#[must_use]
pub fn parse_links(contents: &str) -> Vec<SiteDescriptor> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match SiteDescriptor::parse(line) {
                Ok(site) => Some(site),
                Err(e) => {
                    tracing::warn!("skipping line {}: {}", index + 1, e);
                    None
                }
            }
        })
        .collect()
}

/// Read and parse a links file.
pub fn read_links(path: &Path) -> anyhow::Result<Vec<SiteDescriptor>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read links file {}", path.display()))?;
    Ok(parse_links(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_blank_lines_and_comments() {
        let sites = parse_links(
            "# production\nhttps://example.com\n\n   \n  # staging\nhttp://staging.example.org/\n",
        );
        let domains: Vec<&str> = sites.iter().map(|s| s.domain().as_str()).collect();
        assert_eq!(domains, vec!["example.com", "staging.example.org"]);
    }

    #[test]
    fn test_keeps_input_order_and_duplicates() {
        let sites = parse_links("https://b.example\nhttps://a.example\nhttps://b.example\n");
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[0].domain().as_str(), "b.example");
        assert_eq!(sites[1].domain().as_str(), "a.example");
    }

    #[test]
    fn test_invalid_lines_are_dropped() {
        let sites = parse_links("not a url\nftp://files.example\nhttps://example.com\n");
        assert_eq!(sites.len(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = read_links(Path::new("/nonexistent/links.txt")).unwrap_err();
        assert!(err.to_string().contains("links.txt"));
    }
}
