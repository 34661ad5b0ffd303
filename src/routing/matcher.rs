//! Pattern matching primitives used by the built-in predicates.
//!
//! # Responsibilities
//! - Match request paths against Ant-style patterns (`*`, `**`, `?`, `{var}`)
//! - Match host names label by label, case-insensitively
//!
//! # Design Decisions
//! - Host matching is case-insensitive
//! - Path matching is case-sensitive
//! - No regex: patterns are split once and matched segment by segment
//! - Wildcards are matched with a suffix table, never by backtracking

/// A pre-split Ant-style pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntPattern {
    segments: Vec<String>,
    separator: char,
}

impl AntPattern {
    fn new(pattern: &str, separator: char) -> Self {
        Self {
            segments: split(pattern, separator),
            separator,
        }
    }

    fn matches(&self, value: &str) -> bool {
        let parts = split(value, self.separator);
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        let segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        match_segments(&segments, &parts)
    }
}

fn split(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Bottom-up table over (pattern, parts) suffixes; each cell is computed once,
/// so repeated `**` stays O(pattern * parts).
fn match_segments(pattern: &[&str], parts: &[&str]) -> bool {
    let (p, n) = (pattern.len(), parts.len());
    // row[j]: pattern[i..] matches parts[j..]; next is row i + 1.
    let mut next = vec![false; n + 1];
    next[n] = true;
    for i in (0..p).rev() {
        let mut row = vec![false; n + 1];
        if pattern[i] == "**" {
            row[n] = next[n];
            for j in (0..n).rev() {
                row[j] = next[j] || row[j + 1];
            }
        } else {
            for j in 0..n {
                row[j] = next[j + 1] && match_segment(pattern[i], parts[j]);
            }
        }
        next = row;
    }
    next[0]
}

/// Match one segment with `*`, `?` and `{var}` wildcards.
fn match_segment(pattern: &str, part: &str) -> bool {
    if pattern.starts_with('{') && pattern.ends_with('}') {
        return true;
    }
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = part.chars().collect();
    glob(&p, &s)
}

fn glob(p: &[char], s: &[char]) -> bool {
    let n = s.len();
    let mut next = vec![false; n + 1];
    next[n] = true;
    for i in (0..p.len()).rev() {
        let mut row = vec![false; n + 1];
        match p[i] {
            '*' => {
                row[n] = next[n];
                for j in (0..n).rev() {
                    row[j] = next[j] || row[j + 1];
                }
            }
            '?' => {
                for j in 0..n {
                    row[j] = next[j + 1];
                }
            }
            c => {
                for j in 0..n {
                    row[j] = s[j] == c && next[j + 1];
                }
            }
        }
        next = row;
    }
    next[0]
}

/// Matches request paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    inner: AntPattern,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let inner = AntPattern::new(&raw, '/');
        Self { raw, inner }
    }

    /// Match `path`; a trailing slash is only ignored when `match_trailing_slash` is set.
    pub fn matches(&self, path: &str, match_trailing_slash: bool) -> bool {
        let has_trailing = path.len() > 1 && path.ends_with('/');
        if has_trailing && !match_trailing_slash && !self.raw.ends_with('/') {
            return false;
        }
        self.inner.matches(path)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Matches the Host header.
/// Patterns and hosts are normalized to lowercase; ports are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    inner: AntPattern,
}

impl HostPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into().to_lowercase();
        Self {
            inner: AntPattern::new(strip_port(&pattern), '.'),
        }
    }

    pub fn matches(&self, host: &str) -> bool {
        self.inner.matches(strip_port(&host.to_lowercase()))
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_double_wildcard() {
        let pattern = PathPattern::new("/api/**");
        assert!(pattern.matches("/api/x", false));
        assert!(pattern.matches("/api", false));
        assert!(pattern.matches("/api/v1/users/7", false));
        assert!(!pattern.matches("/other", false));
        assert!(!pattern.matches("/apix", false));
    }

    #[test]
    fn test_path_segment_wildcards() {
        assert!(PathPattern::new("/users/{id}/orders").matches("/users/42/orders", false));
        assert!(PathPattern::new("/img/*.png").matches("/img/cat.png", false));
        assert!(!PathPattern::new("/img/*.png").matches("/img/cat.jpg", false));
        assert!(PathPattern::new("/v?/items").matches("/v2/items", false));
        assert!(!PathPattern::new("/users/*").matches("/users/1/2", false));
    }

    #[test]
    fn test_path_trailing_slash() {
        let pattern = PathPattern::new("/red");
        assert!(pattern.matches("/red", false));
        assert!(!pattern.matches("/red/", false));
        assert!(pattern.matches("/red/", true));
    }

    #[test]
    fn test_host_pattern() {
        let pattern = HostPattern::new("**.example.com");
        assert!(pattern.matches("api.example.com"));
        assert!(pattern.matches("a.b.EXAMPLE.com:8080"));
        assert!(!pattern.matches("example.org"));

        let exact = HostPattern::new("example.com");
        assert!(exact.matches("Example.Com"));
        assert!(!exact.matches("www.example.com"));
    }

    #[test]
    fn test_many_wildcards_on_long_path() {
        let pattern = PathPattern::new("/**/a/**/b/**/c/**/d/**/e/**/z");
        let long: String = "/x".repeat(2_000);
        assert!(!pattern.matches(&long, false));
        assert!(pattern.matches(&format!("{long}/a/b/c/d/e/z"), false));

        let glob = PathPattern::new("/*a*b*c*d*e*z");
        let segment = format!("/{}", "a".repeat(2_000));
        assert!(!glob.matches(&segment, false));
    }
}
