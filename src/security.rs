//! Content-security policy for everything the shell loads
//!
//! The policy string is parsed once into directives. Each load the app makes
//! is checked against the directive for its kind: stream addresses against
//! `media-src`, logos against `img-src`, playlist downloads against
//! `connect-src`. A missing directive falls back to `default-src`; a policy
//! with neither allows the load.
//!
//! The app's own origin (`'self'`) is the local filesystem: `file:` URLs and
//! plain paths.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

pub const DEFAULT_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline' 'unsafe-eval'; worker-src 'self' blob:; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; media-src * blob: data:; connect-src * blob:;";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Default,
    Media,
    Img,
    Connect,
}

impl Directive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::Default => "default-src",
            Directive::Media => "media-src",
            Directive::Img => "img-src",
            Directive::Connect => "connect-src",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Refused to load '{url}' because it violates the {directive} directive")]
pub struct Violation {
    pub directive: Directive,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    /// `*`
    Wildcard,
    /// `'self'`
    SelfOrigin,
    /// `'none'`
    None,
    /// `https:`, `data:`...
    Scheme(String),
    Host {
        scheme: Option<String>,
        host: String,
        port: Option<String>,
    },
    /// `'unsafe-inline'` and other keywords that do not govern URLs
    Keyword,
}

#[derive(Debug, Clone, Default)]
pub struct ContentSecurityPolicy {
    directives: HashMap<String, Vec<Source>>,
}

impl ContentSecurityPolicy {
    /// Parse a policy header. Unknown tokens are kept as non-matching
    /// keywords; a repeated directive keeps its first occurrence.
    pub fn parse(policy: &str) -> Self {
        let mut directives = HashMap::new();
        for part in policy.split(';') {
            let mut tokens = part.split_whitespace();
            let Some(name) = tokens.next() else { continue };
            let name = name.to_ascii_lowercase();
            if directives.contains_key(&name) {
                log::debug!("Ignoring repeated CSP directive {}", name);
                continue;
            }
            directives.insert(name, tokens.map(parse_source).collect());
        }
        Self { directives }
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    pub fn allows(&self, directive: Directive, url: &str) -> bool {
        let sources = self
            .directives
            .get(directive.as_str())
            .or_else(|| self.directives.get(Directive::Default.as_str()));
        let Some(sources) = sources else {
            return true;
        };

        let target = Target::parse(url);
        sources.iter().any(|source| source_matches(source, &target))
    }

    pub fn check(&self, directive: Directive, url: &str) -> Result<(), Violation> {
        if self.allows(directive, url) {
            Ok(())
        } else {
            log::warn!("CSP blocked {} load of {}", directive, url);
            Err(Violation {
                directive,
                url: url.to_string(),
            })
        }
    }
}

fn parse_source(token: &str) -> Source {
    let lower = token.to_ascii_lowercase();
    match lower.as_str() {
        "*" => return Source::Wildcard,
        "'self'" => return Source::SelfOrigin,
        "'none'" => return Source::None,
        _ => {}
    }
    if lower.starts_with('\'') {
        return Source::Keyword;
    }
    if let Some(scheme) = lower.strip_suffix(':') {
        if !scheme.is_empty() && scheme.chars().all(is_scheme_char) {
            return Source::Scheme(scheme.to_string());
        }
    }

    let (scheme, rest) = match lower.split_once("://") {
        Some((scheme, rest)) => (Some(scheme.to_string()), rest),
        None => (None, lower.as_str()),
    };
    let authority = rest.split('/').next().unwrap_or(rest);
    let (host, port) = split_port(authority);
    if host.is_empty() {
        return Source::Keyword;
    }
    Source::Host {
        scheme,
        host: host.to_string(),
        port: port.map(str::to_string),
    }
}

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'
}

fn split_port(authority: &str) -> (&str, Option<&str>) {
    // [::1]:8080
    if let Some(rest) = authority.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => (authority, None),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}

/// The parts of a requested address the policy looks at.
#[derive(Debug)]
struct Target {
    scheme: String,
    host: String,
    port: Option<String>,
}

impl Target {
    fn parse(url: &str) -> Self {
        let url = url.trim();
        let scheme = match url.split_once(':') {
            // c:\videos is a drive letter, not a scheme
            Some((s, _)) if s.len() > 1 && s.chars().all(is_scheme_char) => s.to_ascii_lowercase(),
            _ => {
                return Self {
                    scheme: "file".to_string(),
                    host: String::new(),
                    port: None,
                }
            }
        };

        let host_part = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or("")
            .split(['/', '?', '#'])
            .next()
            .unwrap_or("");
        let host_part = host_part.rsplit_once('@').map(|(_, h)| h).unwrap_or(host_part);
        let (host, port) = split_port(host_part);

        Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port: port.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }
}

fn source_matches(source: &Source, target: &Target) -> bool {
    match source {
        Source::Wildcard => !matches!(target.scheme.as_str(), "data" | "blob" | "filesystem"),
        Source::SelfOrigin => target.scheme == "file",
        Source::None | Source::Keyword => false,
        Source::Scheme(scheme) => scheme_matches(scheme, &target.scheme),
        Source::Host { scheme, host, port } => {
            if let Some(scheme) = scheme {
                if !scheme_matches(scheme, &target.scheme) {
                    return false;
                }
            } else if !matches!(target.scheme.as_str(), "http" | "https" | "ws" | "wss") {
                return false;
            }
            if !host_matches(host, &target.host) {
                return false;
            }
            match port.as_deref() {
                None => target.port.is_none(),
                Some("*") => true,
                Some(p) => target.port.as_deref() == Some(p),
            }
        }
    }
}

/// `http:` also admits the secure upgrade, as browsers do.
fn scheme_matches(source: &str, target: &str) -> bool {
    source == target || (source == "http" && target == "https") || (source == "ws" && target == "wss")
}

fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .strip_suffix(suffix)
            .is_some_and(|sub| sub.len() > 1 && sub.ends_with('.')),
        None => pattern == host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ContentSecurityPolicy {
        ContentSecurityPolicy::parse(DEFAULT_POLICY)
    }

    #[test]
    fn test_media_src_wildcard_admits_network_streams() {
        let csp = policy();
        assert!(csp.allows(Directive::Media, "http://ky-tv.cc:80/XTV1313XTV/XTV1313XTV/516261.m3u8"));
        assert!(csp.allows(Directive::Media, "https://example.com/live.m3u8"));
        assert!(csp.allows(Directive::Media, "rtmp://example.com/app/stream"));
        assert!(csp.allows(Directive::Media, "data:video/mp4;base64,AAAA"));
        assert!(csp.allows(Directive::Media, "blob:abc"));
    }

    #[test]
    fn test_img_src_rejects_plain_http() {
        let csp = policy();
        assert!(csp.allows(Directive::Img, "https://cdn.example.com/logo.png"));
        assert!(csp.allows(Directive::Img, "data:image/png;base64,AAAA"));
        assert!(csp.allows(Directive::Img, "/home/me/logo.png"));
        assert!(!csp.allows(Directive::Img, "http://cdn.example.com/logo.png"));

        let err = csp.check(Directive::Img, "http://x/logo.png").unwrap_err();
        assert_eq!(err.directive, Directive::Img);
    }

    #[test]
    fn test_connect_src_excludes_data_urls() {
        let csp = policy();
        assert!(csp.allows(Directive::Connect, "https://example.com/list.m3u"));
        assert!(!csp.allows(Directive::Connect, "data:text/plain,hello"));
    }

    #[test]
    fn test_missing_directive_falls_back_to_default_src() {
        let csp = ContentSecurityPolicy::parse("default-src 'self'; img-src https:");
        assert!(!csp.allows(Directive::Media, "http://example.com/a.m3u8"));
        assert!(csp.allows(Directive::Media, "file:///videos/a.mp4"));
        assert!(csp.allows(Directive::Media, "C:\\videos\\a.mp4"));

        let open = ContentSecurityPolicy::parse("");
        assert!(open.allows(Directive::Connect, "http://anything"));
    }

    #[test]
    fn test_host_sources() {
        let csp = ContentSecurityPolicy::parse("media-src https://*.example.com cdn.test:8080; connect-src 'none'");
        assert!(csp.allows(Directive::Media, "https://live.example.com/a.m3u8"));
        assert!(!csp.allows(Directive::Media, "https://example.com/a.m3u8"));
        assert!(!csp.allows(Directive::Media, "http://live.example.com/a.m3u8"));
        assert!(csp.allows(Directive::Media, "http://user:pw@cdn.test:8080/a.ts"));
        assert!(!csp.allows(Directive::Media, "http://cdn.test/a.ts"));
        assert!(!csp.allows(Directive::Connect, "https://example.com"));
    }
}
