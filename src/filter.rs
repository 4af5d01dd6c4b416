use crate::config::FilterConfig;
use regex::Regex;
use url::Url;

/// Decides which network responses carry a per-page document
#[derive(Debug)]
pub struct ResponseFilter {
    config: FilterConfig,
    exclude_regexes: Vec<Regex>,
    page_index_regex: Option<Regex>,
}

impl Default for ResponseFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default()).expect("Default filter has no patterns to compile")
    }
}

impl ResponseFilter {
    /// Create a new response filter from configuration
    pub fn new(config: FilterConfig) -> Result<Self, regex::Error> {
        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        let page_index_regex = match &config.page_index_pattern {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };

        Ok(Self {
            config,
            exclude_regexes,
            page_index_regex,
        })
    }

    /// Returns the canonical URL if the response is a per-page document, `None` otherwise
    pub fn qualify(&self, url: &str) -> Option<String> {
        let canonical = canonical_url(url);

        if !canonical.contains(&self.config.resource_marker) {
            return None;
        }
        if !canonical.ends_with(&self.config.document_suffix) {
            return None;
        }

        // Exclusions take precedence over the markers
        for regex in &self.exclude_regexes {
            if regex.is_match(&canonical) {
                ::log::trace!("Excluded by pattern {}: {}", regex.as_str(), url);
                return None;
            }
        }

        Some(canonical)
    }

    /// Page number embedded in the canonical URL, if a page index pattern is configured
    pub fn page_index(&self, canonical: &str) -> Option<u32> {
        let regex = self.page_index_regex.as_ref()?;
        regex
            .captures(canonical)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Strip the query string and fragment from a URL.
///
/// Absolute URLs go through `Url` so equivalent spellings collapse to one key;
/// anything that does not parse is cut at the first `?` or `#`.
pub fn canonical_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}
