use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};

/// "Did you mean" suggestions for queries that matched nothing.
///
/// Display only: suggestions never become candidates.
pub struct FuzzySuggester {
    matcher: Matcher,
}

impl FuzzySuggester {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Best `limit` names for `needle`, by score descending then name
    pub fn suggest<'a>(
        &mut self,
        needle: &str,
        names: impl IntoIterator<Item = &'a str>,
        limit: usize,
    ) -> Vec<String> {
        if needle.trim().is_empty() || limit == 0 {
            return Vec::new();
        }

        let pattern = Pattern::parse(needle, CaseMatching::Ignore, Normalization::Smart);

        let mut scored: Vec<(u32, &str)> = names
            .into_iter()
            .filter_map(|name| {
                let haystack = Utf32String::from(name);
                pattern
                    .score(haystack.slice(..), &mut self.matcher)
                    .map(|score| (score, name))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored.truncate(limit);
        scored.into_iter().map(|(_, name)| name.to_string()).collect()
    }
}

impl Default for FuzzySuggester {
    fn default() -> Self {
        Self::new()
    }
}
