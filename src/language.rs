//! Language pack resolution.
//!
//! Maps a user's requested language codes onto the packs the active engine
//! actually has installed. Resolution never fails: unavailable languages
//! degrade to the configured default so recognition always attempts
//! something.

use std::collections::HashSet;

/// The set of languages handed to the recognition engine after availability
/// fallback. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguages {
    languages: Vec<String>,
    substituted: Vec<String>,
}

impl ResolvedLanguages {
    /// Resolved language codes in request order, unique, never empty.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Requested codes that had no installed pack and fell back to the
    /// default language.
    pub fn substituted(&self) -> &[String] {
        &self.substituted
    }

    /// Joint recognition string in the form the engine expects,
    /// e.g. "eng+deu". All resolved languages are passed to a single engine
    /// invocation; mixed-language documents recognize better jointly than
    /// sequentially.
    pub fn joint(&self) -> String {
        self.languages.join("+")
    }
}

pub struct LanguagePackResolver {
    installed: HashSet<String>,
    default_language: String,
}

impl LanguagePackResolver {
    pub fn new<I, S>(installed: I, default_language: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: installed.into_iter().map(Into::into).collect(),
            default_language: default_language.to_string(),
        }
    }

    pub fn installed(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.installed.iter().cloned().collect();
        langs.sort();
        langs
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Resolve a language request against the installed packs.
    ///
    /// Installed languages pass through in request order. Each missing
    /// language is flagged and the default substituted for it; the default
    /// appears at most once and only when it is not already resolved. An
    /// empty request resolves to the default alone.
    pub fn resolve(&self, requested: &[String]) -> ResolvedLanguages {
        let mut languages: Vec<String> = Vec::new();
        let mut substituted: Vec<String> = Vec::new();

        for code in requested {
            let code = code.trim().to_lowercase();
            if code.is_empty() {
                continue;
            }
            if self.installed.contains(&code) {
                if !languages.contains(&code) {
                    languages.push(code);
                }
            } else if !substituted.contains(&code) {
                tracing::debug!("language pack '{}' not installed, substituting default", code);
                substituted.push(code);
            }
        }

        if !substituted.is_empty() || languages.is_empty() {
            let default = self.default_language.clone();
            if !languages.contains(&default) {
                languages.push(default);
            }
        }

        ResolvedLanguages {
            languages,
            substituted,
        }
    }
}
