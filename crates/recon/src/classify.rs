//! Keyword-based security flag.

/// Keyword set used by the merge script. Substring matches, no word boundaries,
/// so "css" also fires inside unrelated words.
pub const DEFAULT_SECURITY_KEYWORDS: &[&str] = &[
    "race",
    "racy",
    "buffer",
    "overflow",
    "stack",
    "integer",
    "signedness",
    "underflow",
    "improper",
    "unauthenticated",
    "gain access",
    "permission",
    "cross site",
    "css",
    "xss",
    "denial service",
    "dos",
    "crash",
    "deadlock",
    "injection",
    "request forgery",
    "csrf",
    "xsrf",
    "forged",
    "security",
    "vulnerability",
    "vulnerable",
    "exploit",
    "attack",
    "bypass",
    "backdoor",
    "threat",
    "expose",
    "breach",
    "violate",
    "fatal",
    "blacklist",
    "overrun",
    "insecure",
];

/// Stateless keyword scan. Keywords are lowercased once at construction.
#[derive(Debug, Clone)]
pub struct SecurityClassifier {
    keywords: Vec<String>,
}

impl Default for SecurityClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SECURITY_KEYWORDS)
    }
}

impl SecurityClassifier {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// `None` (missing text) is never a security hit.
    pub fn classify(&self, text: Option<&str>) -> bool {
        self.first_match(text).is_some()
    }

    /// The first configured keyword found in `text`, if any.
    pub fn first_match(&self, text: Option<&str>) -> Option<&str> {
        let text = text?.to_lowercase();
        self.keywords
            .iter()
            .find(|k| text.contains(k.as_str()))
            .map(String::as_str)
    }

    /// Space-join the available parts (missing parts count as "") and classify.
    pub fn classify_parts(&self, parts: &[Option<&str>]) -> bool {
        let joined = parts
            .iter()
            .map(|p| p.unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ");
        self.classify(Some(&joined))
    }
}
