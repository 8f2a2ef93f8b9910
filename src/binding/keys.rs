//! Candidate section keys for an options type.

/// Suffix conventionally carried by options type names.
pub const DEFAULT_SUFFIX: &str = "Options";

/// Generates the conventional section keys for `type_name`.
///
/// The exact name always comes first. If the name ends with `suffix` the
/// second key is the name without it, otherwise the name with it appended:
///
/// ```
/// use dragon_options::generate_keys;
///
/// assert_eq!(generate_keys("SampleOptions", "Options"), ["SampleOptions", "Sample"]);
/// assert_eq!(generate_keys("Sample", "Options"), ["Sample", "SampleOptions"]);
/// ```
///
/// An empty suffix, or a name that is nothing but the suffix, yields only the
/// exact name.
pub fn generate_keys(type_name: &str, suffix: &str) -> Vec<String> {
    let mut keys = vec![type_name.to_string()];
    if suffix.is_empty() {
        return keys;
    }

    match type_name.strip_suffix(suffix) {
        Some("") => {}
        Some(stem) => keys.push(stem.to_string()),
        None => keys.push(format!("{type_name}{suffix}")),
    }
    keys
}

/// An ordered list of section keys to probe, or no list at all.
///
/// Absent and empty lists both bind nothing; they are kept apart so callers
/// can tell "no keys were supplied" from "an empty list was supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateKeys(Option<Vec<String>>);

impl CandidateKeys {
    /// No candidate list at all.
    pub fn absent() -> Self {
        Self(None)
    }

    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Some(keys.into_iter().map(Into::into).collect()))
    }

    /// The conventional keys for `type_name`; see [`generate_keys`].
    pub fn generated(type_name: &str, suffix: &str) -> Self {
        Self(Some(generate_keys(type_name, suffix)))
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Returns `true` when there is nothing to probe.
    pub fn is_empty(&self) -> bool {
        self.0.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, Vec::len)
    }

    /// Keys in probe order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flatten().map(String::as_str)
    }

    pub fn as_slice(&self) -> Option<&[String]> {
        self.0.as_deref()
    }
}

impl From<Vec<String>> for CandidateKeys {
    fn from(keys: Vec<String>) -> Self {
        Self(Some(keys))
    }
}

impl From<Option<Vec<String>>> for CandidateKeys {
    fn from(keys: Option<Vec<String>>) -> Self {
        Self(keys)
    }
}

impl From<&[&str]> for CandidateKeys {
    fn from(keys: &[&str]) -> Self {
        Self::new(keys.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for CandidateKeys {
    fn from(keys: [&str; N]) -> Self {
        Self::new(keys)
    }
}

impl From<&str> for CandidateKeys {
    fn from(key: &str) -> Self {
        Self::new([key])
    }
}

impl From<String> for CandidateKeys {
    fn from(key: String) -> Self {
        Self(Some(vec![key]))
    }
}

impl From<&CandidateKeys> for CandidateKeys {
    fn from(keys: &CandidateKeys) -> Self {
        keys.clone()
    }
}
