use chrono::NaiveDate;

/// Calendar-date + short-revision build tag: `DD-MM-YYYY.<short-hash>`.
///
/// Derived once per pipeline run and reused unchanged by the test build and
/// the publish build, so the tag identifies the checkout both were made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTag(String);

impl BuildTag {
    pub fn derive(date: NaiveDate, short_hash: &str) -> Self {
        Self(format!("{}.{}", date.format("%d-%m-%Y"), short_hash))
    }

    /// Derive using the local calendar date.
    pub fn for_today(short_hash: &str) -> Self {
        Self::derive(chrono::Local::now().date_naive(), short_hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BuildTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully named image reference: `{username}/{image}:{tag}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    repository: String,
    tag: BuildTag,
}

impl ImageRef {
    pub fn new(username: &str, image_name: &str, tag: BuildTag) -> Self {
        Self {
            repository: format!("{username}/{image_name}"),
            tag,
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &BuildTag {
        &self.tag
    }

    /// Registry-qualified form. Docker Hub stays unprefixed, matching how
    /// `docker` itself resolves bare references.
    pub fn qualified(&self, registry: &str) -> String {
        if registry == "docker.io" {
            self.to_string()
        } else {
            format!("{registry}/{self}")
        }
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
