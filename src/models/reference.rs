use std::fmt;

/// Tag assumed when a model name carries none
pub const DEFAULT_TAG: &str = "latest";

/// A model name split into its registry coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReference {
    /// `namespace/repository`, namespace filled in when absent
    pub repository: String,
    pub tag: String,
}

impl ModelReference {
    /// Parse `[namespace/]repository[:tag]`
    ///
    /// Bare repositories get `default_namespace` prepended, so `llama3:8b`
    /// becomes `library/llama3` with tag `8b`.
    #[must_use]
    pub fn parse(name: &str, default_namespace: &str) -> Self {
        let (repository, tag) = match name.rsplit_once(':') {
            // a colon followed by a slash belongs to a host:port prefix, not a tag
            Some((repo, tag)) if !tag.contains('/') && !tag.is_empty() => (repo, tag),
            Some((repo, "")) => (repo, DEFAULT_TAG),
            _ => (name, DEFAULT_TAG),
        };

        let repository = if repository.contains('/') {
            repository.to_string()
        } else {
            format!("{}/{repository}", default_namespace.trim_end_matches('/'))
        };

        Self {
            repository,
            tag: tag.to_string(),
        }
    }

    /// Registry path of this model's manifest
    #[must_use]
    pub fn manifest_path(&self) -> String {
        format!("/v2/{}/manifests/{}", self.repository, self.tag)
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_gets_namespace() {
        let reference = ModelReference::parse("llama3:8b", "library");
        assert_eq!(reference.repository, "library/llama3");
        assert_eq!(reference.tag, "8b");
    }

    #[test]
    fn test_namespaced_name_kept() {
        let reference = ModelReference::parse("jmorgan/mixtral:latest", "library");
        assert_eq!(reference.repository, "jmorgan/mixtral");
        assert_eq!(reference.tag, "latest");
    }

    #[test]
    fn test_missing_tag_defaults_to_latest() {
        assert_eq!(ModelReference::parse("phi3", "library").tag, "latest");
        assert_eq!(ModelReference::parse("phi3:", "library").tag, "latest");
    }

    #[test]
    fn test_manifest_path() {
        let reference = ModelReference::parse("foo:latest", "library");
        assert_eq!(reference.manifest_path(), "/v2/library/foo/manifests/latest");
        assert_eq!(reference.to_string(), "library/foo:latest");
    }
}
