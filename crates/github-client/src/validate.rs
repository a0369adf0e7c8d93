use crate::error::GitHubError;

/// Longest repository name GitHub accepts
pub const MAX_REPOSITORY_NAME_LENGTH: usize = 100;

/// Check a repository name against GitHub's naming rules.
///
/// The name is trimmed first. It must be 1 to 100 characters of ASCII
/// letters, digits, `-`, `_` and `.`, may not start or end with `.`, and may
/// not contain `..`.
pub fn validate_repository_name(name: &str) -> Result<(), GitHubError> {
    let name = name.trim();
    let invalid = |reason: &str| {
        Err(GitHubError::InvalidRepositoryName(format!(
            "'{}': {}",
            name, reason
        )))
    };

    let length = name.chars().count();
    if length == 0 {
        return invalid("name is empty");
    }
    if length > MAX_REPOSITORY_NAME_LENGTH {
        return invalid("name is longer than 100 characters");
    }
    if name.starts_with('.') || name.ends_with('.') {
        return invalid("name may not start or end with '.'");
    }
    if name.contains("..") {
        return invalid("name may not contain '..'");
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return invalid(&format!("character '{}' is not allowed", c));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_names() {
        assert!(validate_repository_name("abc.def-1_2").is_ok());
        assert!(validate_repository_name("acme-widgets-private").is_ok());
        assert!(validate_repository_name("  padded  ").is_ok());
        assert!(validate_repository_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn test_rejects_invalid_names() {
        for name in [".hidden", "trailing.", "a..b", "", "   ", "has space", "emoji🚀", "slash/name"] {
            assert!(
                matches!(
                    validate_repository_name(name),
                    Err(GitHubError::InvalidRepositoryName(_))
                ),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_repository_name(&"a".repeat(101)).is_err());
    }
}
