//! Build-time checks on resource names and route prefixes.

use crate::error::ConfigError;

/// A resource name becomes one path segment: non-empty, ASCII alphanumerics, `-` and `_`.
pub fn validate_resource_name(name: &str) -> Result<(), ConfigError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidResourceName(name.to_string()))
    }
}

/// Normalise an API prefix to `/seg[/seg..]` without a trailing slash; `""` and `"/"` mean the root.
pub fn normalize_prefix(prefix: &str) -> Result<String, ConfigError> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    for seg in trimmed.split('/') {
        validate_resource_name(seg).map_err(|_| {
            ConfigError::InvalidEnv {
                name: "API_PREFIX".into(),
                reason: format!("invalid path segment '{}'", seg),
            }
        })?;
    }
    Ok(format!("/{}", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names() {
        assert!(validate_resource_name("items").is_ok());
        assert!(validate_resource_name("user-profiles_2").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("a/b").is_err());
        assert!(validate_resource_name(":id").is_err());
    }

    #[test]
    fn prefixes() {
        assert_eq!(normalize_prefix("/api/v1/").unwrap(), "/api/v1");
        assert_eq!(normalize_prefix("api").unwrap(), "/api");
        assert_eq!(normalize_prefix("/").unwrap(), "");
        assert!(normalize_prefix("/api/{x}").is_err());
    }
}
