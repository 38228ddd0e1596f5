pub mod formatters;

use std::env;
use std::path::{Path, PathBuf};

pub fn resolve_config_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir.map_or_else(
        || {
            let home_dir = home::home_dir().unwrap_or_else(env::temp_dir);
            home_dir.join(".aws-saml-auth")
        },
        PathBuf::from,
    )
}

/// AWS account ids are exactly twelve digits.
pub fn validate_account_id(s: &str) -> Result<String, String> {
    if s.len() != 12 {
        return Err(format!(
            "AWS Account ID must be exactly 12 digits, got {}",
            s.len()
        ));
    }
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Err("AWS Account ID must contain only digits".to_string());
    }
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_config_dir() {
        assert_eq!(
            resolve_config_dir(Some(Path::new("/etc/aws-saml-auth"))),
            PathBuf::from("/etc/aws-saml-auth")
        );
        assert!(resolve_config_dir(None).ends_with(".aws-saml-auth"));
    }

    #[test]
    fn test_validate_account_id() {
        assert_eq!(validate_account_id("123456789012").unwrap(), "123456789012");
        assert!(validate_account_id("12345678901").is_err());
        assert!(validate_account_id("12345678901a").is_err());
    }
}
