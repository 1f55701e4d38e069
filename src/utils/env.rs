/// Get environment variable with YAYA_ prefix, falling back to unprefixed version
///
/// Checks `YAYA_{key}` first, then `{key}`, so deployments can namespace
/// settings without breaking the conventional `SECRET_KEY` / `PORT` names.
///
/// # Examples
///
/// ```rust,ignore
/// use yaya_webhook::utils::get_env_with_prefix;
///
/// // Checks YAYA_SECRET_KEY first, then SECRET_KEY
/// let key = get_env_with_prefix("SECRET_KEY");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("YAYA_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        // Prefixed value wins over the plain one
        unsafe {
            std::env::set_var("YAYA_ENV_TEST_PREFIXED", "prefixed_value");
            std::env::set_var("ENV_TEST_PREFIXED", "plain_value");
        }
        assert_eq!(
            get_env_with_prefix("ENV_TEST_PREFIXED"),
            Some("prefixed_value".to_string())
        );
        unsafe {
            std::env::remove_var("YAYA_ENV_TEST_PREFIXED");
            std::env::remove_var("ENV_TEST_PREFIXED");
        }

        unsafe {
            std::env::set_var("ENV_TEST_FALLBACK", "unprefixed_value");
        }
        assert_eq!(
            get_env_with_prefix("ENV_TEST_FALLBACK"),
            Some("unprefixed_value".to_string())
        );
        unsafe {
            std::env::remove_var("ENV_TEST_FALLBACK");
        }

        assert_eq!(get_env_with_prefix("ENV_TEST_NON_EXISTENT"), None);
    }
}
