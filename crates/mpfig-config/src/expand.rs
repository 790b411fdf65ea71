//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key for error reporting.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(expand_env("upmpost", "toolchain.mpost").unwrap(), "upmpost");
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env("${MPFIG_TEST_SURELY_UNSET:-pdf2svg}", "toolchain.pdf2svg").unwrap();
        assert_eq!(value, "pdf2svg");
    }

    #[test]
    fn test_set_variable_expands() {
        let value = expand_env("${PATH}", "toolchain.mpost").unwrap();
        assert!(!value.is_empty());
        assert!(!value.contains("${"));
    }

    #[test]
    fn test_unset_variable_errors() {
        let err = expand_env("${MPFIG_TEST_SURELY_UNSET}/bin/gs", "toolchain.ghostscript").unwrap_err();
        match err {
            ConfigError::EnvVar { field, message } => {
                assert_eq!(field, "toolchain.ghostscript");
                assert!(message.contains("MPFIG_TEST_SURELY_UNSET"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
