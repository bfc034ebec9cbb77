use std::path::PathBuf;

pub(crate) const DATA_DIR_ENV: &str = "AIMUX_DATA_DIR";

/// CLI value first, then `AIMUX_DATA_DIR`. `None` leaves the choice to the
/// config file or the built-in default.
pub(crate) fn resolve_data_dir(cli_value: Option<&str>) -> Option<PathBuf> {
    resolve_with(cli_value, std::env::var(DATA_DIR_ENV).ok())
}

fn resolve_with(cli_value: Option<&str>, env_value: Option<String>) -> Option<PathBuf> {
    if let Some(value) = cli_value
        && !value.trim().is_empty()
    {
        return Some(PathBuf::from(value.trim()));
    }
    env_value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && !(value.starts_with("${") && value.ends_with('}')))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_beats_env() {
        assert_eq!(
            resolve_with(Some("/srv/aimux"), Some("/tmp/env".to_string())),
            Some(PathBuf::from("/srv/aimux"))
        );
    }

    #[test]
    fn blank_and_placeholder_values_are_unset() {
        assert_eq!(resolve_with(Some("  "), None), None);
        assert_eq!(resolve_with(None, Some("${AIMUX_DATA_DIR}".to_string())), None);
        assert_eq!(
            resolve_with(None, Some(" ./state ".to_string())),
            Some(PathBuf::from("./state"))
        );
    }
}
