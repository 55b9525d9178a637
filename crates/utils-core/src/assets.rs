use std::path::PathBuf;

const DATA_DIR_ENV: &str = "PLANZO_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".planzo";

/// Directory holding the sqlite database and other local state.
///
/// Resolution order: `PLANZO_DATA_DIR`, then `$HOME/.planzo`, then
/// `./.planzo` when no home directory is available.
pub fn asset_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
        tracing::warn!("{DATA_DIR_ENV} is set but empty; falling back to default");
    }

    match dirs::home_dir() {
        Some(home) => home.join(DEFAULT_DATA_DIR),
        None => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_dir_ends_with_data_dir_name() {
        if std::env::var(DATA_DIR_ENV).is_ok() {
            return;
        }
        assert!(asset_dir().ends_with(DEFAULT_DATA_DIR));
    }
}
