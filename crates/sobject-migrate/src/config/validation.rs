//! Configuration validation.

use super::JobConfig;
use crate::error::{MigrateError, Result};

/// Validate the job configuration.
///
/// Per-object query problems are not checked here; they surface as
/// configuration errors of the owning task during setup.
pub fn validate(config: &JobConfig) -> Result<()> {
    if config.objects.is_empty() {
        return Err(MigrateError::InvalidConfig(
            "at least one object is required".into(),
        ));
    }

    for (idx, object) in config.objects.iter().enumerate() {
        if object.query.trim().is_empty() {
            return Err(MigrateError::InvalidConfig(format!(
                "objects[{}].query is required",
                idx
            )));
        }
    }

    if !config.source.medium.is_describable() && !config.target.medium.is_describable() {
        return Err(MigrateError::InvalidConfig(
            "source and target cannot both be csv files".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MediumConfig, ObjectConfig};

    fn valid_config() -> JobConfig {
        JobConfig {
            source: MediumConfig::org("source"),
            target: MediumConfig::org("target"),
            objects: vec![ObjectConfig::new("SELECT Name FROM Account")],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_no_objects() {
        let mut config = valid_config();
        config.objects.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_query() {
        let mut config = valid_config();
        config.objects.push(ObjectConfig::new("   "));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("objects[1].query"));
    }

    #[test]
    fn test_both_sides_csv() {
        let mut config = valid_config();
        config.source = MediumConfig::csv_file();
        config.target = MediumConfig::csv_file();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_one_side_csv_is_allowed() {
        let mut config = valid_config();
        config.source = MediumConfig::csv_file();
        assert!(validate(&config).is_ok());
    }
}
