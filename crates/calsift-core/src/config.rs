use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_MAX_COMPONENT_DEPTH, DEFAULT_MAX_INSTANCES, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_MAX_RESOURCE_SIZE, MIN_MAX_COMPONENT_DEPTH, MIN_MAX_RESOURCE_SIZE, PRODUCT_ID,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bounds applied while reading a calendar resource.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Largest resource accepted, in octets.
    pub max_resource_size: u64,
    /// Largest unfolded content line accepted, in octets.
    pub max_line_length: usize,
    /// Deepest component nesting accepted.
    pub max_component_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_resource_size: DEFAULT_MAX_RESOURCE_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_component_depth: DEFAULT_MAX_COMPONENT_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    /// Upper bound on recurrence instances generated per component.
    pub max_instances: u16,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Allow `param-filter` to address standard RFC 5545 parameters
    /// (PARTSTAT, ROLE, ...) in addition to extension parameters.
    #[serde(default)]
    pub match_standard_parameters: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Zone used for floating times when a query carries no `timezone`.
    pub default_timezone: String,
    pub product_id: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            product_id: PRODUCT_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it or
    /// validating the limits fails.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("limits.max_resource_size", DEFAULT_MAX_RESOURCE_SIZE)?
            .set_default("limits.max_line_length", 8192)?
            .set_default(
                "limits.max_component_depth",
                u64::try_from(DEFAULT_MAX_COMPONENT_DEPTH).unwrap_or(u64::MAX),
            )?
            .set_default("expansion.max_instances", 1000)?
            .set_default("filter.match_standard_parameters", false)?
            .set_default("calendar.default_timezone", "UTC")?
            .set_default("calendar.product_id", PRODUCT_ID)?
            .set_default("logging.level", "info")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        tracing::debug!(
            max_resource_size = settings.limits.max_resource_size,
            max_line_length = settings.limits.max_line_length,
            "Loaded settings"
        );

        Ok(settings)
    }

    /// ## Summary
    /// Checks the limits against their hard floors.
    ///
    /// ## Errors
    /// Returns `CoreError::LimitTooLow` if any limit is below its floor: 4 KiB
    /// for the resource size, 3 for the component depth and 1 for the line
    /// length and instance bound. Returns `CoreError::ConfigError` for a blank
    /// product id.
    pub fn validate(&self) -> CoreResult<()> {
        let limits: [(&'static str, u64, u64); 4] = [
            (
                "limits.max_resource_size",
                self.limits.max_resource_size,
                MIN_MAX_RESOURCE_SIZE,
            ),
            (
                "limits.max_line_length",
                u64::try_from(self.limits.max_line_length).unwrap_or(u64::MAX),
                1,
            ),
            (
                "limits.max_component_depth",
                u64::try_from(self.limits.max_component_depth).unwrap_or(u64::MAX),
                u64::try_from(MIN_MAX_COMPONENT_DEPTH).unwrap_or(u64::MAX),
            ),
            (
                "expansion.max_instances",
                u64::from(self.expansion.max_instances),
                1,
            ),
        ];
        for (name, value, min) in limits {
            if value < min {
                return Err(CoreError::LimitTooLow { name, value, min });
            }
        }
        if self.calendar.product_id.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "calendar.product_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.limits.max_resource_size, 10 * 1024 * 1024);
        assert_eq!(settings.limits.max_line_length, DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(settings.calendar.default_timezone, "UTC");
        assert!(!settings.filter.match_standard_parameters);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_resource_size_below_floor() {
        let mut settings = Settings::default();
        settings.limits.max_resource_size = 4095;
        assert_eq!(
            settings.validate(),
            Err(CoreError::LimitTooLow {
                name: "limits.max_resource_size",
                value: 4095,
                min: 4096,
            })
        );

        settings.limits.max_resource_size = 4096;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_shallow_component_depth() {
        let mut settings = Settings::default();
        assert_eq!(settings.limits.max_component_depth, 64);
        settings.limits.max_component_depth = 2;
        assert_eq!(
            settings.validate(),
            Err(CoreError::LimitTooLow {
                name: "limits.max_component_depth",
                value: 2,
                min: 3,
            })
        );
    }

    #[test]
    fn rejects_zero_line_length() {
        let mut settings = Settings::default();
        settings.limits.max_line_length = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_blank_product_id() {
        let mut settings = Settings::default();
        settings.calendar.product_id = "  ".into();
        assert!(matches!(
            settings.validate(),
            Err(CoreError::ConfigError(_))
        ));
    }
}
