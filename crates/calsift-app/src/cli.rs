//! Command-line arguments.

use std::path::PathBuf;

use calsift_core::config::Settings;
use clap::{Args, Parser, Subcommand};

use crate::walk::Depth;

#[derive(Debug, Parser)]
#[command(name = "calsift", version, about = "CalDAV REPORT queries over iCalendar files")]
pub struct Cli {
    /// Time zone applied to floating times, overriding `calendar.default_timezone`
    #[arg(long, global = true)]
    pub timezone: Option<String>,

    /// Let param-filters match standard iCalendar parameters
    #[arg(long, global = true)]
    pub match_standard_parameters: bool,

    /// Maximum resource size in octets
    #[arg(long, global = true)]
    pub max_resource_size: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a REPORT request body against a collection directory
    Report {
        /// File holding the REPORT XML body
        request: PathBuf,

        #[command(flatten)]
        collection: CollectionArgs,
    },
    /// Print the collection etag
    Etag {
        #[command(flatten)]
        collection: CollectionArgs,
    },
    /// Parse one iCalendar file and print it re-serialized
    Check {
        file: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct CollectionArgs {
    /// Directory holding the collection's `.ics` files
    pub directory: PathBuf,

    #[arg(long, value_enum, default_value_t = Depth::One)]
    pub depth: Depth,

    /// Href prefix members are reported under
    #[arg(long, default_value = "/")]
    pub href_base: String,
}

impl Cli {
    /// Applies command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(timezone) = &self.timezone {
            settings.calendar.default_timezone.clone_from(timezone);
        }
        if self.match_standard_parameters {
            settings.filter.match_standard_parameters = true;
        }
        if let Some(size) = self.max_resource_size {
            settings.limits.max_resource_size = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_settings() {
        let cli = Cli::parse_from([
            "calsift",
            "--timezone",
            "Europe/Berlin",
            "--max-resource-size",
            "8192",
            "report",
            "query.xml",
            "cal",
            "--depth",
            "infinity",
        ]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.calendar.default_timezone, "Europe/Berlin");
        assert_eq!(settings.limits.max_resource_size, 8192);
        assert!(!settings.filter.match_standard_parameters);
        let Command::Report { request, collection } = cli.command else {
            panic!("expected report");
        };
        assert_eq!(request, PathBuf::from("query.xml"));
        assert_eq!(collection.depth, Depth::Infinity);
        assert_eq!(collection.href_base, "/");
    }
}
