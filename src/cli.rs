use clap::Parser;
use tracing::Level;

use crate::options::ExtractOptions;

#[derive(Parser, Debug)]
#[command(name = "zipstrip")]
#[command(version)]
#[command(about = "Extract a ZIP archive, optionally stripping leading path components", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipstrip release.zip                          extract into ./release\n  \
  zipstrip -d out --strip-components 1 v1.zip   drop the top-level folder\n  \
  zipstrip -l --strip-components 1 v1.zip       show where each entry would go")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Extract files into exdir (default: FILE without its extension)
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Drop N leading path components from every entry
    #[arg(long = "strip-components", value_name = "N", default_value_t = 0)]
    pub strip_components: usize,

    /// Remove the archive after a successful extraction
    #[arg(long = "delete-source")]
    pub delete_source: bool,

    /// List entries and their destinations without extracting
    #[arg(short = 'l')]
    pub list: bool,

    /// Quiet mode, only errors are reported
    #[arg(short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::default()
            .strip_components(self.strip_components)
            .delete_source(self.delete_source);
        if let Some(dir) = &self.extract_dir {
            options = options.destination(dir);
        }
        options
    }

    pub fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }
}
