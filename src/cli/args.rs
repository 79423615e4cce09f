//! Command-line argument parsing for symptriage
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// symptriage - symptom-based disease triage from the terminal
#[derive(Parser, Debug)]
#[command(name = "symptriage")]
#[command(author, version)]
#[command(
    about = "Predict a likely disease from symptoms using a classifier ensemble",
    long_about = None
)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Model bundle directory or manifest (overrides the config file)
    #[arg(long, global = true)]
    pub bundle: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except final result)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Skip the disease description request
    #[arg(long, global = true)]
    pub no_advice: bool,

    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict from selected symptom identifiers
    Predict {
        /// Comma-separated symptom identifiers, e.g. itching,skin_rash
        #[arg(long, value_delimiter = ',', conflicts_with = "symptoms_file")]
        symptoms: Vec<String>,

        /// JSON file mapping symptom identifiers to 0/1
        #[arg(long)]
        symptoms_file: Option<PathBuf>,
    },

    /// Predict from a free-text description of symptoms
    Describe {
        /// Description, e.g. "I have itching, skin rash and chills"
        #[arg(value_name = "TEXT", required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Transcribe recorded audio segments, then predict from the transcript
    Listen {
        /// Audio segment files, in recording order
        #[arg(value_name = "SEGMENT", required = true, num_args = 1..)]
        segments: Vec<PathBuf>,
    },

    /// List recognised symptom identifiers
    Symptoms,

    /// List predictable diseases
    Diseases,

    /// Run system diagnostics and health checks
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Verbosity from flags, falling back to the configured default
    pub fn verbosity(&self, default: Verbosity) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => default,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if let Commands::Predict {
            symptoms,
            symptoms_file,
        } = &self.command
        {
            if symptoms.is_empty() && symptoms_file.is_none() {
                return Err(
                    "Select symptoms with --symptoms a,b,c or --symptoms-file picks.json".to_string(),
                );
            }
        }

        if self.quiet && self.verbose > 0 {
            return Err("Cannot combine --quiet with --verbose.".to_string());
        }

        Ok(())
    }

    /// Free-text description joined from positional words
    pub fn description(&self) -> Option<String> {
        match &self.command {
            Commands::Describe { text } => Some(text.join(" ")),
            _ => None,
        }
    }
}

impl Verbosity {
    /// Parse a configured verbosity name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            "very_verbose" => Some(Verbosity::VeryVerbose),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show the session summary
    pub fn show_summary(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Check if should show individual telemetry events
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::VeryVerbose)
    }

    /// Default `tracing` filter directive for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "symptriage=info,warn",
            Verbosity::VeryVerbose => "symptriage=debug,info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_quiet() {
        let args = parse(&["symptriage", "-q", "symptoms"]);
        assert_eq!(args.verbosity(Verbosity::Normal), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_default_from_config() {
        let args = parse(&["symptriage", "diseases"]);
        assert_eq!(args.verbosity(Verbosity::Normal), Verbosity::Normal);
        assert_eq!(args.verbosity(Verbosity::Verbose), Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_verbose() {
        let args = parse(&["symptriage", "doctor", "-v"]);
        assert_eq!(args.verbosity(Verbosity::Normal), Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_very_verbose() {
        let args = parse(&["symptriage", "-vv", "doctor"]);
        assert_eq!(args.verbosity(Verbosity::Quiet), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_predict_symptom_list() {
        let args = parse(&["symptriage", "predict", "--symptoms", "itching,skin_rash,chills"]);
        match &args.command {
            Commands::Predict { symptoms, .. } => {
                assert_eq!(symptoms, &["itching", "skin_rash", "chills"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_predict_requires_symptoms() {
        let args = parse(&["symptriage", "predict"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_symptoms_and_file_conflict() {
        let result = Args::try_parse_from([
            "symptriage",
            "predict",
            "--symptoms",
            "cough",
            "--symptoms-file",
            "picks.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_joins_words() {
        let args = parse(&["symptriage", "--no-advice", "describe", "itching", "and", "chills"]);
        assert!(args.no_advice);
        assert_eq!(args.description().as_deref(), Some("itching and chills"));
    }

    #[test]
    fn test_listen_requires_segments() {
        assert!(Args::try_parse_from(["symptriage", "listen"]).is_err());
        let args = parse(&["symptriage", "listen", "a.wav", "b.wav"]);
        assert!(matches!(args.command, Commands::Listen { ref segments } if segments.len() == 2));
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        let args = parse(&["symptriage", "-q", "-v", "symptoms"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_verbosity_names_round_trip() {
        for level in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::VeryVerbose,
        ] {
            assert_eq!(Verbosity::from_name(level.as_str()), Some(level));
        }
        assert_eq!(Verbosity::from_name("loud"), None);
    }
}
