//! Command line argument parsing for the vecfind CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::protocol::VectorFormat;

/// vecfind - build, inspect and dispatch find_closest batches
#[derive(Parser, Debug, Clone)]
#[command(name = "vecfind")]
#[command(about = "Build, inspect and dispatch find_closest vector search batches")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct VecfindArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'o', long = "output", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl VecfindArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write a random request batch to a file
    Generate(GenerateArgs),

    /// Decode a reply (or request) batch file
    Decode(DecodeArgs),

    /// Parse a textual vector format and show its header
    Format(FormatArgs),

    /// Run a dispatch round against an in-memory store
    Simulate(SimulateArgs),
}

/// Arguments for generating a request batch
#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    /// Number of requests in the batch
    #[arg(short, long, default_value = "1")]
    pub requests: usize,

    /// Number of closest records to ask for per request
    #[arg(short, long, default_value = "10")]
    pub k: u32,

    /// Vector format, as record_size+vector_offset:typexlength
    #[arg(short, long, default_value = "20+4:f32x4")]
    pub format: VectorFormat,

    /// Random seed (random if omitted)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Output file
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,
}

/// Arguments for decoding a batch file
#[derive(Parser, Debug, Clone)]
pub struct DecodeArgs {
    /// File holding an encoded batch
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Decode the file as a request batch instead of a reply
    #[arg(long)]
    pub request: bool,

    /// Number of responses the reply must carry
    #[arg(long)]
    pub expect: Option<usize>,
}

/// Arguments for inspecting a vector format
#[derive(Parser, Debug, Clone)]
pub struct FormatArgs {
    /// Vector format, e.g. 20+4:f32x4
    #[arg(value_name = "FORMAT")]
    pub format: VectorFormat,
}

/// Arguments for a simulated dispatch round
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of target objects
    #[arg(short = 'n', long, default_value = "30")]
    pub objects: usize,

    /// Number of requests in the batch
    #[arg(short, long, default_value = "1")]
    pub requests: usize,

    /// Number of closest records to ask for per request
    #[arg(short, long, default_value = "10")]
    pub k: u32,

    /// Vector format, as record_size+vector_offset:typexlength
    #[arg(short, long, default_value = "20+4:f32x4")]
    pub format: VectorFormat,

    /// Random seed (random if omitted)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Leave this many of the objects out of the store
    #[arg(long, default_value = "0")]
    pub missing: usize,

    /// Dispatcher configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Await the replies on an async executor
    #[arg(long = "async")]
    pub use_async: bool,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ElementType;

    #[test]
    fn test_generate_command() {
        let args = VecfindArgs::try_parse_from([
            "vecfind",
            "generate",
            "--requests",
            "4",
            "-k",
            "3",
            "--format",
            "16+0:u8x16",
            "--seed",
            "7",
            "--out",
            "batch.bin",
        ])
        .unwrap();

        if let Command::Generate(generate_args) = args.command {
            assert_eq!(generate_args.requests, 4);
            assert_eq!(generate_args.k, 3);
            assert_eq!(generate_args.format.element_type, ElementType::U8);
            assert_eq!(generate_args.format.vector_length, 16);
            assert_eq!(generate_args.seed, Some(7));
            assert_eq!(generate_args.out, PathBuf::from("batch.bin"));
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_generate_defaults() {
        let args = VecfindArgs::try_parse_from(["vecfind", "generate", "--out", "x"]).unwrap();
        if let Command::Generate(generate_args) = args.command {
            assert_eq!(generate_args.requests, 1);
            assert_eq!(generate_args.k, 10);
            assert_eq!(generate_args.format.to_string(), "20+4:f32x4");
            assert_eq!(generate_args.seed, None);
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(VecfindArgs::try_parse_from(["vecfind", "format", "8+4:f64x1"]).is_err());
        assert!(VecfindArgs::try_parse_from(["vecfind", "format", "8+0:f16x4"]).is_err());
    }

    #[test]
    fn test_simulate_command() {
        let args = VecfindArgs::try_parse_from([
            "vecfind", "simulate", "-n", "5", "--missing", "2", "--async",
        ])
        .unwrap();

        if let Command::Simulate(simulate_args) = args.command {
            assert_eq!(simulate_args.objects, 5);
            assert_eq!(simulate_args.missing, 2);
            assert!(simulate_args.use_async);
            assert!(simulate_args.config.is_none());
        } else {
            panic!("Expected Simulate command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = VecfindArgs::try_parse_from(["vecfind", "format", "4+0:u8x4"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = VecfindArgs::try_parse_from(["vecfind", "-vv", "format", "4+0:u8x4"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args =
            VecfindArgs::try_parse_from(["vecfind", "--quiet", "format", "4+0:u8x4"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            VecfindArgs::try_parse_from(["vecfind", "--output", "json", "format", "4+0:u8x4"])
                .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
