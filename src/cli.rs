// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Command-line arguments for `apkforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "apkforge",
    version,
    about = "Build all apk package recipes in a workspace, in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to search for package recipes.
    #[arg(short = 'd', long, value_name = "PATH", default_value = ".")]
    pub dir: PathBuf,

    /// Directory used to extend the built-in build pipelines.
    ///
    /// Default: `{dir}/pipelines`.
    #[arg(long, value_name = "PATH")]
    pub pipeline_dir: Option<PathBuf>,

    /// Container runner used to isolate build commands.
    #[arg(long, value_enum, default_value_t = Runner::Docker)]
    pub runner: Runner,

    /// Architecture of packages to build (repeatable).
    #[arg(
        long = "arch",
        value_name = "ARCH",
        default_values_t = [String::from("x86_64"), String::from("aarch64")]
    )]
    pub archs: Vec<String>,

    /// Log what would be built instead of building it.
    #[arg(long)]
    pub dry_run: bool,

    /// Extra keys to include in the build environment keyring.
    #[arg(
        short = 'k',
        long = "keyring-append",
        value_name = "KEY",
        default_values_t = [String::from("https://packages.wolfi.dev/os/wolfi-signing.rsa.pub")]
    )]
    pub extra_keys: Vec<String>,

    /// Extra repositories to include in the build environment.
    #[arg(
        short = 'r',
        long = "repository-append",
        value_name = "REPO",
        default_values_t = [String::from("https://packages.wolfi.dev/os")]
    )]
    pub extra_repos: Vec<String>,

    /// Key to use for signing packages and the index.
    ///
    /// Default: `{dir}/local-melange.rsa`.
    #[arg(long, value_name = "PATH")]
    pub signing_key: Option<PathBuf>,

    /// Namespace used in package URLs in the SBOM (e.g. wolfi, alpine).
    #[arg(long, value_name = "NS", default_value = "wolfi")]
    pub namespace: String,

    /// Directory where built packages are written.
    ///
    /// Default: `{dir}/packages`.
    #[arg(long, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,

    /// Directory used for cached build inputs.
    #[arg(long, value_name = "PATH", default_value = "./melange-cache/")]
    pub cache_dir: String,

    /// Directory or bucket used for preloading the cache.
    #[arg(long, value_name = "SRC", default_value = "")]
    pub cache_source: String,

    /// Whether to regenerate APKINDEX.tar.gz after builds.
    #[arg(long, value_name = "BOOL", action = ArgAction::Set, default_value_t = true)]
    pub generate_index: bool,

    /// Repository where packages will eventually be uploaded; used to skip
    /// already-published packages (http only).
    #[arg(long, value_name = "URL", default_value = "")]
    pub destination_repository: String,

    /// Number of builds to run concurrently (0 means all hardware threads).
    #[arg(short = 'j', long, value_name = "N", default_value_t = 0)]
    pub jobs: usize,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `APKFORGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Restrict the build to these packages (dependencies still build).
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,
}

/// Supported container runners.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Runner {
    Docker,
    Bubblewrap,
}

impl Runner {
    /// Name as passed to the downstream build tool.
    pub fn as_str(self) -> &'static str {
        match self {
            Runner::Docker => "docker",
            Runner::Bubblewrap => "bubblewrap",
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
