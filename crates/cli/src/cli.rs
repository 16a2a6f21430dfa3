use crate::commands::{Command, GenerateArgs};
use clap::{Parser, Subcommand, ValueEnum};
use lockscope_workspaces::ClosurePolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lockscope")]
#[command(about = "Write a self-contained, scoped yarn lockfile for each workspace of a monorepo")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: crate::tracing::TracingFormat,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,
}

/// Closure policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Every member contributes dependencies, devDependencies and peerDependencies
    Uniform,
    /// Only the target contributes devDependencies
    TargetDevOnly,
}

impl From<PolicyArg> for ClosurePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Uniform => Self::Uniform,
            PolicyArg::TargetDevOnly => Self::TargetDevOnly,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Show version information")]
    Version,

    #[command(about = "Generate scoped lockfiles for workspace members")]
    Generate {
        #[arg(long, help = "Monorepo root", default_value = ".")]
        cwd: PathBuf,
        #[arg(
            long = "workspace",
            short = 'w',
            help = "Only generate for this member (repeatable); overrides workspaceLockfiles"
        )]
        workspaces: Vec<String>,
        #[arg(long, help = "Lockfile filename; overrides workspaceLockfileFilename")]
        filename: Option<String>,
        #[arg(long, short = 'j', help = "Members processed concurrently", default_value_t = 4)]
        jobs: usize,
        #[arg(long, help = "Stop starting new members after the first failure")]
        fail_fast: bool,
        #[arg(long, help = "Compute lockfiles without writing them")]
        dry_run: bool,
        #[arg(long, value_enum, default_value = "uniform", help = "Which scopes the closure follows")]
        closure_policy: PolicyArg,
        #[arg(long, help = "Fail members whose archives are missing from .yarn/cache")]
        verify_cache: bool,
    },

    #[command(about = "Print the workspace closure of a member")]
    Closure {
        #[arg(help = "Member name")]
        name: String,
        #[arg(long, help = "Monorepo root", default_value = ".")]
        cwd: PathBuf,
        #[arg(long, value_enum, default_value = "uniform", help = "Which scopes the closure follows")]
        closure_policy: PolicyArg,
    },
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Version => Self::Version,
            Commands::Generate {
                cwd,
                workspaces,
                filename,
                jobs,
                fail_fast,
                dry_run,
                closure_policy,
                verify_cache,
            } => Self::Generate(GenerateArgs {
                cwd,
                workspaces,
                filename,
                jobs,
                fail_fast,
                dry_run,
                closure_policy: closure_policy.into(),
                verify_cache,
            }),
            Commands::Closure {
                name,
                cwd,
                closure_policy,
            } => Self::Closure {
                name,
                cwd,
                policy: closure_policy.into(),
            },
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing::{LogLevel, TracingFormat};

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["lockscope", "version"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Compact);
        assert!(!cli.json);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["lockscope", "--level", "debug", "version"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["lockscope", "-l", "error", "version"]).unwrap();
        assert_eq!(cli.level, LogLevel::Error);

        assert!(Cli::try_parse_from(["lockscope", "--level", "invalid", "version"]).is_err());
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["lockscope", "generate"]).unwrap();
        let Command::Generate(args) = cli.command.into() else {
            panic!("Expected Generate command");
        };

        assert_eq!(args.cwd, PathBuf::from("."));
        assert!(args.workspaces.is_empty());
        assert_eq!(args.filename, None);
        assert_eq!(args.jobs, 4);
        assert!(!args.fail_fast);
        assert!(!args.dry_run);
        assert_eq!(args.closure_policy, ClosurePolicy::Uniform);
        assert!(!args.verify_cache);
    }

    #[test]
    fn test_generate_with_options() {
        let cli = Cli::try_parse_from([
            "lockscope",
            "--json",
            "generate",
            "--cwd",
            "/repo",
            "-w",
            "a",
            "--workspace",
            "@scope/b",
            "--filename",
            "scoped.lock",
            "-j",
            "2",
            "--fail-fast",
            "--dry-run",
            "--closure-policy",
            "target-dev-only",
            "--verify-cache",
        ])
        .unwrap();
        assert!(cli.json);

        let Command::Generate(args) = cli.command.into() else {
            panic!("Expected Generate command");
        };
        assert_eq!(args.cwd, PathBuf::from("/repo"));
        assert_eq!(args.workspaces, vec!["a", "@scope/b"]);
        assert_eq!(args.filename.as_deref(), Some("scoped.lock"));
        assert_eq!(args.jobs, 2);
        assert!(args.fail_fast && args.dry_run && args.verify_cache);
        assert_eq!(args.closure_policy, ClosurePolicy::TargetDevOnly);
    }

    #[test]
    fn test_closure_command() {
        let cli = Cli::try_parse_from(["lockscope", "closure", "a", "--cwd", "repo"]).unwrap();

        let Command::Closure { name, cwd, policy } = cli.command.into() else {
            panic!("Expected Closure command");
        };
        assert_eq!(name, "a");
        assert_eq!(cwd, PathBuf::from("repo"));
        assert_eq!(policy, ClosurePolicy::Uniform);
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["lockscope"]).is_err());
    }
}
