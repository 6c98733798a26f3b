//! IAM Role Verifier CLI
//!
//! This is the main entry point for the iam-role-verifier command-line tool.
//!
//! # Exit Codes
//!
//! - `ExitCode::Success` (0): every check passed
//! - `ExitCode::Violations` (1): at least one check reported a violation
//! - `ExitCode::Error` (2): the run was aborted (unreadable outputs, AWS
//!   failure, undecodable trust policy)
//!
//! See `types::ExitCode` for the enum definition.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use iam_role_verifier::{AwsSettings, OutputsSource, VerifyOptions, DEFAULT_MAX_SESSION_DURATION};

mod commands;
mod output;
mod types;

use types::ExitCode;

use crate::commands::{print_version_info, VerifyConfig};

#[derive(Parser, Debug)]
#[command(
    name = "iam-role-verifier",
    author,
    version,
    disable_version_flag = true,
    about = "Verify a provisioned AWS IAM role against its Terraform outputs",
    long_about = "Reads the values an IAM role was provisioned with from Terraform outputs, \
fetches the live role from IAM and checks that they agree. The trust policy is URL-decoded and \
checked for structure and service principals, and the role's path, creation date, maximum \
session duration and tags are verified.\n\n\
iam-role-verifier verify --terraform-dir ./infra --region us-east-1 --pretty\n  \
terraform output -json | iam-role-verifier verify --outputs -\n  \
iam-role-verifier parse-trust-policy '%7B%22Version%22%3A%222012-10-17%22%7D'"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify the live IAM role against provisioning outputs
    #[command(
        group(ArgGroup::new("source").required(true).args(["outputs", "terraform_dir"])),
        long_about = "Loads role_arn, role_name, role_id and role_tags from Terraform outputs and \
runs every check against the live role. Prints a JSON report on stdout and one line per \
violation on stderr. Exits 0 when all checks pass, 1 on violations and 2 when the run is aborted."
    )]
    Verify {
        /// Outputs JSON file, or '-' for stdin
        #[arg(
            long = "outputs",
            long_help = "Path to a JSON file holding Terraform outputs, either as produced by \
`terraform output -json` or as a flat name to value mapping. Use '-' to read from stdin."
        )]
        outputs: Option<PathBuf>,

        /// Terraform working directory to read outputs from
        #[arg(
            long = "terraform-dir",
            long_help = "Run `terraform output -json` in this directory and verify against its outputs."
        )]
        terraform_dir: Option<PathBuf>,

        /// Terraform binary used with --terraform-dir
        #[arg(long = "terraform-bin", default_value = "terraform", hide = true)]
        terraform_bin: PathBuf,

        /// AWS region
        #[arg(short = 'r', long = "region")]
        region: Option<String>,

        /// AWS shared config profile
        #[arg(long = "profile")]
        profile: Option<String>,

        /// Expected MaxSessionDuration in seconds
        #[arg(long = "expected-max-session-duration", default_value_t = DEFAULT_MAX_SESSION_DURATION)]
        expected_max_session_duration: i32,

        /// Also check that the role lives in the caller's account
        #[arg(
            long = "check-account",
            default_value_t = false,
            long_help = "Call STS GetCallerIdentity and report a violation when the account in \
role_arn differs from the account of the credentials in use."
        )]
        check_account: bool,

        /// Enable pretty JSON output formatting
        #[arg(short = 'p', long = "pretty", default_value_t = false)]
        pretty: bool,

        /// Enable debug logging output
        #[arg(hide = true, short = 'd', long = "debug")]
        debug: bool,
    },

    /// Decode a URL-encoded trust policy and check its structure
    ParseTrustPolicy {
        /// Encoded policy document. If not provided, reads from stdin.
        document: Option<String>,

        /// Enable pretty JSON output formatting
        #[arg(short = 'p', long = "pretty", default_value_t = false)]
        pretty: bool,

        /// Enable debug logging output
        #[arg(hide = true, short = 'd', long = "debug")]
        debug: bool,
    },

    #[command(
        about = "Print version information.",
        short_flag = 'V',
        long_flag = "version"
    )]
    Version {
        #[arg(long = "verbose", default_value_t = false, hide = true)]
        verbose: bool,
    },
}

/// Initialize logging based on configuration
fn init_logging(debug: bool) -> Result<()> {
    let log_level = if debug {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Error
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    Ok(())
}

fn outputs_source(
    outputs: Option<PathBuf>,
    terraform_dir: Option<PathBuf>,
    terraform_bin: PathBuf,
) -> OutputsSource {
    match (outputs, terraform_dir) {
        (_, Some(dir)) => OutputsSource::Terraform {
            dir,
            binary: terraform_bin,
        },
        (Some(path), None) if path.as_os_str() == "-" => OutputsSource::Stdin,
        (Some(path), None) => OutputsSource::File(path),
        (None, None) => OutputsSource::Stdin,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Verify {
            outputs,
            terraform_dir,
            terraform_bin,
            region,
            profile,
            expected_max_session_duration,
            check_account,
            pretty,
            debug,
        } => {
            if let Err(e) = init_logging(debug) {
                eprintln!("iam-role-verifier: Failed to initialize logging: {e}");
                process::exit(ExitCode::Error.into());
            }

            let config = VerifyConfig {
                source: outputs_source(outputs, terraform_dir, terraform_bin),
                aws: AwsSettings { region, profile },
                options: VerifyOptions {
                    expected_max_session_duration,
                },
                check_account,
                pretty,
            };

            match commands::verify(&config).await {
                Ok(code) => code,
                Err(e) => {
                    print_cli_command_error(e);
                    ExitCode::Error
                }
            }
        }

        Commands::ParseTrustPolicy {
            document,
            pretty,
            debug,
        } => {
            if let Err(e) = init_logging(debug) {
                eprintln!("iam-role-verifier: Failed to initialize logging: {e}");
                process::exit(ExitCode::Error.into());
            }

            match commands::parse_trust_policy_document(document, pretty) {
                Ok(code) => code,
                Err(e) => {
                    print_cli_command_error(e);
                    ExitCode::Error
                }
            }
        }

        Commands::Version { verbose } => match print_version_info(verbose) {
            Ok(()) => ExitCode::Success,
            Err(e) => {
                print_cli_command_error(e);
                ExitCode::Error
            }
        },
    };

    process::exit(code.into());
}

fn print_cli_command_error(e: anyhow::Error) {
    eprintln!("Error: {e}");
    let mut source = e.source();
    while let Some(err) = source {
        eprintln!("  Caused by: {err}");
        source = err.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_outputs_source_selection() {
        let bin = PathBuf::from("terraform");
        assert_eq!(
            outputs_source(Some(PathBuf::from("-")), None, bin.clone()),
            OutputsSource::Stdin
        );
        assert_eq!(
            outputs_source(Some(PathBuf::from("out.json")), None, bin.clone()),
            OutputsSource::File(PathBuf::from("out.json"))
        );
        assert_eq!(
            outputs_source(None, Some(PathBuf::from("infra")), bin.clone()),
            OutputsSource::Terraform {
                dir: PathBuf::from("infra"),
                binary: bin,
            }
        );
    }

    #[test]
    fn test_verify_requires_a_source() {
        assert!(Cli::try_parse_from(["iam-role-verifier", "verify"]).is_err());
        assert!(Cli::try_parse_from([
            "iam-role-verifier",
            "verify",
            "--outputs",
            "a.json",
            "--terraform-dir",
            "infra"
        ])
        .is_err());
    }
}
