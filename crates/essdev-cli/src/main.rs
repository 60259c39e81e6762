mod cmd;

use clap::{Parser, Subcommand};
use essdev_core::dispatch::{DispatchSettings, DEFAULT_DISPATCH_TIMEOUT, TOKEN_VAR, URL_VAR};
use essdev_core::lock::DEFAULT_LOCK_TIMEOUT;
use essdev_core::ops::{
    EditOptions, NewInstance, DEFAULT_INSTANCE_TYPE, DEFAULT_OS, DEFAULT_VOLUME_SIZE_GB,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "instance-params",
    about = "Manage ESS instance definitions in a JSON payload file (add, del, list)",
    version,
    propagate_version = true
)]
struct Cli {
    /// Bearer token for the workflow dispatch call
    #[arg(long, global = true, env = TOKEN_VAR, hide_env_values = true)]
    token: Option<String>,

    /// Workflow dispatch endpoint
    #[arg(long, global = true, env = URL_VAR)]
    url: Option<String>,

    /// Seconds to wait for the payload file lock
    #[arg(long, global = true, env = "INSTANCE_PARAMS_LOCK_TIMEOUT", default_value_t = DEFAULT_LOCK_TIMEOUT.as_secs())]
    lock_timeout: u64,

    /// Seconds to wait for the dispatch call to complete
    #[arg(long, global = true, env = "INSTANCE_PARAMS_DISPATCH_TIMEOUT", default_value_t = DEFAULT_DISPATCH_TIMEOUT.as_secs())]
    dispatch_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add instance payload
    Add {
        /// JSON file path
        #[arg(long)]
        file: PathBuf,

        /// Instance name
        #[arg(long)]
        instance: String,

        /// Instance type
        #[arg(long = "type", value_name = "TYPE", default_value = DEFAULT_INSTANCE_TYPE)]
        instance_type: String,

        /// Operating system (rhel9, rhel10, or a literal AMI name)
        #[arg(long, default_value = DEFAULT_OS)]
        os: String,

        /// Volume size in GB
        #[arg(long, default_value_t = DEFAULT_VOLUME_SIZE_GB)]
        volume_size: u32,

        /// Write to a temp file and print the dispatch command instead of sending it
        #[arg(long)]
        dry_run: bool,

        /// Keep the dry-run temp file after exit
        #[arg(long, requires = "dry_run")]
        keep_temp: bool,
    },

    /// Delete instance payload
    Del {
        /// JSON file path
        #[arg(long)]
        file: PathBuf,

        /// Instance name
        #[arg(long)]
        instance: String,

        /// Write to a temp file and print the dispatch command instead of sending it
        #[arg(long)]
        dry_run: bool,

        /// Keep the dry-run temp file after exit
        #[arg(long, requires = "dry_run")]
        keep_temp: bool,
    },

    /// List instance names from essdev_instances
    List {
        /// JSON file path
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = DispatchSettings {
        token: cli.token,
        url: cli.url,
        timeout: Duration::from_secs(cli.dispatch_timeout),
    };
    let lock_timeout = Duration::from_secs(cli.lock_timeout);
    let options = |dry_run, keep_temp| EditOptions {
        dry_run,
        keep_temp,
        lock_timeout,
    };

    let result = match cli.command {
        Commands::Add {
            file,
            instance,
            instance_type,
            os,
            volume_size,
            dry_run,
            keep_temp,
        } => {
            let instance = NewInstance {
                name: instance,
                instance_type,
                os: Some(os),
                volume_size_gb: volume_size,
            };
            cmd::add::run(&file, instance, &options(dry_run, keep_temp), &settings)
        }
        Commands::Del {
            file,
            instance,
            dry_run,
            keep_temp,
        } => cmd::del::run(&file, &instance, &options(dry_run, keep_temp), &settings),
        Commands::List { file } => cmd::list::run(&file),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
