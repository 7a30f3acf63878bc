use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use wxdb_rs::live::{self, LiveConfig, LivePageServer};
use wxdb_rs::{DecryptJobBuilder, JobEvent, KdfParams, ValidationPolicy, WorkerDispatch};

#[derive(Parser)]
#[command(name = "wxdb")]
#[command(about = "Decrypt page-encrypted chat databases", long_about = None)]
struct Cli {
    /// Raw key, 64 hex characters
    #[arg(short, long, env = "WXDB_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a standard database file
    Decrypt {
        /// Encrypted container
        input: PathBuf,

        /// Exact output file (default: unique name in --out-dir)
        #[arg(short, long, conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Directory for a uniquely named output file
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,

        /// Authenticate every page instead of page 0 only
        #[arg(long)]
        verify_all: bool,

        /// Pages between progress reports
        #[arg(long, default_value = "10")]
        progress_every: u64,
    },

    /// Check whether the key fits the container (exit status 0 if it does)
    Validate {
        /// Encrypted container
        input: PathBuf,
    },

    /// List the tables of an encrypted container without decrypting it to disk
    Tables {
        /// Encrypted container
        input: PathBuf,

        /// Name of the interception VFS
        #[arg(long, default_value = wxdb_rs::consts::DEFAULT_VFS_NAME)]
        vfs: String,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let Some(key) = cli.key else {
        bail!("no key given: pass --key or set WXDB_KEY");
    };

    match cli.command {
        Commands::Decrypt {
            input,
            output,
            out_dir,
            verify_all,
            progress_every,
        } => {
            let mut builder = DecryptJobBuilder::new(&input, &key).with_progress_interval(progress_every);
            if let Some(path) = output {
                builder = builder.with_output_file(path);
            } else if let Some(dir) = out_dir {
                builder = builder.with_output_dir(dir);
            }
            if verify_all {
                builder = builder.with_validation(ValidationPolicy::AllPages);
            }
            let job = builder.build().context("invalid key")?;

            let handle = WorkerDispatch::default()
                .dispatch(job)
                .with_context(|| format!("cannot start decryption of {}", input.display()))?;
            for event in handle.events().iter() {
                match event {
                    JobEvent::Progress { done, total } => eprintln!("{done}/{total} pages"),
                    JobEvent::Completed(path) => {
                        println!("{}", path.display());
                        return Ok(ExitCode::SUCCESS);
                    }
                    JobEvent::Failed(err) => {
                        return Err(err).with_context(|| format!("decrypting {}", input.display()));
                    }
                }
            }
            bail!("decryption worker exited without a result")
        }

        Commands::Validate { input } => {
            match wxdb_rs::validate_key_with(&input, &key, &KdfParams::default()) {
                Ok(()) => {
                    println!("key fits {}", input.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    eprintln!("{}: {err}", input.display());
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Tables { input, vfs } => {
            let owned;
            let server: &LivePageServer = if vfs == wxdb_rs::consts::DEFAULT_VFS_NAME {
                live::global()?
            } else {
                owned = LivePageServer::new(LiveConfig::named(vfs))?;
                &owned
            };
            server
                .register_with(&input, &key, &KdfParams::default())
                .with_context(|| format!("cannot register {}", input.display()))?;
            let conn = server.open(&input)?;
            for name in conn.table_names()? {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
