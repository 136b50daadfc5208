//! dircrypt - encrypt and decrypt directory trees in place.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dircrypt::config::{BlobEncoding, ContentMode, EmptyFilePolicy, TempLocation};
use dircrypt::encoding::{decode_name, decode_name_or_literal, encode_name};
use dircrypt::{CryptConfig, Direction, Reporter, TransformEvent, TreeTransformer};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dircrypt")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Password-based in-place encryption of directory trees",
    long_about = "Encrypts every file below a directory with AES-256-CBC. A failed run restores it."
)]
struct Cli {
    /// Log every step to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt every file below a directory
    Encrypt(TransformArgs),

    /// Decrypt a directory encrypted with `encrypt`
    Decrypt(TransformArgs),

    /// Print the obfuscated form of a name
    EncodeName {
        /// Name to encode
        name: String,
    },

    /// Print the plain form of an obfuscated name
    DecodeName {
        /// Encoded name
        code: String,
    },

    /// List a directory, decoding obfuscated names
    Ls {
        /// Directory to list (default: current directory)
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Args)]
struct TransformArgs {
    /// Directory to transform
    dir: PathBuf,

    /// Password (prompted for when omitted)
    #[arg(long)]
    password: Option<String>,

    /// Obfuscate file and directory names
    #[arg(long)]
    obfuscate_names: bool,

    /// On-disk form of encrypted content
    #[arg(long, value_enum)]
    encoding: Option<EncodingArg>,

    /// Which files to encrypt
    #[arg(long, value_enum)]
    content: Option<ContentArg>,

    /// Handling of empty files
    #[arg(long, value_enum)]
    empty_files: Option<EmptyFilesArg>,

    /// Where directory contents are held during the run
    #[arg(long, value_enum)]
    temp: Option<TempArg>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Raw,
    Base64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ContentArg {
    Bytes,
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmptyFilesArg {
    Encrypt,
    PassThrough,
    Reject,
}

#[derive(Clone, Copy, ValueEnum)]
enum TempArg {
    Sibling,
    System,
}

impl TransformArgs {
    fn to_config(&self) -> anyhow::Result<CryptConfig> {
        let mut config = match &self.config {
            Some(path) => CryptConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => CryptConfig::default(),
        };

        if self.obfuscate_names {
            config.obfuscate_names = true;
        }
        if let Some(encoding) = self.encoding {
            config.blob_encoding = match encoding {
                EncodingArg::Raw => BlobEncoding::Raw,
                EncodingArg::Base64 => BlobEncoding::Base64,
            };
        }
        if let Some(content) = self.content {
            config.content_mode = match content {
                ContentArg::Bytes => ContentMode::Bytes,
                ContentArg::Text => ContentMode::Text,
            };
        }
        if let Some(empty_files) = self.empty_files {
            config.empty_files = match empty_files {
                EmptyFilesArg::Encrypt => EmptyFilePolicy::Encrypt,
                EmptyFilesArg::PassThrough => EmptyFilePolicy::PassThrough,
                EmptyFilesArg::Reject => EmptyFilePolicy::Reject,
            };
        }
        if let Some(temp) = self.temp {
            config.temp_location = match temp {
                TempArg::Sibling => TempLocation::Sibling,
                TempArg::System => TempLocation::SystemTemp,
            };
        }

        config.validate()?;
        Ok(config)
    }
}

/// Prints each file outcome as it happens.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: &TransformEvent) {
        match event {
            TransformEvent::File { path, outcome } => {
                println!("{}: {}", outcome, path.display())
            }
            TransformEvent::FileFailed { path, error } => {
                eprintln!("failed: {} ({})", path.display(), error)
            }
            TransformEvent::RolledBack { path } => {
                eprintln!("failsafe: restored {}", path.display())
            }
            TransformEvent::DirectoryEntered { .. }
            | TransformEvent::DirectoryCommitted { .. } => {}
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        let wrong_password = e
            .downcast_ref::<dircrypt::Error>()
            .map_or(false, dircrypt::Error::is_wrong_password);
        if wrong_password {
            eprintln!("Invalid password!");
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Encrypt(args) => cmd_transform(Direction::Encrypt, &args),
        Commands::Decrypt(args) => cmd_transform(Direction::Decrypt, &args),
        Commands::EncodeName { name } => {
            println!("{}", encode_name(&name)?);
            Ok(())
        }
        Commands::DecodeName { code } => {
            println!("{}", decode_name(&code)?);
            Ok(())
        }
        Commands::Ls { dir } => cmd_ls(&dir),
    }
}

fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    match rpassword::prompt_password(prompt) {
        Ok(password) => Ok(password),
        Err(_) => {
            // No terminal: read a line from stdin instead.
            eprint!("{}", prompt);
            io::stderr().flush()?;
            let mut password = String::new();
            io::stdin().read_line(&mut password)?;
            Ok(password.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

fn read_password(direction: Direction, given: Option<&str>) -> anyhow::Result<String> {
    if let Some(password) = given {
        return Ok(password.to_string());
    }

    let password = prompt_password("Password: ")?;
    if direction == Direction::Encrypt {
        let confirm = prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }
    }
    Ok(password)
}

fn cmd_transform(direction: Direction, args: &TransformArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    let password = read_password(direction, args.password.as_deref())?;

    let summary = TreeTransformer::new(config).transform(
        direction,
        &password,
        &args.dir,
        &mut ConsoleReporter,
    )?;

    println!(
        "{} {}: {} files, {} passed through, {} directories",
        match direction {
            Direction::Encrypt => "Encrypted",
            Direction::Decrypt => "Decrypted",
        },
        args.dir.display(),
        summary.files_transformed,
        summary.files_passed_through,
        summary.directories
    );
    Ok(())
}

fn cmd_ls(dir: &Path) -> anyhow::Result<()> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    entries.sort();

    if entries.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    for (name, is_dir) in entries {
        let type_char = if is_dir { 'd' } else { '-' };
        let decoded = decode_name_or_literal(&name);
        if decoded == name {
            println!("{} {}", type_char, name);
        } else {
            println!("{} {}  ({})", type_char, decoded, name);
        }
    }
    Ok(())
}
