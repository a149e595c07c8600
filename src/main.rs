use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use object_seal::config::PipelineConfig;
use object_seal::event::IngestEvent;
use object_seal::pipeline::Pipeline;
use object_seal::store::{FsStore, ObjectLocation};
use object_seal::Sealer;
use sequoia_openpgp::armor;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Seal objects into OpenPGP messages for a recipient from a key ring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log level to be considered:
    ///
    ///  * 0: off
    ///  * 1: error
    ///  * 2: warn
    ///  * 3: info
    ///  * 4: debug
    ///  * 5: trace
    #[arg(short, long, default_value = "error", global = true)]
    pub log_level: LevelFilter,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt one file to the first encryption key of a key ring
    Seal(SealArgs),
    /// Run the ingestion handler against a directory-backed object store
    Ingest(IngestArgs),
}

#[derive(Args, Debug)]
pub struct SealArgs {
    /// Key ring holding the recipient, armored or binary
    #[arg(short, long)]
    pub key_ring: PathBuf,
    /// File to encrypt
    #[arg(short, long)]
    pub input: PathBuf,
    /// Where to write the message, stdout if omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// ASCII-armor the message
    #[arg(short, long)]
    pub armor: bool,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Directory whose subdirectories are buckets
    #[arg(long)]
    pub store_root: PathBuf,
    /// Bucket holding the key ring
    #[arg(long, env = "public_key_bucket")]
    pub public_key_bucket: String,
    /// Key of the key ring inside its bucket
    #[arg(long, env = "public_key_file")]
    pub public_key_file: String,
    /// Bucket receiving sealed objects, nothing is written if unset
    #[arg(long, env = "destination_bucket")]
    pub destination_bucket: Option<String>,
    /// Storage notification (JSON) naming the object
    #[arg(long, required_unless_present = "object", conflicts_with = "object")]
    pub event: Option<PathBuf>,
    /// Object to seal, as bucket/key
    #[arg(long)]
    pub object: Option<ObjectLocation>,
}

fn armor_message(message: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut sink = vec![];
    let mut w = armor::Writer::new(&mut sink, armor::Kind::Message)?;
    w.write_all(message)?;
    w.finalize()?;
    Ok(sink)
}

fn seal(args: SealArgs) -> anyhow::Result<()> {
    let key_ring = std::fs::read(&args.key_ring)
        .with_context(|| format!("Reading key ring {}", args.key_ring.display()))?;
    let payload = std::fs::read(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;

    let mut sealed = Sealer::default().seal(&key_ring, &payload)?;
    if args.armor {
        sealed = armor_message(&sealed)?;
    }

    match args.output {
        Some(path) => std::fs::write(&path, sealed)
            .with_context(|| format!("Writing {}", path.display()))?,
        None => std::io::stdout().lock().write_all(&sealed)?,
    }
    Ok(())
}

fn ingest(args: IngestArgs) -> anyhow::Result<()> {
    let config = PipelineConfig::from_parts(
        &args.public_key_bucket,
        &args.public_key_file,
        args.destination_bucket,
    )?;
    let event = match (args.event, args.object) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Reading event {}", path.display()))?;
            IngestEvent::from_notification_json(&json)?
        }
        (None, Some(object)) => object.into(),
        (None, None) => anyhow::bail!("Either --event or --object is required"),
    };

    let pipeline = Pipeline::new(FsStore::new(args.store_root), config);
    let outcome = pipeline.handle(&event)?;
    println!("{}", outcome.content_type.unwrap_or_default());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Seal(args) => seal(args),
        Command::Ingest(args) => ingest(args),
    }
}
