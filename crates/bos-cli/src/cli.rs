use std::path::PathBuf;

use bos_crypto::HashAlgorithm;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bos",
    about = "Base object serializer: content-addressed decomposition and batching",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serialize a JSON base object into records and batches
    Serialize(SerializeArgs),
    /// Inspect a written batch directory
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct SerializeArgs {
    /// JSON file holding the root object (must carry a `speckle_type`)
    pub input: PathBuf,
    /// TOML serializer configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Default chunk size for `@()` properties
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Byte bound per batch
    #[arg(long)]
    pub max_batch_bytes: Option<usize>,
    /// Hash algorithm for record ids (md5, blake3)
    #[arg(long)]
    pub hash: Option<HashAlgorithm>,
    /// Write batches and a manifest under this directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Compress written batches with zstd
    #[arg(long, requires = "out")]
    pub compress: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Directory containing `manifest.json`
    pub dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serialize() {
        let cli = Cli::try_parse_from(["bos", "serialize", "model.json"]).unwrap();
        if let Command::Serialize(args) = cli.command {
            assert_eq!(args.input, PathBuf::from("model.json"));
            assert!(args.out.is_none());
            assert!(args.hash.is_none());
            assert!(!args.compress);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serialize_overrides() {
        let cli = Cli::try_parse_from([
            "bos", "serialize", "model.json",
            "--chunk-size", "250",
            "--max-batch-bytes", "5000",
            "--hash", "blake3",
            "--out", "out",
            "--compress",
        ])
        .unwrap();
        if let Command::Serialize(args) = cli.command {
            assert_eq!(args.chunk_size, Some(250));
            assert_eq!(args.max_batch_bytes, Some(5000));
            assert_eq!(args.hash, Some(HashAlgorithm::Blake3));
            assert_eq!(args.out, Some(PathBuf::from("out")));
            assert!(args.compress);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn compress_requires_out() {
        assert!(Cli::try_parse_from(["bos", "serialize", "m.json", "--compress"]).is_err());
    }

    #[test]
    fn unknown_hash_is_rejected() {
        assert!(Cli::try_parse_from(["bos", "serialize", "m.json", "--hash", "sha1"]).is_err());
    }

    #[test]
    fn parse_inspect() {
        let cli = Cli::try_parse_from(["bos", "inspect", "out/abc"]).unwrap();
        if let Command::Inspect(args) = cli.command {
            assert_eq!(args.dir, PathBuf::from("out/abc"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["bos", "--verbose", "inspect", "d"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["bos", "--format", "json", "inspect", "d"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
