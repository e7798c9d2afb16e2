use anyhow::{bail, Context};
use bos_pack::{BatchReader, BatchWriter};
use bos_serializer::{BaseObjectSerializer, SerializerConfig};
use bos_store::ObjectStore;
use bos_types::Value;
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serialize(args) => cmd_serialize(args, cli.format),
        Command::Inspect(args) => cmd_inspect(args, cli.format),
    }
}

fn load_config(args: &SerializeArgs) -> anyhow::Result<SerializerConfig> {
    let mut config = match &args.config {
        Some(path) => SerializerConfig::load(path)?,
        None => SerializerConfig::default(),
    };
    if let Some(size) = args.chunk_size {
        config.default_chunk_size = size;
    }
    if let Some(bytes) = args.max_batch_bytes {
        config.max_batch_bytes = bytes;
    }
    if let Some(hash) = args.hash {
        config.hash_algorithm = hash;
    }
    Ok(config)
}

fn cmd_serialize(args: SerializeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", args.input.display()))?;
    let Value::Object(root) = Value::from_json(json) else {
        bail!("{} does not hold a base object (missing `speckle_type`)", args.input.display());
    };

    let mut serializer = BaseObjectSerializer::new(config)?;
    let id = serializer.serialize(&root)?;
    let report = serializer.audit()?;
    let payload = serializer.payload(&id)?;
    let records = serializer.store().len();

    let written = match &args.out {
        Some(out) => {
            let writer = BatchWriter::new(out);
            let writer = if args.compress { writer.compressed(3) } else { writer };
            Some(writer.write(&id, payload.total_children_count, &serializer.batches()?)?)
        }
        None => None,
    };

    match format {
        OutputFormat::Json => {
            let value = match &written {
                Some(set) => json!({
                    "id": id,
                    "totalChildrenCount": payload.total_children_count,
                    "records": records,
                    "dir": set.dir.display().to_string(),
                    "manifest": set.manifest,
                    "audit": report,
                }),
                None => json!({
                    "payload": payload,
                    "records": records,
                    "audit": report,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("{} Serialized {}", "✓".green().bold(), root.speckle_type().cyan());
            println!("  Root: {}", id.as_str().yellow());
            println!("  Children: {}", payload.total_children_count);
            println!("  Records: {}", records);
            println!("  Batches: {}", payload.batches.len());
            if report.is_clean() {
                println!("  Audit: {}", "clean".green());
            } else {
                println!("  Audit: {} violations", report.violations.len().to_string().red());
            }
            match &written {
                Some(set) => println!("  Written to {}", set.dir.display().to_string().bold()),
                None => {
                    for batch in &payload.batches {
                        println!("{batch}");
                    }
                }
            }
        }
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reader = BatchReader::open(&args.dir)
        .with_context(|| format!("opening {}", args.dir.display()))?;
    let manifest = reader.manifest();
    let records = reader.records()?;
    let dangling = reader.dangling_references()?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "rootId": manifest.root_id,
                "totalChildrenCount": manifest.total_children_count,
                "compressed": manifest.compressed,
                "batches": manifest.batches.len(),
                "records": records.len(),
                "dangling": dangling,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("Root {}", manifest.root_id.as_str().yellow().bold());
            println!("  Children: {}", manifest.total_children_count);
            println!("  Records: {}", records.len());
            for entry in &manifest.batches {
                println!(
                    "  {} {} records, {} bytes, crc {:08x}",
                    entry.file.dimmed(),
                    entry.object_count,
                    entry.byte_len,
                    entry.crc32
                );
            }
            if dangling.is_empty() {
                println!("{} No dangling references.", "✓".green().bold());
            } else {
                println!("{} {} dangling references:", "!".yellow().bold(), dangling.len());
                for id in &dangling {
                    println!("  {}", id.red());
                }
            }
        }
    }
    Ok(())
}
