use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use classfile::{
    ClassRecord, DecodeOptions, EncodeOptions, TypeHierarchy,
    class::access_flags::FlagTarget,
};
use common::ClassIdentifier;
use loader::{ClassHierarchy, ClassPath};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod input;

use input::ClassInput;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// jars and directories to load classes from, searched in order
    #[arg(long, global = true, value_delimiter = ':')]
    classpath: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the structure of each class
    Info {
        /// class files, directories or jars
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// check that each class decodes
    Validate {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// print the class file major version of each class
    Version {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// print the class access flags of each class
    Access {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// remove debug information
    Strip {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// directory the stripped classes are written to
        #[arg(long, short)]
        output: PathBuf,
    },
    /// decode and encode each class again
    Roundtrip {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// drop debug information while decoding
        #[arg(long)]
        skip_debug: bool,
        /// recompute stack map frames and maximum sizes
        #[arg(long)]
        compute_frames: bool,
        /// recompute maximum stack and locals only
        #[arg(long)]
        compute_maxs: bool,
        /// directory the encoded classes are written to
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// look a class up on the class path and print it
    Load {
        /// binary or internal name, e.g. java.lang.String
        class: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Info { inputs } => {
            for input in input::collect(&inputs)? {
                let class = classfile::decode(&input.bytes, DecodeOptions::default())
                    .with_context(|| format!("unable to decode {}", input.name))?;
                print_class(&class);
            }
        }
        Command::Validate { inputs } => {
            let mut invalid = 0;
            for input in input::collect(&inputs)? {
                if classfile::is_valid(&input.bytes) {
                    println!("{}: ok", input.name);
                } else {
                    println!("{}: invalid", input.name);
                    invalid += 1;
                }
            }
            if invalid > 0 {
                bail!("{invalid} invalid class files");
            }
        }
        Command::Version { inputs } => {
            for input in input::collect(&inputs)? {
                println!("{}: {}", input.name, classfile::get_version(&input.bytes));
            }
        }
        Command::Access { inputs } => {
            for input in input::collect(&inputs)? {
                println!("{}: 0x{:04x}", input.name, classfile::get_access(&input.bytes));
            }
        }
        Command::Strip { inputs, output } => {
            for input in input::collect(&inputs)? {
                let stripped = classfile::strip_debug(&input.bytes)
                    .with_context(|| format!("unable to strip {}", input.name))?;
                info!("{}: {} -> {} bytes", input.name, input.bytes.len(), stripped.len());
                write_output(&output, &input.name, &stripped)?;
            }
        }
        Command::Roundtrip {
            inputs,
            skip_debug,
            compute_frames,
            compute_maxs,
            output,
        } => {
            let decode_options = DecodeOptions {
                skip_debug,
                ..DecodeOptions::default()
            };
            let encode_options = EncodeOptions {
                compute_frames,
                compute_maxs: compute_maxs || compute_frames,
            };
            // inputs resolve super classes before the class path does
            let hierarchy = ClassHierarchy::new(class_path(&args.classpath, &inputs)?);
            for input in input::collect(&inputs)? {
                let bytes = roundtrip(&input, decode_options, encode_options, &hierarchy)?;
                println!("{}: {} -> {} bytes", input.name, input.bytes.len(), bytes.len());
                if let Some(output) = &output {
                    write_output(output, &input.name, &bytes)?;
                }
            }
        }
        Command::Load { class } => {
            let identifier = ClassIdentifier::parse(&class)?;
            let mut class_path = class_path(&args.classpath, &[])?;
            match class_path.from_runtime(&identifier)? {
                Some(class) => print_class(&class),
                None => bail!("class {identifier} not found on the class path"),
            }
        }
    }

    Ok(())
}

/// Directory and jar inputs followed by `--classpath`, or by the
/// environment's class path when none is given.
fn class_path(classpath: &[PathBuf], inputs: &[PathBuf]) -> Result<ClassPath> {
    let archives: Vec<&PathBuf> = inputs.iter().filter(|path| !input::is_class_file(path)).collect();
    let mut class_path = ClassPath::from_entries(&archives)?;
    if classpath.is_empty() {
        class_path.append(ClassPath::from_env()?);
    } else {
        class_path.append(ClassPath::from_entries(classpath)?);
    }
    Ok(class_path)
}

/// Encodes a decoded class and checks the result decodes again.
fn roundtrip(
    input: &ClassInput,
    decode_options: DecodeOptions,
    encode_options: EncodeOptions,
    hierarchy: &dyn TypeHierarchy,
) -> Result<Vec<u8>> {
    let class = classfile::get_node(&input.bytes, decode_options)
        .with_context(|| format!("unable to decode {}", input.name))?;
    let bytes = classfile::encode_with(&class, encode_options, hierarchy)
        .with_context(|| format!("unable to encode {}", input.name))?;
    if let Err(err) = classfile::decode(&bytes, DecodeOptions::default()) {
        warn!("{} no longer decodes after encoding: {err}", input.name);
        bail!("round trip of {} failed", input.name);
    }
    Ok(bytes)
}

fn write_output(directory: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = directory.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("unable to create {}", parent.display()))?;
    }
    fs::write(&path, bytes).with_context(|| format!("unable to write {}", path.display()))
}

fn print_class(class: &ClassRecord) {
    println!(
        "{} {} (version {}.{})",
        class.access.names(FlagTarget::Class).join(" "),
        class.name,
        class.major_version,
        class.minor_version
    );
    if let Some(super_name) = &class.super_name {
        println!("  extends {super_name}");
    }
    for interface in &class.interfaces {
        println!("  implements {interface}");
    }
    if let Some(source_file) = &class.source_file {
        println!("  source {source_file}");
    }
    for field in &class.fields {
        println!(
            "  field {} {} {}",
            field.access.names(FlagTarget::Field).join(" "),
            field.name,
            field.descriptor
        );
    }
    for method in &class.methods {
        let size = match &method.code {
            Some(code) => format!(
                " [stack {}, locals {}, {} instructions]",
                code.max_stack,
                code.max_locals,
                code.instructions.len()
            ),
            None => String::new(),
        };
        println!(
            "  method {} {}{}{size}",
            method.access.names(FlagTarget::Method).join(" "),
            method.name,
            method.descriptor
        );
    }
}
