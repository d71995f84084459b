//! `js-ld`: the CLI driver named in spec.md §1/§6 as an external
//! collaborator of the module generator. Parses arguments, reads the wasm
//! binary and the symbols/exports/externs files off disk, and calls into
//! `js-ld-core`.

mod fragment;

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use js_ld_core::{GeneratorInput, ModuleGenerator, WasmView, SYMBOLS_MODULE};

/// `js-ld --output <out.js> --exports <file.js>... --symbols <file.js>...
/// --externs <file.js> <input.wasm>` (spec.md §6).
#[derive(Debug, Parser)]
#[command(name = "js-ld", version, about = "Link a wasm module with hand-written JS into one UMD script")]
struct Args {
    /// The wasm object module to link.
    input: PathBuf,

    /// Where to write the generated UMD script.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// A JS fragment declaring exports; may be repeated.
    #[arg(long = "exports", value_name = "FILE")]
    exports: Vec<PathBuf>,

    /// A JS fragment declaring imported symbols; may be repeated.
    #[arg(long = "symbols", value_name = "FILE")]
    symbols: Vec<PathBuf>,

    /// A flat allowlist of externs, one identifier per line.
    #[arg(long = "externs", value_name = "FILE")]
    externs: Option<PathBuf>,

    /// Override the emitted module's UMD/AMD name (defaults to the wasm
    /// input's file stem).
    #[arg(long = "out-name", value_name = "NAME")]
    out_name: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = rmain(&args) {
        eprintln!("error: {err:?}");
        process::exit(1);
    }
}

fn rmain(args: &Args) -> Result<()> {
    log::debug!("reading wasm module from {}", args.input.display());
    let wasm_bytes = fs::read(&args.input).with_context(|| format!("failed to read {}", args.input.display()))?;
    let module = parity_wasm::deserialize_buffer(&wasm_bytes)
        .with_context(|| format!("failed to parse wasm module {}", args.input.display()))?;
    let wasm = WasmView::from_module(&module, SYMBOLS_MODULE)?;

    let mut symbols_files = Vec::new();
    for path in &args.symbols {
        log::debug!("parsing symbols file {}", path.display());
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        symbols_files.push(
            fragment::parse_symbols_file(&text).with_context(|| format!("in symbols file {}", path.display()))?,
        );
    }

    let mut exports_files = Vec::new();
    for path in &args.exports {
        log::debug!("parsing exports file {}", path.display());
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        exports_files.push(
            fragment::parse_exports_file(&text).with_context(|| format!("in exports file {}", path.display()))?,
        );
    }

    let externs: BTreeSet<String> = match &args.externs {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            fragment::parse_externs(&text)
        }
        None => BTreeSet::new(),
    };

    let wasm_filename = args
        .input
        .file_name()
        .and_then(|s| s.to_str())
        .context("wasm input path has no file name")?
        .to_string();
    let module_name = args.out_name.clone().unwrap_or_else(|| {
        args.input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("out")
            .to_string()
    });

    log::debug!(
        "generating module {:?} ({} symbols files, {} exports files, {} externs)",
        module_name,
        symbols_files.len(),
        exports_files.len(),
        externs.len()
    );

    let input = GeneratorInput {
        wasm,
        wasm_filename,
        symbols_files,
        exports_files,
        externs,
        module_name,
    };

    let mut generator = ModuleGenerator::new();
    let output = generator.generate(input)?;

    fs::write(&args.output, output).with_context(|| format!("failed to write {}", args.output.display()))?;
    log::debug!("wrote {}", args.output.display());
    Ok(())
}
