extern crate clap;

mod compiler;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{App, Arg};
use log::{LevelFilter, error, info, warn};
use simple_logger::SimpleLogger;

#[derive(Clone, Copy, PartialEq)]
enum OutputFormat {
    Vm,
    Xml,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Vm => "vm",
            OutputFormat::Xml => "xml",
        }
    }
}

struct Options {
    format: OutputFormat,
    out_dir: Option<PathBuf>,
}

fn main() {
    let app = App::new("jackc")
        .version("0.1.0")
        .author("Lee Keitel")
        .about("Compiles .jack classes to stack VM code")
        .arg(
            Arg::with_name("INPUT")
                .help("A .jack file or a directory of them")
                .required(true),
        )
        .arg(
            Arg::with_name("xml")
                .long("xml")
                .help("Write the XML parse tree instead of VM code"),
        )
        .arg(
            Arg::with_name("out-dir")
                .short("o")
                .long("out-dir")
                .value_name("DIR")
                .takes_value(true)
                .help("Directory for output files"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Log more (repeat for debug output)"),
        )
        .get_matches();

    let level = match app.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("logger: {}", e);
    }

    let opts = Options {
        format: if app.is_present("xml") {
            OutputFormat::Xml
        } else {
            OutputFormat::Vm
        },
        out_dir: app.value_of("out-dir").map(PathBuf::from),
    };

    let input = Path::new(app.value_of("INPUT").unwrap_or_default());
    let sources = collect_sources(input).unwrap_or_else(|e| {
        error!("{}: {}", input.display(), e);
        std::process::exit(1);
    });

    let mut failed = 0;
    for src in &sources {
        if let Err(e) = compile_one(src, &opts) {
            error!("{}: {}", src.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        error!("{} of {} files failed", failed, sources.len());
        std::process::exit(1);
    }
}

/// A single `.jack` file, or every `.jack` file directly inside a
/// directory in name order.
fn collect_sources(input: &Path) -> io::Result<Vec<PathBuf>> {
    if input.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(input)? {
            let path = entry?.path();
            if path.is_file() && is_jack(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            warn!("no .jack files in {}", input.display());
        }
        return Ok(files);
    }

    if is_jack(input) {
        return Ok(vec![input.to_path_buf()]);
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "expected a .jack file or a directory",
    ))
}

fn is_jack(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "jack")
}

/// Compiles one file and writes its output next to it, or into the output
/// directory. Nothing is written when compilation fails.
fn compile_one(src: &Path, opts: &Options) -> Result<(), Box<dyn std::error::Error>> {
    info!("compiling {}", src.display());
    let compiled = compiler::compile_file(src, opts.format == OutputFormat::Xml)?;

    let stem = src.file_stem().unwrap_or_default();
    if stem.to_string_lossy() != compiled.class_name {
        warn!(
            "{}: class {} does not match the file name",
            src.display(),
            compiled.class_name
        );
    }

    let dir = match &opts.out_dir {
        Some(dir) => dir.as_path(),
        None => src.parent().unwrap_or_else(|| Path::new(".")),
    };
    let out_path = dir.join(stem).with_extension(opts.format.extension());

    let contents = match opts.format {
        OutputFormat::Vm => compiled.vm,
        OutputFormat::Xml => compiled.parse_tree.unwrap_or_default().into_bytes(),
    };
    fs::write(&out_path, contents)?;
    info!("wrote {}", out_path.display());
    Ok(())
}
