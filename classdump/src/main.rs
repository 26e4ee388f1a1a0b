use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use classfile::reader::SliceReader;
use classfile::ClassFile;

/// Decode and validate a class file, reporting diagnostics or its signature.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the class file to decode.
    #[arg(value_name = "CLASS_FILE")]
    class_file: PathBuf,

    /// Print every accumulated diagnostic as `message: offset`, one per line.
    #[arg(short = 'C', long = "check")]
    check: bool,

    /// Print the assembler's rendered class signature.
    #[arg(short = 'S', long = "signature")]
    signature: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut file = match File::open(&args.class_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open {}: {e}", args.class_file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut contents = Vec::new();
    if let Err(e) = file.read_to_end(&mut contents) {
        eprintln!("failed to read {}: {e}", args.class_file.display());
        return ExitCode::FAILURE;
    }

    let mut reader = SliceReader::new(&contents);
    let class = ClassFile::parse(&mut reader);

    let magic_gate_failed = class.errors().iter().any(|e| e.message.starts_with("invalid magic"));
    if magic_gate_failed {
        for e in class.errors() {
            eprintln!("{e}");
        }
        return ExitCode::FAILURE;
    }

    if args.check {
        for e in class.errors() {
            println!("{e}");
        }
    }
    if args.signature {
        println!("{}", class.signature());
    }

    ExitCode::SUCCESS
}
