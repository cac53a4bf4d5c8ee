#[macro_use]
extern crate clap;

mod dump;
mod error;

use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use clap::Arg;

use error::Error;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Path to the .tasm source file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("memdump")
                .help("Write the three memory-dump files after the run")
                .index(2)
                // Without this, clap 2.x treats a leading `-` as an attempted
                // short-flag cluster before it ever considers positional
                // binding, and `-memdump` is rejected outright — even though
                // it is the exact flag spelling `tasm.c`'s own argv handling
                // expects (argv[2] == "-memdump"), not a clap long option.
                .allow_hyphen_values(true),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let memdump = matches.value_of("memdump") == Some("-memdump");

    if let Err(err) = run(input, memdump) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(input: &str, memdump: bool) -> Result<(), Error> {
    let input_path = Path::new(input);
    if input_path.extension().and_then(|ext| ext.to_str()) != Some("tasm") {
        return Err(Error::BadExtension(input_path.to_owned()));
    }

    let source = read_source(input_path)?;

    let assembled = match tasm_asm::assemble(&source) {
        Ok(assembled) => assembled,
        Err(err) => {
            // Mirrors the reference assembler: only a code-region overflow
            // dumps mid-assembly, since it is the only assembly fault that
            // carries a partially-written tape worth inspecting.
            if memdump {
                if let Some(tape) = &err.partial_tape {
                    if let Err(dump_err) = dump::write_all(tape) {
                        eprintln!("could not write memory dump: {}", dump_err);
                    }
                }
            }
            return Err(Error::from(err));
        }
    };

    let mut machine = tasm_vm::Machine::new();
    machine.tape = assembled.tape;
    machine.ip = assembled.entry;
    machine.memdump = memdump;

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let run_result = tasm_vm::vm::run(&mut machine, &mut lock);

    if machine.memdump {
        if let Err(err) = dump::write_all(&machine.tape) {
            eprintln!("could not write memory dump: {}", err);
        }
    }

    run_result.map_err(Error::from)
}

fn read_source(path: &Path) -> Result<String, Error> {
    let file = File::open(path).map_err(|err| Error::Io(err, path.to_owned()))?;
    let mut reader = BufReader::new(file);
    let mut source = String::new();
    reader
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, path.to_owned()))?;
    Ok(source)
}
