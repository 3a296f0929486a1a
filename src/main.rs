extern crate emu86;

use std::fs::File;
use std::io::Read;
use std::process::exit;

use clap::{App, Arg};

use emu86::machine::Machine;
use emu86::runner::Runner;

fn main() {
    env_logger::init();

    let matches = App::new("emu86")
        .version("0.1")
        .about("Experimental emulator of an early IBM PC class machine")
        .arg(Arg::with_name("floppy")
            .help("Boot a raw floppy image")
            .takes_value(true)
            .long("floppy"))
        .arg(Arg::with_name("com")
            .help("Load and run a flat .COM executable")
            .takes_value(true)
            .long("com"))
        .get_matches();

    let mut machine = Machine::default();

    if let Some(path) = matches.value_of("floppy") {
        if let Err(err) = machine.hw.floppy.insert(path) {
            eprintln!("Failed to mount floppy image {}: {}", path, err);
            exit(1);
        }
        if !machine.hw.floppy.is_bootable() {
            eprintln!("{} is not a bootable floppy image.", path);
            exit(1);
        }
        if let Err(err) = machine.boot_floppy() {
            eprintln!("Failed to boot {}: {}", path, err);
            exit(1);
        }
    } else if let Some(path) = matches.value_of("com") {
        let data = match read_binary(path) {
            Ok(data) => data,
            Err(err) => {
                eprintln!("Could not open file {}: {}", path, err);
                exit(1);
            }
        };
        if let Err(err) = machine.load_com(&data) {
            eprintln!("Failed to load {}: {}", path, err);
            exit(1);
        }
    } else {
        eprintln!("Nothing to do! See --help");
        exit(1);
    }

    let mut runner = Runner::new(machine);
    runner.start();
    let (machine, error) = runner.wait();

    if let Some(err) = error {
        eprintln!("A fatal error occurred and emulation cannot continue: {}", err);
        eprintln!(
            "last instruction at {:04X}:{:04X}",
            machine.cpu.regs.last_cs, machine.cpu.regs.last_ip
        );
        exit(1);
    }
    exit(0);
}

fn read_binary(path: &str) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    File::open(path)?.read_to_end(&mut buffer)?;
    Ok(buffer)
}
