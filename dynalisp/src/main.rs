//! Tiny demo binary for the Scheme-like front end: reads a program from a
//! file path argument (or stdin if none is given) and prints the value it
//! evaluates to.

use std::io::Read;
use std::{env, fs, process};

fn read_source(path: Option<&str>) -> std::io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn main() {
    env_logger::init();
    let path = env::args().nth(1);
    let source = match read_source(path.as_deref()) {
        Ok(source) => source,
        Err(e) => {
            log::error!("failed to read source: {e}");
            process::exit(1);
        }
    };

    let source_name = path.as_deref().unwrap_or("<stdin>");
    match dynalisp::run(&source, source_name) {
        Ok(value) => println!("{value:?}"),
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    }
}
