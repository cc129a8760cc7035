extern crate getopts;

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use getopts::Options;

use temple::annotation::Driver as ManifestDriver;
use temple::context::AmbientContext;
use temple::driver::CompileDriver;
use temple::model::TypeCatalog;

fn usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} -m MANIFEST -t TYPES -o OUTDIR", program);
    print!("{}", opts.usage(&brief));
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("m", "manifest", "driver manifest TOML file", "MANIFEST");
    opts.optopt("t", "types", "model type catalog TOML file", "TYPES");
    opts.optopt("o", "out", "output directory for generated Rust source", "OUTDIR");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            usage(&program, &opts);
            process::exit(1);
        }
    };

    if matches.opt_present("h") {
        usage(&program, &opts);
        return;
    }

    let (manifest_path, types_path, out_dir) = match (
        matches.opt_str("m"),
        matches.opt_str("t"),
        matches.opt_str("o"),
    ) {
        (Some(m), Some(t), Some(o)) => (m, t, o),
        _ => {
            usage(&program, &opts);
            process::exit(1);
        }
    };

    let manifest_source = match fs::read_to_string(&manifest_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: could not read manifest {:?}: {}", manifest_path, e);
            process::exit(1);
        }
    };
    let manifest = match ManifestDriver::from_toml(&manifest_source) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: invalid manifest {:?}: {}", manifest_path, e);
            process::exit(1);
        }
    };

    let catalog = match TypeCatalog::from_file(&types_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let driver = CompileDriver::new(catalog, AmbientContext::new());
    let outcome = driver.run(&manifest);

    for diagnostic in &outcome.diagnostics {
        eprintln!("{}", diagnostic);
    }

    if let Err(e) = fs::create_dir_all(&out_dir) {
        eprintln!("error: could not create output directory {:?}: {}", out_dir, e);
        process::exit(1);
    }

    for generated in &outcome.programs {
        let file = Path::new(&out_dir).join(format!("{}.rs", generated.fn_name));
        if let Err(e) = fs::write(&file, generated.source()) {
            eprintln!("error: could not write {:?}: {}", file, e);
            process::exit(1);
        }
    }

    if outcome.has_errors() {
        process::exit(1);
    }
}
