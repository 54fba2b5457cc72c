//! Inspection driver for popenv environments.
//!
//! Examples:
//!   popenv-cli states
//!   popenv-cli run --preset spatial --size 10 --steps 5 --seed 7
//!   popenv-cli run --config my_env.json --steps 100 --values
//!   popenv-cli config --preset pair
//!
//! `run` prints one JSON snapshot per step on stdout. Logs go to stderr;
//! `--verbose` turns on the per-step debug log.

use std::fs;
use std::io::{self, Write};
use std::process;

use popenv::prelude::*;
use tracing::{error, info, Level};

struct Args {
    command: String,
    preset: String,
    config: Option<String>,
    size: usize,
    trials: usize,
    steps: usize,
    seed: u64,
    run: usize,
    values: bool,
    verbose: bool,
}

fn usage() -> ! {
    eprintln!(
        "Usage: popenv-cli <states|run|config> [--preset spatial|pair] [--config FILE]\n\
         \x20                 [--size N] [--trials N] [--steps N] [--seed N] [--run N]\n\
         \x20                 [--values] [--verbose]"
    );
    process::exit(2);
}

fn make_error(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    process::exit(2);
}

fn parse_num<T: std::str::FromStr>(flag: &str, v: Option<&String>) -> T {
    v.and_then(|s| s.parse().ok())
        .unwrap_or_else(|| make_error(&format!("{flag} needs a non-negative number")))
}

fn parse_args() -> Args {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.is_empty() || raw[0] == "--help" || raw[0] == "-h" || raw[0] == "help" {
        usage();
    }

    let mut args = Args {
        command: raw[0].clone(),
        preset: "spatial".to_string(),
        config: None,
        size: 10,
        trials: 100,
        steps: 10,
        seed: 42,
        run: 0,
        values: false,
        verbose: false,
    };

    let mut it = raw[1..].iter();
    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--preset" => {
                args.preset = it
                    .next()
                    .cloned()
                    .unwrap_or_else(|| make_error("--preset needs a name"))
            }
            "--config" => {
                args.config = Some(
                    it.next()
                        .cloned()
                        .unwrap_or_else(|| make_error("--config needs a path")),
                )
            }
            "--size" => args.size = parse_num(flag, it.next()),
            "--trials" => args.trials = parse_num(flag, it.next()),
            "--steps" => args.steps = parse_num(flag, it.next()),
            "--seed" => args.seed = parse_num(flag, it.next()),
            "--run" => args.run = parse_num(flag, it.next()),
            "--values" => args.values = true,
            "--verbose" => args.verbose = true,
            other => make_error(&format!("unknown flag {other}")),
        }
    }
    args
}

fn load_config(args: &Args) -> Result<EnvConfig, String> {
    if let Some(path) = &args.config {
        let text = fs::read_to_string(path).map_err(|e| format!("reading {path}: {e}"))?;
        return EnvConfig::from_json_str(&text).map_err(|e| e.to_string());
    }
    match args.preset.as_str() {
        "spatial" => Ok(EnvConfig::spatial_attention(args.size, args.trials)),
        "pair" => Ok(EnvConfig::distance_pair(args.size, args.trials)),
        other => Err(format!("unknown preset {other:?} (expected spatial|pair)")),
    }
}

fn out_line(line: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")
}

fn main() {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let cfg = load_config(&args).unwrap_or_else(|e| make_error(&e));

    if args.command == "config" {
        if let Err(e) = out_line(&cfg.to_json_string()) {
            error!("failed to write config: {e}");
            process::exit(1);
        }
        return;
    }

    let mut env = match Environment::new(cfg, args.seed) {
        Ok(env) => env,
        Err(e) => {
            error!("invalid configuration: {e}");
            make_error(&e.to_string());
        }
    };
    env.init(args.run);

    match args.command.as_str() {
        "states" => {
            for s in env.states() {
                let dims = s.dim_names.join(",");
                if out_line(&format!("{}\t{:?}\t[{}]", s.name, s.shape, dims)).is_err() {
                    return;
                }
            }
        }
        "run" => {
            info!(steps = args.steps, seed = args.seed, "running");
            for _ in 0..args.steps {
                if let Err(e) = env.step() {
                    eprintln!("Failed: {e}");
                    process::exit(1);
                }
                let snap = EnvAdapter::new(&env).with_values(args.values).snapshot();
                let line = match serde_json::to_string(&snap) {
                    Ok(line) => line,
                    Err(e) => make_error(&e.to_string()),
                };
                // Stop quietly when the reader goes away (e.g. `| head`).
                if out_line(&line).is_err() {
                    return;
                }
            }
        }
        _ => usage(),
    }
}
