//! xwire - Main entry point
//!
//! X11 wire-protocol server: fonts, extensions and request dispatch

use std::env;
use std::process;
use std::sync::Arc;

use xwire::server::{self, Server, ServerConfig};
use xwire::VERSION;

fn print_usage() {
    println!("xwire v{}", VERSION);
    println!("X11 wire-protocol server");
    println!();
    println!("Usage: xwire [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -display <n>          Display number (default: 0)");
    println!("  -listen <addr>        Address to bind (default: 0.0.0.0)");
    println!("  -pool <n>             Idle reply writers kept for reuse (default: 64)");
    println!("  -nobigreq             Do not offer BIG-REQUESTS");
    println!("  -h, --help            Show this help message");
    println!();
    println!("Examples:");
    println!("  xwire -display 1");
    println!("  RUST_LOG=debug xwire -listen 127.0.0.1 -pool 16");
    println!();
}

/// Value following a flag
fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", flag))
}

fn parse_args() -> Result<ServerConfig, String> {
    let mut config = ServerConfig::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-display" => {
                config.display = flag_value(&args, &mut i, "-display")?
                    .trim_start_matches(':')
                    .parse()
                    .map_err(|_| "Invalid display number".to_string())?;
            }
            "-listen" => {
                config.listen_address = flag_value(&args, &mut i, "-listen")?.to_string();
            }
            "-pool" => {
                config.max_idle_writers = flag_value(&args, &mut i, "-pool")?
                    .parse()
                    .map_err(|_| "Invalid pool size".to_string())?;
            }
            "-nobigreq" => {
                config.big_requests = false;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    log::info!("xwire v{}", VERSION);
    log::info!("Display: :{}", config.display);
    log::info!("BIG-REQUESTS: {}", config.big_requests);
    log::info!("Reply writer pool: {} idle max", config.max_idle_writers);

    let server = match Server::new(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: Failed to initialize server: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server::listener::serve(server) {
        eprintln!("Error: Failed to start TCP listener: {}", e);
        process::exit(1);
    }
}
