use bci2k_reader::{Bci2kReader, Result};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <path-to-dat-file> [--no-cache] [--mask <STATE>=<VALUE>]", args[0]);
        std::process::exit(1);
    }

    let dat_path = &args[1];
    let use_cache = !args.iter().any(|arg| arg == "--no-cache");
    let mut mask: Option<(String, u64)> = None;
    // Parse --mask argument
    if let Some(mask_idx) = args.iter().position(|arg| arg == "--mask") {
        match args.get(mask_idx + 1).and_then(|s| s.split_once('=')) {
            Some((state, value)) => match value.parse::<u64>() {
                Ok(value) => mask = Some((state.to_string(), value)),
                Err(_) => {
                    eprintln!("ERROR: Mask value must be a non-negative integer, got '{}'", value);
                    std::process::exit(1);
                }
            },
            None => {
                eprintln!("ERROR: --mask flag requires an argument of the form <STATE>=<VALUE>.");
                std::process::exit(1);
            }
        }
    }

    println!("Reading BCI2000 file: {}", dat_path);
    println!("Cache: {}", if use_cache { "enabled" } else { "disabled" });
    println!("{}", "=".repeat(60));

    if let Err(e) = run(dat_path, use_cache, mask) {
        eprintln!("\nERROR: Failed to read BCI2000 file");
        eprintln!("  {}", e);
        std::process::exit(1);
    }
}

fn run(path: &str, use_cache: bool, mask: Option<(String, u64)>) -> Result<()> {
    let mut reader = Bci2kReader::open(path, use_cache)?;
    let header = reader.decoder().header().clone();

    println!("\nRecording Information:");
    println!("  File version: {}", header.file_version.as_deref().unwrap_or("1.0"));
    println!("  Data format: {}", header.data_format);
    println!("  Channels: {}", reader.channel_count());
    println!("  Samples: {}", reader.len());
    match reader.sampling_rate() {
        Ok(rate) => println!(
            "  Sampling rate: {} Hz ({:.2} s)",
            rate,
            reader.len() as f64 / rate
        ),
        Err(e) => println!("  Sampling rate: unavailable ({})", e),
    }
    println!("  Parameters: {}", reader.parameters().len());

    println!("\nStates ({}):", header.states.len());
    for state in &header.states {
        println!(
            "  {:<24} {:>2} bits at byte {}, bit {}",
            state.name, state.length, state.byte_location, state.bit_location
        );
    }

    if let Some((state, value)) = mask {
        let selection = reader.states()?.mask_where(&state, |v| v == value)?;
        println!("\nMask {} == {}:", state, value);
        println!("  Matching samples: {}", selection.count());
        println!("  Contiguous runs: {}", selection.runs().len());
        let (signals, _) = reader.at(selection)?;
        println!("  Selected signal shape: {:?}", signals.dim());
    }

    reader.close();
    Ok(())
}
