use clap::{Arg, ArgAction, Command, value_parser};
use clap_num::maybe_hex;
use exhume_mft::projection::{CSV_HEADER, body_lines, csv_summary_row};
use exhume_mft::{DecodedEntry, ENTRY_SIZE};
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

fn read_entry<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn main() {
    let matches = Command::new("exhume_mft")
        .version("0.1.0")
        .author("ForensicXlab")
        .about("Decode the entries of a raw $MFT file.")
        .arg(
            Arg::new("mft")
                .short('m')
                .long("mft")
                .value_parser(value_parser!(String))
                .required(true)
                .help("The path to the extracted $MFT file."),
        )
        .arg(
            Arg::new("record")
                .short('r')
                .long("record")
                .value_parser(maybe_hex::<u64>)
                .help("Decode a single entry by its index in the file (decimal or hex)."),
        )
        .arg(
            Arg::new("count")
                .short('c')
                .long("count")
                .value_parser(maybe_hex::<u64>)
                .help("Stop after this many entries."),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_parser(["json", "csv", "body", "table"])
                .default_value("json")
                .help("Output format."),
        )
        .arg(
            Arg::new("pretty")
                .short('p')
                .long("pretty")
                .action(ArgAction::SetTrue)
                .help("Pretty-print JSON output."),
        )
        .arg(
            Arg::new("log_level")
                .short('l')
                .long("log-level")
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .default_value("info")
                .help("Set the log verbosity level"),
        )
        .get_matches();

    // Initialize logger.
    let log_level_str = matches
        .get_one::<String>("log_level")
        .map(String::as_str)
        .unwrap_or("info");
    let level_filter = match log_level_str {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };
    env_logger::Builder::new().filter_level(level_filter).init();

    let Some(mft_path) = matches.get_one::<String>("mft") else {
        error!("No $MFT path given.");
        return;
    };
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("json");
    let pretty = matches.get_flag("pretty");
    let record = matches.get_one::<u64>("record").copied();
    let count = matches.get_one::<u64>("count").copied().unwrap_or(u64::MAX);

    let file = match File::open(mft_path) {
        Ok(f) => f,
        Err(e) => {
            error!("Could not open '{}': {}", mft_path, e);
            return;
        }
    };
    let mut reader = BufReader::new(file);
    debug!("Opened '{}'", mft_path);

    let (first, limit) = match record {
        Some(index) => (index, 1),
        None => (0, count),
    };
    if first > 0 {
        if let Err(e) = reader.seek(SeekFrom::Start(first * ENTRY_SIZE as u64)) {
            error!("Could not seek to entry {}: {}", first, e);
            return;
        }
    }

    if format == "csv" {
        println!("{}", CSV_HEADER.join(","));
    }

    let mut buf = vec![0u8; ENTRY_SIZE];
    let mut decoded = 0u64;
    let mut index = first;
    while decoded < limit {
        let filled = match read_entry(&mut reader, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                error!("Read error at entry {}: {}", index, e);
                break;
            }
        };
        if filled == 0 {
            break;
        }
        if filled < ENTRY_SIZE {
            warn!(
                "Trailing {} bytes at entry {} are shorter than an entry, ignored.",
                filled, index
            );
            break;
        }

        match DecodedEntry::from_bytes(&buf) {
            Ok(entry) => match format {
                "csv" => println!("{}", csv_summary_row(&entry, index, ",")),
                "body" => {
                    for line in body_lines(&entry, index) {
                        println!("{}", line);
                    }
                }
                "table" => println!("{}", entry),
                _ => {
                    let value = entry.to_json(index);
                    let out = if pretty {
                        serde_json::to_string_pretty(&value)
                    } else {
                        serde_json::to_string(&value)
                    };
                    match out {
                        Ok(s) => println!("{}", s),
                        Err(e) => error!("Error serializing entry {} to JSON: {}", index, e),
                    }
                }
            },
            Err(e) => error!("Failed to decode entry {}: {}", index, e),
        }
        decoded += 1;
        index += 1;
    }
    info!("Decoded {} entries from '{}'", decoded, mft_path);
}
