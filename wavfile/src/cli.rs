use std::path::PathBuf;
use std::time::Duration;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};
use wavfile_core::RawChunk;

/// Parse a human-friendly offset string into a [`Duration`].
///
/// Supported suffixes are `ms` (milliseconds), `s` (seconds), `m` (minutes),
/// and `h` (hours). Multiple components may be chained together, such as
/// `"1m30s"` or `"2h15m"`. Zero is accepted and means the start of the audio.
pub fn parse_offset(value: &str) -> Result<Duration, String> {
    let input = value.trim();
    if input.is_empty() {
        return Err("offset cannot be empty".into());
    }

    let mut total_ms: u128 = 0;
    let mut index = 0;
    let bytes = input.as_bytes();
    let len = bytes.len();
    let invalid = || format!("invalid offset '{value}'");

    while index < len {
        let start = index;
        while index < len && bytes[index].is_ascii_digit() {
            index += 1;
        }

        if start == index || index >= len {
            return Err(invalid());
        }

        let number = input[start..index].parse::<u128>().map_err(|_| invalid())?;

        let remainder = &input[index..];
        let (unit_len, factor) = if remainder.starts_with("ms") {
            (2, 1u128)
        } else if remainder.starts_with('s') {
            (1, 1_000u128)
        } else if remainder.starts_with('m') {
            (1, 60_000u128)
        } else if remainder.starts_with('h') {
            (1, 3_600_000u128)
        } else {
            return Err(invalid());
        };

        index += unit_len;

        total_ms = number
            .checked_mul(factor)
            .and_then(|component| total_ms.checked_add(component))
            .ok_or_else(|| "offset is too large".to_owned())?;
    }

    if total_ms > u128::from(u64::MAX) {
        return Err("offset is too large".into());
    }

    Ok(Duration::from_millis(total_ms as u64))
}

/// Parse an `ID=TEXT` pair into a metadata chunk.
///
/// `ID` must be exactly four ASCII characters, such as `ICMT` or `INAM`.
pub fn parse_tag(value: &str) -> Result<RawChunk, String> {
    let (id, text) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=TEXT, got '{value}'"))?;

    let id: [u8; 4] = id
        .as_bytes()
        .try_into()
        .ok()
        .filter(|id: &[u8; 4]| id.is_ascii())
        .ok_or_else(|| format!("chunk id '{id}' must be four ASCII characters"))?;

    RawChunk::new(id, text.as_bytes().to_vec()).map_err(|err| err.to_string())
}

fn format_arguments() -> [Arg; 3] {
    [
        Arg::new("rate")
            .short('r')
            .long("rate")
            .value_name("HZ")
            .help("Sample rate")
            .default_value("44100")
            .value_parser(value_parser!(u32).range(1..)),
        Arg::new("channels")
            .short('c')
            .long("channels")
            .value_name("COUNT")
            .help("Number of interleaved channels")
            .default_value("1")
            .value_parser(value_parser!(u16).range(1..)),
        Arg::new("bits")
            .short('b')
            .long("bits")
            .value_name("BITS")
            .help("Bits per sample (8, 16, 24 or 32)")
            .default_value("16")
            .value_parser(value_parser!(u16).range(1..)),
    ]
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Inspect and build PCM WAV files")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("info")
                .about("Print the format, lengths and metadata of a WAV file")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("WAV file to inspect")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Write an empty WAV file holding only the header")
                .args(format_arguments())
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("Path of the file to create (replaced if it exists)")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("pack")
                .about("Wrap raw little-endian PCM into a WAV file")
                .args(format_arguments())
                .arg(
                    Arg::new("tag")
                        .short('m')
                        .long("metadata")
                        .value_name("ID=TEXT")
                        .help("Append a metadata chunk after the audio (repeatable)")
                        .action(ArgAction::Append)
                        .value_parser(ValueParser::new(parse_tag)),
                )
                .arg(
                    Arg::new("input")
                        .value_name("RAW")
                        .help("Raw PCM input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .value_name("OUTPUT")
                        .help("WAV file to write")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("unpack")
                .about("Extract the raw PCM payload of a WAV file")
                .arg(
                    Arg::new("start")
                        .short('s')
                        .long("start")
                        .value_name("OFFSET")
                        .help("Skip this much audio first (e.g. 500ms, 1m30s)")
                        .value_parser(ValueParser::new(parse_offset)),
                )
                .arg(
                    Arg::new("input")
                        .value_name("FILE")
                        .help("WAV file to read")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .value_name("RAW")
                        .help("Raw PCM output")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}
