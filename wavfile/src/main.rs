mod cli;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::ArgMatches;
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, warn};
use wavfile_core::{
    AudioFileReader, MetadataChunk, PcmWaveCreator, RawChunk, WavFile, WavFormat, WaveFileCreator,
};

use crate::cli::build_cli;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();
    match matches.subcommand() {
        Some(("info", args)) => info(args),
        Some(("create", args)) => create(args),
        Some(("pack", args)) => pack(args),
        Some(("unpack", args)) => unpack(args),
        _ => unreachable!("subcommand is required"),
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> &'a PathBuf {
    args.get_one::<PathBuf>(name).expect("required argument")
}

fn format_from_args(args: &ArgMatches) -> anyhow::Result<WavFormat> {
    let rate = *args.get_one::<u32>("rate").expect("defaulted argument");
    let channels = *args.get_one::<u16>("channels").expect("defaulted argument");
    let bits = *args.get_one::<u16>("bits").expect("defaulted argument");

    WavFormat::builder()
        .sample_rate(rate)
        .channels(channels)
        .bits_per_sample(bits)
        .build()
        .context("invalid audio format")
}

fn progress_bar(len: u64, template: &str) -> ProgressBar {
    let progress = ProgressBar::new(len);
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}

fn open_existing(path: &Path) -> anyhow::Result<WavFile> {
    if !path.is_file() {
        return Err(anyhow!("input file does not exist: {}", path.display()));
    }
    WavFile::open(path).with_context(|| format!("failed to read '{}'", path.display()))
}

fn info(args: &ArgMatches) -> anyhow::Result<()> {
    let path = path_arg(args, "file");
    let wav = open_existing(path)?;

    println!("File:         {}", path.display());
    println!(
        "Format:       PCM, {} Hz, {} channel(s), {} bit",
        wav.sample_rate(),
        wav.channels(),
        wav.bits_per_sample()
    );
    println!("Frames:       {}", wav.total_frames());
    println!("Duration:     {}", HumanDuration(wav.duration()));
    println!(
        "Audio:        {} byte(s) ({})",
        wav.total_audio_length(),
        HumanBytes(u64::from(wav.total_audio_length()))
    );
    println!("RIFF length:  {}", wav.total_data_length());

    match wav.metadata() {
        Some(metadata) => {
            println!("Metadata:     {} byte(s)", wav.metadata_size());
            for chunk in metadata.chunks() {
                println!("  {} ({} byte(s))", chunk.id_str(), chunk.payload().len());
            }
        }
        None => println!("Metadata:     none"),
    }

    Ok(())
}

fn create(args: &ArgMatches) -> anyhow::Result<()> {
    let path = path_arg(args, "file");
    let format = format_from_args(args)?;

    PcmWaveCreator::new(format)
        .create_empty(path)
        .with_context(|| format!("failed to create '{}'", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

fn pack(args: &ArgMatches) -> anyhow::Result<()> {
    let input_path = path_arg(args, "input");
    let output_path = path_arg(args, "output");
    let format = format_from_args(args)?;

    if !input_path.is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }

    let mut input = File::open(input_path)
        .with_context(|| format!("failed to open '{}'", input_path.display()))?;
    let input_len = input.metadata()?.len();
    if input_len % u64::from(format.frame_size()) != 0 {
        warn!(
            "'{}' holds {input_len} byte(s), not a whole number of {}-byte frames",
            input_path.display(),
            format.frame_size()
        );
    }
    let audio_len = u32::try_from(input_len)
        .map_err(|_| anyhow!("{} of PCM exceeds the WAV size limit", HumanBytes(input_len)))?;

    let mut wav = WavFile::create(output_path, format)
        .with_context(|| format!("failed to create '{}'", output_path.display()))?;

    let progress = progress_bar(
        input_len,
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes}",
    );
    let copied = {
        let output = OpenOptions::new()
            .append(true)
            .open(output_path)
            .with_context(|| format!("failed to open '{}'", output_path.display()))?;
        let mut output = BufWriter::new(output);
        let copied = copy_with_progress(&mut input, &mut output, &progress)
            .with_context(|| format!("failed to copy audio into '{}'", output_path.display()))?;
        output.flush()?;
        copied
    };
    progress.finish_and_clear();

    if copied != u64::from(audio_len) {
        return Err(anyhow!(
            "'{}' changed size while packing ({copied} of {audio_len} byte(s) copied)",
            input_path.display()
        ));
    }

    wav.finish_write(audio_len)
        .context("failed to finalise audio length")?;

    let tags: Vec<RawChunk> = args
        .get_many::<RawChunk>("tag")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let finalised = if tags.is_empty() {
        wav.write_header()
    } else {
        let mut metadata = MetadataChunk::new();
        for tag in tags {
            metadata.push(tag);
        }
        wav.write_metadata(metadata)
    };
    finalised.with_context(|| format!("failed to finalise '{}'", output_path.display()))?;

    println!(
        "Packed {} ({}) into {}",
        HumanBytes(copied),
        HumanDuration(wav.duration()),
        output_path.display()
    );
    Ok(())
}

fn copy_with_progress<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    progress: &ProgressBar,
) -> std::io::Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        output.write_all(&buffer[..read])?;
        copied += read as u64;
        progress.set_position(copied);
    }
    Ok(copied)
}

fn start_frame(offset: Duration, sample_rate: u32) -> u64 {
    let frame = offset.as_millis() * u128::from(sample_rate) / 1_000;
    frame.try_into().unwrap_or(u64::MAX)
}

fn unpack(args: &ArgMatches) -> anyhow::Result<()> {
    let input_path = path_arg(args, "input");
    let output_path = path_arg(args, "output");
    let wav = open_existing(input_path)?;

    let mut reader = wav
        .reader()
        .with_context(|| format!("failed to open '{}'", input_path.display()))?;

    if let Some(offset) = args.get_one::<Duration>("start") {
        let frame = start_frame(*offset, reader.sample_rate());
        debug!("seeking to frame {frame} of {}", reader.total_frames());
        reader
            .seek(frame)
            .with_context(|| format!("cannot start at {}", HumanDuration(*offset)))?;
    }

    let output = File::create(output_path)
        .with_context(|| format!("failed to create '{}'", output_path.display()))?;
    let mut output = BufWriter::new(output);

    let progress = progress_bar(
        reader.total_frames() - reader.frame_position(),
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames",
    );
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;
    while reader.has_remaining() {
        let read = reader
            .read_pcm(&mut buffer)
            .with_context(|| format!("failed to read audio from '{}'", input_path.display()))?;
        if read == 0 {
            break;
        }
        output.write_all(&buffer[..read])?;
        written += read as u64;
        progress.inc(read as u64 / u64::from(wav.frame_size_in_bytes()));
    }
    output.flush()?;
    progress.finish_and_clear();

    println!(
        "Unpacked {} into {}",
        HumanBytes(written),
        output_path.display()
    );
    Ok(())
}
