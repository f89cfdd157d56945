use std::error::Error;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tempfile::tempdir;
use wavfile_core::{
    AudioFileReader, InvalidFormatReason, MetadataChunk, PcmWaveCreator, RawChunk, RiffChunk,
    WavError, WavFile, WavFormat, WaveFileCreator,
};

/// Synthesise a 16-bit mono sine tone as raw little-endian PCM.
///
/// Fixtures are produced at runtime so that no binary assets need to be kept in
/// the repository.
fn test_tone(sample_rate: u32, duration_ms: u64) -> Vec<u8> {
    let total_samples = (sample_rate as u64 * duration_ms + 999) / 1_000;
    let mut samples = Vec::with_capacity(total_samples as usize * 2);

    for n in 0..total_samples {
        let theta = (n as f32 / sample_rate as f32) * 2.0 * std::f32::consts::PI * 440.0;
        let sample = (theta.sin() * i16::MAX as f32) as i16;
        samples.extend_from_slice(&sample.to_le_bytes());
    }
    samples
}

/// Write a header by hand, followed by `audio` and the raw `trailer` bytes.
fn write_raw_wav<P: AsRef<Path>>(
    path: P,
    riff_length: u32,
    audio: &[u8],
    trailer: &[u8],
) -> Result<(), Box<dyn Error>> {
    let mut file = File::create(path)?;
    file.write_all(b"RIFF")?;
    file.write_all(&riff_length.to_le_bytes())?;
    file.write_all(b"WAVE")?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?; // PCM
    file.write_all(&1u16.to_le_bytes())?; // channels
    file.write_all(&8_000u32.to_le_bytes())?;
    file.write_all(&16_000u32.to_le_bytes())?; // byte rate
    file.write_all(&2u16.to_le_bytes())?; // block align
    file.write_all(&16u16.to_le_bytes())?;
    file.write_all(b"data")?;
    file.write_all(&(audio.len() as u32).to_le_bytes())?;
    file.write_all(audio)?;
    file.write_all(trailer)?;
    Ok(())
}

/// Create a file, stream `audio` into it and finalise the header.
fn stream_into(path: &Path, format: WavFormat, audio: &[u8]) -> Result<WavFile, Box<dyn Error>> {
    let mut wav = WavFile::create(path, format)?;

    let mut file = OpenOptions::new().append(true).open(path)?;
    for chunk in audio.chunks(1_000) {
        file.write_all(chunk)?;
    }
    drop(file);

    wav.finish_write(audio.len() as u32)?;
    wav.write_header()?;
    Ok(wav)
}

#[test]
fn empty_file_header_bytes() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("empty.wav");

    let format = WavFormat::builder()
        .sample_rate(44_100)
        .channels(1)
        .bits_per_sample(16)
        .build()?;
    WavFile::create(&path, format)?;

    let bytes = fs::read(&path)?;
    assert_eq!(bytes.len(), 44);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
    assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 1);
    assert_eq!(
        u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        44_100
    );
    assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(
        u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
        0
    );

    dir.close()?;
    Ok(())
}

#[test]
fn hand_built_header_without_metadata() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("plain.wav");
    write_raw_wav(&path, 36 + 1_000, &[0u8; 1_000], &[])?;

    let wav = WavFile::open(&path)?;
    assert!(!wav.has_metadata());
    assert_eq!(wav.metadata_size(), 0);
    assert_eq!(wav.total_audio_length(), 1_000);
    assert_eq!(wav.total_data_length(), 1_036);
    assert_eq!(wav.sample_rate(), 8_000);
    assert_eq!(wav.channels(), 1);
    assert_eq!(wav.bits_per_sample(), 16);
    assert_eq!(wav.total_frames(), 500);

    dir.close()?;
    Ok(())
}

#[test]
fn trailing_metadata_is_parsed() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("tagged.wav");

    let mut metadata = MetadataChunk::new();
    metadata.push(RawChunk::new(*b"INAM", b"tone".to_vec())?);
    metadata.push(RawChunk::new(*b"ISFT", b"wavfile".to_vec())?);
    let trailer = metadata.to_bytes();
    let audio = test_tone(8_000, 50);
    let riff_length = 36 + audio.len() as u32 + trailer.len() as u32;
    write_raw_wav(&path, riff_length, &audio, &trailer)?;

    let wav = WavFile::open(&path)?;
    assert!(wav.has_metadata());
    assert_eq!(wav.metadata_size(), trailer.len() as u64);
    assert_eq!(wav.metadata(), Some(&metadata));

    dir.close()?;
    Ok(())
}

#[test]
fn malformed_metadata_is_reported() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.wav");
    write_raw_wav(&path, 36 + 100 + 5, &[0u8; 100], b"LIST\xff")?;

    let err = WavFile::open(&path).expect_err("truncated metadata should fail");
    assert!(matches!(err, WavError::MalformedChunk { .. }));

    dir.close()?;
    Ok(())
}

#[test]
fn short_file_is_invalid() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("short.wav");
    fs::write(&path, b"RIFF\x24\0\0\0WAVEfmt ")?;

    let err = WavFile::open(&path).expect_err("short file should fail");
    match err {
        WavError::InvalidFormat(InvalidFormatReason::TooShort { len }) => assert_eq!(len, 16),
        other => panic!("unexpected error: {other:?}"),
    }

    dir.close()?;
    Ok(())
}

#[test]
fn corrupt_tag_stops_before_metadata() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("corrupt.wav");
    // The metadata region is garbage; the header error must win.
    write_raw_wav(&path, 36 + 10 + 3, &[0u8; 10], b"???")?;
    let mut bytes = fs::read(&path)?;
    bytes[8..12].copy_from_slice(b"WAVX");
    fs::write(&path, &bytes)?;

    let err = WavFile::open(&path).expect_err("bad WAVE tag should fail");
    assert!(matches!(
        err,
        WavError::InvalidFormat(InvalidFormatReason::MissingWaveTag)
    ));

    dir.close()?;
    Ok(())
}

#[test]
fn declared_metadata_beyond_file_end_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("oversized.wav");
    write_raw_wav(&path, u32::MAX, &[], &[])?;

    let err = WavFile::open(&path).expect_err("oversized RIFF length should fail");
    match err {
        WavError::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected error: {other:?}"),
    }

    dir.close()?;
    Ok(())
}

#[test]
fn unpadded_final_chunk_keeps_riff_length() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("unpadded.wav");
    let mut trailer = b"ICMT".to_vec();
    trailer.extend_from_slice(&1u32.to_le_bytes());
    trailer.push(7);
    write_raw_wav(&path, 36 + 10 + 9, &[0u8; 10], &trailer)?;

    let mut wav = WavFile::open(&path)?;
    assert_eq!(wav.metadata_size(), 9);
    assert_eq!(wav.total_data_length(), 55);

    wav.finish_write(wav.total_audio_length())?;
    assert_eq!(wav.total_data_length(), 55);
    wav.write_header()?;

    assert_eq!(fs::metadata(&path)?.len(), 44 + 10 + 9);
    let reopened = WavFile::open(&path)?;
    assert_eq!(reopened.total_data_length(), 55);
    assert_eq!(
        reopened.metadata().and_then(|m| m.find(b"ICMT")).map(RawChunk::payload),
        Some(&[7u8][..])
    );

    dir.close()?;
    Ok(())
}

#[test]
fn missing_file_propagates_io_error() {
    let err = WavFile::open("does/not/exist.wav").expect_err("missing file should fail");
    match err {
        WavError::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn streamed_file_round_trips() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("streamed.wav");
    let audio = test_tone(8_000, 1_100);
    let format = WavFormat::builder().sample_rate(8_000).build()?;

    let written = stream_into(&path, format, &audio)?;
    assert_eq!(written.total_data_length(), 36 + audio.len() as u32);
    assert_eq!(fs::metadata(&path)?.len(), 44 + audio.len() as u64);

    let wav = WavFile::open(&path)?;
    assert_eq!(wav.format(), format);
    assert_eq!(wav.total_audio_length(), audio.len() as u32);
    assert!(!wav.has_metadata());

    let mut reader = wav.reader()?;
    let mut decoded = Vec::new();
    let mut buffer = vec![0u8; 333];
    while reader.has_remaining() {
        let read = reader.read_pcm(&mut buffer)?;
        decoded.extend_from_slice(&buffer[..read]);
    }
    assert_eq!(decoded, audio);
    assert_eq!(reader.frame_position(), reader.total_frames());

    dir.close()?;
    Ok(())
}

#[test]
fn metadata_written_after_audio_survives_reopen() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("annotated.wav");
    let audio = test_tone(8_000, 100);
    let format = WavFormat::builder().sample_rate(8_000).build()?;
    let mut wav = stream_into(&path, format, &audio)?;

    let mut metadata = MetadataChunk::new();
    metadata.push(RawChunk::new(*b"ICMT", b"first pass".to_vec())?);
    metadata.push(RawChunk::new(*b"IART", b"odd".to_vec())?);
    wav.write_metadata(metadata.clone())?;

    let expected_len = 44 + audio.len() as u64 + metadata.total_size();
    assert_eq!(fs::metadata(&path)?.len(), expected_len);

    let reopened = WavFile::open(&path)?;
    assert_eq!(reopened.metadata(), Some(&metadata));
    assert_eq!(
        u64::from(reopened.total_data_length()),
        36 + audio.len() as u64 + metadata.total_size()
    );

    // Replacing with a smaller region truncates the old bytes.
    let mut smaller = MetadataChunk::new();
    smaller.push(RawChunk::new(*b"ICMT", b"v2".to_vec())?);
    wav.write_metadata(smaller.clone())?;
    assert_eq!(fs::metadata(&path)?.len(), 44 + audio.len() as u64 + 10);
    assert_eq!(WavFile::open(&path)?.metadata(), Some(&smaller));

    wav.write_metadata(MetadataChunk::new())?;
    let cleared = WavFile::open(&path)?;
    assert!(!cleared.has_metadata());
    assert_eq!(cleared.total_audio_length(), audio.len() as u32);

    dir.close()?;
    Ok(())
}

#[test]
fn creator_output_is_openable() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("created.wav");

    let created = PcmWaveCreator::default().create_empty(&path)?;
    let opened = WavFile::open(&path)?;

    assert_eq!(opened.format(), created.format());
    assert_eq!(opened.total_audio_length(), 0);
    assert_eq!(opened.total_data_length(), 36);
    assert!(!opened.reader()?.has_remaining());

    dir.close()?;
    Ok(())
}

#[test]
fn finalised_file_decodes_with_symphonia() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("decodable.wav");
    let audio = test_tone(8_000, 500);
    let format = WavFormat::builder().sample_rate(8_000).build()?;
    stream_into(&path, format, &audio)?;

    let mut hint = Hint::new();
    hint.with_extension("wav");
    let mss = MediaSourceStream::new(Box::new(File::open(&path)?), Default::default());
    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut reader = probed.format;

    let track = reader.default_track().ok_or("no default track")?;
    assert_eq!(track.codec_params.sample_rate, Some(8_000));
    assert_eq!(track.codec_params.channels.map(|c| c.count()), Some(1));

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut frames = 0u64;
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(err) => return Err(err.into()),
        };
        frames += decoder.decode(&packet)?.frames() as u64;
    }
    assert_eq!(frames, audio.len() as u64 / 2);

    dir.close()?;
    Ok(())
}
