use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::Path,
};

use log::debug;

use crate::config::PpmConfig;
use crate::entropy_coding::{ACReader, ACWriter};
use crate::error::{Error, Result};
use crate::models::{PpmDecoder, PpmEncoder, PpmModel};
use crate::u8;

/// Compresses `data` with a fresh model, the stream ends with EOF
pub fn compress(data: &[u8], config: &PpmConfig) -> Result<Vec<u8>> {
    let mut model = PpmModel::new(*config)?;
    let mut encoder = PpmEncoder::new(&mut model, ACWriter::new(Vec::new()));
    encoder.encode_all(data)?;
    Ok(encoder.finish()?.into_inner())
}

/// Inverse of `compress`, the config must match the one used to compress
pub fn decompress(data: &[u8], config: &PpmConfig) -> Result<Vec<u8>> {
    let mut model = PpmModel::new(*config)?;
    let decoder = PpmDecoder::new(&mut model, ACReader::new(data))?;
    decoder.collect()
}

/// Returns the number of bytes read
pub fn compress_stream<R: Read, W: Write>(reader: R, writer: W, config: &PpmConfig) -> Result<u64> {
    let mut model = PpmModel::new(*config)?;
    let mut encoder = PpmEncoder::new(&mut model, ACWriter::new(BufWriter::new(writer)));
    let mut read = 0;
    for byte in BufReader::new(reader).bytes() {
        encoder.encode(byte?)?;
        read += 1;
    }
    encoder.finish()?;
    Ok(read)
}

/// Returns the number of bytes written
pub fn decompress_stream<R: Read, W: Write>(reader: R, writer: W, config: &PpmConfig) -> Result<u64> {
    let mut model = PpmModel::new(*config)?;
    let decoder = PpmDecoder::new(&mut model, ACReader::new(BufReader::new(reader)))?;
    let mut writer = BufWriter::new(writer);
    let mut written = 0;
    for byte in decoder {
        writer.write_all(&[byte?])?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Compresses a file behind a one-byte header holding the max order
pub fn compress_file(input: &Path, output: &Path, config: &PpmConfig) -> Result<u64> {
    config.validate()?;
    let reader = File::open(input)?;
    let mut writer = File::create(output)?;
    writer.write_all(&[u8!(config.max_order)])?;
    let read = compress_stream(reader, writer, config)?;
    debug!("{}: order {}, {} bytes in", input.display(), config.max_order, read);
    Ok(read)
}

/// Decompresses a file written by `compress_file`, the order comes from its header
pub fn decompress_file(input: &Path, output: &Path) -> Result<u64> {
    let mut reader = File::open(input)?;
    let mut header = [0];
    reader.read_exact(&mut header).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => Error::InvalidConfig("compressed file has no header"),
        _ => Error::Io(err),
    })?;
    let config = PpmConfig::with_order(usize::from(header[0]));

    let written = decompress_stream(reader, File::create(output)?, &config)?;
    debug!("{}: order {}, {} bytes out", input.display(), config.max_order, written);
    Ok(written)
}
