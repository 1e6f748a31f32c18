//! Minimal codec for the compressed named-tag descriptor format.
//!
//! A descriptor file is a single named root compound, big-endian encoded,
//! usually gzip-compressed (zlib and raw streams also occur in the wild).
//! The reader decompresses the whole stream before decoding; descriptor
//! files are trusted local data, so no size limit is enforced.

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    fn type_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => TAG_BYTE,
            Tag::Short(_) => TAG_SHORT,
            Tag::Int(_) => TAG_INT,
            Tag::Long(_) => TAG_LONG,
            Tag::Float(_) => TAG_FLOAT,
            Tag::Double(_) => TAG_DOUBLE,
            Tag::ByteArray(_) => TAG_BYTE_ARRAY,
            Tag::String(_) => TAG_STRING,
            Tag::List(_) => TAG_LIST,
            Tag::Compound(_) => TAG_COMPOUND,
            Tag::IntArray(_) => TAG_INT_ARRAY,
            Tag::LongArray(_) => TAG_LONG_ARRAY,
        }
    }
}

/// A named collection of tags. Lookups are by exact name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    entries: HashMap<String, Tag>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tag: Tag) {
        self.entries.insert(name.into(), tag);
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(Tag::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer lookup with widening: byte, short, int and long all match.
    pub fn get_long(&self, name: &str) -> Option<i64> {
        match self.entries.get(name) {
            Some(Tag::Byte(v)) => Some(i64::from(*v)),
            Some(Tag::Short(v)) => Some(i64::from(*v)),
            Some(Tag::Int(v)) => Some(i64::from(*v)),
            Some(Tag::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.entries.get(name) {
            Some(Tag::Byte(v)) => Some(i32::from(*v)),
            Some(Tag::Short(v)) => Some(i32::from(*v)),
            Some(Tag::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_byte(&self, name: &str) -> Option<i8> {
        match self.entries.get(name) {
            Some(Tag::Byte(v)) => Some(*v),
            _ => None,
        }
    }

    /// Booleans are stored as bytes; any non-zero value is true.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_byte(name).map(|v| v != 0)
    }

    pub fn get_compound(&self, name: &str) -> Option<&Compound> {
        match self.entries.get(name) {
            Some(Tag::Compound(c)) => Some(c),
            _ => None,
        }
    }
}

/// Read a descriptor file and decode its root compound.
///
/// The stream is sniffed for gzip or zlib magic and decompressed fully
/// before decoding; a plain uncompressed tree is accepted as well.
pub fn read_compressed(path: &Path) -> Result<Compound> {
    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read descriptor: {}", path.display()))?;
    let data = decompress(&raw)
        .with_context(|| format!("failed to decompress descriptor: {}", path.display()))?;
    decode_root(&data).with_context(|| format!("failed to decode descriptor: {}", path.display()))
}

fn decompress(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match raw {
        [0x1f, 0x8b, ..] => {
            GzDecoder::new(raw).read_to_end(&mut out)?;
        }
        [0x78, ..] => {
            ZlibDecoder::new(raw).read_to_end(&mut out)?;
        }
        _ => out.extend_from_slice(raw),
    }
    Ok(out)
}

/// Decode an uncompressed tag tree. The root must be a named compound.
pub fn decode_root(data: &[u8]) -> Result<Compound> {
    let mut reader = TagReader { data, pos: 0 };
    let type_id = reader.read_u8()?;
    if type_id != TAG_COMPOUND {
        bail!("root tag must be a compound, got type {type_id}");
    }
    reader.read_string()?; // root name, conventionally empty
    match reader.read_payload(TAG_COMPOUND)? {
        Tag::Compound(c) => Ok(c),
        _ => unreachable!(),
    }
}

struct TagReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl TagReader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| anyhow::anyhow!("truncated tag data at offset {}", self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        if len < 0 {
            bail!("negative length {len} at offset {}", self.pos);
        }
        Ok(len as usize)
    }

    fn read_payload(&mut self, type_id: u8) -> Result<Tag> {
        Ok(match type_id {
            TAG_BYTE => Tag::Byte(self.read_u8()? as i8),
            TAG_SHORT => Tag::Short(self.read_i16()?),
            TAG_INT => Tag::Int(self.read_i32()?),
            TAG_LONG => Tag::Long(self.read_i64()?),
            TAG_FLOAT => Tag::Float(self.read_f32()?),
            TAG_DOUBLE => Tag::Double(self.read_f64()?),
            TAG_BYTE_ARRAY => {
                let len = self.read_len()?;
                Tag::ByteArray(self.take(len)?.to_vec())
            }
            TAG_STRING => Tag::String(self.read_string()?),
            TAG_LIST => {
                let elem_type = self.read_u8()?;
                let len = self.read_len()?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.read_payload(elem_type)?);
                }
                Tag::List(items)
            }
            TAG_COMPOUND => {
                let mut compound = Compound::new();
                loop {
                    let child_type = self.read_u8()?;
                    if child_type == TAG_END {
                        break;
                    }
                    let name = self.read_string()?;
                    let tag = self.read_payload(child_type)?;
                    compound.insert(name, tag);
                }
                Tag::Compound(compound)
            }
            TAG_INT_ARRAY => {
                let len = self.read_len()?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.read_i32()?);
                }
                Tag::IntArray(items)
            }
            TAG_LONG_ARRAY => {
                let len = self.read_len()?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.read_i64()?);
                }
                Tag::LongArray(items)
            }
            other => bail!("unknown tag type {other} at offset {}", self.pos),
        })
    }
}

/// Encode a root compound as an uncompressed tag tree.
pub fn encode_root(root: &Compound) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(TAG_COMPOUND);
    write_string(&mut out, "");
    write_compound_payload(&mut out, root);
    out
}

/// Encode a root compound and gzip it, matching what the game writes.
pub fn encode_root_gzipped(root: &Compound) -> Result<Vec<u8>> {
    let plain = encode_root(root);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&plain)?;
    Ok(encoder.finish()?)
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    let len = s.len().min(u16::MAX as usize) as u16;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&s.as_bytes()[..len as usize]);
}

fn write_compound_payload(out: &mut Vec<u8>, compound: &Compound) {
    for (name, tag) in &compound.entries {
        out.push(tag.type_id());
        write_string(out, name);
        write_payload(out, tag);
    }
    out.push(TAG_END);
}

fn write_payload(out: &mut Vec<u8>, tag: &Tag) {
    match tag {
        Tag::Byte(v) => out.push(*v as u8),
        Tag::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::ByteArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            out.extend_from_slice(v);
        }
        Tag::String(v) => write_string(out, v),
        Tag::List(items) => {
            let elem_type = items.first().map(Tag::type_id).unwrap_or(TAG_END);
            out.push(elem_type);
            out.extend_from_slice(&(items.len() as i32).to_be_bytes());
            for item in items {
                write_payload(out, item);
            }
        }
        Tag::Compound(c) => write_compound_payload(out, c),
        Tag::IntArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            for item in v {
                out.extend_from_slice(&item.to_be_bytes());
            }
        }
        Tag::LongArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            for item in v {
                out.extend_from_slice(&item.to_be_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "world_finder_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn sample_root() -> Compound {
        let mut version = Compound::new();
        version.insert("Name", Tag::String("1.21.4".to_string()));

        let mut root = Compound::new();
        root.insert("LevelName", Tag::String("Skyblock".to_string()));
        root.insert("RandomSeed", Tag::Long(-4242424242i64));
        root.insert("GameType", Tag::Int(1));
        root.insert("Difficulty", Tag::Byte(2));
        root.insert("hardcore", Tag::Byte(0));
        root.insert("Version", Tag::Compound(version));
        root.insert(
            "ServerBrands",
            Tag::List(vec![Tag::String("vanilla".to_string())]),
        );
        root
    }

    #[test]
    fn round_trips_through_plain_encoding() {
        let root = sample_root();
        let bytes = encode_root(&root);
        let decoded = decode_root(&bytes).unwrap();
        assert_eq!(decoded, root);
    }

    #[test]
    fn reads_gzipped_file_from_disk() -> Result<()> {
        let path = temp_path("nbt_gzip.dat");
        let bytes = encode_root_gzipped(&sample_root())?;
        std::fs::write(&path, bytes)?;

        let decoded = read_compressed(&path)?;
        assert_eq!(decoded.get_string("LevelName"), Some("Skyblock"));
        assert_eq!(decoded.get_long("RandomSeed"), Some(-4242424242i64));
        assert_eq!(
            decoded
                .get_compound("Version")
                .and_then(|v| v.get_string("Name")),
            Some("1.21.4")
        );

        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn reads_uncompressed_file_from_disk() -> Result<()> {
        let path = temp_path("nbt_plain.dat");
        std::fs::write(&path, encode_root(&sample_root()))?;

        let decoded = read_compressed(&path)?;
        assert_eq!(decoded.get_int("GameType"), Some(1));

        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn numeric_getters_widen_but_do_not_truncate() {
        let mut root = Compound::new();
        root.insert("b", Tag::Byte(7));
        root.insert("s", Tag::Short(300));
        root.insert("l", Tag::Long(1 << 40));

        assert_eq!(root.get_long("b"), Some(7));
        assert_eq!(root.get_long("s"), Some(300));
        assert_eq!(root.get_int("s"), Some(300));
        assert_eq!(root.get_int("l"), None);
        assert_eq!(root.get_byte("s"), None);
    }

    #[test]
    fn bool_getter_reads_nonzero_bytes() {
        let mut root = Compound::new();
        root.insert("on", Tag::Byte(1));
        root.insert("off", Tag::Byte(0));
        assert_eq!(root.get_bool("on"), Some(true));
        assert_eq!(root.get_bool("off"), Some(false));
        assert_eq!(root.get_bool("missing"), None);
    }

    #[test]
    fn rejects_non_compound_root_and_truncated_data() {
        let err = decode_root(&[TAG_STRING, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("root tag"));

        // Cut inside the first child's name length field.
        let mut bytes = encode_root(&sample_root());
        bytes.truncate(5);
        assert!(decode_root(&bytes).is_err());
    }
}
