//! Reader for the first image file directory of a classic TIFF.
//!
//! The full decoder refuses files without the baseline image tags. This
//! reader only walks the directory entries, so the georeferencing tags of
//! such a file can still be read.

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

const ENTRY_LEN: usize = 12;

#[derive(Debug, Clone, Copy)]
struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    value: [u8; 4],
}

/// Entries of the first IFD, borrowing the file bytes for out-of-line values.
#[derive(Debug)]
pub struct Ifd<'a> {
    bytes: &'a [u8],
    little_endian: bool,
    entries: Vec<IfdEntry>,
}

impl<'a> Ifd<'a> {
    pub fn read_first(bytes: &'a [u8]) -> Result<Self, String> {
        let little_endian = match bytes.get(0..2) {
            Some(b"II") => true,
            Some(b"MM") => false,
            _ => return Err("Invalid TIFF signature".to_string()),
        };
        let mut ifd = Self {
            bytes,
            little_endian,
            entries: Vec::new(),
        };

        let version = ifd.u16_at(2)?;
        if version != 42 {
            return Err(format!("Unsupported TIFF version {}", version));
        }

        let offset = ifd.u32_at(4)? as usize;
        let count = ifd.u16_at(offset)? as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let start = offset + 2 + i * ENTRY_LEN;
            let value = ifd.slice(start + 8, 4)?;
            entries.push(IfdEntry {
                tag: ifd.u16_at(start)?,
                field_type: ifd.u16_at(start + 2)?,
                count: ifd.u32_at(start + 4)?,
                value: [value[0], value[1], value[2], value[3]],
            });
        }
        ifd.entries = entries;
        Ok(ifd)
    }

    /// First value of a SHORT or LONG tag.
    pub fn u32_value(&self, tag: u16) -> Result<Option<u32>, String> {
        let Some(entry) = self.entry(tag) else {
            return Ok(None);
        };
        if entry.count == 0 {
            return Err(format!("Tag {} has no value", tag));
        }
        // Inline values are left-justified in the value field.
        let value = match entry.field_type {
            TYPE_SHORT => u32::from(self.decode_u16([entry.value[0], entry.value[1]])),
            TYPE_LONG => self.decode_u32(entry.value),
            other => return Err(format!("Unsupported field type {} for tag {}", other, tag)),
        };
        Ok(Some(value))
    }

    /// All values of a DOUBLE tag.
    pub fn f64_values(&self, tag: u16) -> Result<Option<Vec<f64>>, String> {
        let Some(entry) = self.entry(tag) else {
            return Ok(None);
        };
        if entry.field_type != TYPE_DOUBLE {
            return Err(format!(
                "Unsupported field type {} for tag {}",
                entry.field_type, tag
            ));
        }
        let len = (entry.count as usize)
            .checked_mul(8)
            .ok_or_else(|| format!("Tag {} is too large", tag))?;
        let offset = self.decode_u32(entry.value) as usize;
        let raw = self.slice(offset, len)?;

        let values = raw
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                if self.little_endian {
                    f64::from_le_bytes(buf)
                } else {
                    f64::from_be_bytes(buf)
                }
            })
            .collect();
        Ok(Some(values))
    }

    fn entry(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }

    fn slice(&self, start: usize, len: usize) -> Result<&'a [u8], String> {
        let bytes: &'a [u8] = self.bytes;
        start
            .checked_add(len)
            .and_then(|end| bytes.get(start..end))
            .ok_or_else(|| format!("TIFF truncated at offset {}", start))
    }

    fn u16_at(&self, offset: usize) -> Result<u16, String> {
        let raw = self.slice(offset, 2)?;
        Ok(self.decode_u16([raw[0], raw[1]]))
    }

    fn u32_at(&self, offset: usize) -> Result<u32, String> {
        let raw = self.slice(offset, 4)?;
        Ok(self.decode_u32([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn decode_u16(&self, raw: [u8; 2]) -> u16 {
        if self.little_endian {
            u16::from_le_bytes(raw)
        } else {
            u16::from_be_bytes(raw)
        }
    }

    fn decode_u32(&self, raw: [u8; 4]) -> u32 {
        if self.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        }
    }
}
