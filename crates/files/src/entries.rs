//! Listing the entries inside binary images.
//!
//! ELF and PE images list their section names, WebAssembly modules their
//! sections (custom sections as `custom:<name>`), and static archives their
//! member names. Mach-O images list nothing.

use crate::error::{Error, ErrorKind, Result};
use crate::image::{ARCHIVE_MAGIC, ImageFormat};
use crate::models::{Image, ImageEntry};
use scry_core::{Items, ScanContext};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// Operation name reported to ignore policies.
pub const READ_ENTRIES: &str = "read_entries";

const WASM_HEADER_LEN: usize = 8;
const WASM_SECTIONS: [&str; 13] = [
    "type", "import", "function", "table", "memory", "global", "export", "start", "element", "code", "data",
    "datacount", "tag",
];
const AR_HEADER_LEN: usize = 60;
const PE_SECTION_LEN: usize = 40;

/// Bounds-checked reads over an image. Reading past the end raises
/// [`ErrorKind::Truncated`].
#[derive(Clone, Copy)]
struct Bytes<'b> {
    data: &'b [u8],
    path: &'b Path,
    big_endian: bool,
}
impl<'b> Bytes<'b> {
    fn new(data: &'b [u8], path: &'b Path) -> Self {
        Self {
            data,
            path,
            big_endian: false,
        }
    }

    fn big_endian(self, big_endian: bool) -> Self {
        Self { big_endian, ..self }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn truncated(&self) -> Error {
        Error::from(ErrorKind::Truncated(self.path.to_path_buf()))
    }

    fn malformed(&self, reason: &'static str) -> Error {
        Error::from(ErrorKind::Malformed {
            path: self.path.to_path_buf(),
            reason,
        })
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'b [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| self.truncated())
    }

    /// A view of `len` bytes at `offset`, with the same byte order.
    fn sub(&self, offset: usize, len: usize) -> Result<Self> {
        Ok(Self {
            data: self.slice(offset, len)?,
            ..*self
        })
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut array = [0; N];
        array.copy_from_slice(self.slice(offset, N)?);
        Ok(array)
    }

    fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.array::<1>(offset)?[0])
    }

    fn u16(&self, offset: usize) -> Result<u16> {
        let bytes = self.array(offset)?;
        Ok(if self.big_endian { u16::from_be_bytes(bytes) } else { u16::from_le_bytes(bytes) })
    }

    fn u32(&self, offset: usize) -> Result<u32> {
        let bytes = self.array(offset)?;
        Ok(if self.big_endian { u32::from_be_bytes(bytes) } else { u32::from_le_bytes(bytes) })
    }

    fn u64(&self, offset: usize) -> Result<u64> {
        let bytes = self.array(offset)?;
        Ok(if self.big_endian { u64::from_be_bytes(bytes) } else { u64::from_le_bytes(bytes) })
    }

    fn uleb128(&self, offset: &mut usize) -> Result<usize> {
        let mut value = 0usize;
        for shift in (0..35).step_by(7) {
            let byte = self.u8(*offset)?;
            *offset += 1;
            value |= usize::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(self.malformed("LEB128 value too long"))
    }

    /// The NUL-terminated string starting at `offset`, which must end before
    /// `end`.
    fn c_str(&self, offset: usize, end: usize) -> Result<String> {
        if offset >= end {
            return Err(self.malformed("name offset outside string table"));
        }
        let region = self.data.get(offset..end.min(self.len())).ok_or_else(|| self.truncated())?;
        match region.iter().position(|&byte| byte == 0) {
            Some(nul) => Ok(String::from_utf8_lossy(&region[..nul]).into_owned()),
            None if end > self.len() => Err(self.truncated()),
            None => Err(self.malformed("unterminated name")),
        }
    }
}

fn to_offset(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn elf_sections(bytes: Bytes<'_>, names: &mut Vec<String>) -> Result<()> {
    let wide = match bytes.u8(4)? {
        1 => false,
        2 => true,
        _ => return Err(bytes.malformed("unknown ELF class")),
    };
    let bytes = match bytes.u8(5)? {
        1 => bytes.big_endian(false),
        2 => bytes.big_endian(true),
        _ => return Err(bytes.malformed("unknown ELF byte order")),
    };
    let (shoff, shentsize, shnum, shstrndx) = if wide {
        (bytes.u64(0x28)?, bytes.u16(0x3A)?, bytes.u16(0x3C)?, bytes.u16(0x3E)?)
    } else {
        (u64::from(bytes.u32(0x20)?), bytes.u16(0x2E)?, bytes.u16(0x30)?, bytes.u16(0x32)?)
    };
    if shnum == 0 {
        return Ok(());
    }
    let header_len = if wide { 0x40 } else { 0x28 };
    if usize::from(shentsize) < header_len {
        return Err(bytes.malformed("section header entry too small"));
    }
    if shstrndx >= shnum {
        return Err(bytes.malformed("section name table index out of range"));
    }
    // (name offset, data offset, data size)
    let section = |index: u16| -> Result<(usize, usize, usize)> {
        let at = to_offset(shoff).saturating_add(usize::from(index).saturating_mul(usize::from(shentsize)));
        let header = bytes.sub(at, header_len)?;
        let name = header.u32(0)? as usize;
        Ok(if wide {
            (name, to_offset(header.u64(0x18)?), to_offset(header.u64(0x20)?))
        } else {
            (name, header.u32(0x10)? as usize, header.u32(0x14)? as usize)
        })
    };
    let (_, table, table_len) = section(shstrndx)?;
    let table_end = table.saturating_add(table_len);
    for index in 0..shnum {
        let (name, _, _) = section(index)?;
        let name = bytes.c_str(table.saturating_add(name), table_end)?;
        if !name.is_empty() {
            names.push(name);
        }
    }
    Ok(())
}

fn pe_sections(bytes: Bytes<'_>, names: &mut Vec<String>) -> Result<()> {
    let signature = bytes.u32(0x3C)? as usize;
    if bytes.slice(signature, 4)? != b"PE\0\0" {
        return Err(bytes.malformed("missing PE signature"));
    }
    let coff = bytes.sub(signature.saturating_add(4), 20)?;
    let count = coff.u16(2)?;
    let optional_header_len = coff.u16(16)?;
    let table = signature.saturating_add(24).saturating_add(usize::from(optional_header_len));
    for index in 0..usize::from(count) {
        let name = bytes.slice(table.saturating_add(index * PE_SECTION_LEN), 8)?;
        let len = name.iter().position(|&byte| byte == 0).unwrap_or(name.len());
        names.push(String::from_utf8_lossy(&name[..len]).into_owned());
    }
    Ok(())
}

fn wasm_sections(bytes: Bytes<'_>, names: &mut Vec<String>) -> Result<()> {
    let mut offset = WASM_HEADER_LEN;
    while offset < bytes.len() {
        let id = bytes.u8(offset)?;
        offset += 1;
        let size = bytes.uleb128(&mut offset)?;
        let end = offset.saturating_add(size);
        let name = match id {
            0 => {
                let mut at = offset;
                let len = bytes.uleb128(&mut at)?;
                if at.saturating_add(len) > end {
                    return Err(bytes.malformed("custom section name overruns section"));
                }
                format!("custom:{}", String::from_utf8_lossy(bytes.slice(at, len)?))
            },
            1..=13 => WASM_SECTIONS[usize::from(id) - 1].to_string(),
            _ => return Err(bytes.malformed("unknown WebAssembly section id")),
        };
        if end > bytes.len() {
            return Err(bytes.truncated());
        }
        names.push(name);
        offset = end;
    }
    Ok(())
}

fn long_member_name(table: &[u8], index: usize) -> Option<String> {
    let rest = table.get(index..)?;
    let end = rest.iter().position(|&byte| byte == b'\n').unwrap_or(rest.len());
    Some(String::from_utf8_lossy(&rest[..end]).trim_end_matches('/').to_string())
}

fn archive_members(bytes: Bytes<'_>, names: &mut Vec<String>) -> Result<()> {
    let mut long_names: &[u8] = &[];
    let mut offset = ARCHIVE_MAGIC.len();
    while offset < bytes.len() {
        let header = bytes.slice(offset, AR_HEADER_LEN)?;
        if &header[58..] != b"`\n" {
            return Err(bytes.malformed("bad archive member header"));
        }
        let size = std::str::from_utf8(&header[48..58])
            .ok()
            .and_then(|size| size.trim_end().parse::<usize>().ok())
            .ok_or_else(|| bytes.malformed("bad archive member size"))?;
        let data = offset + AR_HEADER_LEN;
        let field = String::from_utf8_lossy(&header[..16]);
        let field = field.trim_end();
        let name: Option<Cow<'_, str>> = match field {
            // Symbol tables
            "/" | "/SYM64/" => None,
            "//" => {
                long_names = bytes.slice(data, size)?;
                None
            },
            _ if field.starts_with("#1/") => {
                let len = field[3..].parse().map_err(|_| bytes.malformed("bad archive name length"))?;
                let name = String::from_utf8_lossy(bytes.slice(data, len)?);
                Some(Cow::Owned(name.trim_end_matches('\0').to_string()))
            },
            _ if field.starts_with('/') => {
                let index = field[1..].parse().map_err(|_| bytes.malformed("bad archive long name reference"))?;
                let name = long_member_name(long_names, index)
                    .ok_or_else(|| bytes.malformed("archive long name out of range"))?;
                Some(Cow::Owned(name))
            },
            _ => Some(Cow::Borrowed(field.strip_suffix('/').unwrap_or(field))),
        };
        if let Some(name) = name.filter(|name| !name.starts_with("__.SYMDEF")) {
            names.push(name.into_owned());
        }
        if data.saturating_add(size) > bytes.len() {
            return Err(bytes.truncated());
        }
        // Member data is padded to an even offset.
        offset = data + size + size % 2;
    }
    Ok(())
}

fn list_entries(format: ImageFormat, bytes: Bytes<'_>, names: &mut Vec<String>) -> Result<()> {
    match format {
        ImageFormat::Elf => elf_sections(bytes, names),
        ImageFormat::Pe => pe_sections(bytes, names),
        ImageFormat::Wasm => wasm_sections(bytes, names),
        ImageFormat::Archive => archive_members(bytes, names),
        ImageFormat::MachO => {
            tracing::debug!(path = %bytes.path.display(), "Entry listing is not supported for Mach-O images");
            Ok(())
        },
    }
}

/// List the entries inside `image`.
///
/// A truncated image still yields every entry read before its end. A file
/// that has gone missing or become unreadable yields nothing. Any other
/// fault, such as an inconsistent header, is offered to the context's ignore
/// policies under [`READ_ENTRIES`]. If no policy swallows it, it follows the
/// entries already read as an `Err` element.
pub fn read_entries<'c>(context: &'c ScanContext, image: Image) -> Items<'c, ImageEntry> {
    let data = match fs::read(image.path()) {
        Ok(data) => data,
        Err(e) => {
            let error = Error::from(ErrorKind::from_io(e, image.path()));
            let kind: &ErrorKind = &error;
            if kind.is_expected() {
                tracing::debug!(error = %kind, "Skipping image that can no longer be read");
                return Box::new(std::iter::empty());
            }
            return Box::new(context.recover(READ_ENTRIES, error).into_iter());
        },
    };
    let mut names = Vec::new();
    let fault = match list_entries(image.format, Bytes::new(&data, image.path()), &mut names) {
        Ok(()) => None,
        Err(e) if matches!(&*e, ErrorKind::Truncated(_)) => {
            tracing::debug!(path = %image.path().display(), kept = names.len(), "Image is truncated; keeping entries read so far");
            None
        },
        Err(e) => context.recover(READ_ENTRIES, e),
    };
    Box::new(names.into_iter().map(move |name| Ok(ImageEntry::new(image.clone(), name))).chain(fault))
}
