//! Version metadata from the `VS_VERSIONINFO` resource of Windows PE executables.
//!
//! Reads the same fields the Windows version API exposes (`FileVersion`, `ProductName`, ...)
//! straight from the file, so it works on any platform.
//!
//! Layout walked here:
//! - DOS header, `PE\0\0` signature, COFF header and optional header (PE32 or PE32+)
//! - the resource data directory, mapped to a file offset through the section table
//! - resource tree: type `RT_VERSION` → first name → first language → data entry
//! - the `VS_VERSIONINFO` block tree with its `StringFileInfo` and `VarFileInfo` children

use std::{fs, path::Path};

use thiserror::Error;

/// Error while reading version information from an executable.
#[derive(Error, Debug)]
pub enum VersionInfoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a portable executable")]
    NotPortableExecutable,

    #[error("malformed executable: {0}")]
    Malformed(String),

    #[error("file has no version resource")]
    NoVersionResource,

    #[error("version resource has no translation table")]
    NoTranslation,

    #[error("version resource has no string table for language {0}")]
    LanguageNotFound(String),

    #[error("version resource has no field {field:?} for language {language}")]
    FieldNotFound { field: String, language: String },
}

type Result<T> = std::result::Result<T, VersionInfoError>;

const RT_VERSION: u32 = 16;
const RESOURCE_DIRECTORY_INDEX: usize = 2;
const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;
const FIXED_FILE_INFO_SIGNATURE: u32 = 0xFEEF_04BD;
const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;

/// a language and code page pair from `VarFileInfo\Translation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub language: u16,
    pub code_page: u16,
}

impl Translation {
    /// the string table key for this translation, e.g. `040904b0`
    pub fn key(&self) -> String {
        format!("{:04x}{:04x}", self.language, self.code_page)
    }
}

/// numeric versions from `VS_FIXEDFILEINFO`, most significant part first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFileInfo {
    pub file_version: [u16; 4],
    pub product_version: [u16; 4],
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StringTable {
    language: String,
    strings: Vec<(String, String)>,
}

/// Parsed `VS_VERSIONINFO` resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionInfo {
    fixed: Option<FixedFileInfo>,
    translations: Vec<Translation>,
    string_tables: Vec<StringTable>,
}

impl VersionInfo {
    /// reads the version resource of the executable at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_pe_bytes(&data)
    }

    /// parses the version resource out of a complete PE image
    pub fn from_pe_bytes(data: &[u8]) -> Result<Self> {
        let resource = pe::find_version_resource(data)?;
        Self::from_resource(resource)
    }

    /// parses a raw `VS_VERSIONINFO` block
    pub fn from_resource(resource: &[u8]) -> Result<Self> {
        let (root, _) = Block::parse(resource)?;
        if root.key != "VS_VERSION_INFO" {
            return Err(VersionInfoError::Malformed(format!(
                "unexpected version resource key {:?}",
                root.key
            )));
        }

        let mut info = VersionInfo {
            fixed: FixedFileInfo::parse(root.value),
            ..Default::default()
        };
        for child in Block::children(root.children)? {
            match child.key.as_str() {
                "StringFileInfo" => {
                    for table in Block::children(child.children)? {
                        let strings = Block::children(table.children)?
                            .into_iter()
                            .map(|s| (s.key, utf16_text(s.value)))
                            .collect();
                        info.string_tables.push(StringTable {
                            language: table.key,
                            strings,
                        });
                    }
                }
                "VarFileInfo" => {
                    for var in Block::children(child.children)? {
                        if var.key == "Translation" {
                            info.translations
                                .extend(var.value.chunks_exact(4).map(|c| Translation {
                                    language: u16::from_le_bytes([c[0], c[1]]),
                                    code_page: u16::from_le_bytes([c[2], c[3]]),
                                }));
                        }
                    }
                }
                other => log::debug!("skipping unknown version block {other:?}"),
            }
        }
        Ok(info)
    }

    pub fn fixed_file_info(&self) -> Option<&FixedFileInfo> {
        self.fixed.as_ref()
    }

    pub fn translations(&self) -> &[Translation] {
        &self.translations
    }

    /// string table keys in file order
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.string_tables.iter().map(|t| t.language.as_str())
    }

    /// the language used when none is requested: the first translation
    pub fn default_language(&self) -> Result<String> {
        self.translations
            .first()
            .map(Translation::key)
            .ok_or(VersionInfoError::NoTranslation)
    }

    /// Looks up `field` in the string table for `language`, e.g. `"040904b0"`.
    ///
    /// With `language = None` the first entry of the translation table picks the string table.
    /// Languages and field names compare case-insensitively, like the Windows API does.
    pub fn field(&self, field: &str, language: Option<&str>) -> Result<&str> {
        let language = match language {
            Some(l) => l.to_owned(),
            None => self.default_language()?,
        };
        let table = self
            .string_tables
            .iter()
            .find(|t| t.language.eq_ignore_ascii_case(&language))
            .ok_or_else(|| VersionInfoError::LanguageNotFound(language.clone()))?;
        table
            .strings
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| VersionInfoError::FieldNotFound {
                field: field.to_owned(),
                language,
            })
    }
}

/// Reads one `StringFileInfo` field, like `FileVersion`, from the executable at `path`.
///
/// `language` is the 8 hex digit language and code page id (`040904b0`).
/// Without it the first language of the translation table is used.
pub fn read_version_field(
    path: impl AsRef<Path>,
    field: &str,
    language: Option<&str>,
) -> Result<String> {
    let path = path.as_ref();
    log::debug!("reading version field {field:?} from {}", path.display());
    let info = VersionInfo::from_file(path)?;
    info.field(field, language).map(str::to_owned)
}

impl FixedFileInfo {
    fn parse(value: &[u8]) -> Option<FixedFileInfo> {
        if read_u32(value, 0).ok()? != FIXED_FILE_INFO_SIGNATURE {
            return None;
        }
        let version = |offset: usize| -> Option<[u16; 4]> {
            let ms = read_u32(value, offset).ok()?;
            let ls = read_u32(value, offset + 4).ok()?;
            Some([(ms >> 16) as u16, ms as u16, (ls >> 16) as u16, ls as u16])
        };
        Some(FixedFileInfo {
            file_version: version(8)?,
            product_version: version(16)?,
        })
    }
}

/// One node of the `VS_VERSIONINFO` tree: `wLength`, `wValueLength`, `wType`, key, value, children.
struct Block<'a> {
    key: String,
    value: &'a [u8],
    children: &'a [u8],
}

impl<'a> Block<'a> {
    /// parses the block at the start of `data`, returning it and its `wLength`
    fn parse(data: &'a [u8]) -> Result<(Block<'a>, usize)> {
        let length = read_u16(data, 0)? as usize;
        let value_length = read_u16(data, 2)? as usize;
        let value_type = read_u16(data, 4)?;
        if length < 6 || length > data.len() {
            return Err(VersionInfoError::Malformed(format!(
                "version block length {length} out of bounds"
            )));
        }
        let data = &data[..length];

        let mut key_units: Vec<u16> = vec![];
        let mut pos = 6;
        loop {
            let unit = read_u16(data, pos)?;
            pos += 2;
            if unit == 0 {
                break;
            }
            key_units.push(unit);
        }
        let key = String::from_utf16_lossy(&key_units);

        pos = align4(pos).min(length);
        // text values count UTF-16 units, binary values count bytes
        let value_bytes = if value_type == 1 {
            value_length * 2
        } else {
            value_length
        };
        let value_end = (pos + value_bytes).min(length);
        let value = &data[pos..value_end];
        let children = &data[align4(value_end).min(length)..];

        Ok((
            Block {
                key,
                value,
                children,
            },
            length,
        ))
    }

    fn children(mut data: &'a [u8]) -> Result<Vec<Block<'a>>> {
        let mut blocks = vec![];
        while data.len() >= 6 {
            let (block, length) = Block::parse(data)?;
            blocks.push(block);
            data = &data[align4(length).min(data.len())..];
        }
        Ok(blocks)
    }
}

mod pe {
    use super::*;

    struct Section {
        virtual_address: u32,
        virtual_size: u32,
        raw_size: u32,
        raw_pointer: u32,
    }

    enum ResourceNode {
        Directory(usize),
        Data(usize),
    }

    pub(super) fn find_version_resource(data: &[u8]) -> Result<&[u8]> {
        if data.get(0..2) != Some(b"MZ".as_slice()) {
            return Err(VersionInfoError::NotPortableExecutable);
        }
        let pe_offset = read_u32(data, 0x3C)? as usize;
        if data.get(pe_offset..pe_offset.saturating_add(4)) != Some(b"PE\0\0".as_slice()) {
            return Err(VersionInfoError::NotPortableExecutable);
        }

        let coff = pe_offset + 4;
        let number_of_sections = read_u16(data, coff + 2)? as usize;
        let optional_header_size = read_u16(data, coff + 16)? as usize;
        let optional = coff + 20;
        let (rva_count_offset, directories_offset) = match read_u16(data, optional)? {
            PE32_MAGIC => (92, 96),
            PE32_PLUS_MAGIC => (108, 112),
            magic => {
                return Err(VersionInfoError::Malformed(format!(
                    "unknown optional header magic {magic:#x}"
                )))
            }
        };
        let rva_count = read_u32(data, optional + rva_count_offset)? as usize;
        if rva_count <= RESOURCE_DIRECTORY_INDEX {
            return Err(VersionInfoError::NoVersionResource);
        }
        let directory = optional + directories_offset + RESOURCE_DIRECTORY_INDEX * 8;
        let resource_rva = read_u32(data, directory)?;
        if resource_rva == 0 || read_u32(data, directory + 4)? == 0 {
            return Err(VersionInfoError::NoVersionResource);
        }

        let sections = read_sections(data, optional + optional_header_size, number_of_sections)?;
        let resources = data
            .get(rva_to_offset(&sections, resource_rva)?..)
            .ok_or_else(|| malformed("resource section past end of file"))?;

        let mut node = directory_entries(resources, 0)?
            .into_iter()
            .find(|(id, _)| *id == RT_VERSION)
            .map(|(_, node)| node)
            .ok_or(VersionInfoError::NoVersionResource)?;
        // name and language levels, take the first entry of each
        for _ in 0..2 {
            if let ResourceNode::Directory(offset) = node {
                node = directory_entries(resources, offset)?
                    .into_iter()
                    .next()
                    .map(|(_, node)| node)
                    .ok_or(VersionInfoError::NoVersionResource)?;
            }
        }
        let ResourceNode::Data(entry) = node else {
            return Err(malformed("resource tree deeper than three levels"));
        };

        let data_rva = read_u32(resources, entry)?;
        let size = read_u32(resources, entry + 4)? as usize;
        let offset = rva_to_offset(&sections, data_rva)?;
        log::debug!("version resource at file offset {offset:#x}, {size} bytes");
        data.get(offset..offset.saturating_add(size))
            .ok_or_else(|| malformed("version resource past end of file"))
    }

    fn read_sections(data: &[u8], table: usize, count: usize) -> Result<Vec<Section>> {
        (0..count)
            .map(|i| {
                let header = table + i * 40;
                Ok(Section {
                    virtual_size: read_u32(data, header + 8)?,
                    virtual_address: read_u32(data, header + 12)?,
                    raw_size: read_u32(data, header + 16)?,
                    raw_pointer: read_u32(data, header + 20)?,
                })
            })
            .collect()
    }

    fn rva_to_offset(sections: &[Section], rva: u32) -> Result<usize> {
        sections
            .iter()
            .find(|s| {
                let size = s.virtual_size.max(s.raw_size);
                rva >= s.virtual_address && u64::from(rva) < u64::from(s.virtual_address) + u64::from(size)
            })
            .map(|s| (rva - s.virtual_address) as usize + s.raw_pointer as usize)
            .ok_or_else(|| malformed(&format!("rva {rva:#x} is not inside any section")))
    }

    fn directory_entries(resources: &[u8], offset: usize) -> Result<Vec<(u32, ResourceNode)>> {
        let named = read_u16(resources, offset + 12)? as usize;
        let ids = read_u16(resources, offset + 14)? as usize;
        (0..named + ids)
            .map(|i| {
                let entry = offset + 16 + i * 8;
                let name = read_u32(resources, entry)?;
                let target = read_u32(resources, entry + 4)?;
                let node = if target & SUBDIRECTORY_FLAG != 0 {
                    ResourceNode::Directory((target & !SUBDIRECTORY_FLAG) as usize)
                } else {
                    ResourceNode::Data(target as usize)
                };
                Ok((name, node))
            })
            .collect()
    }

    fn malformed(msg: &str) -> VersionInfoError {
        VersionInfoError::Malformed(msg.to_owned())
    }
}

fn align4(pos: usize) -> usize {
    (pos + 3) & !3
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    offset
        .checked_add(2)
        .and_then(|end| data.get(offset..end))
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| VersionInfoError::Malformed(format!("truncated at offset {offset:#x}")))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    offset
        .checked_add(4)
        .and_then(|end| data.get(offset..end))
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| VersionInfoError::Malformed(format!("truncated at offset {offset:#x}")))
}

/// UTF-16LE text up to the first NUL
fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
