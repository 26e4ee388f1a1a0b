//! Constant pool: tagged-entry array with two-phase decode (§3, §4.4).

use crate::descriptors::check_binary_name;
use crate::diagnostics::Diagnostic;
use crate::reader::{Reader, ReaderError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    IndexError(String),
    ValueError(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::IndexError(m) => write!(f, "IndexError: {m}"),
            LookupError::ValueError(m) => write!(f, "ValueError: {m}"),
        }
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug, Clone)]
pub enum Constant {
    Utf8 { bytes: Vec<u8>, text: String },
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    /// The slot following a Long or Double. Any lookup into it is an error.
    Reserved,
}

impl Constant {
    fn kind_name(&self) -> &'static str {
        match self {
            Constant::Utf8 { .. } => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class { .. } => "Class",
            Constant::String { .. } => "String",
            Constant::FieldRef { .. } => "FieldRef",
            Constant::MethodRef { .. } => "MethodRef",
            Constant::InterfaceMethodRef { .. } => "InterfaceMethodRef",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Reserved => "Reserved",
        }
    }
}

/// Decodes a Modified-UTF-8 byte sequence, per the exact byte-range table.
/// Continues past a malformed sequence so a single entry yields every
/// error it contains in one pass.
pub fn decode_modified_utf8(bytes: &[u8], base_offset: u64) -> (String, Vec<Diagnostic>) {
    let mut out = String::new();
    let mut errors = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let b1 = bytes[i];
        match b1 {
            0x00 => {
                errors.push(Diagnostic::new("invalid byte 0x00", base_offset + i as u64));
                i += 1;
            }
            0x01..=0x7F => {
                out.push(b1 as char);
                i += 1;
            }
            0x80..=0xBF => {
                errors.push(Diagnostic::new(format!("invalid byte 0x{b1:02X}"), base_offset + i as u64));
                i += 1;
            }
            0xC0..=0xDF => {
                if let Some(&b2) = bytes.get(i + 1) {
                    if (0x80..=0xBF).contains(&b2) {
                        let cp = (((b1 & 0x1F) as u32) << 6) | ((b2 & 0x3F) as u32);
                        out.push(char::from_u32(cp).unwrap_or('\u{FFFD}'));
                        i += 2;
                        continue;
                    }
                    errors.push(Diagnostic::new(format!("invalid byte 0x{b2:02X}"), base_offset + (i + 1) as u64));
                    i += 1;
                } else {
                    errors.push(Diagnostic::new("truncated two-byte sequence", base_offset + i as u64));
                    i += 1;
                }
            }
            0xE0..=0xEF => {
                let b2 = bytes.get(i + 1).copied();
                let b3 = bytes.get(i + 2).copied();
                match (b2, b3) {
                    (Some(b2), Some(b3)) if (0x80..=0xBF).contains(&b2) && (0x80..=0xBF).contains(&b3) => {
                        let cp = (((b1 & 0x0F) as u32) << 12) | (((b2 & 0x3F) as u32) << 6) | ((b3 & 0x3F) as u32);
                        out.push(char::from_u32(cp).unwrap_or('\u{FFFD}'));
                        i += 3;
                    }
                    _ => {
                        errors.push(Diagnostic::new("invalid three-byte sequence", base_offset + i as u64));
                        i += 1;
                    }
                }
            }
            0xF0..=0xFF => {
                errors.push(Diagnostic::new(format!("invalid byte 0x{b1:02X}"), base_offset + i as u64));
                i += 1;
            }
        }
    }
    (out, errors)
}

pub struct ConstantPool {
    /// Index 0 is unused; slots are `None` only before the read phase
    /// populates them.
    entries: Vec<Option<Constant>>,
    offsets: Vec<u64>,
    pub errors: Vec<Diagnostic>,
}

impl ConstantPool {
    /// An empty pool (index 0 only), used when a fatal error prevents the
    /// reader from reaching the constant pool at all.
    pub fn empty() -> Self {
        ConstantPool {
            entries: vec![None],
            offsets: vec![0],
            errors: Vec::new(),
        }
    }

    pub fn read<R: Reader>(reader: &mut R) -> Result<Self, ReaderError> {
        let count = reader.read_u2()?;
        let mut entries: Vec<Option<Constant>> = vec![None; count as usize];
        let mut offsets: Vec<u64> = vec![0; count as usize];
        let mut errors = Vec::new();

        let mut i: usize = 1;
        while i < count as usize {
            let tag_offset = reader.tell();
            let tag = reader.read_u1()?;
            let constant = match tag {
                1 => {
                    let len = reader.read_u2()?;
                    let raw = reader.read_bytes(len as usize)?;
                    let (text, utf8_errors) = decode_modified_utf8(&raw, reader.tell_prev());
                    errors.extend(utf8_errors);
                    Some(Constant::Utf8 { bytes: raw, text })
                }
                3 => Some(Constant::Integer(reader.read_u4()? as i32)),
                4 => Some(Constant::Float(f32::from_bits(reader.read_u4()?))),
                5 => {
                    let hi = reader.read_u4()? as u64;
                    let lo = reader.read_u4()? as u64;
                    Some(Constant::Long((((hi << 32) | lo) as i64)))
                }
                6 => {
                    let hi = reader.read_u4()? as u64;
                    let lo = reader.read_u4()? as u64;
                    Some(Constant::Double(f64::from_bits((hi << 32) | lo)))
                }
                7 => Some(Constant::Class { name_index: reader.read_u2()? }),
                8 => Some(Constant::String { string_index: reader.read_u2()? }),
                9 => Some(Constant::FieldRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                }),
                10 => Some(Constant::MethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                }),
                11 => Some(Constant::InterfaceMethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                }),
                12 => Some(Constant::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                }),
                15 => Some(Constant::MethodHandle {
                    reference_kind: reader.read_u1()?,
                    reference_index: reader.read_u2()?,
                }),
                16 => Some(Constant::MethodType { descriptor_index: reader.read_u2()? }),
                18 => Some(Constant::InvokeDynamic {
                    bootstrap_method_attr_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                }),
                other => {
                    errors.push(Diagnostic::new(format!("unknown constant pool tag {other}"), tag_offset));
                    None
                }
            };

            if constant.is_none() {
                // Unknown tag: the reader position can't be trusted to
                // realign with further entries, so decoding stops here.
                break;
            }

            let wide = matches!(constant, Some(Constant::Long(_)) | Some(Constant::Double(_)));
            offsets[i] = tag_offset;
            entries[i] = constant;
            if wide {
                i += 1;
                if i < count as usize {
                    offsets[i] = tag_offset;
                    entries[i] = Some(Constant::Reserved);
                }
            }
            i += 1;
        }

        Ok(ConstantPool { entries, offsets, errors })
    }

    /// Resolve phase: numerics -> UTF-8 -> class -> method-type ->
    /// name-and-type -> refs -> strings -> invoke-dynamic -> method-handle.
    pub fn resolve(&mut self) {
        let count = self.entries.len();
        let order: [fn(&Constant) -> bool; 9] = [
            |c| matches!(c, Constant::Integer(_) | Constant::Float(_) | Constant::Long(_) | Constant::Double(_)),
            |c| matches!(c, Constant::Utf8 { .. }),
            |c| matches!(c, Constant::Class { .. }),
            |c| matches!(c, Constant::MethodType { .. }),
            |c| matches!(c, Constant::NameAndType { .. }),
            |c| matches!(c, Constant::FieldRef { .. } | Constant::MethodRef { .. } | Constant::InterfaceMethodRef { .. }),
            |c| matches!(c, Constant::String { .. }),
            |c| matches!(c, Constant::InvokeDynamic { .. }),
            |c| matches!(c, Constant::MethodHandle { .. }),
        ];
        for matches_kind in order {
            for i in 1..count {
                let is_target = match &self.entries[i] {
                    Some(c) => matches_kind(c),
                    None => false,
                };
                if is_target {
                    self.resolve_one(i);
                }
            }
        }
    }

    fn resolve_one(&mut self, i: usize) {
        let offset = self.offsets[i];
        let constant = self.entries[i].clone();
        match constant {
            Some(Constant::Class { name_index }) => match self.get_utf8(name_index as usize) {
                Ok(name) => {
                    if !check_binary_name(&name) {
                        self.errors.push(Diagnostic::new(format!("invalid binary class name {name:?}"), offset));
                    }
                }
                Err(e) => self.errors.push(Diagnostic::new(e.to_string(), offset)),
            },
            Some(Constant::String { string_index }) => {
                if let Err(e) = self.get_utf8(string_index as usize) {
                    self.errors.push(Diagnostic::new(e.to_string(), offset));
                }
            }
            Some(Constant::NameAndType { name_index, descriptor_index }) => {
                if let Err(e) = self.get_utf8(name_index as usize) {
                    self.errors.push(Diagnostic::new(e.to_string(), offset));
                }
                if let Err(e) = self.get_utf8(descriptor_index as usize) {
                    self.errors.push(Diagnostic::new(e.to_string(), offset));
                }
            }
            Some(Constant::MethodType { descriptor_index }) => {
                if let Err(e) = self.get_utf8(descriptor_index as usize) {
                    self.errors.push(Diagnostic::new(e.to_string(), offset));
                }
            }
            Some(Constant::FieldRef { class_index, name_and_type_index })
            | Some(Constant::MethodRef { class_index, name_and_type_index })
            | Some(Constant::InterfaceMethodRef { class_index, name_and_type_index }) => {
                if let Err(e) = self.expect_kind(class_index as usize, "Class") {
                    self.errors.push(Diagnostic::new(e.to_string(), offset));
                }
                if let Err(e) = self.expect_kind(name_and_type_index as usize, "NameAndType") {
                    self.errors.push(Diagnostic::new(e.to_string(), offset));
                }
            }
            Some(Constant::InvokeDynamic { name_and_type_index, .. }) => {
                if let Err(e) = self.expect_kind(name_and_type_index as usize, "NameAndType") {
                    self.errors.push(Diagnostic::new(e.to_string(), offset));
                }
            }
            Some(Constant::MethodHandle { reference_index, .. }) => {
                if self.at(reference_index as usize).is_err() {
                    self.errors.push(Diagnostic::new("invalid reference_index", offset));
                }
            }
            _ => {}
        }
    }

    fn expect_kind(&self, i: usize, kind: &str) -> Result<(), LookupError> {
        let entry = self.at(i)?;
        if entry.kind_name() == kind {
            Ok(())
        } else {
            Err(LookupError::ValueError(format!("expected {kind} at index {i}, found {}", entry.kind_name())))
        }
    }

    /// Returns the entry at one-based index `i`.
    pub fn at(&self, i: usize) -> Result<&Constant, LookupError> {
        if i < 1 || i >= self.entries.len() {
            return Err(LookupError::IndexError(format!("index {i} out of range")));
        }
        match &self.entries[i] {
            Some(Constant::Reserved) => Err(LookupError::IndexError(format!("index {i} is a reserved slot"))),
            Some(c) => Ok(c),
            None => Err(LookupError::IndexError(format!("index {i} out of range"))),
        }
    }

    pub fn get_utf8(&self, i: usize) -> Result<String, LookupError> {
        match self.at(i)? {
            Constant::Utf8 { text, .. } => Ok(text.clone()),
            other => Err(LookupError::ValueError(format!("expected Utf8 at index {i}, found {}", other.kind_name()))),
        }
    }

    pub fn get_class_name(&self, i: usize) -> Result<String, LookupError> {
        match self.at(i)? {
            Constant::Class { name_index } => self.get_utf8(*name_index as usize),
            other => Err(LookupError::ValueError(format!("expected Class at index {i}, found {}", other.kind_name()))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    fn build_pool(bytes: &[u8]) -> ConstantPool {
        let mut r = SliceReader::new(bytes);
        let mut pool = ConstantPool::read(&mut r).unwrap();
        pool.resolve();
        pool
    }

    #[test]
    fn long_slot_quirk() {
        // count=4: entries 1 (Long), 2 (reserved), 3 (Utf8 "x")
        let mut bytes = vec![0x00, 0x04];
        bytes.push(5); // Long tag
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.push(1); // Utf8 tag
        bytes.extend_from_slice(&[0x00, 0x01, b'x']);
        let pool = build_pool(&bytes);
        assert!(pool.get_utf8(2).is_err());
        assert_eq!(pool.get_utf8(3).unwrap(), "x");
    }

    #[test]
    fn empty_pool_index_one_is_index_error() {
        let pool = build_pool(&[0x00, 0x01]);
        assert!(matches!(pool.at(1), Err(LookupError::IndexError(_))));
    }

    #[test]
    fn malformed_utf8_reports_offset() {
        let (_text, errors) = decode_modified_utf8(&[0xC0, 0x41], 4);
        assert!(errors.iter().any(|e| e.message == "invalid byte 0x41" && e.offset == 5));
    }

    #[test]
    fn class_entry_resolves_binary_name() {
        let mut bytes = vec![0x00, 0x03];
        bytes.push(1); // #1 Utf8
        bytes.extend_from_slice(&[0x00, 0x10]);
        bytes.extend_from_slice(b"java/lang/Object");
        bytes.push(7); // #2 Class -> #1
        bytes.extend_from_slice(&[0x00, 0x01]);
        let pool = build_pool(&bytes);
        assert_eq!(pool.get_class_name(2).unwrap(), "java/lang/Object");
        assert!(pool.errors.is_empty());
    }
}
