//! Generic attribute envelope and the `Code` attribute (§4.5).
//!
//! The broader attribute zoo (StackMapTable, RuntimeVisibleAnnotations,
//! Module, …) decodes bytecode-verification and metadata attributes this
//! decoder does not interpret; only the envelope and `Code` are needed
//! for structural integrity.

use crate::diagnostics::Diagnostic;
use crate::reader::{Reader, ReaderError, SliceReader};

#[derive(Debug, Clone)]
pub struct RawAttribute {
    pub name_index: u16,
    pub name: Option<String>,
    pub bytes: Vec<u8>,
    pub offset: u64,
}

impl RawAttribute {
    pub fn read<R: Reader>(reader: &mut R) -> Result<Self, ReaderError> {
        let offset = reader.tell();
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()?;
        let bytes = reader.read_bytes(length as usize)?;
        Ok(RawAttribute { name_index, name: None, bytes, offset })
    }

    /// Looks up `name_index` against the enclosing pool; appends a
    /// diagnostic if it isn't a Utf8 entry.
    pub fn resolve(&mut self, pool: &crate::constants::ConstantPool, errors: &mut Vec<Diagnostic>) {
        match pool.get_utf8(self.name_index as usize) {
            Ok(name) => self.name = Some(name),
            Err(e) => errors.push(Diagnostic::new(e.to_string(), self.offset)),
        }
    }
}

/// Indexes a list of raw attributes by name, keeping the last occurrence
/// of any duplicate.
pub fn index_by_name(attrs: &[RawAttribute]) -> std::collections::HashMap<String, usize> {
    let mut map = std::collections::HashMap::new();
    for (i, a) in attrs.iter().enumerate() {
        if let Some(name) = &a.name {
            map.insert(name.clone(), i);
        }
    }
    map
}

#[derive(Debug, Clone)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<RawAttribute>,
}

impl Code {
    /// Decodes from an attribute's raw bytes using a fresh reader.
    pub fn decode(raw: &[u8], base_offset: u64, errors: &mut Vec<Diagnostic>) -> Result<Self, ReaderError> {
        let mut reader = SliceReader::new(raw);
        let max_stack = reader.read_u2()?;
        let max_locals = reader.read_u2()?;
        let code_length = reader.read_u4()?;
        if code_length == 0 || code_length > 65535 {
            errors.push(Diagnostic::new(
                format!("code_length {code_length} out of range [1, 65535]"),
                base_offset + reader.tell_prev(),
            ));
        }
        let code = reader.read_bytes(code_length as usize)?;

        let exception_table_length = reader.read_u2()?;
        let mut exception_table = Vec::with_capacity(exception_table_length as usize);
        for _ in 0..exception_table_length {
            let entry_offset = base_offset + reader.tell();
            let start_pc = reader.read_u2()?;
            let end_pc = reader.read_u2()?;
            let handler_pc = reader.read_u2()?;
            let catch_type = reader.read_u2()?;
            if !(u32::from(start_pc) < u32::from(end_pc) && u32::from(end_pc) <= code_length) {
                errors.push(Diagnostic::new(
                    "exception table entry violates start_pc < end_pc <= code_length",
                    entry_offset,
                ));
            }
            if u32::from(handler_pc) >= code_length {
                errors.push(Diagnostic::new("handler_pc must be less than code_length", entry_offset));
            }
            exception_table.push(ExceptionTableEntry {
                start_pc,
                end_pc,
                handler_pc,
                catch_type,
                offset: entry_offset,
            });
        }

        let attribute_count = reader.read_u2()?;
        let mut attributes = Vec::with_capacity(attribute_count as usize);
        for _ in 0..attribute_count {
            attributes.push(RawAttribute::read(&mut reader)?);
        }

        Ok(Code { max_stack, max_locals, code, exception_table, attributes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_code_with_no_handlers() {
        let mut bytes = vec![0x00, 0x02, 0x00, 0x01]; // max_stack, max_locals
        bytes.extend_from_slice(&1u32.to_be_bytes()); // code_length
        bytes.push(0xB1); // return
        bytes.extend_from_slice(&[0x00, 0x00]); // exception_table_length
        bytes.extend_from_slice(&[0x00, 0x00]); // attribute_count
        let mut errors = Vec::new();
        let code = Code::decode(&bytes, 0, &mut errors).unwrap();
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.code, vec![0xB1]);
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_bad_exception_table_entry() {
        let mut bytes = vec![0x00, 0x01, 0x00, 0x01];
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x00]);
        bytes.extend_from_slice(&[0x00, 0x01]); // exception_table_length = 1
        bytes.extend_from_slice(&[0x00, 0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]); // start>end
        bytes.extend_from_slice(&[0x00, 0x00]);
        let mut errors = Vec::new();
        Code::decode(&bytes, 0, &mut errors).unwrap();
        assert!(!errors.is_empty());
    }
}
