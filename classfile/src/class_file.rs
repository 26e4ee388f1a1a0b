//! Top-level assembler (§4.7): magic, versions, constant pool, this/super,
//! interfaces, fields, methods, class-level attributes.

use crate::access_flags::{self, FlagContext};
use crate::attributes::RawAttribute;
use crate::constants::ConstantPool;
use crate::descriptors;
use crate::diagnostics::Diagnostic;
use crate::members::{FieldInfo, MethodInfo};
use crate::reader::Reader;

const MAGIC: u32 = 0xCAFEBABE;

pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<RawAttribute>,
    pub errors: Vec<Diagnostic>,
}

impl ClassFile {
    /// Reads and resolves a class file from `reader`. Always returns a
    /// value; callers inspect `errors()` to tell a clean parse from a
    /// dirty one.
    pub fn parse<R: Reader>(reader: &mut R) -> ClassFile {
        let mut errors = Vec::new();

        let magic = match reader.read_u4() {
            Ok(v) => v,
            Err(e) => {
                return ClassFile::empty_with_error(format!("{e}"), 0);
            }
        };
        if magic != MAGIC {
            errors.push(Diagnostic::new(format!("invalid magic value {magic:#010X}"), 0));
            return ClassFile::empty_with_error_list(magic, errors);
        }

        let minor_version = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::empty_with_error(format!("{e}"), 4),
        };
        let major_version = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::empty_with_error(format!("{e}"), 6),
        };
        if major_version < 45 {
            errors.push(Diagnostic::new(format!("unsupported major version {major_version}"), 6));
        }

        let mut constant_pool = match ConstantPool::read(reader) {
            Ok(p) => p,
            Err(e) => return ClassFile::empty_with_error(format!("{e}"), 8),
        };
        constant_pool.resolve();
        errors.extend(constant_pool.errors.clone());

        let access_flags = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
        };
        let this_class = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
        };
        let super_class = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
        };

        let interfaces_count = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
        };
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            match reader.read_u2() {
                Ok(v) => interfaces.push(v),
                Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
            }
        }

        let is_interface = access_flags & access_flags::ACC_INTERFACE == access_flags::ACC_INTERFACE;

        let fields_count = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
        };
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            match FieldInfo::read(reader) {
                Ok(f) => fields.push(f),
                Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
            }
        }

        let methods_count = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
        };
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            match MethodInfo::read(reader) {
                Ok(m) => methods.push(m),
                Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
            }
        }

        let attributes_count = match reader.read_u2() {
            Ok(v) => v,
            Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
        };
        let mut attributes = Vec::with_capacity(attributes_count as usize);
        for _ in 0..attributes_count {
            match RawAttribute::read(reader) {
                Ok(a) => attributes.push(a),
                Err(e) => return ClassFile::finish_with_reader_error(magic, minor_version, major_version, constant_pool, errors, e),
            }
        }

        // Class-level checks.
        if constant_pool.get_class_name(this_class as usize).is_err() {
            errors.push(Diagnostic::new("this_class must reference a Class entry", 8));
        }
        if super_class != 0 && constant_pool.get_class_name(super_class as usize).is_err() {
            errors.push(Diagnostic::new("super_class must be zero or reference a Class entry", 8));
        }
        access_flags::check(access_flags, access_flags::CLASS_RULES, 8, &mut errors);

        for field in &mut fields {
            field.resolve(&constant_pool, is_interface);
        }
        for method in &mut methods {
            method.resolve(&constant_pool, is_interface);
        }
        for attribute in &mut attributes {
            attribute.resolve(&constant_pool, &mut errors);
        }

        for field in &fields {
            errors.extend(field.errors.clone());
        }
        for method in &methods {
            errors.extend(method.errors.clone());
        }

        ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            errors,
        }
    }

    fn empty_with_error(message: String, offset: u64) -> ClassFile {
        ClassFile::empty_with_error_list(0, vec![Diagnostic::new(message, offset)])
    }

    /// Magic mismatch (or any earlier fatal read failure): the value still
    /// materializes, but no further decoding is attempted.
    fn empty_with_error_list(magic: u32, errors: Vec<Diagnostic>) -> ClassFile {
        ClassFile {
            magic,
            minor_version: 0,
            major_version: 0,
            constant_pool: ConstantPool::empty(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            errors,
        }
    }

    fn finish_with_reader_error(
        magic: u32,
        minor_version: u16,
        major_version: u16,
        constant_pool: ConstantPool,
        mut errors: Vec<Diagnostic>,
        e: crate::reader::ReaderError,
    ) -> ClassFile {
        errors.push(Diagnostic::new(format!("{e}"), 0));
        ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            errors,
        }
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & access_flags::ACC_INTERFACE == access_flags::ACC_INTERFACE
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags & access_flags::ACC_ENUM == access_flags::ACC_ENUM
    }

    pub fn name(&self) -> Option<String> {
        self.constant_pool.get_class_name(self.this_class as usize).ok()
    }

    pub fn super_name(&self) -> Option<String> {
        if self.super_class == 0 {
            None
        } else {
            self.constant_pool.get_class_name(self.super_class as usize).ok()
        }
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces
            .iter()
            .filter_map(|&idx| self.constant_pool.get_class_name(idx as usize).ok())
            .collect()
    }

    /// Produces the full human-readable class declaration described in §4.7.
    pub fn signature(&self) -> String {
        let name = self.name().unwrap_or_default();
        let dotted_name = descriptors::parse_binary_class_name(&name).unwrap_or(name.clone());

        let mut header = access_flags::render_flags(self.access_flags, FlagContext::Class);
        if !header.is_empty() {
            header.push(' ');
        }
        header.push_str(&dotted_name);

        if let Some(super_name) = self.super_name() {
            let dotted_super = descriptors::parse_binary_class_name(&super_name).unwrap_or(super_name);
            header.push_str(&format!(" extends {dotted_super}"));
        }

        let interfaces = self.interface_names();
        if !interfaces.is_empty() {
            let dotted: Vec<String> = interfaces
                .iter()
                .map(|n| descriptors::parse_binary_class_name(n).unwrap_or_else(|_| n.clone()))
                .collect();
            header.push_str(&format!(" implements {}", dotted.join(", ")));
        }

        let mut out = format!("{header} {{\n");
        for method in &self.methods {
            if let Ok(sig) = method.signature(&self.constant_pool, &dotted_name) {
                out.push_str(&format!("    {sig};\n"));
            }
        }
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    fn simple_class_bytes(major: u16) -> Vec<u8> {
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE];
        bytes.extend_from_slice(&[0x00, 0x00]); // minor
        bytes.extend_from_slice(&major.to_be_bytes()); // major
        // constant pool: #1 Utf8 "a/B$c", #2 Class -> #1,
        // #3 Utf8 "java/lang/Object", #4 Class -> #3
        bytes.extend_from_slice(&[0x00, 0x05]); // count = 5
        bytes.push(1);
        bytes.extend_from_slice(&[0x00, 0x05]);
        bytes.extend_from_slice(b"a/B$c");
        bytes.push(7);
        bytes.extend_from_slice(&[0x00, 0x01]);
        bytes.push(1);
        bytes.extend_from_slice(&[0x00, 0x10]);
        bytes.extend_from_slice(b"java/lang/Object");
        bytes.push(7);
        bytes.extend_from_slice(&[0x00, 0x03]);

        bytes.extend_from_slice(&[0x00, 0x21]); // access_flags: PUBLIC|SUPER
        bytes.extend_from_slice(&[0x00, 0x02]); // this_class
        bytes.extend_from_slice(&[0x00, 0x04]); // super_class
        bytes.extend_from_slice(&[0x00, 0x00]); // interfaces_count
        bytes.extend_from_slice(&[0x00, 0x00]); // fields_count
        bytes.extend_from_slice(&[0x00, 0x00]); // methods_count
        bytes.extend_from_slice(&[0x00, 0x00]); // attributes_count
        bytes
    }

    #[test]
    fn magic_rejection_halts_decoding() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0];
        let mut reader = SliceReader::new(&bytes);
        let class = ClassFile::parse(&mut reader);
        assert_eq!(class.errors().len(), 1);
        assert_eq!(class.errors()[0].message, "invalid magic value 0xDEADBEEF");
        assert_eq!(class.errors()[0].offset, 0);
        assert_eq!(class.fields.len(), 0);
        assert_eq!(class.methods.len(), 0);
    }

    #[test]
    fn major_version_boundary() {
        let bytes44 = simple_class_bytes(44);
        let mut r = SliceReader::new(&bytes44);
        let class44 = ClassFile::parse(&mut r);
        assert!(class44.errors().iter().any(|e| e.message.contains("unsupported major version")));

        let bytes45 = simple_class_bytes(45);
        let mut r2 = SliceReader::new(&bytes45);
        let class45 = ClassFile::parse(&mut r2);
        assert!(!class45.errors().iter().any(|e| e.message.contains("unsupported major version")));
    }

    #[test]
    fn signature_round_trip() {
        let bytes = simple_class_bytes(52);
        let mut r = SliceReader::new(&bytes);
        let class = ClassFile::parse(&mut r);
        assert!(class.errors().is_empty(), "{:?}", class.errors());
        let sig = class.signature();
        assert!(sig.contains("a.B$c extends java.lang.Object"), "{sig}");
    }
}
