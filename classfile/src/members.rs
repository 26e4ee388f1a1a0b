//! Field and method entries (§4.6): shared shape, divergent rule sets.

use crate::access_flags::{self, FlagContext};
use crate::attributes::{Code, RawAttribute};
use crate::constants::ConstantPool;
use crate::descriptors::{self, InvalidDescriptor};
use crate::diagnostics::Diagnostic;
use crate::reader::{Reader, ReaderError};

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<RawAttribute>,
    pub offset: u64,
    pub errors: Vec<Diagnostic>,
}

impl FieldInfo {
    pub fn read<R: Reader>(reader: &mut R) -> Result<Self, ReaderError> {
        let offset = reader.tell();
        let access_flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attribute_count = reader.read_u2()?;
        let mut attributes = Vec::with_capacity(attribute_count as usize);
        for _ in 0..attribute_count {
            attributes.push(RawAttribute::read(reader)?);
        }
        Ok(FieldInfo { access_flags, name_index, descriptor_index, attributes, offset, errors: Vec::new() })
    }

    pub fn resolve(&mut self, pool: &ConstantPool, is_interface: bool) {
        for a in &mut self.attributes {
            a.resolve(pool, &mut self.errors);
        }
        let rules = access_flags::field_rules(is_interface);
        access_flags::check(self.access_flags, &rules, self.offset, &mut self.errors);

        match pool.get_utf8(self.name_index as usize) {
            Ok(name) if !descriptors::check_unqualified_name(&name) => {
                self.errors.push(Diagnostic::new(format!("invalid unqualified name {name:?}"), self.offset));
            }
            Err(e) => self.errors.push(Diagnostic::new(e.to_string(), self.offset)),
            _ => {}
        }
        match pool.get_utf8(self.descriptor_index as usize) {
            Ok(desc) if !descriptors::check_field_descriptor(&desc) => {
                self.errors.push(Diagnostic::new(format!("invalid field descriptor {desc:?}"), self.offset));
            }
            Err(e) => self.errors.push(Diagnostic::new(e.to_string(), self.offset)),
            _ => {}
        }
    }

    pub fn name(&self, pool: &ConstantPool) -> Result<String, crate::constants::LookupError> {
        pool.get_utf8(self.name_index as usize)
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<RawAttribute>,
    pub code: Option<Code>,
    pub offset: u64,
    pub errors: Vec<Diagnostic>,
}

impl MethodInfo {
    pub fn read<R: Reader>(reader: &mut R) -> Result<Self, ReaderError> {
        let offset = reader.tell();
        let access_flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attribute_count = reader.read_u2()?;
        let mut attributes = Vec::with_capacity(attribute_count as usize);
        for _ in 0..attribute_count {
            attributes.push(RawAttribute::read(reader)?);
        }
        Ok(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
            code: None,
            offset,
            errors: Vec::new(),
        })
    }

    pub fn is_initializer(&self, pool: &ConstantPool) -> bool {
        matches!(self.name(pool).as_deref(), Ok("<init>") | Ok("<clinit>"))
    }

    pub fn is_class_initializer(&self, pool: &ConstantPool) -> bool {
        matches!(self.name(pool).as_deref(), Ok("<clinit>"))
    }

    pub fn resolve(&mut self, pool: &ConstantPool, is_interface: bool) {
        for a in &mut self.attributes {
            a.resolve(pool, &mut self.errors);
        }

        let code_attr = crate::attributes::index_by_name(&self.attributes)
            .get("Code")
            .map(|&i| &self.attributes[i]);
        if let Some(code_attr) = code_attr {
            match Code::decode(&code_attr.bytes, code_attr.offset, &mut self.errors) {
                Ok(code) => {
                    for ex in &code.exception_table {
                        if ex.catch_type != 0 && pool.get_class_name(ex.catch_type as usize).is_err() {
                            self.errors.push(Diagnostic::new(
                                format!("catch_type {} must be zero or reference a Class entry", ex.catch_type),
                                ex.offset,
                            ));
                        }
                    }
                    self.code = Some(code);
                }
                Err(e) => self.errors.push(Diagnostic::new(e.to_string(), code_attr.offset)),
            }
        }

        let is_init = self.is_initializer(pool);
        let rules = access_flags::method_rules(is_interface, is_init);
        access_flags::check(self.access_flags, &rules, self.offset, &mut self.errors);

        match pool.get_utf8(self.name_index as usize) {
            Ok(name) if name != "<init>" && name != "<clinit>" && !descriptors::check_unqualified_name(&name) => {
                self.errors.push(Diagnostic::new(format!("invalid unqualified name {name:?}"), self.offset));
            }
            Err(e) => self.errors.push(Diagnostic::new(e.to_string(), self.offset)),
            _ => {}
        }
        match pool.get_utf8(self.descriptor_index as usize) {
            Ok(desc) if !descriptors::check_method_descriptor(&desc) => {
                self.errors.push(Diagnostic::new(format!("invalid method descriptor {desc:?}"), self.offset));
            }
            Err(e) => self.errors.push(Diagnostic::new(e.to_string(), self.offset)),
            _ => {}
        }
    }

    pub fn name(&self, pool: &ConstantPool) -> Result<String, crate::constants::LookupError> {
        pool.get_utf8(self.name_index as usize)
    }

    /// Flag signature, return type, name and parameter list, per §4.6's
    /// example: `public static void main(java.lang.String[])`.
    pub fn signature(&self, pool: &ConstantPool, enclosing_class_name: &str) -> Result<String, InvalidDescriptor> {
        let descriptor = pool
            .get_utf8(self.descriptor_index as usize)
            .map_err(|e| InvalidDescriptor(e.to_string()))?;
        let (params, ret) = descriptors::parse_method_descriptor(&descriptor)?;

        let mut flag_sig = access_flags::render_flags(self.access_flags, FlagContext::Method);
        if self.is_class_initializer(pool) && self.access_flags & access_flags::ACC_STATIC == 0 {
            if flag_sig.is_empty() {
                flag_sig.push_str("static");
            } else {
                flag_sig.push_str(" static");
            }
        }

        let method_name = self.name(pool).map_err(|e| InvalidDescriptor(e.to_string()))?;
        let display_name = if self.is_initializer(pool) {
            descriptors::unqualify(enclosing_class_name)
        } else {
            method_name.as_str()
        };

        let params_str = params.join(", ");
        let prefix = if flag_sig.is_empty() { String::new() } else { format!("{flag_sig} ") };
        Ok(format!("{prefix}{ret} {display_name}({params_str})"))
    }
}
