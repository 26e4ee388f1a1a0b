//! Access-flag decode and validation.
//!
//! Validation is expressed as data: each rule set is a list of assertions
//! over the flag word, walked by one generic checker, rather than
//! duplicated per kind (§4.3, §9 "Rule-set application").

use crate::diagnostics::Diagnostic;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

/// A single named bit together with the name it carries in a given
/// validation context (see the 0x0020/0x0040/0x0080 dual-purpose bits).
#[derive(Debug, Clone, Copy)]
pub struct NamedFlag {
    pub bit: u16,
    pub name: &'static str,
}

/// One assertion over a flag word. Evaluated in order by `check`.
pub enum Rule {
    /// At most one of these bits may be set.
    Exclusive(&'static [NamedFlag]),
    /// If `if_set` is set, `then_set` must also be set.
    Implies(NamedFlag, NamedFlag),
    /// If `if_set` is set, none of `forbidden` may be set.
    ImpliesNot(NamedFlag, &'static [NamedFlag]),
    /// All of these bits must be set unconditionally in this context.
    Mandatory(&'static [NamedFlag]),
    /// None of these bits may be set in this context.
    Forbidden(&'static [NamedFlag]),
}

fn is_set(mask: u16, flag: NamedFlag) -> bool {
    mask & flag.bit == flag.bit
}

/// Walks `rules` against `mask`, appending a `Diagnostic` per violation at
/// `offset` (the start of the flag word).
pub fn check(mask: u16, rules: &[Rule], offset: u64, errors: &mut Vec<Diagnostic>) {
    for rule in rules {
        match rule {
            Rule::Exclusive(group) => {
                let set: Vec<&str> = group.iter().filter(|f| is_set(mask, **f)).map(|f| f.name).collect();
                if set.len() > 1 {
                    errors.push(Diagnostic::new(
                        format!("{} simultaneous flags is invalid", set.join(" and ")),
                        offset,
                    ));
                }
            }
            Rule::Implies(cond, required) => {
                if is_set(mask, *cond) && !is_set(mask, *required) {
                    errors.push(Diagnostic::new(
                        format!("{} requires {}", cond.name, required.name),
                        offset,
                    ));
                }
            }
            Rule::ImpliesNot(cond, forbidden) => {
                if is_set(mask, *cond) {
                    for f in *forbidden {
                        if is_set(mask, *f) {
                            errors.push(Diagnostic::new(
                                format!("{} forbids {}", cond.name, f.name),
                                offset,
                            ));
                        }
                    }
                }
            }
            Rule::Mandatory(group) => {
                for f in *group {
                    if !is_set(mask, *f) {
                        errors.push(Diagnostic::new(format!("{} is mandatory", f.name), offset));
                    }
                }
            }
            Rule::Forbidden(group) => {
                for f in *group {
                    if is_set(mask, *f) {
                        errors.push(Diagnostic::new(format!("{} is forbidden", f.name), offset));
                    }
                }
            }
        }
    }
}

const PUBLIC: NamedFlag = NamedFlag { bit: ACC_PUBLIC, name: "public" };
const PRIVATE: NamedFlag = NamedFlag { bit: ACC_PRIVATE, name: "private" };
const PROTECTED: NamedFlag = NamedFlag { bit: ACC_PROTECTED, name: "protected" };
const STATIC: NamedFlag = NamedFlag { bit: ACC_STATIC, name: "static" };
const FINAL: NamedFlag = NamedFlag { bit: ACC_FINAL, name: "final" };
const SUPER: NamedFlag = NamedFlag { bit: ACC_SUPER, name: "super" };
const SYNCHRONIZED: NamedFlag = NamedFlag { bit: ACC_SYNCHRONIZED, name: "synchronized" };
const VOLATILE: NamedFlag = NamedFlag { bit: ACC_VOLATILE, name: "volatile" };
const NATIVE: NamedFlag = NamedFlag { bit: ACC_NATIVE, name: "native" };
const INTERFACE: NamedFlag = NamedFlag { bit: ACC_INTERFACE, name: "interface" };
const ABSTRACT: NamedFlag = NamedFlag { bit: ACC_ABSTRACT, name: "abstract" };
const STRICT: NamedFlag = NamedFlag { bit: ACC_STRICT, name: "strictfp" };
const ANNOTATION: NamedFlag = NamedFlag { bit: ACC_ANNOTATION, name: "annotation" };
const ENUM: NamedFlag = NamedFlag { bit: ACC_ENUM, name: "enum" };
const BRIDGE: NamedFlag = NamedFlag { bit: ACC_BRIDGE, name: "bridge" };

pub const CLASS_RULES: &[Rule] = &[
    Rule::Implies(INTERFACE, ABSTRACT),
    Rule::ImpliesNot(INTERFACE, &[FINAL, SUPER, ENUM]),
    Rule::Implies(ANNOTATION, INTERFACE),
    Rule::Exclusive(&[FINAL, ABSTRACT]),
];

pub fn field_rules(is_interface: bool) -> Vec<Rule> {
    let mut rules = vec![
        Rule::Exclusive(&[PUBLIC, PRIVATE, PROTECTED]),
        Rule::Exclusive(&[FINAL, VOLATILE]),
    ];
    if is_interface {
        rules.push(Rule::Mandatory(&[PUBLIC, STATIC, FINAL]));
        rules.push(Rule::Forbidden(&[PRIVATE, PROTECTED, VOLATILE, ENUM]));
    }
    rules
}

pub fn method_rules(is_interface: bool, is_initializer: bool) -> Vec<Rule> {
    let mut rules = vec![Rule::Exclusive(&[PUBLIC, PRIVATE, PROTECTED])];
    if is_interface {
        rules.push(Rule::Forbidden(&[PROTECTED, FINAL, SYNCHRONIZED, NATIVE]));
    }
    rules.push(Rule::ImpliesNot(
        ABSTRACT,
        &[PRIVATE, STATIC, FINAL, SYNCHRONIZED, NATIVE, STRICT],
    ));
    if is_initializer {
        rules.push(Rule::Forbidden(&[FINAL, SYNCHRONIZED, BRIDGE, NATIVE, ABSTRACT]));
    }
    rules
}

/// Emits the space-separated lowercase names of the set bits in ascending
/// bit-value order, honoring the dual-purpose-bit tie-break rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagContext {
    Class,
    Field,
    Method,
}

pub fn render_flags(mask: u16, ctx: FlagContext) -> String {
    let mut names = Vec::new();
    let bits: &[(u16, &str)] = &[
        (ACC_PUBLIC, "public"),
        (ACC_PRIVATE, "private"),
        (ACC_PROTECTED, "protected"),
        (ACC_STATIC, "static"),
        (ACC_FINAL, "final"),
        (0x0020, match ctx {
            FlagContext::Class => "super",
            FlagContext::Method => "synchronized",
            FlagContext::Field => "",
        }),
        (0x0040, match ctx {
            FlagContext::Method => "bridge",
            FlagContext::Field => "volatile",
            FlagContext::Class => "",
        }),
        (0x0080, match ctx {
            FlagContext::Method => "varargs",
            FlagContext::Field => "transient",
            FlagContext::Class => "",
        }),
        (ACC_NATIVE, "native"),
        (ACC_INTERFACE, ""),
        (ACC_ABSTRACT, "abstract"),
        (ACC_STRICT, "strictfp"),
        (ACC_SYNTHETIC, "synthetic"),
        (ACC_ANNOTATION, "annotation"),
        (ACC_ENUM, "enum"),
    ];
    for (bit, name) in bits {
        if mask & bit == *bit && !name.is_empty() {
            names.push(*name);
        }
    }
    if ctx == FlagContext::Class {
        names.push(if mask & ACC_INTERFACE == ACC_INTERFACE { "interface" } else { "class" });
    }
    names.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_abstract_conflict() {
        let mut errors = Vec::new();
        check(ACC_FINAL | ACC_ABSTRACT, CLASS_RULES, 0, &mut errors);
        assert!(errors.iter().any(|e| e.message == "final and abstract simultaneous flags is invalid"));
    }

    #[test]
    fn interface_field_missing_mandatory() {
        let rules = field_rules(true);
        let mut errors = Vec::new();
        check(ACC_PUBLIC, &rules, 0, &mut errors);
        assert!(errors.iter().any(|e| e.message == "static is mandatory"));
        assert!(errors.iter().any(|e| e.message == "final is mandatory"));
    }

    #[test]
    fn class_tie_break_rendering() {
        assert_eq!(render_flags(ACC_SUPER, FlagContext::Class), "super class");
        assert_eq!(render_flags(ACC_SYNCHRONIZED, FlagContext::Method), "synchronized");
        assert_eq!(render_flags(ACC_VOLATILE, FlagContext::Field), "volatile");
    }

    #[test]
    fn public_static_method_flags() {
        assert_eq!(render_flags(ACC_PUBLIC | ACC_STATIC, FlagContext::Method), "public static");
    }
}
