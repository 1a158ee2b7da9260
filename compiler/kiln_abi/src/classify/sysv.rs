//! System V AMD64 classification.
//!
//! Each eightbyte of an aggregate gets a class from the scalars overlapping
//! it; the classes then decide between registers and memory.

use kiln_types::{ContainerLayout, Idx, OptionalRepr, PtrSize, TypeData};
use smallvec::SmallVec;

use super::{AbiCx, AbiSlot, Classifier, ParamClass, ReturnClass, Slots};
use crate::ty::FloatKind;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Class {
    None,
    Integer,
    Sse,
    SseUp,
    /// A lone 32-bit-or-narrower float in an eightbyte.
    Float,
    /// Two such floats sharing an eightbyte.
    FloatCombine,
    X87,
    X87Up,
    Memory,
}

/// Eightbytes of a register-passable aggregate (at most two).
type Classes = [Class; 2];

/// Merge the class of a scalar into the class of its eightbyte.
fn merge(a: Class, b: Class) -> Class {
    match (a, b) {
        (Class::Float, Class::Float) => Class::FloatCombine,
        (x, y) if x == y => x,
        (Class::None, x) | (x, Class::None) => x,
        (Class::Memory, _) | (_, Class::Memory) => Class::Memory,
        (Class::Integer, _) | (_, Class::Integer) => Class::Integer,
        (Class::X87 | Class::X87Up | Class::SseUp, _)
        | (_, Class::X87 | Class::X87Up | Class::SseUp) => Class::Memory,
        _ => Class::Sse,
    }
}

struct Eightbytes {
    classes: Classes,
    memory: bool,
}

impl Eightbytes {
    fn put(&mut self, offset: u64, class: Class) {
        match self.classes.get_mut((offset / 8) as usize) {
            Some(slot) => *slot = merge(*slot, class),
            None => self.memory = true,
        }
    }

    fn put_all(&mut self, offset: u64, classes: &[Class]) {
        for (i, class) in classes.iter().enumerate() {
            self.put(offset + 8 * i as u64, *class);
        }
    }
}

/// Integer classes covering `size` bytes.
fn integers(out: &mut Eightbytes, offset: u64, size: u64) {
    for i in 0..size.div_ceil(8) {
        out.put(offset + 8 * i, Class::Integer);
    }
}

fn classify_into(cx: &AbiCx<'_>, ty: Idx, offset: u64, out: &mut Eightbytes) {
    kiln_stack::ensure_sufficient_stack(|| match cx.get(ty) {
        TypeData::Bool | TypeData::Enum { .. } | TypeData::ErrorSet(_) => {
            out.put(offset, Class::Integer);
        }
        TypeData::Int { .. } => integers(out, offset, cx.size(ty)),
        TypeData::Pointer(p) if p.size == PtrSize::Slice => integers(out, offset, cx.size(ty)),
        TypeData::Pointer(_) => out.put(offset, Class::Integer),
        TypeData::Float { bits } => match bits {
            16 | 32 => out.put(offset, Class::Float),
            64 => out.put(offset, Class::Sse),
            80 if cx.target.supports_f80() => out.put_all(offset, &[Class::X87, Class::X87Up]),
            128 => out.put_all(offset, &[Class::Sse, Class::SseUp]),
            _ => integers(out, offset, cx.size(ty)),
        },
        TypeData::Vector { child, .. } => {
            let size = cx.size(ty);
            if *child == Idx::BOOL {
                integers(out, offset, size);
            } else if size <= 8 {
                out.put(offset, Class::Sse);
            } else if size <= 16 {
                out.put_all(offset, &[Class::Sse, Class::SseUp]);
            } else {
                out.memory = true;
            }
        }
        TypeData::Struct(s) if s.layout == ContainerLayout::Packed => {
            integers(out, offset, cx.size(ty));
        }
        TypeData::Union(u) if u.layout == ContainerLayout::Packed => {
            integers(out, offset, cx.size(ty));
        }
        TypeData::Optional { child } if cx.pool.optional_repr(*child) == OptionalRepr::Payload => {
            classify_into(cx, *child, offset, out);
        }
        _ => {
            for m in cx.members(ty) {
                classify_into(cx, m.ty, offset + m.offset, out);
            }
        }
    });
}

/// Eightbyte classes of an aggregate, or `None` if it goes to memory.
fn eightbytes(cx: &AbiCx<'_>, ty: Idx) -> Option<Classes> {
    if cx.size(ty) > 16 {
        return None;
    }
    let mut out = Eightbytes {
        classes: [Class::None; 2],
        memory: false,
    };
    classify_into(cx, ty, 0, &mut out);
    let classes = out.classes;
    if out.memory || classes.contains(&Class::Memory) {
        return None;
    }
    if classes[1] == Class::X87Up && classes[0] != Class::X87 {
        return None;
    }
    Some(classes)
}

fn has_x87(classes: &Classes) -> bool {
    classes.iter().any(|c| matches!(c, Class::X87 | Class::X87Up))
}

fn slots(classes: &Classes) -> Slots {
    let mut out: Slots = SmallVec::new();
    for class in classes {
        let slot = match class {
            Class::None => break,
            Class::Integer => AbiSlot::Int(64),
            Class::Sse => AbiSlot::Float(FloatKind::Double),
            Class::Float => AbiSlot::Float(FloatKind::Float),
            Class::FloatCombine => AbiSlot::FloatVector {
                len: 2,
                elem: FloatKind::Float,
            },
            Class::X87 => AbiSlot::Float(FloatKind::X86Fp80),
            Class::SseUp => {
                if let Some(last) = out.last_mut() {
                    *last = match *last {
                        AbiSlot::Float(FloatKind::Double) => AbiSlot::FloatVector {
                            len: 2,
                            elem: FloatKind::Double,
                        },
                        _ => AbiSlot::FloatVector {
                            len: 4,
                            elem: FloatKind::Float,
                        },
                    };
                }
                continue;
            }
            Class::X87Up | Class::Memory => continue,
        };
        out.push(slot);
    }
    out
}

/// x86-64 System V.
#[derive(Copy, Clone, Debug, Default)]
pub struct SysV;

impl Classifier for SysV {
    fn name(&self) -> &'static str {
        "x86_64-sysv"
    }

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass {
        if cx.is_scalar(ty) {
            return ParamClass::ByValue;
        }
        match eightbytes(cx, ty) {
            Some(classes) if !has_x87(&classes) => {
                if classes == [Class::Integer, Class::None] {
                    ParamClass::AbiSizedInt
                } else {
                    ParamClass::Split(slots(&classes))
                }
            }
            _ => ParamClass::ByReference {
                mutable: false,
                caller_copy: true,
            },
        }
    }

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass {
        if cx.is_scalar(ty) {
            return ReturnClass::ByValue;
        }
        let Some(classes) = eightbytes(cx, ty) else {
            return ReturnClass::Sret;
        };
        // x87 values come back on the FPU stack, alone.
        if has_x87(&classes) && classes != [Class::X87, Class::X87Up] {
            return ReturnClass::Sret;
        }
        if classes == [Class::Integer, Class::None] {
            ReturnClass::AbiSizedInt
        } else {
            ReturnClass::Split(slots(&classes))
        }
    }
}
