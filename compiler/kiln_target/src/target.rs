//! Target descriptors.
//!
//! A [`Target`] is the read-only set of facts the lowering engine needs about
//! one compilation target: architecture, OS, object format, endianness,
//! pointer widths per address space, the alignment tables the native backend
//! uses, C type sizes, stack alignment and the few CPU features that change
//! calling-convention classification.
//!
//! Descriptors are built once per compilation and shared by reference (they
//! are `Send + Sync`); nothing here is mutated after construction.
//!
//! # Usage
//!
//! ```text
//! let target = Target::from_triple("x86_64-unknown-linux-gnu")?;
//! assert_eq!(target.ptr_bits(), 64);
//! let layout = data_layout(&target);
//! ```

use std::fmt;

use crate::triple::{TargetTripleComponents, SUPPORTED_TARGETS};
use crate::TargetError;

/// CPU architecture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Arch {
    X86,
    X86_64,
    Aarch64,
    Arm,
    Thumb,
    Riscv32,
    Riscv64,
    Wasm32,
    Wasm64,
    Mips,
    Mipsel,
    Powerpc64le,
}

impl Arch {
    /// Parse the architecture component of a triple.
    ///
    /// RISC-V ISA suffixes (`gc`, `imac`, ...) are accepted; ARM sub-arch
    /// suffixes (`armv7`, `thumbv7em`) map to the base architecture.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let arch = match s {
            "x86_64" | "amd64" => Self::X86_64,
            "i386" | "i486" | "i586" | "i686" | "x86" => Self::X86,
            "aarch64" | "arm64" => Self::Aarch64,
            "wasm32" => Self::Wasm32,
            "wasm64" => Self::Wasm64,
            "mips" => Self::Mips,
            "mipsel" => Self::Mipsel,
            "powerpc64le" | "ppc64le" => Self::Powerpc64le,
            s if s.starts_with("riscv64") => Self::Riscv64,
            s if s.starts_with("riscv32") => Self::Riscv32,
            s if s.starts_with("thumb") => Self::Thumb,
            s if s.starts_with("arm") => Self::Arm,
            other => return Err(TargetError::UnknownArch(other.to_string())),
        };
        Ok(arch)
    }

    pub fn is_x86(self) -> bool {
        matches!(self, Self::X86 | Self::X86_64)
    }

    pub fn is_arm(self) -> bool {
        matches!(self, Self::Arm | Self::Thumb)
    }

    pub fn is_riscv(self) -> bool {
        matches!(self, Self::Riscv32 | Self::Riscv64)
    }

    pub fn is_wasm(self) -> bool {
        matches!(self, Self::Wasm32 | Self::Wasm64)
    }

    pub fn is_mips(self) -> bool {
        matches!(self, Self::Mips | Self::Mipsel)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
            Self::Thumb => "thumb",
            Self::Riscv32 => "riscv32",
            Self::Riscv64 => "riscv64",
            Self::Wasm32 => "wasm32",
            Self::Wasm64 => "wasm64",
            Self::Mips => "mips",
            Self::Mipsel => "mipsel",
            Self::Powerpc64le => "powerpc64le",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operating system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Os {
    Linux,
    Darwin,
    Windows,
    Wasi,
    Freestanding,
}

impl Os {
    fn parse(s: &str) -> Self {
        match s {
            "linux" => Self::Linux,
            "darwin" | "macos" => Self::Darwin,
            "windows" => Self::Windows,
            "wasi" => Self::Wasi,
            _ => Self::Freestanding,
        }
    }
}

/// Environment / ABI component of the triple.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Env {
    Gnu,
    Musl,
    Msvc,
    GnuEabiHf,
    Eabi,
    None,
}

impl Env {
    fn parse(s: Option<&str>) -> Self {
        match s {
            Some("gnu") => Self::Gnu,
            Some("musl") => Self::Musl,
            Some("msvc") => Self::Msvc,
            Some("gnueabihf") => Self::GnuEabiHf,
            Some("eabi") => Self::Eabi,
            _ => Self::None,
        }
    }
}

/// Object file format, derived from OS and architecture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectFormat {
    Elf,
    MachO,
    Coff,
    Wasm,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Endian {
    Little,
    Big,
}

/// Pointer layout of one address space, in bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddressSpaceLayout {
    pub id: u32,
    pub size_bits: u16,
    pub abi_bits: u16,
    pub pref_bits: u16,
    /// Width of the integer used for address arithmetic.
    pub index_bits: u16,
    /// Pointers in this address space may not be cast to integers.
    pub non_integral: bool,
    /// Always spelled out in the data layout, even when it matches the default.
    pub force: bool,
}

impl AddressSpaceLayout {
    const fn new(id: u32, size_bits: u16, abi_bits: u16) -> Self {
        Self {
            id,
            size_bits,
            abi_bits,
            pref_bits: abi_bits,
            index_bits: size_bits,
            non_integral: false,
            force: false,
        }
    }

    const fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    const fn non_integral(mut self) -> Self {
        self.non_integral = true;
        self
    }

    /// Same size and alignment as `other`, ignoring identity and flags.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.size_bits == other.size_bits
            && self.abi_bits == other.abi_bits
            && self.pref_bits == other.pref_bits
            && self.index_bits == other.index_bits
    }

    pub fn size_bytes(&self) -> u64 {
        u64::from(self.size_bits).div_ceil(8)
    }

    pub fn align_bytes(&self) -> u64 {
        (u64::from(self.abi_bits) / 8).max(1)
    }
}

/// One entry of an integer, float or vector alignment table, in bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AlignSpec {
    pub bits: u16,
    pub abi_bits: u16,
    pub pref_bits: u16,
}

impl AlignSpec {
    pub const fn new(bits: u16, abi_bits: u16, pref_bits: u16) -> Self {
        Self {
            bits,
            abi_bits,
            pref_bits,
        }
    }

    pub const fn natural(bits: u16, abi_bits: u16) -> Self {
        Self::new(bits, abi_bits, abi_bits)
    }
}

/// The backend's default integer alignments; targets list only what differs.
pub const DEFAULT_INT_ALIGNS: &[AlignSpec] = &[
    AlignSpec::natural(1, 8),
    AlignSpec::natural(8, 8),
    AlignSpec::natural(16, 16),
    AlignSpec::natural(32, 32),
    AlignSpec::new(64, 32, 64),
];

pub const DEFAULT_FLOAT_ALIGNS: &[AlignSpec] = &[
    AlignSpec::natural(16, 16),
    AlignSpec::natural(32, 32),
    AlignSpec::natural(64, 64),
    AlignSpec::natural(128, 128),
];

pub const DEFAULT_VECTOR_ALIGNS: &[AlignSpec] =
    &[AlignSpec::natural(64, 64), AlignSpec::natural(128, 128)];

/// Default pointer width/alignment of address space 0.
pub const DEFAULT_POINTER_BITS: u16 = 64;

/// Default preferred alignment of aggregates.
pub const DEFAULT_AGGREGATE_PREF_BITS: u16 = 64;

/// Function pointer alignment marker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FnPtrAlign {
    /// `Fi<N>`: independent of function alignment (ARM).
    Independent(u16),
    /// `Fn<N>`: a multiple of the function's own alignment (PowerPC).
    MultipleOfFunction(u16),
}

/// C scalar types whose size/alignment the frontend needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CType {
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    LongDouble,
}

/// Size and ABI alignment of a C type, in bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CTypeLayout {
    pub bits: u16,
    pub abi_bits: u16,
}

impl CTypeLayout {
    const fn new(bits: u16, abi_bits: u16) -> Self {
        Self { bits, abi_bits }
    }

    pub fn size_bytes(self) -> u64 {
        u64::from(self.bits) / 8
    }

    pub fn align_bytes(self) -> u64 {
        u64::from(self.abi_bits) / 8
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct CTypes {
    long: u16,
    long_long_align: u16,
    double_align: u16,
    long_double: (u16, u16),
}

/// CPU features consulted by the C ABI classifiers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Features {
    /// RISC-V `D` extension: doubles are passed in float registers.
    pub riscv_d: bool,
    /// ARM hard-float ABI (VFP registers carry floating-point arguments).
    pub arm_hard_float: bool,
    /// ARM native half-precision arithmetic.
    pub arm_fullfp16: bool,
}

/// Read-only facts about one compilation target.
#[derive(Debug, Clone)]
pub struct Target {
    triple: String,
    components: TargetTripleComponents,
    arch: Arch,
    os: Os,
    env: Env,
    object_format: ObjectFormat,
    endian: Endian,
    ptr_bits: u16,
    /// Sorted by id; always contains address space 0.
    address_spaces: Vec<AddressSpaceLayout>,
    /// Sorted by width; the defaults merged with target overrides.
    int_aligns: Vec<AlignSpec>,
    float_aligns: Vec<AlignSpec>,
    vector_aligns: Vec<AlignSpec>,
    /// Wide-vector overrides emitted after the stack alignment.
    vector_overrides: Vec<AlignSpec>,
    aggregate_pref_bits: u16,
    native_int_widths: Vec<u16>,
    stack_align_bits: u16,
    fn_ptr_align: Option<FnPtrAlign>,
    c_types: CTypes,
    features: Features,
}

fn merge(defaults: &[AlignSpec], overrides: &[AlignSpec]) -> Vec<AlignSpec> {
    let mut table: Vec<AlignSpec> = defaults.to_vec();
    for spec in overrides {
        match table.iter_mut().find(|e| e.bits == spec.bits) {
            Some(entry) => *entry = *spec,
            None => table.push(*spec),
        }
    }
    table.sort_by_key(|e| e.bits);
    table
}

impl Target {
    /// Build the descriptor for a supported triple.
    pub fn from_triple(triple: &str) -> Result<Self, TargetError> {
        if !SUPPORTED_TARGETS.contains(&triple) {
            return Err(TargetError::UnsupportedTarget {
                triple: triple.to_string(),
                supported: SUPPORTED_TARGETS.to_vec(),
            });
        }
        let components = TargetTripleComponents::parse(triple)?;
        let target = Self::from_components(triple, components)?;
        tracing::debug!(
            triple,
            arch = %target.arch,
            ptr_bits = target.ptr_bits,
            "target descriptor built"
        );
        Ok(target)
    }

    /// Descriptor for the machine running the compiler.
    pub fn host() -> Result<Self, TargetError> {
        let triple = match (std::env::consts::ARCH, std::env::consts::OS) {
            ("x86_64", "linux") => "x86_64-unknown-linux-gnu",
            ("x86_64", "macos") => "x86_64-apple-darwin",
            ("x86_64", "windows") => "x86_64-pc-windows-msvc",
            ("x86", "linux") => "i686-unknown-linux-gnu",
            ("aarch64", "linux") => "aarch64-unknown-linux-gnu",
            ("aarch64", "macos") => "aarch64-apple-darwin",
            ("riscv64", "linux") => "riscv64gc-unknown-linux-gnu",
            ("powerpc64", "linux") if cfg!(target_endian = "little") => {
                "powerpc64le-unknown-linux-gnu"
            }
            (arch, os) => {
                return Err(TargetError::UnsupportedTarget {
                    triple: format!("{arch}-{os}"),
                    supported: SUPPORTED_TARGETS.to_vec(),
                })
            }
        };
        Self::from_triple(triple)
    }

    fn from_components(
        triple: &str,
        components: TargetTripleComponents,
    ) -> Result<Self, TargetError> {
        let arch = Arch::parse(&components.arch)?;
        let os = Os::parse(&components.os);
        let env = Env::parse(components.env.as_deref());

        let object_format = if arch.is_wasm() {
            ObjectFormat::Wasm
        } else {
            match os {
                Os::Darwin => ObjectFormat::MachO,
                Os::Windows => ObjectFormat::Coff,
                _ => ObjectFormat::Elf,
            }
        };
        let endian = if arch == Arch::Mips {
            Endian::Big
        } else {
            Endian::Little
        };

        let ptr_bits: u16 = match arch {
            Arch::X86 | Arch::Arm | Arch::Thumb | Arch::Riscv32 | Arch::Wasm32 => 32,
            Arch::Mips | Arch::Mipsel => 32,
            Arch::X86_64 | Arch::Aarch64 | Arch::Riscv64 | Arch::Wasm64 => 64,
            Arch::Powerpc64le => 64,
        };

        let mut p0 = AddressSpaceLayout::new(0, ptr_bits, ptr_bits);
        let mut extra_spaces = Vec::new();
        let mut int_overrides = Vec::new();
        let mut float_overrides = Vec::new();
        let mut vector_overrides_table = Vec::new();
        let mut vector_overrides = Vec::new();
        let mut aggregate_pref_bits = DEFAULT_AGGREGATE_PREF_BITS;
        let mut fn_ptr_align = None;
        let mut features = Features::default();
        let stack_align_bits: u16;
        let native_int_widths: Vec<u16>;

        let i64_natural = AlignSpec::natural(64, 64);
        let i128_natural = AlignSpec::natural(128, 128);
        let narrow_ints_pref32 = [AlignSpec::new(8, 8, 32), AlignSpec::new(16, 16, 32)];

        let mut c_types = CTypes {
            long: ptr_bits,
            long_long_align: 64,
            double_align: 64,
            long_double: (64, 64),
        };

        match arch {
            Arch::X86_64 | Arch::X86 => {
                // Mixed-width pointer address spaces (ptr32_sptr, ptr32_uptr, ptr64).
                extra_spaces.push(AddressSpaceLayout::new(270, 32, 32).forced());
                extra_spaces.push(AddressSpaceLayout::new(271, 32, 32).forced());
                extra_spaces.push(AddressSpaceLayout::new(272, 64, 64).forced());
                int_overrides.push(i128_natural);
                stack_align_bits = 128;
                if arch == Arch::X86_64 {
                    int_overrides.push(i64_natural);
                    float_overrides.push(AlignSpec::natural(80, 128));
                    native_int_widths = vec![8, 16, 32, 64];
                    c_types.long_double = if os == Os::Windows {
                        (64, 64)
                    } else {
                        (128, 128)
                    };
                    if os == Os::Windows {
                        c_types.long = 32;
                    }
                } else {
                    float_overrides.push(AlignSpec::new(64, 32, 64));
                    float_overrides.push(AlignSpec::natural(80, 32));
                    native_int_widths = vec![8, 16, 32];
                    c_types.long_long_align = 32;
                    c_types.double_align = 32;
                    c_types.long_double = (96, 32);
                }
            }
            Arch::Aarch64 => {
                if os != Os::Darwin {
                    int_overrides.extend(narrow_ints_pref32);
                    c_types.long_double = (128, 128);
                }
                int_overrides.push(i64_natural);
                int_overrides.push(i128_natural);
                native_int_widths = vec![32, 64];
                stack_align_bits = 128;
            }
            Arch::Arm | Arch::Thumb => {
                fn_ptr_align = Some(FnPtrAlign::Independent(8));
                int_overrides.push(i64_natural);
                vector_overrides_table.push(AlignSpec::new(128, 64, 128));
                aggregate_pref_bits = 32;
                native_int_widths = vec![32];
                stack_align_bits = 64;
                features.arm_hard_float = env == Env::GnuEabiHf;
            }
            Arch::Riscv32 | Arch::Riscv64 => {
                int_overrides.push(i64_natural);
                if arch == Arch::Riscv64 {
                    p0 = p0.forced();
                    int_overrides.push(i128_natural);
                    native_int_widths = vec![32, 64];
                } else {
                    native_int_widths = vec![32];
                }
                stack_align_bits = 128;
                c_types.long_double = (128, 128);
                let isa = components.arch.trim_start_matches("riscv32");
                let isa = isa.trim_start_matches("riscv64");
                features.riscv_d = isa.contains('g') || isa.contains('d');
            }
            Arch::Wasm32 | Arch::Wasm64 => {
                if arch == Arch::Wasm64 {
                    p0 = p0.forced();
                }
                // Externref/funcref live in non-integral address spaces.
                extra_spaces.push(AddressSpaceLayout::new(1, ptr_bits, ptr_bits).non_integral());
                extra_spaces.push(AddressSpaceLayout::new(10, 8, 8).non_integral());
                extra_spaces.push(AddressSpaceLayout::new(20, 8, 8).non_integral());
                int_overrides.push(i64_natural);
                int_overrides.push(i128_natural);
                native_int_widths = vec![32, 64];
                stack_align_bits = 128;
                c_types.long_double = (128, 128);
            }
            Arch::Mips | Arch::Mipsel => {
                int_overrides.extend(narrow_ints_pref32);
                int_overrides.push(i64_natural);
                native_int_widths = vec![32];
                stack_align_bits = 64;
            }
            Arch::Powerpc64le => {
                fn_ptr_align = Some(FnPtrAlign::MultipleOfFunction(32));
                int_overrides.push(i64_natural);
                int_overrides.push(i128_natural);
                native_int_widths = vec![32, 64];
                stack_align_bits = 128;
                vector_overrides.push(AlignSpec::new(256, 256, 512));
                c_types.long_double = (128, 128);
            }
        }

        let mut address_spaces = vec![p0];
        address_spaces.extend(extra_spaces);
        address_spaces.sort_by_key(|a| a.id);

        Ok(Self {
            triple: triple.to_string(),
            components,
            arch,
            os,
            env,
            object_format,
            endian,
            ptr_bits,
            address_spaces,
            int_aligns: merge(DEFAULT_INT_ALIGNS, &int_overrides),
            float_aligns: merge(DEFAULT_FLOAT_ALIGNS, &float_overrides),
            vector_aligns: merge(DEFAULT_VECTOR_ALIGNS, &vector_overrides_table),
            vector_overrides,
            aggregate_pref_bits,
            native_int_widths,
            stack_align_bits,
            fn_ptr_align,
            c_types,
            features,
        })
    }

    // -- Identity --

    pub fn triple(&self) -> &str {
        &self.triple
    }

    pub fn components(&self) -> &TargetTripleComponents {
        &self.components
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn env(&self) -> Env {
        self.env
    }

    pub fn object_format(&self) -> ObjectFormat {
        self.object_format
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    pub fn is_darwin(&self) -> bool {
        self.os == Os::Darwin
    }

    pub fn is_wasm(&self) -> bool {
        self.arch.is_wasm()
    }

    // -- Pointers --

    pub fn ptr_bits(&self) -> u16 {
        self.ptr_bits
    }

    pub fn ptr_bytes(&self) -> u64 {
        u64::from(self.ptr_bits) / 8
    }

    /// Layout of pointers in `addrspace`; unknown spaces use address space 0.
    pub fn pointer_layout(&self, addrspace: u32) -> &AddressSpaceLayout {
        self.address_spaces
            .iter()
            .find(|a| a.id == addrspace)
            .unwrap_or(&self.address_spaces[0])
    }

    pub fn address_spaces(&self) -> &[AddressSpaceLayout] {
        &self.address_spaces
    }

    // -- Alignment tables --

    /// ABI alignment in bytes of an integer `bits` wide.
    ///
    /// Uses the smallest table entry at least `bits` wide, or the widest
    /// entry when the integer is wider than every entry.
    pub fn int_align(&self, bits: u32) -> u64 {
        let entry = self
            .int_aligns
            .iter()
            .find(|e| u32::from(e.bits) >= bits)
            .or_else(|| self.int_aligns.last());
        entry.map_or(1, |e| (u64::from(e.abi_bits) / 8).max(1))
    }

    /// Alignment of `__int128`, when the target gives it one of its own.
    pub fn int128_align(&self) -> Option<u64> {
        self.int_aligns
            .iter()
            .find(|e| e.bits == 128)
            .map(|e| u64::from(e.abi_bits) / 8)
    }

    /// ABI alignment in bytes of a float `bits` wide.
    pub fn float_align(&self, bits: u32) -> u64 {
        self.float_aligns
            .iter()
            .find(|e| u32::from(e.bits) == bits)
            .map_or_else(
                || natural_align(u64::from(bits)),
                |e| u64::from(e.abi_bits) / 8,
            )
    }

    /// ABI alignment in bytes of a vector whose elements total `bits`.
    pub fn vector_align(&self, bits: u64) -> u64 {
        self.vector_aligns
            .iter()
            .chain(&self.vector_overrides)
            .find(|e| u64::from(e.bits) == bits)
            .map_or_else(|| natural_align(bits), |e| u64::from(e.abi_bits) / 8)
    }

    pub fn int_aligns(&self) -> &[AlignSpec] {
        &self.int_aligns
    }

    pub fn float_aligns(&self) -> &[AlignSpec] {
        &self.float_aligns
    }

    pub fn vector_aligns(&self) -> &[AlignSpec] {
        &self.vector_aligns
    }

    pub fn vector_overrides(&self) -> &[AlignSpec] {
        &self.vector_overrides
    }

    pub fn aggregate_pref_bits(&self) -> u16 {
        self.aggregate_pref_bits
    }

    pub fn native_int_widths(&self) -> &[u16] {
        &self.native_int_widths
    }

    pub fn stack_align_bits(&self) -> u16 {
        self.stack_align_bits
    }

    pub fn fn_ptr_align(&self) -> Option<FnPtrAlign> {
        self.fn_ptr_align
    }

    // -- Scalar support --

    /// Whether `f16` lowers to a native half type rather than `i16`.
    pub fn supports_f16(&self) -> bool {
        match self.arch {
            Arch::Wasm32 | Arch::Wasm64 | Arch::Mips | Arch::Mipsel | Arch::Powerpc64le => false,
            Arch::Arm | Arch::Thumb => !self.features.arm_hard_float || self.features.arm_fullfp16,
            _ => true,
        }
    }

    /// Whether `f80` lowers to the x87 extended type rather than `i80`.
    pub fn supports_f80(&self) -> bool {
        self.arch.is_x86()
    }

    pub fn c_type(&self, ty: CType) -> CTypeLayout {
        match ty {
            CType::Char => CTypeLayout::new(8, 8),
            CType::Short => CTypeLayout::new(16, 16),
            CType::Int | CType::Float => CTypeLayout::new(32, 32),
            CType::Long => CTypeLayout::new(self.c_types.long, self.c_types.long),
            CType::LongLong => CTypeLayout::new(64, self.c_types.long_long_align),
            CType::Double => CTypeLayout::new(64, self.c_types.double_align),
            CType::LongDouble => {
                let (bits, align) = self.c_types.long_double;
                CTypeLayout::new(bits, align)
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple)
    }
}

/// Power-of-two alignment for a value `bits` wide, in bytes.
fn natural_align(bits: u64) -> u64 {
    bits.div_ceil(8).max(1).next_power_of_two()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap known-good triples")]
mod tests;
