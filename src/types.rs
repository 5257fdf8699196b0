/// Semantic types as seen by the code generator (the front end has
/// already resolved and checked them).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    Bool,
    /// Signed integer; width in bits.
    Int(u16),
    /// Unsigned integer; width in bits.
    Uint(u16),
    /// `bytesN`; width in bytes.
    FixedBytes(u8),
    /// Enumeration, carrying its member count (storage width derives from it).
    Enum(u32),
    /// `varuint`, the TL-B `VarUInteger 32`.
    VarUint,
    Address,
    /// A contract value is serialized exactly like an address.
    Contract(String),
    /// Dynamic array of non-byte elements, represented as `(length, dict)`.
    Array(Box<Ty>),
    /// `bytes` / `string`: a byte array stored in its own cell chain.
    Bytes,
    StringLiteral(String),
    Mapping(Box<Ty>, Box<Ty>),
    /// `mapping(uint32 => varuint)` of currency balances.
    ExtraCurrencyCollection,
    Struct(StructTy),
    TvmCell,
    TvmSlice,
    TvmBuilder,
    Function {
        params: Vec<Ty>,
        returns: Vec<Ty>,
    },
}

/// A resolved struct type. The code generator never looks at the field
/// layout itself (that is the struct compiler's business) but carries
/// the definition through to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructTy {
    pub name: String,
    pub fields: Vec<(String, Ty)>,
}

/// Numeric facts about an integral type: signedness and serialized width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerInfo {
    pub is_signed: bool,
    pub num_bits: u16,
}

impl Ty {
    /// Integer info for types that serialize as a plain `STI`/`STU` field,
    /// `None` for everything else. Bool counts as a signed 1-bit integer
    /// (it is stored with `STI 1`).
    pub fn integer_info(&self) -> Option<IntegerInfo> {
        match self {
            Ty::Bool => Some(IntegerInfo {
                is_signed: true,
                num_bits: 1,
            }),
            Ty::Int(bits) => Some(IntegerInfo {
                is_signed: true,
                num_bits: *bits,
            }),
            Ty::Uint(bits) => Some(IntegerInfo {
                is_signed: false,
                num_bits: *bits,
            }),
            Ty::FixedBytes(bytes) => Some(IntegerInfo {
                is_signed: false,
                num_bits: 8 * *bytes as u16,
            }),
            Ty::Enum(members) => Some(IntegerInfo {
                is_signed: false,
                num_bits: 8 * enum_storage_bytes(*members),
            }),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        self.integer_info().is_some()
    }

    /// Address or contract; both serialize as an `addr_std` slice.
    pub fn is_address_like(&self) -> bool {
        matches!(self, Ty::Address | Ty::Contract(_))
    }

    /// A non-byte dynamic array, stored as a `(length, dict)` pair.
    pub fn is_usual_array(&self) -> bool {
        matches!(self, Ty::Array(_))
    }

    /// `bytes`, `string`, or a string literal; all cell-chain encoded.
    pub fn is_byte_array_or_string(&self) -> bool {
        matches!(self, Ty::Bytes | Ty::StringLiteral(_))
    }

    pub fn display(&self) -> String {
        match self {
            Ty::Bool => "bool".to_string(),
            Ty::Int(bits) => format!("int{}", bits),
            Ty::Uint(bits) => format!("uint{}", bits),
            Ty::FixedBytes(bytes) => format!("bytes{}", bytes),
            Ty::Enum(_) => "enum".to_string(),
            Ty::VarUint => "varuint".to_string(),
            Ty::Address => "address".to_string(),
            Ty::Contract(name) => format!("contract {}", name),
            Ty::Array(inner) => format!("{}[]", inner.display()),
            Ty::Bytes => "bytes".to_string(),
            Ty::StringLiteral(_) => "string literal".to_string(),
            Ty::Mapping(key, value) => {
                format!("mapping({} => {})", key.display(), value.display())
            }
            Ty::ExtraCurrencyCollection => "ExtraCurrencyCollection".to_string(),
            Ty::Struct(s) => format!("struct {}", s.name),
            Ty::TvmCell => "TvmCell".to_string(),
            Ty::TvmSlice => "TvmSlice".to_string(),
            Ty::TvmBuilder => "TvmBuilder".to_string(),
            Ty::Function { .. } => "function".to_string(),
        }
    }
}

/// Bytes needed to store an enum discriminant for `members` members.
fn enum_storage_bytes(members: u32) -> u16 {
    let mut bytes: u16 = 1;
    while u64::from(members) > 1u64 << (8 * bytes) {
        bytes += 1;
    }
    bytes
}

// ─── Dictionary key encoding ──────────────────────────────────────

/// Bit length of a standard internal address slice:
/// `addr_std$10` tag + anycast-none bit + int8 workchain + 256-bit hash.
pub const STD_ADDRESS_BITS: u16 = 2 + 1 + 8 + 256;

/// Bit length of the dictionary key a value of type `key` produces.
///
/// Integer keys narrower than 32 bits are widened to a 32-bit key, so
/// every narrow-integer mapping shares one key layout. String and
/// byte-array keys are hashed to 256 bits first (see
/// `Emitter::prepare_key_for_dict_operations`).
pub fn dict_key_length(key: &Ty) -> u16 {
    if let Some(info) = key.integer_info() {
        return info.num_bits.max(32);
    }
    if key.is_address_like() {
        return STD_ADDRESS_BITS;
    }
    if key.is_byte_array_or_string() {
        return 256;
    }
    panic!("no dictionary key encoding for {}", key.display());
}

/// The key-family letter in `DICT[I|U]...` opcodes: `I` for signed
/// integer keys, `U` for unsigned (and for hashed string keys), and the
/// empty string for address keys, which use the slice-keyed family.
pub fn dict_key_char(key: &Ty) -> &'static str {
    if let Some(info) = key.integer_info() {
        return if info.is_signed { "I" } else { "U" };
    }
    if key.is_byte_array_or_string() {
        return "U";
    }
    if key.is_address_like() {
        return "";
    }
    panic!("no dictionary key encoding for {}", key.display());
}

/// The key type an index expression over `ty` produces: arrays are
/// indexed by `uint32`, mappings by their declared key type.
pub fn index_key_type(ty: &Ty) -> Ty {
    match ty {
        Ty::Array(_) => Ty::Uint(32),
        Ty::Mapping(key, _) => (**key).clone(),
        Ty::ExtraCurrencyCollection => Ty::Uint(32),
        _ => panic!("{} is not indexable", ty.display()),
    }
}

/// The value type an index expression over `ty` produces.
pub fn index_value_type(ty: &Ty) -> Ty {
    match ty {
        Ty::Array(elem) => (**elem).clone(),
        Ty::Mapping(_, value) => (**value).clone(),
        Ty::ExtraCurrencyCollection => Ty::VarUint,
        _ => panic!("{} is not indexable", ty.display()),
    }
}

// ─── Elementary cast targets ──────────────────────────────────────

/// Elementary type-name tokens usable as explicit cast targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementaryTy {
    IntM(u16),
    UintM(u16),
    BytesM(u8),
    Int,
    Uint,
    Address,
    Bool,
    Bytes,
    String,
}

impl ElementaryTy {
    pub fn display(&self) -> String {
        match self {
            ElementaryTy::IntM(n) => format!("int{}", n),
            ElementaryTy::UintM(n) => format!("uint{}", n),
            ElementaryTy::BytesM(n) => format!("bytes{}", n),
            ElementaryTy::Int => "int".to_string(),
            ElementaryTy::Uint => "uint".to_string(),
            ElementaryTy::Address => "address".to_string(),
            ElementaryTy::Bool => "bool".to_string(),
            ElementaryTy::Bytes => "bytes".to_string(),
            ElementaryTy::String => "string".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_info_widths() {
        assert_eq!(
            Ty::Uint(64).integer_info(),
            Some(IntegerInfo {
                is_signed: false,
                num_bits: 64
            })
        );
        assert_eq!(
            Ty::Int(17).integer_info(),
            Some(IntegerInfo {
                is_signed: true,
                num_bits: 17
            })
        );
        assert_eq!(
            Ty::Bool.integer_info(),
            Some(IntegerInfo {
                is_signed: true,
                num_bits: 1
            })
        );
        assert_eq!(Ty::FixedBytes(4).integer_info().unwrap().num_bits, 32);
        assert!(Ty::Address.integer_info().is_none());
        assert!(Ty::TvmCell.integer_info().is_none());
    }

    #[test]
    fn test_enum_storage_width() {
        assert_eq!(Ty::Enum(3).integer_info().unwrap().num_bits, 8);
        assert_eq!(Ty::Enum(256).integer_info().unwrap().num_bits, 8);
        assert_eq!(Ty::Enum(257).integer_info().unwrap().num_bits, 16);
    }

    #[test]
    fn test_dict_key_length() {
        assert_eq!(dict_key_length(&Ty::Uint(32)), 32);
        assert_eq!(dict_key_length(&Ty::Int(128)), 128);
        assert_eq!(dict_key_length(&Ty::Address), 267);
        assert_eq!(dict_key_length(&Ty::Bytes), 256);
    }

    #[test]
    fn test_dict_key_length_widens_narrow_integers() {
        assert_eq!(dict_key_length(&Ty::Uint(8)), 32);
        assert_eq!(dict_key_length(&Ty::Int(16)), 32);
        assert_eq!(dict_key_length(&Ty::Bool), 32);
        assert_eq!(dict_key_length(&Ty::FixedBytes(2)), 32);
        // the floor does not touch wider keys
        assert_eq!(dict_key_length(&Ty::Uint(33)), 33);
        assert_eq!(dict_key_length(&Ty::Uint(256)), 256);
    }

    #[test]
    fn test_dict_key_char() {
        assert_eq!(dict_key_char(&Ty::Int(8)), "I");
        assert_eq!(dict_key_char(&Ty::Uint(256)), "U");
        assert_eq!(dict_key_char(&Ty::Bytes), "U");
        assert_eq!(dict_key_char(&Ty::Address), "");
    }

    #[test]
    fn test_index_types() {
        let m = Ty::Mapping(Box::new(Ty::Uint(32)), Box::new(Ty::Uint(64)));
        assert_eq!(index_key_type(&m), Ty::Uint(32));
        assert_eq!(index_value_type(&m), Ty::Uint(64));
        let a = Ty::Array(Box::new(Ty::Uint(8)));
        assert_eq!(index_key_type(&a), Ty::Uint(32));
        assert_eq!(index_value_type(&a), Ty::Uint(8));
        assert_eq!(index_value_type(&Ty::ExtraCurrencyCollection), Ty::VarUint);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ty::Uint(16).display(), "uint16");
        assert_eq!(
            Ty::Mapping(Box::new(Ty::Address), Box::new(Ty::TvmCell)).display(),
            "mapping(address => TvmCell)"
        );
        assert_eq!(ElementaryTy::BytesM(4).display(), "bytes4");
    }
}
