use std::fmt::Display;

/// The closed type vocabulary of the language.
///
/// `Ptr` is the untyped byte pointer spelled `ptr`; `Pointer` is produced by
/// the `*` suffix and may nest (`i32**`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    I32,
    I64,
    F32,
    F64,
    Void,
    Ptr,
    Pointer(Box<Type>),
}

impl Type {
    /// Looks up a primitive spelling. Pointer suffixes are handled by the parser.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "i32" => Some(Type::I32),
            "i64" => Some(Type::I64),
            "f32" => Some(Type::F32),
            "f64" => Some(Type::F64),
            "void" => Some(Type::Void),
            "ptr" => Some(Type::Ptr),
            _ => None,
        }
    }

    pub fn is_primitive_name(name: &str) -> bool {
        Type::from_name(name).is_some()
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::I32 | Type::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr | Type::Pointer(_))
    }

    /// `ptr` or `void*`, which accept any pointer.
    pub fn is_untyped_pointer(&self) -> bool {
        match self {
            Type::Ptr => true,
            Type::Pointer(inner) => inner.is_void(),
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::Void => write!(f, "void"),
            Type::Ptr => write!(f, "ptr"),
            Type::Pointer(inner) => write!(f, "{}*", inner),
        }
    }
}
