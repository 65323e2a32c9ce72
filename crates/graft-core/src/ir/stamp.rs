use serde::Serialize;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize,
)]
pub enum ValueKind {
    Int,
    Boolean,
    Object,
    Void,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Boolean => "boolean",
            ValueKind::Object => "Object",
            ValueKind::Void => "void",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Nullness {
    Unknown,
    NonNull,
    AlwaysNull,
}

/// Resolved field handle. Compared structurally, never looked up by name at
/// compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FieldRef {
    pub holder: &'static str,
    pub name: &'static str,
    pub kind: ValueKind,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.holder, self.name)
    }
}

/// What the compiler statically knows about an object's representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Shape {
    Unknown,
    /// Backed by a primitive array reachable through `storage`.
    ArrayBacked {
        element: ValueKind,
        storage: FieldRef,
    },
    /// A known type whose representation is not described to the compiler.
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Stamp {
    pub kind: ValueKind,
    pub nullness: Nullness,
    pub shape: Shape,
}

impl Stamp {
    pub fn int() -> Self {
        Self::primitive(ValueKind::Int)
    }

    pub fn boolean() -> Self {
        Self::primitive(ValueKind::Boolean)
    }

    pub fn void() -> Self {
        Self::primitive(ValueKind::Void)
    }

    fn primitive(kind: ValueKind) -> Self {
        Self {
            kind,
            nullness: Nullness::NonNull,
            shape: Shape::Unknown,
        }
    }

    pub fn object() -> Self {
        Self {
            kind: ValueKind::Object,
            nullness: Nullness::Unknown,
            shape: Shape::Unknown,
        }
    }

    pub fn null() -> Self {
        Self {
            kind: ValueKind::Object,
            nullness: Nullness::AlwaysNull,
            shape: Shape::Unknown,
        }
    }

    pub fn for_kind(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Object => Self::object(),
            other => Self::primitive(other),
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn non_null(mut self) -> Self {
        self.nullness = Nullness::NonNull;
        self
    }

    pub fn is_non_null(&self) -> bool {
        self.nullness == Nullness::NonNull
    }

    pub fn is_always_null(&self) -> bool {
        self.nullness == Nullness::AlwaysNull
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match self.nullness {
            Nullness::NonNull if self.kind == ValueKind::Object => write!(f, "!"),
            Nullness::AlwaysNull => write!(f, " null"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Constant {
    Int(i32),
    Boolean(bool),
    Null,
}

impl Constant {
    pub fn stamp(self) -> Stamp {
        match self {
            Constant::Int(_) => Stamp::int(),
            Constant::Boolean(_) => Stamp::boolean(),
            Constant::Null => Stamp::null(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Boolean(v) => write!(f, "{v}"),
            Constant::Null => write!(f, "null"),
        }
    }
}
