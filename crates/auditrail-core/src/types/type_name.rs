//! Friendly, generics-aware entity type names.
//!
//! Audit records label each entity with a readable type name such as
//! `Order` or `Envelope<Invoice,Customer>`: module paths are stripped and
//! generic arguments are rendered recursively inside angle brackets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A possibly-generic type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeName {
    /// The base name without module path.
    pub name: String,
    /// Generic arguments, in declaration order.
    pub generic_args: Vec<TypeName>,
}

impl TypeName {
    /// A non-generic type name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_args: Vec::new(),
        }
    }

    /// Append a generic argument.
    pub fn with_arg(mut self, arg: TypeName) -> Self {
        self.generic_args.push(arg);
        self
    }

    /// Derive the friendly name of a Rust type.
    pub fn of<T: ?Sized>() -> Self {
        Self::parse(std::any::type_name::<T>())
    }

    /// Parse a fully qualified name such as `alloc::vec::Vec<app::Order>`.
    pub fn parse(raw: &str) -> Self {
        let mut pos = 0;
        parse_at(raw.trim(), &mut pos)
    }

    /// Whether the type has generic arguments.
    pub fn is_generic(&self) -> bool {
        !self.generic_args.is_empty()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.is_generic() {
            write!(f, "<")?;
            for (i, arg) in self.generic_args.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

fn parse_at(input: &str, pos: &mut usize) -> TypeName {
    let bytes = input.as_bytes();
    let start = *pos;
    let mut depth = 0usize;
    while *pos < bytes.len() {
        match bytes[*pos] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'<' | b',' | b'>' if depth == 0 => break,
            _ => {}
        }
        *pos += 1;
    }

    let name = strip_path(input[start..*pos].trim());
    let mut generic_args = Vec::new();

    if *pos < bytes.len() && bytes[*pos] == b'<' {
        *pos += 1;
        loop {
            generic_args.push(parse_at(input, pos));
            match bytes.get(*pos) {
                Some(b',') => *pos += 1,
                Some(b'>') => {
                    *pos += 1;
                    break;
                }
                _ => break,
            }
        }
    }

    TypeName { name, generic_args }
}

fn strip_path(segment: &str) -> String {
    // Tuples and arrays keep their inner spelling.
    if segment.contains(['(', '[']) {
        return segment.to_string();
    }
    segment
        .rsplit("::")
        .next()
        .unwrap_or(segment)
        .to_string()
}
