// src/graphql/selection.rs
//! Response selection sets.

use std::fmt;

/// One entry of a GraphQL selection set.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(&'static str),
    Object(&'static str, Vec<Selection>),
    /// Inline fragment, `... on Type { .. }`.
    Fragment(&'static str, Vec<Selection>),
}

pub fn field(name: &'static str) -> Selection {
    Selection::Field(name)
}

pub fn object(name: &'static str, children: Vec<Selection>) -> Selection {
    Selection::Object(name, children)
}

pub fn fragment(type_condition: &'static str, children: Vec<Selection>) -> Selection {
    Selection::Fragment(type_condition, children)
}

/// `{ name type }`, the shape of every EIP-712 member list.
pub fn members(name: &'static str) -> Selection {
    object(name, vec![field("name"), field("type")])
}

/// `{ id }`, the shape of every DID reference.
pub fn reference(name: &'static str) -> Selection {
    object(name, vec![field("id")])
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[Selection]) -> fmt::Result {
    for child in children {
        write!(f, " {}", child)?;
    }
    f.write_str(" }")
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Field(name) => f.write_str(name),
            Selection::Object(name, children) => {
                write!(f, "{} {{", name)?;
                write_children(f, children)
            }
            Selection::Fragment(type_condition, children) => {
                write!(f, "... on {} {{", type_condition)?;
                write_children(f, children)
            }
        }
    }
}
