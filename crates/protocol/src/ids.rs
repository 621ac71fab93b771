//! Composite identifiers for objects and templates.
//!
//! The server addresses everything by short sequences of small integers
//! (`[2, 0, 0]` and the like). Two identifiers are equal iff every element
//! matches in order; an identifier is never a scalar and must not be
//! collapsed into one. The newtypes below derive structural `Eq + Hash`, so
//! the element sequence itself is the map key.

use core::fmt;

use serde::{Deserialize, Serialize};

macro_rules! composite_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn new(elements: impl Into<Vec<u8>>) -> Self {
                Self(elements.into())
            }

            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(v: Vec<u8>) -> Self {
                Self(v)
            }
        }

        impl From<&[u8]> for $name {
            fn from(s: &[u8]) -> Self {
                Self(s.to_vec())
            }
        }

        impl<const N: usize> From<[u8; N]> for $name {
            fn from(a: [u8; N]) -> Self {
                Self(a.to_vec())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut first = true;
                for e in &self.0 {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{e}")?;
                    first = false;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Compact debug form: ObjectId(2.0.0)
                write!(f, "{}(", stringify!($name))?;
                fmt::Display::fmt(self, f)?;
                write!(f, ")")
            }
        }
    };
}

composite_id!(
    /// Identifier of one live object in the simulation.
    ObjectId
);
composite_id!(
    /// Identifier of one registered geometry template.
    TemplateId
);
