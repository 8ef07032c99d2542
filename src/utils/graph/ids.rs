//! Strongly-typed identifiers for graph nodes and edges.
//!
//! Both identifiers are plain indices into the slot vectors of a
//! [`crate::utils::graph::DirectedGraph`]. Slots are never reused, so an identifier
//! stays unambiguous after the element it names has been removed.

use std::fmt;

macro_rules! graph_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Creates an identifier from a raw slot index.
            #[must_use]
            #[inline]
            pub const fn new(index: usize) -> Self {
                $name(index)
            }

            /// Returns the raw slot index.
            #[must_use]
            #[inline]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                $name(index)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

graph_id!(
    /// Identifier of a node slot in a directed graph.
    NodeId,
    "n"
);

graph_id!(
    /// Identifier of an edge slot in a directed graph.
    EdgeId,
    "e"
);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(NodeId::new(3).to_string(), "n3");
        assert_eq!(EdgeId::new(7).to_string(), "e7");
        assert_eq!(format!("{:?}", NodeId::new(1)), "NodeId(1)");
    }

    #[test]
    fn test_conversions() {
        let node: NodeId = 42.into();
        assert_eq!(node.index(), 42);
        assert_eq!(usize::from(EdgeId::new(9)), 9);
    }

    #[test]
    fn test_hash_and_order() {
        let set: HashSet<NodeId> = [NodeId::new(1), NodeId::new(1), NodeId::new(2)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(NodeId::new(1) < NodeId::new(2));
    }
}
