use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::Error;

/// An SNMP object identifier. Ordering is lexicographic by arc, which is
/// the order agents walk in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_arcs(arcs: impl Into<Vec<u32>>) -> Self {
        Self(arcs.into())
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Arcs after `prefix`, if this OID lives under it.
    pub fn suffix(&self, prefix: &Oid) -> Option<&[u32]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }

    #[must_use]
    pub fn child(&self, arc: u32) -> Self {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Self(arcs)
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim()
            .trim_start_matches('.')
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| Error::Ber(format!("invalid OID arc '{part}' in '{s}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if arcs.len() < 2 {
            return Err(Error::Ber(format!("OID '{s}' needs at least two arcs")));
        }
        Ok(Self(arcs))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_leading_dot() {
        let a: Oid = "1.3.6.1.2.1.43.18.1.1".parse().unwrap_or_default();
        let b: Oid = ".1.3.6.1.2.1.43.18.1.1".parse().unwrap_or_default();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1.3.6.1.2.1.43.18.1.1");
    }

    #[test]
    fn rejects_garbage() {
        assert!("1.3.six".parse::<Oid>().is_err());
        assert!("1".parse::<Oid>().is_err());
    }

    #[test]
    fn ordering_follows_the_walk() {
        let root = Oid::from_arcs(vec![1, 3, 6, 1]);
        let a = root.child(2).child(10);
        let b = root.child(10);
        assert!(a < b);
        assert_eq!(b.suffix(&root), Some(&[10][..]));
        assert_eq!(root.suffix(&b), None);
    }
}
