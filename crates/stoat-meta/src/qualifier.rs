//! Value-category qualifiers carried by views and signatures.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit mask of value-category qualifiers.
///
/// `TEMPORARY` marks a value that may be moved from, `REFERENCE` a borrowed
/// location, `CONST` and `VOLATILE` access restrictions. Combinations are
/// legal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers(u8);

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers(0);
    pub const TEMPORARY: Qualifiers = Qualifiers(1);
    pub const CONST: Qualifiers = Qualifiers(2);
    pub const VOLATILE: Qualifiers = Qualifiers(4);
    pub const REFERENCE: Qualifiers = Qualifiers(8);

    /// Shorthand for the most common parameter shape.
    pub const CONST_REF: Qualifiers = Qualifiers(2 | 8);

    pub fn from_bits(bits: u8) -> Qualifiers {
        Qualifiers(bits & 0xF)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Qualifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether a view with these qualifiers answers a type-check request.
    ///
    /// A non-const source may answer a const request and a reference source a
    /// temporary request. A const source never answers a non-const request, a
    /// temporary source never answers a reference request; volatile follows
    /// the const rule.
    pub fn satisfies(self, request: Qualifiers) -> bool {
        if self.contains(Qualifiers::CONST) && !request.contains(Qualifiers::CONST) {
            return false;
        }
        if self.contains(Qualifiers::VOLATILE) && !request.contains(Qualifiers::VOLATILE) {
            return false;
        }
        if request.contains(Qualifiers::REFERENCE) && !self.contains(Qualifiers::REFERENCE) {
            return false;
        }
        true
    }

    /// Whether an argument with these qualifiers binds to a declared
    /// parameter during overload lookup.
    ///
    /// Mirrors reference-binding rules: a move parameter needs a temporary, a
    /// mutable reference needs a non-const non-temporary reference, and a
    /// const reference or by-value parameter accepts anything readable.
    pub fn binds_to(self, declared: Qualifiers) -> bool {
        if declared.contains(Qualifiers::TEMPORARY) {
            return self.contains(Qualifiers::TEMPORARY);
        }
        if declared.contains(Qualifiers::REFERENCE) && !declared.contains(Qualifiers::CONST) {
            return self.contains(Qualifiers::REFERENCE)
                && !self.contains(Qualifiers::CONST)
                && !self.contains(Qualifiers::TEMPORARY);
        }
        true
    }
}

impl BitOr for Qualifiers {
    type Output = Qualifiers;

    fn bitor(self, rhs: Qualifiers) -> Qualifiers {
        Qualifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Qualifiers {
    fn bitor_assign(&mut self, rhs: Qualifiers) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "none");
        }
        let mut first = true;
        for (bit, label) in [
            (Qualifiers::TEMPORARY, "temporary"),
            (Qualifiers::CONST, "const"),
            (Qualifiers::VOLATILE, "volatile"),
            (Qualifiers::REFERENCE, "reference"),
        ] {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{label}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_are_stable() {
        assert_eq!(Qualifiers::TEMPORARY.bits(), 1);
        assert_eq!(Qualifiers::CONST.bits(), 2);
        assert_eq!(Qualifiers::VOLATILE.bits(), 4);
        assert_eq!(Qualifiers::REFERENCE.bits(), 8);
        assert_eq!(Qualifiers::CONST_REF.bits(), 10);
    }

    #[test]
    fn non_const_source_answers_const_request() {
        assert!(Qualifiers::REFERENCE.satisfies(Qualifiers::CONST_REF));
    }

    #[test]
    fn const_source_rejects_non_const_request() {
        assert!(!Qualifiers::CONST_REF.satisfies(Qualifiers::REFERENCE));
        assert!(Qualifiers::CONST_REF.satisfies(Qualifiers::CONST_REF));
    }

    #[test]
    fn reference_source_answers_temporary_request() {
        assert!(Qualifiers::REFERENCE.satisfies(Qualifiers::TEMPORARY));
    }

    #[test]
    fn temporary_source_rejects_reference_request() {
        assert!(!Qualifiers::TEMPORARY.satisfies(Qualifiers::REFERENCE));
        assert!(Qualifiers::TEMPORARY.satisfies(Qualifiers::TEMPORARY));
    }

    #[test]
    fn binding_rules() {
        // move parameter needs a temporary
        assert!(Qualifiers::TEMPORARY.binds_to(Qualifiers::TEMPORARY));
        assert!(!Qualifiers::CONST_REF.binds_to(Qualifiers::TEMPORARY));

        // mutable reference parameter rejects const and temporaries
        assert!(Qualifiers::REFERENCE.binds_to(Qualifiers::REFERENCE));
        assert!(!Qualifiers::CONST_REF.binds_to(Qualifiers::REFERENCE));
        assert!(!Qualifiers::TEMPORARY.binds_to(Qualifiers::REFERENCE));

        // const reference binds anything
        assert!(Qualifiers::TEMPORARY.binds_to(Qualifiers::CONST_REF));
        assert!(Qualifiers::REFERENCE.binds_to(Qualifiers::CONST_REF));
        assert!(Qualifiers::CONST_REF.binds_to(Qualifiers::CONST_REF));
    }
}
