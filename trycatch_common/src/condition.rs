//! Condition identifiers.
//!
//! A condition is a plain integer. Identifiers `1..LAST_ID` are reserved for
//! the runtime and its built-in situations; `LAST_ID` is the first value free
//! for callers. Independently written modules mint their own identifiers from
//! `LAST_ID` upward, so two modules picking the same value is expected. The
//! label registry of the runtime crate reports such collisions when it names
//! a condition.
//!
//! `0` means "no condition" and is never raised.

use std::fmt;

/// Identifier of a raisable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConditionId(pub i32);

impl ConditionId {
    /// Synchronous fault delivered by the execution environment.
    pub const FAULT: Self = Self(1);
    /// Memory allocation failed.
    pub const ALLOC_FAILED: Self = Self(2);
    /// I/O operation failed.
    pub const IO_ERROR: Self = Self(3);
    /// The label registry is full.
    pub const TOO_MANY_RESOLVERS: Self = Self(4);
    /// Arithmetic produced NaN.
    pub const NAN: Self = Self(5);
    /// Integer overflow.
    pub const INT_OVERFLOW: Self = Self(6);
    /// Value or index out of range.
    pub const OUT_OF_RANGE: Self = Self(7);
    /// Code path not implemented yet.
    pub const NOT_YET_IMPLEMENTED: Self = Self(8);
    /// A unit test assertion failed.
    pub const UNIT_TEST_FAILED: Self = Self(9);
    /// A loop exceeded its iteration bound.
    pub const INFINITE_LOOP: Self = Self(10);
    /// Sentinel: first identifier available to callers. Not a condition.
    pub const LAST_ID: Self = Self(11);

    /// Identifier `offset` steps after `self`.
    ///
    /// # Panics
    ///
    /// Panics if the result does not fit in an `i32`, in every build
    /// profile. In a `const` context this is a compile error.
    #[inline]
    pub const fn offset(self, offset: i32) -> Self {
        match self.0.checked_add(offset) {
            Some(id) => Self(id),
            None => panic!("condition identifier overflows i32"),
        }
    }

    /// User identifier `offset` steps after [`Self::LAST_ID`].
    #[inline]
    pub const fn user(offset: i32) -> Self {
        Self::LAST_ID.offset(offset)
    }

    /// Returns true for identifiers in the reserved range `1..LAST_ID`.
    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0 >= 1 && self.0 < Self::LAST_ID.0
    }

    /// Raw integer value.
    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for ConditionId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<ConditionId> for i32 {
    fn from(id: ConditionId) -> Self {
        id.0
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Labels of the reserved identifiers, indexed by identifier value.
const BUILTIN_LABELS: [&str; ConditionId::LAST_ID.0 as usize] = [
    "",
    "Fault",
    "AllocFailed",
    "IoError",
    "TooManyResolvers",
    "NaN",
    "IntOverflow",
    "OutOfRange",
    "NotYetImplemented",
    "UnitTestFailed",
    "InfiniteLoop",
];

/// Label of a reserved identifier, `None` outside `1..LAST_ID`.
pub fn builtin_label(id: ConditionId) -> Option<&'static str> {
    if id.is_reserved() {
        Some(BUILTIN_LABELS[id.0 as usize])
    } else {
        None
    }
}

/// Defines a module of consecutive condition identifiers plus a `resolve`
/// function naming them, ready to hand to the runtime's label registry.
///
/// The base expression is evaluated inside the generated module; reach
/// items of the enclosing module through `super::`.
///
/// ```rust
/// use trycatch_common::condition::ConditionId;
/// use trycatch_common::condition_set;
///
/// condition_set! {
///     /// Conditions raised by the tokenizer.
///     pub mod lexer from ConditionId::LAST_ID => {
///         UNEXPECTED_CHAR = "UnexpectedChar",
///         UNTERMINATED_STRING = "UnterminatedString",
///     }
/// }
///
/// assert_eq!(lexer::UNEXPECTED_CHAR, ConditionId::LAST_ID);
/// assert_eq!(lexer::UNTERMINATED_STRING, ConditionId::user(1));
/// assert_eq!(lexer::resolve(lexer::UNTERMINATED_STRING), Some("UnterminatedString"));
/// assert_eq!(lexer::resolve(ConditionId::NAN), None);
/// ```
#[macro_export]
macro_rules! condition_set {
    (
        $(#[$meta:meta])*
        $vis:vis mod $module:ident from $base:expr => {
            $( $(#[$cmeta:meta])* $name:ident = $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis mod $module {
            #[allow(unused_imports)]
            use $crate::condition::ConditionId;

            #[allow(non_camel_case_types, dead_code)]
            #[repr(i32)]
            enum Offset {
                $( $name ),+
            }

            $(
                $(#[$cmeta])*
                pub const $name: $crate::condition::ConditionId =
                    $crate::condition::ConditionId::offset($base, Offset::$name as i32);
            )+

            /// Label of an identifier of this set, `None` for any other.
            pub fn resolve(id: $crate::condition::ConditionId) -> Option<&'static str> {
                $(
                    if id == $name {
                        return Some($label);
                    }
                )+
                None
            }
        }
    };
}
