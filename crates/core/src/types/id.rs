//! Newtype IDs for type-safe entity references.
//!
//! Doubtfire hands out integer primary keys for every entity, so each ID is a
//! thin `i64` wrapper. Use the `define_id!` macro to create wrappers that
//! prevent passing a unit role ID where a user ID is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use unit_admin_core::define_id;
/// define_id!(TutorialId);
/// define_id!(CampusId);
///
/// let tutorial = TutorialId::new(7);
/// assert_eq!(tutorial.as_i64(), 7);
///
/// // These are different types, so this won't compile:
/// // let _: CampusId = tutorial;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw integer key.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying integer key.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(UnitId);
define_id!(UnitRoleId);
define_id!(GroupSetId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_display_and_parse() {
        let id = UnitRoleId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(" 42 ".parse::<UnitRoleId>().unwrap(), id);
    }

    #[test]
    fn test_id_rejects_non_numeric_input() {
        assert!("tutor".parse::<UserId>().is_err());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&UnitId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: UnitId = serde_json::from_str("9").unwrap();
        assert_eq!(back, UnitId::new(9));
    }
}
