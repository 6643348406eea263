//! Enumerations with stable on-disk discriminants.

/// An enum persisted as its `u32` discriminant.
///
/// Usually implemented through [`persist_enum!`](crate::persist_enum).
pub trait PersistEnum: Copy {
    fn to_raw(self) -> u32;

    /// Map a stored discriminant back to a variant; `None` if unknown.
    fn from_raw(raw: u32) -> Option<Self>;
}

/// Declare a fieldless enum with explicit discriminants and implement
/// [`PersistEnum`] for it.
///
/// ```
/// skirmish_persist::persist_enum! {
///     pub enum GameType {
///         SinglePlayer = 0,
///         Skirmish = 2,
///     }
/// }
///
/// use skirmish_persist::PersistEnum;
/// assert_eq!(GameType::from_raw(2), Some(GameType::Skirmish));
/// assert_eq!(GameType::from_raw(1), None);
/// ```
#[macro_export]
macro_rules! persist_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $crate::PersistEnum for $name {
            fn to_raw(self) -> u32 {
                self as u32
            }

            fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::PersistEnum;

    crate::persist_enum! {
        #[derive(Default)]
        enum Sparse {
            #[default]
            Invalid = 0,
            Construction = 1,
            UnitLost = 10,
        }
    }

    #[test]
    fn raw_values_follow_declared_discriminants() {
        assert_eq!(Sparse::UnitLost.to_raw(), 10);
        assert_eq!(Sparse::from_raw(1), Some(Sparse::Construction));
        assert_eq!(Sparse::from_raw(5), None);
        assert_eq!(Sparse::default(), Sparse::Invalid);
    }
}
