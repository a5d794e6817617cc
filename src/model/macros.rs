/// Generate `as_str`, `From<T> for String`, and `TryFrom<&str> for T` for a
/// closed, `Copy` enum stored as text.
///
/// `TryFrom` is strict: it accepts exactly the stored spelling and is meant
/// for decoding persisted rows. Lenient parsing of player input stays with
/// each type's `FromStr`.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $str,)+
                }
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }

        impl TryFrom<&str> for $name {
            type Error = String;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                match s {
                    $($str => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($name))),
                }
            }
        }
    };
}
