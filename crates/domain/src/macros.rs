//! Display/FromStr generation for the small lifecycle enums
//!
//! Session status and transcript roles are rendered as fixed labels in logs,
//! in the formatted transcript and on the CLI, and parsed back from config
//! and test fixtures. One macro keeps both directions in sync.
//!
//! ```rust
//! use secrely_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum CallState {
//!     Dialing,
//!     Ringing,
//!     Finished,
//! }
//!
//! impl_domain_status_conversions!(CallState {
//!     Dialing => "dialing",
//!     Ringing => "ringing",
//!     Finished => "finished",
//! });
//!
//! assert_eq!(CallState::Ringing.to_string(), "ringing");
//! assert_eq!("FINISHED".parse::<CallState>(), Ok(CallState::Finished));
//! ```

/// Implements `Display` and case-insensitive `FromStr` for a fieldless enum.
///
/// Labels are written as given; parsing compares against the lowercased
/// label, so mixed-case labels such as `"Agent"` still round-trip.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let lowered = s.trim().to_lowercase();
                $(
                    if lowered == $str.to_lowercase() {
                        return ::std::result::Result::Ok(Self::$variant);
                    }
                )+
                ::std::result::Result::Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
