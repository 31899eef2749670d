// ABOUTME: This module provides macros to reduce boilerplate in the TPDU implementations
// ABOUTME: Includes macros for message-type registration and builder-style setters

/// Macro for registering a TPDU struct as a variant of `Tpdu`
///
/// # Arguments
/// * `$kind` - The TPDU struct name, which is also the `Tpdu` variant name
/// * `$mti` - The TP-MTI bits of the first octet
/// * `$direction` - The direction the message travels in
///
/// # Generated code
/// - `MTI` and `DIRECTION` associated constants
/// - `check_mti` helper that fails before any further field is read
/// - `From<$kind> for Tpdu`
macro_rules! impl_tpdu_kind {
    ($kind:ident, $mti:expr, $direction:expr) => {
        impl $kind {
            /// TP-MTI bits identifying this message type
            pub const MTI: u8 = $mti;

            /// Direction this message type travels in
            pub const DIRECTION: $crate::tpdu::Direction = $direction;

            fn check_mti(first_octet: u8) -> Result<(), $crate::codec::CodecError> {
                let actual = first_octet & 0x03;
                if actual != Self::MTI {
                    return Err($crate::codec::CodecError::UnexpectedMessageType {
                        layer: $crate::codec::Layer::Transfer,
                        expected: Self::MTI,
                        actual,
                    });
                }
                Ok(())
            }
        }

        impl From<$kind> for $crate::tpdu::Tpdu {
            fn from(value: $kind) -> Self {
                $crate::tpdu::Tpdu::$kind(value)
            }
        }
    };
}

/// Macro for generating builder-style setter methods
///
/// For each field, generates:
/// ```rust,ignore
/// pub fn $field(mut self, $field: $type) -> Self {
///     self.$field = $field;
///     self
/// }
/// ```
macro_rules! builder_setters {
    ($($field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

// Make macros available to the rest of the crate
pub(crate) use {builder_setters, impl_tpdu_kind};
