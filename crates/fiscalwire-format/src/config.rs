use crate::template::LegacyCodes;
use crate::text::TextEncoding;

/// Field codec configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatConfig {
    /// Encoding applied to `T` and `B` fields. Default: Latin-1.
    pub text_encoding: TextEncoding,
    /// Whether `Y`/`Z` are typed fields or literals. Default: literals.
    pub legacy_codes: LegacyCodes,
}
