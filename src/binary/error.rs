use super::types::ValueType;
use nom::error::ErrorKind;
use thiserror::Error;

/// Ways a byte slice can fail to decode into a module.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("module does not start with \\0asm")]
    InvalidMagic,
    #[error("unsupported binary version: {0}")]
    UnsupportedVersion(u32),
    #[error("malformed LEB128 integer")]
    MalformedLeb128,
    #[error("unexpected end of input")]
    ShortRead,
    #[error("unknown section id: {0}")]
    UnknownSectionId(u8),
    #[error("unsupported function type form: {0:#04x}")]
    UnsupportedType(u8),
    #[error("unsupported value type: {0:#04x}")]
    UnsupportedValueType(u8),
    #[error("unsupported local type: {0:?}")]
    UnsupportedLocalType(ValueType),
    #[error("unsupported import kind: {0:#04x}")]
    UnsupportedImportKind(u8),
    #[error("unknown export kind: {0:#04x}")]
    UnknownExportKind(u8),
    #[error("invalid mutability flag: {0:#04x}")]
    InvalidMutability(u8),
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),
    #[error("invalid constant initializer expression at {0:#04x}")]
    InvalidInitExpr(u8),
    #[error("section payload size does not match its contents")]
    InconsistentSize,
}

// The decoder runs on complete input, so nom's own failures boil down to a
// handful of kinds: `tag` is only used for the magic bytes, `Eof` means the
// input ran out mid-field, and everything else comes out of the LEB128
// parsers.
impl<'a> nom::error::ParseError<&'a [u8]> for DecodeError {
    fn from_error_kind(_input: &'a [u8], kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Tag => DecodeError::InvalidMagic,
            ErrorKind::Eof => DecodeError::ShortRead,
            _ => DecodeError::MalformedLeb128,
        }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> nom::error::ContextError<&'a [u8]> for DecodeError {}
