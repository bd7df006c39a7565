/// Identifier and literal sanitizer
///
/// Every name or string that ends up inside generated SQL text passes through
/// here first:
/// - `clean` escapes a value for a single-quoted string literal
/// - `field_clean` escapes a value for a double-quoted identifier
///
/// Values that cannot be represented safely (NUL bytes, empty or over-long
/// identifiers) are rejected with `AdminError::ValidationRejected` instead
/// of being altered.
use crate::core::AdminError;

/// NAMEDATALEN - 1; longer identifiers are truncated by the server
pub const MAX_IDENTIFIER_LEN: usize = 63;

fn reject_nul(value: &str, context: &str) -> Result<(), AdminError> {
    if value.contains('\0') {
        return Err(AdminError::ValidationRejected(format!(
            "{context} contains a NUL byte"
        )));
    }
    Ok(())
}

/// Escape a value for use inside `'...'`
///
/// Quotes and backslashes are both doubled. A value containing a backslash
/// must then be written as an escape string (`E'...'`, see `quote_literal`)
/// so it reads the same whatever `standard_conforming_strings` is set to.
pub fn clean(value: &str) -> Result<String, AdminError> {
    reject_nul(value, "literal")?;
    Ok(value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Escape a value for use inside `"..."`
pub fn field_clean(identifier: &str) -> Result<String, AdminError> {
    if identifier.is_empty() {
        return Err(AdminError::ValidationRejected(
            "identifier is empty".to_string(),
        ));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(AdminError::ValidationRejected(format!(
            "identifier is longer than {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    reject_nul(identifier, "identifier")?;
    Ok(identifier.replace('"', "\"\""))
}

/// `"identifier"`
pub fn quote_ident(identifier: &str) -> Result<String, AdminError> {
    Ok(format!("\"{}\"", field_clean(identifier)?))
}

/// `'literal'`, or `E'literal'` when the value contains a backslash
pub fn quote_literal(value: &str) -> Result<String, AdminError> {
    let cleaned = clean(value)?;
    if value.contains('\\') {
        Ok(format!("E'{cleaned}'"))
    } else {
        Ok(format!("'{cleaned}'"))
    }
}

/// `"schema"."name"`
pub fn qualified_name(schema: &str, name: &str) -> Result<String, AdminError> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(name)?))
}

/// Text form of a relation reference as accepted by `regclass` input
///
/// The result is an identifier that will later travel as a string value,
/// so it is escaped for both contexts when rendered inline.
pub fn regclass_text(schema: &str, name: &str) -> Result<String, AdminError> {
    qualified_name(schema, name)
}
