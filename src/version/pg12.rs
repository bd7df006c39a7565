/// PostgreSQL 12: tables can no longer have OIDs and `pg_class.relhasoids`
/// is gone, so the lookup is answered without a query
use crate::connection::Statement;
use crate::core::AdminError;
use crate::sanitize::field_clean;

use super::chain::Overrides;

pub const OVERRIDES: Overrides = Overrides {
    has_object_ids: Some(has_object_ids),
    ..Overrides::NONE
};

pub fn has_object_ids(schema: &str, table: &str) -> Result<Option<Statement>, AdminError> {
    // Names are still validated so a bad request fails the same way on every version
    field_clean(schema)?;
    field_clean(table)?;
    Ok(None)
}
