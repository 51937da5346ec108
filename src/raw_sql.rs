//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! All SQL in this module is static text; user input never reaches it.

use diesel::dsl::sql;
use diesel::expression::SqlLiteral;
use diesel::sql_types::BigInt;

/// Window function for counting total rows across the full result set.
///
/// Returns `COUNT(*) OVER()` which gives the total count before LIMIT/OFFSET.
/// Diesel doesn't support window functions natively.
pub fn count_over() -> SqlLiteral<BigInt> {
    sql::<BigInt>("COUNT(*) OVER()")
}
