//! SQL identifier quoting.

/// Quote a SQL identifier using MySQL backtick quoting.
///
/// Embedded backticks are escaped by doubling them.
///
/// # Examples
///
/// ```
/// use sqlbulk_core::quote_ident;
///
/// assert_eq!(quote_ident("users"), "`users`");
/// assert_eq!(quote_ident("user`name"), "`user``name`");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Combine an optional schema and a table name into one quoted identifier.
///
/// MySQL treats a schema as a database, so `app` + `orders` becomes
/// `` `app`.`orders` ``.
pub fn qualified_name(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => {
            format!("{}.{}", quote_ident(schema), quote_ident(table))
        }
        _ => quote_ident(table),
    }
}
