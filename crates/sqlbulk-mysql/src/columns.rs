//! Column selection for bulk operations.
//!
//! A selection is either every applicable column or an ordered list of
//! property names. A name may carry an accumulate suffix (`"stock+="`,
//! `"stock-="`) which only matters to update assignments; everywhere else
//! the bare property name is used.

use std::fmt;

/// How an update assignment combines the staged value with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignOp {
    /// `a.col = b.col`
    #[default]
    Set,
    /// `a.col = a.col + b.col`
    Add,
    /// `a.col = a.col - b.col`
    Subtract,
}

/// One selected property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub property: String,
    pub op: AssignOp,
}

impl ColumnRef {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            op: AssignOp::Set,
        }
    }

    /// Parse a name with an optional `+=` / `-=` suffix.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        let (property, op) = if let Some(name) = spec.strip_suffix("+=") {
            (name, AssignOp::Add)
        } else if let Some(name) = spec.strip_suffix("-=") {
            (name, AssignOp::Subtract)
        } else {
            (spec, AssignOp::Set)
        };
        Self {
            property: property.trim_end().to_string(),
            op,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            AssignOp::Set => write!(f, "{}", self.property),
            AssignOp::Add => write!(f, "{}+=", self.property),
            AssignOp::Subtract => write!(f, "{}-=", self.property),
        }
    }
}

/// A column selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    /// Every column the operation applies to (keys: the primary key).
    #[default]
    All,
    /// Exactly these properties, in order.
    Names(Vec<ColumnRef>),
}

impl Columns {
    /// Select named properties; names may carry operator suffixes.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Columns::Names(names.into_iter().map(|n| ColumnRef::parse(n.as_ref())).collect())
    }

    /// An explicitly empty selection.
    pub fn none() -> Self {
        Columns::Names(Vec::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Columns::All)
    }

    /// Expand to concrete references, using `all` for [`Columns::All`].
    pub(crate) fn resolve<F>(&self, all: F) -> Vec<ColumnRef>
    where
        F: FnOnce() -> Vec<String>,
    {
        match self {
            Columns::All => all().into_iter().map(ColumnRef::new).collect(),
            Columns::Names(refs) => refs.clone(),
        }
    }
}

impl From<&str> for Columns {
    fn from(name: &str) -> Self {
        Columns::names([name])
    }
}

impl From<String> for Columns {
    fn from(name: String) -> Self {
        Columns::names([name])
    }
}

impl From<Vec<&str>> for Columns {
    fn from(names: Vec<&str>) -> Self {
        Columns::names(names)
    }
}

impl From<Vec<String>> for Columns {
    fn from(names: Vec<String>) -> Self {
        Columns::names(names)
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(names: [&str; N]) -> Self {
        Columns::names(names)
    }
}

/// Build a [`Columns`] from field names of a type, checked at compile time.
///
/// ```ignore
/// let keys = columns!(Order { id });
/// let set = columns!(Order { status, stock += });
/// assert_eq!(set, Columns::names(["status", "stock+="]));
/// ```
#[macro_export]
macro_rules! columns {
    ($ty:ty { $($body:tt)* }) => {
        $crate::__columns!(@munch $ty; []; $($body)*)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __columns {
    (@munch $ty:ty; [$($field:ident $op:literal)*];) => {{
        let _ = |record: &$ty| {
            $( let _ = &record.$field; )*
        };
        $crate::Columns::names([$( ::core::concat!(::core::stringify!($field), $op) ),*])
    }};
    (@munch $ty:ty; [$($acc:tt)*]; $field:ident += $(, $($rest:tt)*)?) => {
        $crate::__columns!(@munch $ty; [$($acc)* $field "+="]; $($($rest)*)?)
    };
    (@munch $ty:ty; [$($acc:tt)*]; $field:ident -= $(, $($rest:tt)*)?) => {
        $crate::__columns!(@munch $ty; [$($acc)* $field "-="]; $($($rest)*)?)
    };
    (@munch $ty:ty; [$($acc:tt)*]; $field:ident $(, $($rest:tt)*)?) => {
        $crate::__columns!(@munch $ty; [$($acc)* $field ""]; $($($rest)*)?)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operator_suffixes() {
        assert_eq!(ColumnRef::parse("Column1"), ColumnRef::new("Column1"));
        assert_eq!(ColumnRef::parse("Column1+=").op, AssignOp::Add);
        assert_eq!(ColumnRef::parse("Column1 -=").property, "Column1");
        assert_eq!(ColumnRef::parse("Column1 -=").op, AssignOp::Subtract);
        assert_eq!(ColumnRef::parse("stock+=").to_string(), "stock+=");
    }

    #[test]
    fn resolve_all_uses_fallback() {
        let cols = Columns::All.resolve(|| vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cols, vec![ColumnRef::new("a"), ColumnRef::new("b")]);

        let named = Columns::from(["x", "y+="]).resolve(Vec::new);
        assert_eq!(named.len(), 2);
        assert_eq!(named[1].op, AssignOp::Add);
        assert!(Columns::none().resolve(|| vec!["a".to_string()]).is_empty());
    }

    #[allow(dead_code)]
    struct Stock {
        sku: String,
        quantity: i32,
        price: f64,
    }

    #[test]
    fn macro_matches_names() {
        assert_eq!(columns!(Stock { sku }), Columns::names(["sku"]));
        assert_eq!(
            columns!(Stock { sku, quantity +=, price }),
            Columns::names(["sku", "quantity+=", "price"])
        );
        assert_eq!(
            columns!(Stock { quantity -= }),
            Columns::names(["quantity-="])
        );
    }
}
