//! Expansion checks for `#[derive(Entity, Model)]`.

use sqlbulk_core::{
    Entity, Error, MappingErrorKind, Model, ScalarType, Value, ValueConverter, ValueGenerated,
};
use sqlbulk_macros::{Entity, Model};

mod conv {
    use sqlbulk_core::{ScalarType, Value, ValueConverter};

    pub fn season() -> ValueConverter {
        ValueConverter::new(
            ScalarType::I32,
            |v| {
                Ok(Value::Int(match v.as_str() {
                    Some("Winter") => 0,
                    Some("Spring") => 1,
                    Some("Summer") => 2,
                    _ => 3,
                }))
            },
            |v| {
                Ok(Value::Text(
                    match v.as_i64() {
                        Some(0) => "Winter",
                        Some(1) => "Spring",
                        Some(2) => "Summer",
                        _ => "Autumn",
                    }
                    .to_string(),
                ))
            },
        )
    }
}

#[derive(Debug, Clone, Default, Entity, Model)]
#[bulk(table = "bulk_test", schema = "bench")]
struct BulkTest {
    #[bulk(primary_key, auto_increment)]
    id: i64,
    #[bulk(column = "col_1")]
    column1: i32,
    column2: Option<String>,
    #[bulk(sql_type = "datetime(3)")]
    column3: chrono::NaiveDateTime,
    #[bulk(converter = "conv::season")]
    season: String,
    #[bulk(row_version)]
    version: Vec<u8>,
    #[bulk(skip)]
    scratch: u8,
}

#[derive(Debug, Default, Entity, Model)]
struct PlainRow {
    key: String,
}

#[test]
fn properties_follow_declaration_order() {
    let names: Vec<_> = BulkTest::properties().iter().map(|p| p.name).collect();
    assert_eq!(
        names,
        ["id", "column1", "column2", "column3", "season", "version"]
    );
    let column2 = BulkTest::property("column2").unwrap();
    assert_eq!(column2.scalar, ScalarType::String);
    assert!(column2.nullable);
    assert!(BulkTest::property("scratch").is_none());
}

#[test]
fn accessors_read_and_write() {
    let mut row = BulkTest::default();
    row.set("column1", Value::BigInt(5)).unwrap();
    row.set("column2", Value::Text("abc".into())).unwrap();
    assert_eq!(row.column1, 5);
    assert_eq!(row.get("column2"), Some(Value::Text("abc".into())));

    row.set("column2", Value::Null).unwrap();
    assert_eq!(row.get("column2"), Some(Value::Null));
    assert_eq!(row.get("scratch"), None);

    match row.set("scratch", Value::Int(1)) {
        Err(Error::Mapping(m)) => {
            assert_eq!(m.kind, MappingErrorKind::UnknownProperty);
            assert_eq!(m.type_name, "BulkTest");
        }
        _ => panic!("expected unknown property"),
    }
}

#[test]
fn model_metadata() {
    assert_eq!(BulkTest::TABLE_NAME, "bulk_test");
    assert_eq!(BulkTest::SCHEMA, Some("bench"));
    assert_eq!(BulkTest::primary_key(), vec!["id"]);

    let fields = BulkTest::fields();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[0].value_generated, ValueGenerated::OnAdd);
    assert_eq!(fields[1].column_name, "col_1");
    assert_eq!(fields[3].sql_type, Some("datetime(3)"));
    assert!(fields[2].nullable);
    assert!(fields[5].row_version);
    assert_eq!(fields[5].value_generated, ValueGenerated::OnAddOrUpdate);

    let converters: Vec<(&str, ValueConverter)> = BulkTest::converters();
    assert_eq!(converters.len(), 1);
    assert_eq!(converters[0].0, "season");
    assert_eq!(
        converters[0].1.to_provider(&Value::Text("Spring".into())).unwrap(),
        Value::Int(1)
    );
}

#[test]
fn defaults_without_attributes() {
    assert_eq!(PlainRow::TABLE_NAME, "plain_row");
    assert_eq!(PlainRow::SCHEMA, None);
    assert!(PlainRow::primary_key().is_empty());
    assert!(PlainRow::converters().is_empty());
}
