//! End-to-end compilation against a realistic call-log catalog

use serde_json::{Map, Value, json};

use super::*;
use crate::data::sql::{Backend, PostgresDialect, SqliteDialect};

fn calls_catalog() -> FieldCatalog {
    FieldCatalog::builder("calls", "calls")
        .field(FieldDescriptor::new("id", "id", ValueType::Integer))
        .field(FieldDescriptor::new("account_id", "account_id", ValueType::Integer))
        .field(
            FieldDescriptor::new("status", "status", ValueType::Enum)
                .with_values(["queued", "ringing", "completed", "failed"]),
        )
        .field(
            FieldDescriptor::new("direction", "direction", ValueType::Enum)
                .with_values(["inbound", "outbound"]),
        )
        .field(FieldDescriptor::new("duration_seconds", "duration_seconds", ValueType::Integer))
        .field(FieldDescriptor::new("started_at", "started_at", ValueType::Datetime))
        .field(FieldDescriptor::new("ended_at", "ended_at", ValueType::Datetime))
        .field(FieldDescriptor::new("caller_number", "caller_number", ValueType::String).partial_match())
        .field(FieldDescriptor::new("callee_number", "callee_number", ValueType::String).partial_match())
        .field(FieldDescriptor::new("notes", "notes", ValueType::String).partial_match())
        .field(FieldDescriptor::new("agent_name", "agents.name", ValueType::String).via("agent"))
        .field(FieldDescriptor::new("recording", "recording", ValueType::Boolean))
        .association(JoinSpec::left("agent", "agents", "id", "calls.agent_id"))
        .timezone(TimezoneSource::Joined {
            join: JoinSpec::left(
                "local_timezone",
                "account_settings",
                "account_id",
                "calls.account_id",
            )
            .with_alias("local_tz"),
            column: "time_zone".to_string(),
        })
        .shortcut("status", "status")
        .shortcut("direction", "direction")
        .search("q", ["caller_number", "callee_number"])
        .default_sort("started_at", SortDirection::Desc)
        .build()
        .unwrap()
}

fn base() -> BaseQuery {
    BaseQuery::from_table("calls").scope_eq("account_id", 42)
}

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn compile(request: Value, query_params: Value) -> Result<CompiledQuery, FilterError> {
    compile_request(
        &calls_catalog(),
        base(),
        &request,
        &params(query_params),
        &ParseLimits::default(),
    )
}

fn render(request: Value) -> (String, Vec<SqlValue>) {
    let (sql, params) = compile(request, json!({}))
        .unwrap()
        .to_sql(&PostgresDialect)
        .unwrap();
    (sql, params.values)
}

fn canonical_request() -> Value {
    json!({
        "filter": {
            "status": {"in": ["completed", "failed"]},
            "started_at": {"range": {"from": "2024-01-01T00:00:00Z", "to": "2024-02-01T00:00:00Z"}},
            "duration_seconds": {"range": {"interval": "30..600"}},
            "or": [
                {"caller_number": {"contains": "555"}},
                {"callee_number": {"starts_with": "+1"}},
                {"notes": {"ends_with": "follow up"}}
            ],
            "and": [
                {"recording": {"eq": true}},
                {"duration_seconds": {"gteq": 10}}
            ],
            "not": [
                {"direction": {"eq": "outbound"}},
                {"caller_number": {"contains": "bot"}}
            ]
        },
        "sort": {"order_by": "duration_seconds", "direction": "desc"},
        "paging": {"page": 1, "items": 10}
    })
}

#[test]
fn test_canonical_request() {
    let query = compile(
        canonical_request(),
        json!({"status": "completed", "q": "smith"}),
    )
    .unwrap();
    let (sql, params) = query.to_sql(&PostgresDialect).unwrap();

    assert_eq!(
        sql,
        "SELECT calls.* FROM calls \
         WHERE account_id = $1 \
         AND status IN ($2, $3) \
         AND (started_at >= $4 AND started_at < $5) \
         AND duration_seconds BETWEEN $6 AND $7 \
         AND (caller_number ILIKE $8 ESCAPE '\\' OR callee_number ILIKE $9 ESCAPE '\\' OR notes ILIKE $10 ESCAPE '\\') \
         AND (recording = $11 AND duration_seconds >= $12) \
         AND NOT (direction = $13 AND caller_number ILIKE $14 ESCAPE '\\') \
         AND (status = $15 AND (caller_number ILIKE $16 ESCAPE '\\' OR callee_number ILIKE $17 ESCAPE '\\')) \
         ORDER BY duration_seconds DESC LIMIT 10 OFFSET 0"
    );
    assert_eq!(
        params.values,
        vec![
            SqlValue::Integer(42),
            SqlValue::from("completed"),
            SqlValue::from("failed"),
            SqlValue::from("2024-01-01T00:00:00Z"),
            SqlValue::from("2024-02-01T00:00:00Z"),
            SqlValue::Integer(30),
            SqlValue::Integer(600),
            SqlValue::from("%555%"),
            SqlValue::from("+1%"),
            SqlValue::from("%follow up"),
            SqlValue::Bool(true),
            SqlValue::Integer(10),
            SqlValue::from("outbound"),
            SqlValue::from("%bot%"),
            SqlValue::from("completed"),
            SqlValue::from("%smith%"),
            SqlValue::from("%smith%"),
        ]
    );
    assert!(query.joins().is_empty());
    assert_eq!(query.limit(), 10);
    assert_eq!(query.offset(), 0);
}

#[test]
fn test_compilation_is_deterministic() {
    let first = compile(canonical_request(), json!({"q": "smith"}))
        .unwrap()
        .to_sql(&PostgresDialect)
        .unwrap();
    let second = compile(canonical_request(), json!({"q": "smith"}))
        .unwrap()
        .to_sql(&PostgresDialect)
        .unwrap();

    assert_eq!(first.0, second.0);
    assert_eq!(first.1.values, second.1.values);
}

#[test]
fn test_single_entry_combinator_is_rejected() {
    let err = compile(
        json!({"filter": {"or": [{"status": {"eq": "completed"}}]}}),
        json!({}),
    )
    .unwrap_err();

    assert_eq!(err, FilterError::CombinatorArity(1));
    assert_eq!(err.to_string(), "Combinator requires at least 2 conditions, got 1");
    assert_eq!(err.code(), "COMBINATOR_ARITY");
}

#[test]
fn test_unknown_field_at_depth() {
    let err = compile(
        json!({"filter": {"and": [
            {"id": {"eq": 1}},
            {"or": [{"id": {"eq": 2}}, {"not": [{"id": {"eq": 3}}, {"talk_time": {"greater_than": 5}}]}]}
        ]}}),
        json!({}),
    )
    .unwrap_err();

    assert_eq!(err, FilterError::UnrecognizedField("talk_time".to_string()));
}

#[test]
fn test_range_failures() {
    let cases = [
        (
            json!({"from": "2024-01-01T00:00:00Z"}),
            RangeDefect::MissingTo,
        ),
        (json!({"to": "2024-01-01T00:00:00Z"}), RangeDefect::MissingFrom),
        (
            json!({"from": "2024-01-01T00:00:00Z", "to": "2024-02-01T00:00:00Z", "interval": "a..b"}),
            RangeDefect::BothBoundsAndInterval,
        ),
        (json!({}), RangeDefect::Neither),
        (json!({"interval": "2024-01-01T00:00:00Z"}), RangeDefect::BadInterval),
        (json!({"since": "2024-01-01"}), RangeDefect::UnknownKey("since".to_string())),
    ];

    for (range, defect) in cases {
        assert_eq!(
            compile(json!({"filter": {"started_at": {"range": range}}}), json!({})).unwrap_err(),
            FilterError::MalformedRange {
                field: "started_at".to_string(),
                defect
            }
        );
    }
}

#[test]
fn test_local_time_joins_timezone_once() {
    let (sql, params) = render(json!({
        "filter": {
            "local_time:started_at": {"gteq": "2024-03-01T09:00:00"},
            "local_time:ended_at": {"less_than": "2024-03-01T17:00:00"}
        },
        "sort": {"order_by": "id"}
    }));

    assert_eq!(
        sql,
        "SELECT calls.* FROM calls \
         LEFT JOIN account_settings AS local_tz ON local_tz.account_id = calls.account_id \
         WHERE calls.account_id = $1 \
         AND (calls.started_at AT TIME ZONE local_tz.time_zone) >= $2 \
         AND (calls.ended_at AT TIME ZONE local_tz.time_zone) < $3 \
         ORDER BY calls.id ASC LIMIT 50 OFFSET 0"
    );
    assert_eq!(params.len(), 3);
}

#[test]
fn test_time_of_day_interval() {
    let (sql, params) = render(json!({
        "filter": {"time_of_day:local_time:started_at": {"range": {"interval": "09:00..17:30"}}}
    }));

    assert_eq!(
        sql,
        "SELECT calls.* FROM calls \
         LEFT JOIN account_settings AS local_tz ON local_tz.account_id = calls.account_id \
         WHERE calls.account_id = $1 \
         AND CAST((calls.started_at AT TIME ZONE local_tz.time_zone) AS TIME) BETWEEN CAST($2 AS TIME) AND CAST($3 AS TIME) \
         ORDER BY calls.started_at DESC LIMIT 50 OFFSET 0"
    );
    assert_eq!(params[1..], [SqlValue::from("09:00"), SqlValue::from("17:30")]);
}

#[test]
fn test_added_joins_do_not_clash_with_base_columns() {
    // account_settings also has account_id, agents also has id
    let (sql, params) = render(json!({
        "filter": {
            "account_id": {"eq": 42},
            "local_time:started_at": {"gteq": "2024-03-01T09:00:00"},
            "agent_name": {"eq": "Ada"}
        },
        "sort": [{"order_by": "id"}],
        "fields": ["id", "agent_name"]
    }));

    assert_eq!(
        sql,
        "SELECT calls.id, agents.name AS agent_name FROM calls \
         LEFT JOIN account_settings AS local_tz ON local_tz.account_id = calls.account_id \
         LEFT JOIN agents ON agents.id = calls.agent_id \
         WHERE calls.account_id = $1 \
         AND calls.account_id = $2 \
         AND (calls.started_at AT TIME ZONE local_tz.time_zone) >= $3 \
         AND agents.name = $4 \
         ORDER BY calls.id ASC LIMIT 50 OFFSET 0"
    );
    assert_eq!(params.len(), 4);
}

#[test]
fn test_local_time_rejected_without_named_zones() {
    let catalog = FieldCatalog::builder("calls", "calls")
        .field(FieldDescriptor::new("started_at", "started_at", ValueType::Datetime))
        .timezone(TimezoneSource::Fixed(chrono_tz::Europe::Berlin))
        .build()
        .unwrap();
    let query = compile_request(
        &catalog,
        BaseQuery::from_table("calls"),
        &json!({"filter": {"local_time:started_at": {"gteq": "2024-03-01 09:00:00"}}}),
        &Map::new(),
        &ParseLimits::default(),
    )
    .unwrap();

    let err = query.to_sql(&SqliteDialect).unwrap_err();
    assert_eq!(
        err,
        FilterError::UnsupportedExpression {
            expression: "local_time".to_string(),
            dialect: "sqlite".to_string(),
        }
    );
    assert_eq!(err.code(), "UNSUPPORTED_EXPRESSION");

    let (sql, params) = query.to_sql(&PostgresDialect).unwrap();
    assert_eq!(
        sql,
        "SELECT calls.* FROM calls WHERE (started_at AT TIME ZONE $1) >= $2 LIMIT 50 OFFSET 0"
    );
    assert_eq!(params.values[0], SqlValue::from("Europe/Berlin"));

    // Other expressions still render on SQLite
    let query = compile_request(
        &catalog,
        BaseQuery::from_table("calls"),
        &json!({"filter": {"time_of_day:started_at": {"gteq": "09:00"}}}),
        &Map::new(),
        &ParseLimits::default(),
    )
    .unwrap();
    assert_eq!(
        query.to_sql(&SqliteDialect).unwrap().0,
        "SELECT calls.* FROM calls WHERE time(started_at) >= time(?) LIMIT 50 OFFSET 0"
    );
}

#[test]
fn test_incompatible_expression() {
    assert_eq!(
        compile(json!({"filter": {"local_time:notes": {"eq": "x"}}}), json!({})).unwrap_err(),
        FilterError::IncompatibleExpression {
            expression: "local_time".to_string(),
            field: "notes".to_string(),
            value_type: ValueType::String,
        }
    );
    assert_eq!(
        compile(json!({"filter": {"weekday:started_at": {"eq": 1}}}), json!({})).unwrap_err(),
        FilterError::UnrecognizedExpression("weekday".to_string())
    );
}

#[test]
fn test_wildcards_are_literal() {
    let (sql, params) = render(json!({
        "filter": {"notes": {"does_not_contain": "50%_off"}}
    }));

    assert!(sql.contains(r"notes NOT ILIKE $2 ESCAPE '\'"));
    assert_eq!(params[1], SqlValue::from(r"%50\%\_off%"));
}

#[test]
fn test_operator_and_value_validation() {
    assert_eq!(
        compile(json!({"filter": {"recording": {"greater_than": true}}}), json!({})).unwrap_err(),
        FilterError::DisallowedOperator {
            field: "recording".to_string(),
            operator: "greater_than".to_string(),
        }
    );
    assert_eq!(
        compile(json!({"filter": {"id": {"near": 1}}}), json!({})).unwrap_err(),
        FilterError::UnrecognizedOperator("near".to_string())
    );
    assert!(matches!(
        compile(json!({"filter": {"status": {"eq": "lost"}}}), json!({})),
        Err(FilterError::InvalidValue { ref field, .. }) if field == "status"
    ));
    assert!(matches!(
        compile(json!({"filter": {"direction": {"eq": "inbound"}}}), json!({"direction": "sideways"})),
        Err(FilterError::InvalidValue { .. })
    ));
}

#[test]
fn test_sqlite_rendering() {
    let query = compile(
        json!({
            "filter": {
                "caller_number": {"starts_with": "+44"},
                "ended_at": {"null": true}
            },
            "sort": [{"order_by": "agent_name"}, {"order_by": "id", "direction": "DESC"}],
            "paging": {"page": 2, "items": 25}
        }),
        json!({}),
    )
    .unwrap();
    let (sql, params) = query.to_sql(&SqliteDialect).unwrap();

    assert_eq!(
        sql,
        "SELECT calls.* FROM calls \
         LEFT JOIN agents ON agents.id = calls.agent_id \
         WHERE calls.account_id = ? AND calls.caller_number LIKE ? ESCAPE '\\' AND calls.ended_at IS NULL \
         ORDER BY agents.name ASC, calls.id DESC LIMIT 25 OFFSET 25"
    );
    assert_eq!(params.values, vec![SqlValue::Integer(42), SqlValue::from("+44%")]);
}

#[test]
fn test_through_registry() {
    let registry = CatalogRegistry::build([calls_catalog()]).unwrap();
    let catalog = registry.catalog("calls").unwrap();
    let query = compile_request(
        catalog,
        base(),
        &json!({"filter": {"id": {"eq": 7}}, "fields": ["id", "agent_name"]}),
        &Map::new(),
        &ParseLimits::default(),
    )
    .unwrap();
    let (sql, _) = query.to_sql(Backend::Duckdb.dialect()).unwrap();

    assert_eq!(
        sql,
        "SELECT calls.id, agents.name AS agent_name FROM calls \
         LEFT JOIN agents ON agents.id = calls.agent_id \
         WHERE calls.account_id = ? AND calls.id = ? \
         ORDER BY calls.started_at DESC LIMIT 50 OFFSET 0"
    );
    assert_eq!(
        registry.catalog("invoices").unwrap_err(),
        FilterError::UnrecognizedResource("invoices".to_string())
    );
}

#[test]
fn test_limits() {
    let mut nested = json!({"id": {"eq": 0}});
    for i in 1..=3 {
        nested = json!({"and": [nested, {"id": {"eq": i}}]});
    }
    let limits = ParseLimits {
        max_depth: 2,
        ..ParseLimits::default()
    };

    assert_eq!(
        parse_filters(&json!({"filter": nested}).to_string(), &calls_catalog(), &limits)
            .unwrap_err(),
        FilterError::FilterTooDeep(2)
    );

    let limits = ParseLimits {
        max_request_bytes: 32,
        ..ParseLimits::default()
    };
    assert_eq!(
        parse_filters(&canonical_request().to_string(), &calls_catalog(), &limits).unwrap_err(),
        FilterError::RequestTooLarge { max_bytes: 32 }
    );
}
