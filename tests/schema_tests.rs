//! Schema checks through the public API, including definitions loaded from
//! fixtures

use datakit::schema::{ErrorCode, Format, ModelRegistry};
use datakit::{Registry, Schema};
use serde_json::{json, Value};

fn fixture(name: &str) -> Value {
    let raw = match name {
        "models" => include_str!("fixtures/models.json"),
        "user_schema" => include_str!("fixtures/user_schema.json"),
        "user_valid" => include_str!("fixtures/user_valid.json"),
        other => panic!("unknown fixture {}", other),
    };
    serde_json::from_str(raw).unwrap()
}

fn user_schema() -> Schema {
    let models = ModelRegistry::from_definitions(&fixture("models")).unwrap();
    Schema::from_definition(&fixture("user_schema"), &models).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_integer_below_minimum() {
    let report = Schema::number().integer().min(3.0).check(&mut json!(2));
    assert!(!report.is_valid());
    assert!(report.has("", ErrorCode::Min));
}

#[test]
fn test_two_invalid_siblings_both_reported() {
    let schema = Schema::object([("a", Schema::number()), ("b", Schema::string())]);
    let report = schema.check(&mut json!({"a": "x", "b": 1}));
    assert!(!report.is_valid());
    assert_eq!(report.len(), 2);
    assert_eq!(report.codes_at("a"), vec![ErrorCode::NotANumber]);
    assert_eq!(report.codes_at("b"), vec![ErrorCode::NotAString]);
}

#[test]
fn test_duplicate_elements_rejected() {
    let report = Schema::array(Schema::number()).unique().check(&mut json!([1, 1, 2]));
    assert!(report.has("", ErrorCode::NotUnique));
}

#[test]
fn test_boolean_string_is_coerced() {
    let mut value = json!("true");
    assert!(Schema::string().format(Format::Boolean).check(&mut value).is_valid());
    assert_eq!(value, json!(true));
}

#[test]
fn test_whitelist_strips_in_place() {
    let schema = Schema::object([("foo", Schema::number())]).white_list();
    let mut input = json!({"foo": 1, "bar": 2});
    assert!(schema.check(&mut input).is_valid());
    assert!(input.get("bar").is_none());
}

#[test]
fn test_allow_list_accepts_null() {
    let schema = Schema::string().allow([Value::Null]);
    assert!(schema.check(&mut Value::Null).is_valid());
}

// =============================================================================
// Definitions and models
// =============================================================================

#[test]
fn test_user_fixture_is_valid_and_coerced() {
    let user = user_schema().validate(fixture("user_valid")).unwrap();
    assert_eq!(user["age"], json!(36));
    assert_eq!(user["nickname"], Value::Null);
    assert_eq!(user["roles"], json!(["admin", "member"]));
}

#[test]
fn test_user_fixture_defaults_and_stripping() {
    let mut user = fixture("user_valid");
    user.as_object_mut().unwrap().remove("roles");
    user["internal"] = json!("secret");

    assert!(user_schema().check(&mut user).is_valid());
    assert_eq!(user["roles"], json!(["member"]));
    assert!(user.get("internal").is_none());
}

#[test]
fn test_user_fixture_reports_every_violation() {
    let mut user = json!({
        "id": "not-an-id",
        "email": "nobody",
        "age": "-4",
        "address": {"street": "", "zip": "123", "country": "NL"},
        "roles": ["admin", "admin", "root"]
    });

    let report = user_schema().check(&mut user);
    let errors = report.errors();
    assert!(report.has("id", ErrorCode::InvalidFormat));
    assert!(report.has("email", ErrorCode::InvalidFormat));
    assert!(report.has("age", ErrorCode::InvalidFormat));
    assert!(report.has("address.street", ErrorCode::MinLength));
    assert!(report.has("address.zip", ErrorCode::InvalidFormat));
    assert!(report.has("address.country", ErrorCode::NotAllowed));
    assert!(report.has("roles", ErrorCode::NotUnique));
    assert!(report.has("roles[2]", ErrorCode::NotInEnum));
    assert_eq!(errors.len(), 8);

    // Nothing was coerced on a failing node
    assert_eq!(user["age"], json!("-4"));
}

#[test]
fn test_report_serializes_for_clients() {
    let schema = Schema::object([("age", Schema::number().min(18.0))]);
    let report = schema.check(&mut json!({"age": 4}));
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({"age": [{"message": "MIN", "meta": {"min": 18.0}}]})
    );
}

// =============================================================================
// Registry + schema
// =============================================================================

#[test]
fn test_check_registry_section() {
    let mut registry = Registry::from_value(json!({"server": {"port": "8080", "host": "localhost"}})).unwrap();
    let schema = Schema::object([
        ("port", Schema::string().format(Format::UnsignedInteger)),
        ("host", Schema::string().min_length(1)),
    ]);

    let section = registry.get("server").unwrap();
    let checked = schema.validate(section).unwrap();
    registry.set("server", checked).unwrap();

    assert_eq!(registry.get("server.port"), Some(json!(8080)));
}
