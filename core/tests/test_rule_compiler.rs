use gateway_selector_core::error::CompileErrorKind;
use gateway_selector_core::{compile_ruleset, CompileOptions, RulesetWire, SelectorConfig};

fn compile_err(json: &str) -> gateway_selector_core::CompileError {
    let wire: RulesetWire = serde_json::from_str(json).unwrap();
    compile_ruleset(&wire, &SelectorConfig::default(), &CompileOptions::default()).unwrap_err()
}

#[test]
fn pix_key_type_alias_accepts_each_closed_set_member() {
    for value in ["QRCODE_STATIC", "QRCODE_DYNAMIC", "EMAIL", "PHONE", "CPF", "CNPJ", "EVP"] {
        let json = format!(
            r#"{{"id":1,"version":1,"gateways":["E2E"],
                "rules":[{{"id":1,"priority":1,"enabled":true,"condition_type":"PIX_KEY_TYPE","condition_value":"{value}",
                    "action":{{"route":"FIXED","gateway":"E2E"}}}}]}}"#
        );
        let wire: RulesetWire = serde_json::from_str(&json).unwrap();
        assert!(compile_ruleset(&wire, &SelectorConfig::default(), &CompileOptions::default()).is_ok(), "{value} should be accepted");
    }
}

#[test]
fn missing_condition_value_on_an_alias_rule_fails() {
    let err = compile_err(
        r#"{"id":1,"version":1,"gateways":["E2E"],
            "rules":[{"id":1,"priority":1,"enabled":true,"condition_type":"USER",
                "action":{"route":"FIXED","gateway":"E2E"}}]}"#,
    );
    assert!(err.entries().iter().any(|e| e.kind == CompileErrorKind::MissingCondition));
}

#[test]
fn missing_condition_json_on_an_advanced_rule_fails() {
    let err = compile_err(
        r#"{"id":1,"version":1,"gateways":["E2E"],
            "rules":[{"id":1,"priority":1,"enabled":true,"condition_type":"ADVANCED",
                "action":{"route":"FIXED","gateway":"E2E"}}]}"#,
    );
    assert!(err.entries().iter().any(|e| e.kind == CompileErrorKind::MissingCondition));
}

#[test]
fn weighted_action_rejects_an_unknown_gateway_while_still_reporting_other_errors() {
    let err = compile_err(
        r#"{"id":1,"version":1,"gateways":["CELCOIN"],
            "rules":[{"id":1,"priority":1,"enabled":true,"condition_type":"ADVANCED",
                "condition_json": {"type":"VALUE_IN","field":"x","values":[1]},
                "action":{"route":"WEIGHTED","weights":{"CELCOIN":50,"GHOST":50}}}]}"#,
    );
    assert!(err.entries().iter().any(|e| e.kind == CompileErrorKind::UnknownGateway));
}

#[test]
fn deny_with_empty_reason_code_fails() {
    let err = compile_err(
        r#"{"id":1,"version":1,"gateways":["E2E"],
            "rules":[{"id":1,"priority":1,"enabled":true,"condition_type":"USER","condition_value":1,
                "action":{"route":"DENY","reason_code":"  "}}]}"#,
    );
    assert!(err.entries().iter().any(|e| e.kind == CompileErrorKind::BadType));
}

#[test]
fn errors_across_multiple_rules_are_all_reported_in_one_pass() {
    let err = compile_err(
        r#"{"id":1,"version":1,"gateways":["E2E"],
            "rules":[
                {"id":1,"priority":1,"enabled":true,"condition_type":"PIX_KEY_TYPE","condition_value":"NOT_REAL",
                 "action":{"route":"FIXED","gateway":"E2E"}},
                {"id":2,"priority":2,"enabled":true,"condition_type":"USER","condition_value":1,
                 "action":{"route":"FIXED","gateway":"GHOST"}}
            ]}"#,
    );
    assert_eq!(err.entries().len(), 2);
}
