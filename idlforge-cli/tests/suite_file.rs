mod common;

use common::{deposit_state, vault_session};
use idlforge_cli::suite::{SuiteError, TestCase, TestSuite};
use idlforge_core::form::CallInputState;
use idlforge_core::validation::is_submittable;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;

#[test]
fn saved_suite_loads_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault-suite.json");
    let session = vault_session();
    let owner = Pubkey::new_unique();

    let mut suite = TestSuite::new("vault smoke", session.program_id().to_string());
    suite.add_case(TestCase::from_state("deposit 5", &session, &deposit_state(&session, &owner, 5)));
    suite.add_case(TestCase::new("init", "initialize"));
    suite.save(&path).unwrap();

    let loaded = TestSuite::load(&path).unwrap();
    assert_eq!(loaded, suite);
    assert_eq!(loaded.test_cases[0].accounts["owner"], owner.to_string());
}

#[test]
fn replayed_case_is_still_submittable() {
    let session = vault_session();
    let owner = Pubkey::new_unique();
    let case = TestCase::from_state("deposit", &session, &deposit_state(&session, &owner, 42));
    let call = session.call("deposit").unwrap();

    let state = case.to_state(call);
    assert!(is_submittable(session.schema().types(), call, &state));
    assert_eq!(state.accounts["owner"].address, owner.to_string());
}

#[test]
fn arguments_are_stored_in_canonical_form() {
    let session = vault_session();
    let call = session.call("configure").unwrap();
    let admin = Pubkey::new_unique();
    let mut state = CallInputState::empty(call);
    state.args.insert(
        "params".into(),
        json!({ "fee_bps": "25", "mode": "Withdraw", "admins": [admin.to_string()], "tag": "0x01020304" }),
    );

    let case = TestCase::from_state("configure", &session, &state);
    let params = &case.args["params"];
    assert_eq!(params["fee_bps"], json!("25"));
    assert_eq!(params["mode"], json!("Withdraw"));
    assert_eq!(params["tag"], json!("0x01020304"));
    assert_eq!(params["admins"][0], json!(admin.to_string()));
}

#[test]
fn uncoercible_input_is_kept_as_entered() {
    let session = vault_session();
    let mut state = CallInputState::empty(session.call("deposit").unwrap());
    state.args.insert("amount".into(), json!("lots"));

    let case = TestCase::from_state("bad", &session, &state);
    assert_eq!(case.args["amount"], json!("lots"));
}

#[test]
fn cases_are_removed_by_name_or_id_prefix() {
    let mut suite = TestSuite::new("s", "p");
    let first = suite.add_case(TestCase::new("one", "initialize"));
    suite.add_case(TestCase::new("two", "deposit"));

    let removed = suite.remove_case(&first.to_string()[..8]).unwrap();
    assert_eq!(removed.name, "one");
    assert_eq!(suite.remove_case("two").unwrap().instruction, "deposit");
    assert!(matches!(suite.remove_case("two"), Err(SuiteError::CaseNotFound(_))));
    assert!(matches!(suite.remove_case(""), Err(SuiteError::CaseNotFound(_))));
}

#[test]
fn garbage_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(TestSuite::load(&path), Err(SuiteError::Format { .. })));
    assert!(matches!(
        TestSuite::load(&dir.path().join("missing.json")),
        Err(SuiteError::Io { .. })
    ));
}
