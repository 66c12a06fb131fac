//! Bulk import: partial success, structural rejection, persistence conflicts.

mod common;

use adm_core::{
    error::{AdmError, StructuralImportError},
    import::IssueKind,
    roster::LifecycleState,
};
use common::{add_adm, engine};

#[test]
fn row_missing_phone_is_reported_and_siblings_are_created() {
    let engine = engine();
    let raw = "name,phone,location\n\
               Ravi Kumar,9000000001,Mumbai\n\
               Neha Shah,9000000002,Pune\n\
               Amit Rao,,Delhi\n\
               Priya Nair,9000000004,Kochi\n\
               Sunil Das,9000000005,Kolkata";

    let report = engine.bulk_import_agents(raw).unwrap();

    assert_eq!(report.created, 4);
    assert_eq!(report.total_submitted, 5);
    assert_eq!(report.errors_count, 1);
    let issue = &report.errors[0];
    assert_eq!(issue.row_index, 3);
    assert_eq!(issue.kind, IssueKind::MissingFields);
    assert!(issue.message.contains("phone"), "message should name the field: {}", issue.message);
    assert_eq!(engine.list_unassigned_agents().unwrap().len(), 4);
}

#[test]
fn defaults_apply_to_blank_optionals() {
    let engine = engine();
    let raw = "name,phone,location,language,lifecycle_state\n\
               Ravi Kumar,9000000001,Mumbai,,\n\
               Neha Shah,9000000002,Pune,Marathi,At Risk";

    let report = engine.bulk_import_agents(raw).unwrap();
    assert_eq!(report.created, 2);

    let agents = engine.list_agents().unwrap();
    assert_eq!(agents[0].language, "Hindi");
    assert_eq!(agents[0].lifecycle_state, LifecycleState::Dormant);
    assert_eq!(agents[1].language, "Marathi");
    assert_eq!(agents[1].lifecycle_state, LifecycleState::AtRisk);
}

#[test]
fn missing_required_column_rejects_the_whole_batch() {
    let engine = engine();
    let raw = "name,location\nRavi Kumar,Mumbai";

    let err = engine.bulk_import_agents(raw).unwrap_err();
    match err {
        AdmError::StructuralImport(StructuralImportError::MissingColumns { missing }) => {
            assert_eq!(missing, vec!["phone".to_string()]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    assert!(engine.list_agents().unwrap().is_empty(), "nothing may persist");
}

#[test]
fn duplicate_phone_fails_only_its_row() {
    let engine = engine();
    let raw = "name,phone,location\n\
               Ravi Kumar,9000000001,Mumbai\n\
               Ravi Again,9000000001,Thane\n\
               Neha Shah,9000000002,Pune";

    let report = engine.bulk_import_agents(raw).unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.errors_count, 1);
    assert_eq!(report.errors[0].row_index, 2);
    assert_eq!(report.errors[0].kind, IssueKind::DuplicatePhone);
    assert_eq!(report.errors[0].phone.as_deref(), Some("9000000001"));
}

#[test]
fn parse_and_persistence_errors_merge_in_row_order() {
    let engine = engine();
    engine
        .bulk_import_agents("name,phone,location\nExisting,9000000004,Delhi")
        .unwrap();

    let raw = "name,phone,location,lifecycle_state\n\
               A,9000000001,Mumbai,dormant\n\
               B,,Pune,dormant\n\
               C,9000000003,Delhi,sleeping\n\
               D,9000000004,Kochi,active";
    let report = engine.bulk_import_agents(raw).unwrap();

    assert_eq!(report.created, 1);
    let kinds: Vec<(usize, IssueKind)> = report.errors.iter().map(|e| (e.row_index, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (2, IssueKind::MissingFields),
            (3, IssueKind::InvalidField),
            (4, IssueKind::DuplicatePhone),
        ]
    );
    assert_eq!(report.errors_count, 3);
}

#[test]
fn unknown_assigned_adm_is_a_row_issue() {
    let engine = engine();
    let adm = add_adm(&engine, "West - Mumbai", "Hindi", 10);
    let raw = format!(
        "name,phone,location,assigned_adm_id\n\
         A,9000000001,Mumbai,{}\n\
         B,9000000002,Pune,999",
        adm.id
    );

    let report = engine.bulk_import_agents(&raw).unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.errors[0].row_index, 2);
    assert_eq!(report.errors[0].kind, IssueKind::UnknownAdm);
    assert_eq!(engine.list_agents_for_adm(adm.id).unwrap().len(), 1);
}

#[test]
fn import_onto_a_full_adm_records_a_capacity_warning() {
    let engine = engine();
    let small = add_adm(&engine, "West - Mumbai", "Hindi", 2);
    let roomy = add_adm(&engine, "North - Delhi", "Hindi", 10);
    let raw = format!(
        "name,phone,location,assigned_adm_id\n\
         A,9000000001,Mumbai,{small}\n\
         B,9000000002,Mumbai,{small}\n\
         C,9000000003,Mumbai,{small}\n\
         D,9000000004,Delhi,{roomy}",
        small = small.id,
        roomy = roomy.id,
    );

    let report = engine.bulk_import_agents(&raw).unwrap();

    assert_eq!(report.created, 4, "over-capacity rows are still placed");
    assert_eq!(report.capacity_warnings.len(), 1);
    let warning = &report.capacity_warnings[0];
    assert_eq!(warning.adm_id, small.id);
    assert_eq!(warning.assigned_agents, 3);
    assert_eq!(warning.max_capacity, 2);
    assert_eq!(warning.utilization_pct, 150);
    assert_eq!(engine.list_agents_for_adm(small.id).unwrap().len(), 3);
}

#[test]
fn unassigned_import_carries_no_capacity_warnings() {
    let engine = engine();
    add_adm(&engine, "West - Mumbai", "Hindi", 1);
    let report = engine
        .bulk_import_agents("name,phone,location\nA,9000000001,Mumbai\nB,9000000002,Pune")
        .unwrap();
    assert_eq!(report.created, 2);
    assert!(report.capacity_warnings.is_empty());
}

#[test]
fn dormancy_reason_is_carried_through() {
    let engine = engine();
    let raw = "name,phone,location,lifecycle_state,dormancy_reason\n\
               A,9000000001,Mumbai,dormant,commission_concerns: Delayed Payment\n\
               B,9000000002,Pune,active,";

    let report = engine.bulk_import_agents(raw).unwrap();
    assert_eq!(report.created, 2);

    let agents = engine.list_agents().unwrap();
    assert_eq!(
        agents[0].dormancy_reason.as_deref(),
        Some("commission_concerns: Delayed Payment")
    );
    assert_eq!(agents[1].dormancy_reason, None);
}

#[test]
fn tab_header_splits_every_row_on_tabs() {
    let engine = engine();
    let raw = "name\tphone\tregion\tlanguage\tMax Capacity\n\
               Rajiv Malhotra\t9800000101\tWest - Mumbai\tHindi,English,Marathi\t40\n\
               Priyanka Kapoor\t9800000102\tNorth - Delhi\t\tabc";

    let report = engine.bulk_import_adms(raw).unwrap();
    assert_eq!(report.created, 2, "errors: {:?}", report.errors);

    let adms = engine.list_adms().unwrap();
    assert_eq!(adms[0].language, "Hindi,English,Marathi");
    assert_eq!(adms[0].max_capacity, 40);
    assert_eq!(adms[1].language, "Hindi,English");
    assert_eq!(adms[1].max_capacity, 50, "unparsable capacity falls back to the default");
}

#[test]
fn comma_row_under_tab_header_is_structural() {
    let engine = engine();
    let raw = "name\tphone\tlocation\nRavi Kumar,9000000001,Mumbai";

    let err = engine.bulk_import_agents(raw).unwrap_err();
    assert!(matches!(
        err,
        AdmError::StructuralImport(StructuralImportError::MixedDelimiter { row_index: 1 })
    ));
    assert!(engine.list_agents().unwrap().is_empty());
}

#[test]
fn partially_tab_split_row_rejects_the_whole_batch() {
    let engine = engine();
    let raw = "name,phone,location\n\
               Neha Shah,9000000002,Pune\n\
               Ravi Kumar\t9000000001\tMumbai, Andheri";

    let err = engine.bulk_import_agents(raw).unwrap_err();
    assert!(matches!(
        err,
        AdmError::StructuralImport(StructuralImportError::MixedDelimiter { row_index: 2 })
    ));
    assert!(engine.list_agents().unwrap().is_empty(), "nothing is persisted");
}

#[test]
fn every_report_gets_its_own_batch_id() {
    let engine = engine();
    let a = engine.bulk_import_agents("name,phone,location\nA,9000000001,Pune").unwrap();
    let b = engine.bulk_import_agents("name,phone,location\nB,9000000002,Pune").unwrap();
    assert_ne!(a.batch_id, b.batch_id);
    assert_eq!(a.batch_id.len(), 36);
}
