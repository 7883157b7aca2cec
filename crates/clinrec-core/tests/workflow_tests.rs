//! End-to-end assignment and clinical-record workflow tests.

use clinrec_core::{open_core, open_core_in_memory, ClinicalCore, CoreError, RequestStatus, User};

fn register_pair(core: &ClinicalCore) -> (User, User) {
    let physician = core
        .register_user("11111111A".into(), "Juan".into(), "Pérez".into())
        .unwrap();
    core.set_medical_role(&physician.id, true).unwrap();

    let patient = core
        .register_user("22222222B".into(), "Ana".into(), "García".into())
        .unwrap();

    (physician, patient)
}

#[test]
fn test_full_assignment_lifecycle() {
    let core = open_core_in_memory().unwrap();
    let (physician, patient) = register_pair(&core);

    // Physician opens a request
    let request = core
        .create_assignment_request(&physician.id, &patient.nif)
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    // Both sides see it
    assert_eq!(
        core.pending_requests_for_physician(&physician.id)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        core.requests_received_by_patient(&patient.id).unwrap().len(),
        1
    );

    // Patient was notified
    assert_eq!(core.unread_notification_count(&patient.id).unwrap(), 1);

    // Patient accepts
    let decided = core
        .decide_assignment_request(&patient.id, &request.id, "accepted")
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Accepted);

    // An active link now exists and the pending views are clear
    assert_eq!(
        core.active_links_for_physician(&physician.id).unwrap().len(),
        1
    );
    assert!(core
        .pending_requests_for_physician(&physician.id)
        .unwrap()
        .is_empty());

    // Physician was notified of the decision
    assert_eq!(core.unread_notification_count(&physician.id).unwrap(), 1);
}

#[test]
fn test_single_pending_request_per_pair() {
    let core = open_core_in_memory().unwrap();
    let (physician, patient) = register_pair(&core);

    let first = core
        .create_assignment_request(&physician.id, &patient.nif)
        .unwrap();

    let err = core
        .create_assignment_request(&physician.id, &patient.nif)
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    // Once decided, the pair is free for a new request
    core.decide_assignment_request(&patient.id, &first.id, "rejected")
        .unwrap();
    core.create_assignment_request(&physician.id, &patient.nif)
        .unwrap();
}

#[test]
fn test_role_revocation_cascades() {
    let core = open_core_in_memory().unwrap();
    let (physician, patient) = register_pair(&core);

    let request = core
        .create_assignment_request(&physician.id, &patient.nif)
        .unwrap();
    core.decide_assignment_request(&patient.id, &request.id, "accepted")
        .unwrap();

    core.set_medical_role(&physician.id, false).unwrap();

    assert!(core
        .active_links_for_physician(&physician.id)
        .unwrap()
        .is_empty());

    // A former physician can no longer open requests
    let err = core
        .create_assignment_request(&physician.id, &patient.nif)
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
}

#[test]
fn test_antecedent_editing_over_core() {
    let core = open_core_in_memory().unwrap();
    let (_physician, patient) = register_pair(&core);

    core.replace_family_history(&patient.id, "diabetes\n\nhypertension\n\nasthma")
        .unwrap();

    core.delete_antecedent(&patient.id, 0).unwrap();
    let entries = core.list_antecedents(&patient.id).unwrap();
    assert_eq!(entries, vec!["hypertension", "asthma"]);

    core.edit_antecedent(&patient.id, 1, "childhood asthma")
        .unwrap();
    let entries = core.list_antecedents(&patient.id).unwrap();
    assert!(entries[1].ends_with("] childhood asthma"));

    // History survives full deletion as an empty blob
    core.delete_antecedent(&patient.id, 0).unwrap();
    core.delete_antecedent(&patient.id, 0).unwrap();
    assert!(core.list_antecedents(&patient.id).unwrap().is_empty());

    let history = core.get_clinical_history(&patient.id).unwrap();
    assert!(history.family_history.is_none());
}

#[test]
fn test_ingestion_and_export() {
    let core = open_core_in_memory().unwrap();
    let (_physician, patient) = register_pair(&core);

    core.record_allergies(&patient.id, "penicillin\nlactose")
        .unwrap();
    core.record_blood_panel(
        &patient.id,
        r#"[{"label": "glucose", "value": "92,5", "unit": "mg/dL"}]"#,
    )
    .unwrap();

    assert_eq!(core.list_allergies(&patient.id).unwrap().len(), 2);
    assert_eq!(core.list_clinical_data(&patient.id).unwrap().len(), 3);

    let json = core.export_user_json(&patient.id).unwrap();
    assert!(json.contains("penicillin"));
    assert!(json.contains("glucose"));

    let csv = core.export_user_csv(&patient.id).unwrap();
    assert!(csv.lines().count() >= 4); // header + 3 entries

    // Both exports were recorded in the access log
    assert_eq!(core.verify_access_log().unwrap(), 2);
}

#[test]
fn test_notification_mutations_require_ownership() {
    let core = open_core_in_memory().unwrap();
    let (physician, patient) = register_pair(&core);

    // The request notifies the patient
    core.create_assignment_request(&physician.id, &patient.nif)
        .unwrap();
    let notes = core.notifications_for_user(&patient.id).unwrap();
    let note = &notes[0];

    // Another user cannot flip or delete someone else's notification
    let err = core
        .mark_notification_read(&physician.id, &note.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
    let err = core
        .delete_notification(&physician.id, &note.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
    assert_eq!(core.unread_notification_count(&patient.id).unwrap(), 1);

    // The owner can
    core.mark_notification_read(&patient.id, &note.id).unwrap();
    assert_eq!(core.unread_notification_count(&patient.id).unwrap(), 0);

    core.delete_notification(&patient.id, &note.id).unwrap();
    assert!(core.notifications_for_user(&patient.id).unwrap().is_empty());

    // A deleted notification is gone, not unauthorized
    let err = core
        .mark_notification_read(&patient.id, &note.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[test]
fn test_mark_all_notifications_read() {
    let core = open_core_in_memory().unwrap();
    let (physician, patient) = register_pair(&core);

    let request = core
        .create_assignment_request(&physician.id, &patient.nif)
        .unwrap();
    core.decide_assignment_request(&patient.id, &request.id, "rejected")
        .unwrap();
    core.create_assignment_request(&physician.id, &patient.nif)
        .unwrap();

    assert_eq!(core.unread_notification_count(&patient.id).unwrap(), 2);
    assert_eq!(core.mark_all_notifications_read(&patient.id).unwrap(), 2);
    assert_eq!(core.unread_notification_count(&patient.id).unwrap(), 0);

    // Only the caller's notifications are touched
    assert_eq!(core.unread_notification_count(&physician.id).unwrap(), 1);
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinrec.db");
    let path = path.to_str().unwrap();

    let patient_id = {
        let core = open_core(path).unwrap();
        let (_physician, patient) = register_pair(&core);
        core.replace_family_history(&patient.id, "diabetes").unwrap();
        patient.id
    };

    let core = open_core(path).unwrap();
    assert_eq!(
        core.list_antecedents(&patient_id).unwrap(),
        vec!["diabetes"]
    );
}

#[test]
fn test_bad_blood_panel_persists_nothing() {
    let core = open_core_in_memory().unwrap();
    let (_physician, patient) = register_pair(&core);

    let err = core
        .record_blood_panel(
            &patient.id,
            r#"[{"label": "glucose", "value": 92}, {"label": "broken"}]"#,
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));

    assert!(core.list_clinical_data(&patient.id).unwrap().is_empty());
}
