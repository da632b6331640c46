mod support;

use nalgebra::Vector3;
use probeplan::{
    MoveCommand, PoseTarget, ProbeError, ProbeKind, Session, Settings, record::InsertionRecord,
};
use support::{approx_point, approx_vec, ccf};

fn session() -> Session {
    Session::new(ccf(), Settings::default())
}

#[test]
fn record_survives_json() {
    let mut session = session();
    session.set_active_transform("Qiu2018").unwrap();
    let a = session.add_probe(ProbeKind::Neuropixels24);
    session
        .apply(
            a,
            MoveCommand::SetAbsolute(
                PoseTarget::position(Vector3::new(-1.5, 2.0, 3.25)).with_angles(Vector3::new(45.0, -30.0, 90.0)),
            ),
        )
        .unwrap();

    let record = session.record(a).unwrap();
    assert_eq!(record.probe, 24);
    assert_eq!(record.transform, "Qiu2018");
    assert_eq!(record.apmldv(), Vector3::new(-1.5, 2.0, 3.25));
    assert_eq!(record.angles(), Vector3::new(45.0, -30.0, 90.0));

    let json = record.to_json().unwrap();
    let parsed = InsertionRecord::from_json(&json).unwrap();
    assert_eq!(parsed, record);

    let b = session.restore(&parsed).unwrap();
    let original = session.report(a).unwrap();
    let restored = session.report(b).unwrap();
    assert_eq!(session.probe(b).unwrap().insertion().kind(), ProbeKind::Neuropixels24);
    assert!(approx_vec(&restored.apmldv, &original.apmldv, 1e-12));
    assert!(approx_point(&restored.pose.tip, &original.pose.tip, 1e-12));
    assert!(approx_vec(&restored.pose.up, &original.pose.up, 1e-12));
}

#[test]
fn record_json_uses_plain_field_names() {
    let json = r#"{"ap":1.0,"ml":-2.0,"dv":0.5,"phi":0.0,"theta":-15.0,"spin":0.0,"probe":0,"transform":"CCF"}"#;
    let record = InsertionRecord::from_json(json).unwrap();
    assert_eq!(record.apmldv(), Vector3::new(1.0, -2.0, 0.5));
    assert_eq!(record.theta, -15.0);

    let mut session = session();
    let handle = session.restore(&record).unwrap();
    assert_eq!(session.probe(handle).unwrap().insertion().kind(), ProbeKind::Neuropixels1);
}

#[test]
fn restore_rejects_unknown_names() {
    let mut session = session();
    let mut record = InsertionRecord {
        ap: 0.0,
        ml: 0.0,
        dv: 0.0,
        phi: 0.0,
        theta: 0.0,
        spin: 0.0,
        probe: 0,
        transform: "Paxinos".into(),
    };
    assert_eq!(
        session.restore(&record),
        Err(ProbeError::UnknownTransform("Paxinos".into()))
    );

    record.transform = "CCF".into();
    record.probe = 3;
    assert_eq!(session.restore(&record), Err(ProbeError::UnknownProbeKind(3)));
    assert!(session.is_empty());
}

#[test]
fn malformed_record_is_a_serialization_error() {
    let err = InsertionRecord::from_json("{\"ap\": \"north\"}").unwrap_err();
    assert!(matches!(err, ProbeError::Serialization(_)));
}
