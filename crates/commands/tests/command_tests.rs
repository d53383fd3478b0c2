use powgate_commands::{run, Reply, VisitorReply};
use powgate_common::{EngineConfig, PowgateError};
use powgate_engine::Engine;
use std::thread;
use std::time::Duration;

fn visitor(engine: &Engine, captcha: &str) -> VisitorReply {
    match run(engine, "ADD_VISITOR", &[captcha]).unwrap() {
        Reply::Visitor(reply) => reply,
        other => panic!("expected visitor reply, got {:?}", other),
    }
}

#[test]
fn test_one_second_window_through_commands() {
    let engine = Engine::default();
    let config = r#"{"levels":[{"visitor_threshold":2,"difficulty_factor":10},{"visitor_threshold":4,"difficulty_factor":40}],"duration":1}"#;
    run(&engine, "ADD_CAPTCHA", &["fast", config]).unwrap();

    assert_eq!(visitor(&engine, "fast").difficulty_factor, 10);
    assert_eq!(visitor(&engine, "fast").difficulty_factor, 10);
    visitor(&engine, "fast");
    let fourth = visitor(&engine, "fast");
    assert_eq!(fourth.count, 4);
    assert_eq!(fourth.difficulty_factor, 40);

    thread::sleep(Duration::from_millis(1_100));

    assert_eq!(run(&engine, "GET_COUNT", &["fast"]).unwrap(), Reply::Integer(0));
    let fresh = visitor(&engine, "fast");
    assert_eq!(fresh.count, 1);
    assert_eq!(fresh.difficulty_factor, 10);
}

#[test]
fn test_challenge_expires_through_commands() {
    let engine = Engine::default();
    let payload = r#"{"difficulty":8,"duration":1,"challenge":"soon-gone"}"#;
    run(&engine, "ADD_CHALLENGE", &["c", payload]).unwrap();

    thread::sleep(Duration::from_millis(1_100));

    assert!(matches!(
        run(&engine, "GET_CHALLENGE", &["c", "soon-gone"]),
        Err(PowgateError::ChallengeNotFound)
    ));
    assert!(matches!(
        run(&engine, "DELETE_CHALLENGE", &["c", "soon-gone"]),
        Err(PowgateError::ChallengeNotFound)
    ));
    // The key is free again once the old record has lapsed.
    assert_eq!(run(&engine, "ADD_CHALLENGE", &["c", payload]).unwrap(), Reply::Ok);
}

#[test]
fn test_single_use_challenges() {
    let engine = Engine::new(EngineConfig {
        consume_challenge_on_read: true,
        ..EngineConfig::default()
    });
    let payload = r#"{"difficulty":500,"duration":5,"challenge":"once"}"#;
    run(&engine, "ADD_CHALLENGE", &["c", payload]).unwrap();

    assert!(run(&engine, "GET_CHALLENGE", &["c", "once"]).is_ok());
    assert!(matches!(
        run(&engine, "GET_CHALLENGE", &["c", "once"]),
        Err(PowgateError::ChallengeNotFound)
    ));
}

#[test]
fn test_fixed_floor_difficulty() {
    let engine = Engine::new(EngineConfig {
        fixed_floor_difficulty: Some(1),
        ..EngineConfig::default()
    });
    let config = r#"{"levels":[{"visitor_threshold":3,"difficulty_factor":30}],"duration":60}"#;
    run(&engine, "ADD_CAPTCHA", &["floor", config]).unwrap();

    assert_eq!(visitor(&engine, "floor").difficulty_factor, 1);
    assert_eq!(visitor(&engine, "floor").difficulty_factor, 1);
    assert_eq!(visitor(&engine, "floor").difficulty_factor, 30);
}
