use tether::{Handle, IMPLEMENTATION_IDENTIFIER, InitOptions, QosProfile, RetCode};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn context() -> Handle {
    init_tracing();
    let options = InitOptions {
        install_logging: false,
        ..InitOptions::default()
    };
    tether::init_context(&options).unwrap()
}

#[test]
fn identifier_is_stamped_on_every_handle() {
    let context = context();
    let node = tether::create_node(&context, "n", "").unwrap();
    assert_eq!(tether::get_implementation_identifier(), IMPLEMENTATION_IDENTIFIER);
    assert_eq!(context.implementation_identifier(), IMPLEMENTATION_IDENTIFIER);
    assert_eq!(node.implementation_identifier(), IMPLEMENTATION_IDENTIFIER);
    assert_eq!(node.kind(), "node");
}

#[test]
fn wrong_entity_type_is_an_invalid_argument() {
    let context = context();
    let node = tether::create_node(&context, "n", "").unwrap();
    let guard = tether::create_guard_condition(&context).unwrap();
    let qos = QosProfile::default();

    assert_eq!(tether::publish(&node, b"x"), Err(RetCode::InvalidArgument));
    assert_eq!(
        tether::create_publisher(&guard, "/t", "T", &qos).unwrap_err(),
        RetCode::InvalidArgument
    );
    assert_eq!(
        tether::trigger_guard_condition(&node),
        Err(RetCode::InvalidArgument)
    );
    assert_eq!(
        tether::create_node(&node, "m", "").unwrap_err(),
        RetCode::InvalidArgument
    );
}

#[test]
fn foreign_handles_are_an_incorrect_implementation() {
    let foreign = Handle::foreign("some_other_middleware");
    let _context = context();

    assert_eq!(
        tether::create_node(&foreign, "n", "").unwrap_err(),
        RetCode::IncorrectImplementation
    );
    assert_eq!(
        tether::trigger_guard_condition(&foreign),
        Err(RetCode::IncorrectImplementation)
    );
    assert_eq!(
        tether::take_loaned_message(&foreign).unwrap_err(),
        RetCode::IncorrectImplementation
    );
}

#[test]
fn destroy_keeps_mismatched_handles() {
    let context = context();
    let mut node = Some(tether::create_node(&context, "n", "").unwrap());

    assert_eq!(
        tether::destroy_publisher(&mut node),
        Err(RetCode::InvalidArgument)
    );
    assert!(node.is_some());

    tether::destroy_node(&mut node).unwrap();
    assert!(node.is_none());
    assert_eq!(tether::destroy_node(&mut node), Err(RetCode::InvalidArgument));
}

#[test]
fn invalid_node_name_fails_creation() {
    let context = context();
    assert_eq!(
        tether::create_node(&context, "a/b", "").unwrap_err(),
        RetCode::Error
    );
}

#[test]
fn graph_guard_condition_is_unsupported() {
    let context = context();
    let node = tether::create_node(&context, "n", "").unwrap();
    assert_eq!(
        tether::node_get_graph_guard_condition(&node).unwrap_err(),
        RetCode::Unsupported
    );
}
