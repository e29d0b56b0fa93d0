use avatar_database::text_enum;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TicketState {
    #[default]
    Open,
    InProgress,
    Closed,
}

text_enum!(TicketState {
    Open => "open",
    InProgress => "in_progress",
    Closed => "closed",
});

#[test]
fn renders_the_storage_form() {
    assert_eq!(TicketState::Open.as_str(), "open");
    assert_eq!(TicketState::InProgress.to_string(), "in_progress");
}

#[test]
fn round_trips_every_variant() {
    for state in [TicketState::Open, TicketState::InProgress, TicketState::Closed] {
        let parsed: TicketState = state.as_str().parse().unwrap();
        assert_eq!(parsed, state);
    }
}

#[test]
fn rejects_unknown_values() {
    let result = "reopened".parse::<TicketState>();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("unknown TicketState value"));
}

#[test]
fn parsing_is_case_sensitive() {
    assert!("Open".parse::<TicketState>().is_err());
}
