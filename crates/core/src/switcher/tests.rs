use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LampState {
    Off,
    On,
    Broken,
}

impl ClosedSet for LampState {
    fn members() -> &'static [Self] {
        &[LampState::Off, LampState::On, LampState::Broken]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LampEventKind {
    TurnedOn,
    TurnedOff,
    Burned,
}

impl ClosedSet for LampEventKind {
    fn members() -> &'static [Self] {
        &[
            LampEventKind::TurnedOn,
            LampEventKind::TurnedOff,
            LampEventKind::Burned,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TurnedOn {
    brightness: u8,
}

#[derive(Debug, Clone, PartialEq)]
struct TurnedOff;

#[derive(Debug, Clone, PartialEq)]
struct Burned {
    switch_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum LampEvent {
    TurnedOn(TurnedOn),
    TurnedOff(TurnedOff),
    Burned(Burned),
}

impl SwitchEvent for LampEvent {
    type Kind = LampEventKind;

    fn kind(&self) -> LampEventKind {
        match self {
            LampEvent::TurnedOn(_) => LampEventKind::TurnedOn,
            LampEvent::TurnedOff(_) => LampEventKind::TurnedOff,
            LampEvent::Burned(_) => LampEventKind::Burned,
        }
    }
}

macro_rules! lamp_variant {
    ($payload:ident) => {
        impl EventVariant<LampEvent> for $payload {
            const KIND: LampEventKind = LampEventKind::$payload;

            fn extract(event: &LampEvent) -> Option<&Self> {
                match event {
                    LampEvent::$payload(p) => Some(p),
                    _ => None,
                }
            }
        }
    };
}

lamp_variant!(TurnedOn);
lamp_variant!(TurnedOff);
lamp_variant!(Burned);

#[derive(Debug, Clone, PartialEq)]
struct Lamp {
    state: LampState,
    brightness: u8,
    switches: u32,
}

impl Lamp {
    fn new() -> Self {
        Self {
            state: LampState::Off,
            brightness: 0,
            switches: 0,
        }
    }
}

type LampSwitcher = StateSwitcher<Lamp, LampState, LampEvent>;

fn lamp_table() -> LampSwitcher {
    StateSwitcher::builder()
        .state_accessor(|l: &Lamp| l.state)
        .transition::<TurnedOn>(LampState::Off)
        .precondition(
            |_, e| e.brightness > 0,
            |_, e| format!("brightness {} is too low", e.brightness),
        )
        .precondition(
            |_, e| e.brightness <= 100,
            |_, e| format!("brightness {} is too high", e.brightness),
        )
        .apply(|l, e| {
            l.state = LampState::On;
            l.brightness = e.brightness;
            l.switches += 1;
        })
        .transition::<TurnedOff>(LampState::On)
        .apply(|l, _| {
            l.state = LampState::Off;
            l.brightness = 0;
        })
        .transition::<Burned>(LampState::On)
        .precondition(
            |l, e| e.switch_count == l.switches,
            |l, e| format!("switch count {} != {}", e.switch_count, l.switches),
        )
        .apply(|l, _| l.state = LampState::Broken)
        .ignore::<TurnedOn>(LampState::On)
        .ignore::<TurnedOff>(LampState::Off)
        .ignore_in::<TurnedOn>(&[LampState::Broken])
        .ignore_in::<TurnedOff>(&[LampState::Broken])
        .ignore_when::<Burned, _>(LampState::Broken, |l, e| e.switch_count == l.switches)
        .build()
        .unwrap()
}

fn on(brightness: u8) -> LampEvent {
    LampEvent::TurnedOn(TurnedOn { brightness })
}

#[test]
fn applied_transition_mutates_and_reports_true() {
    let table = lamp_table();
    let mut lamp = Lamp::new();

    assert_eq!(table.switch(&mut lamp, &on(40)), Ok(true));
    assert_eq!(lamp.state, LampState::On);
    assert_eq!(lamp.brightness, 40);
    assert_eq!(table.current_state(&lamp), LampState::On);
}

#[test]
fn ignored_event_leaves_aggregate_untouched() {
    let table = lamp_table();
    let mut lamp = Lamp::new();
    table.switch(&mut lamp, &on(40)).unwrap();
    let before = lamp.clone();

    assert_eq!(table.switch(&mut lamp, &on(90)), Ok(false));
    assert_eq!(lamp, before);
}

#[test]
fn unregistered_pair_is_unexpected() {
    let table = lamp_table();
    let mut lamp = Lamp::new();

    let err = table
        .switch(&mut lamp, &LampEvent::Burned(Burned { switch_count: 0 }))
        .unwrap_err();

    assert_eq!(err.state, "Off");
    assert_eq!(err.event, "Burned");
    assert_eq!(err.reason, "no transition registered");
    assert_eq!(lamp, Lamp::new());
}

#[test]
fn failing_preconditions_are_all_reported() {
    let table = lamp_table();
    let mut lamp = Lamp::new();

    let err = table.switch(&mut lamp, &on(0)).unwrap_err();
    assert_eq!(err.reason, "brightness 0 is too low");

    let err = table.switch(&mut lamp, &on(200)).unwrap_err();
    assert_eq!(err.reason, "brightness 200 is too high");
    assert!(err.to_string().contains("in state Off"));
    assert_eq!(lamp, Lamp::new());
}

#[test]
fn precondition_sees_aggregate_state() {
    let table = lamp_table();
    let mut lamp = Lamp::new();
    table.switch(&mut lamp, &on(10)).unwrap();

    let err = table
        .switch(&mut lamp, &LampEvent::Burned(Burned { switch_count: 7 }))
        .unwrap_err();
    assert_eq!(err.reason, "switch count 7 != 1");

    assert_eq!(
        table.switch(&mut lamp, &LampEvent::Burned(Burned { switch_count: 1 })),
        Ok(true)
    );
    assert_eq!(lamp.state, LampState::Broken);
}

#[test]
fn guarded_ignore_only_ignores_matching_replays() {
    let table = lamp_table();
    let mut lamp = Lamp::new();
    table.switch(&mut lamp, &on(10)).unwrap();
    table
        .switch(&mut lamp, &LampEvent::Burned(Burned { switch_count: 1 }))
        .unwrap();

    assert_eq!(
        table.switch(&mut lamp, &LampEvent::Burned(Burned { switch_count: 1 })),
        Ok(false)
    );

    let err = table
        .switch(&mut lamp, &LampEvent::Burned(Burned { switch_count: 2 }))
        .unwrap_err();
    assert_eq!(err.reason, "ignore guard rejected the event");
}

#[test]
fn rule_lookup_reports_kinds() {
    let table = lamp_table();

    assert_eq!(
        table.rule(LampState::Off, LampEventKind::TurnedOn),
        Some(RuleKind::Transition)
    );
    assert_eq!(
        table.rule(LampState::On, LampEventKind::TurnedOn),
        Some(RuleKind::Ignore)
    );
    assert_eq!(
        table.rule(LampState::Broken, LampEventKind::Burned),
        Some(RuleKind::GuardedIgnore)
    );
    assert_eq!(table.rule(LampState::Off, LampEventKind::Burned), None);
    assert_eq!(table.rule_count(), 8);
}

#[test]
fn missing_accessor_fails_build() {
    let err = LampSwitcher::builder()
        .ignore::<TurnedOff>(LampState::Off)
        .build()
        .unwrap_err();

    assert_eq!(err, SwitcherBuildError::MissingStateAccessor);
}

#[test]
fn duplicate_transition_fails_build() {
    let err = LampSwitcher::builder()
        .state_accessor(|l| l.state)
        .transition::<TurnedOff>(LampState::On)
        .apply(|l, _| l.state = LampState::Off)
        .transition::<TurnedOff>(LampState::On)
        .apply(|l, _| l.state = LampState::Broken)
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        SwitcherBuildError::DuplicateRule {
            state: "On".to_string(),
            event: "TurnedOff".to_string(),
            existing: RuleKind::Transition,
            new: RuleKind::Transition,
        }
    );
}

#[test]
fn transition_and_ignore_for_same_pair_fails_build() {
    let err = LampSwitcher::builder()
        .state_accessor(|l| l.state)
        .transition::<TurnedOff>(LampState::On)
        .apply(|l, _| l.state = LampState::Off)
        .ignore::<TurnedOff>(LampState::On)
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        SwitcherBuildError::DuplicateRule {
            existing: RuleKind::Transition,
            new: RuleKind::Ignore,
            ..
        }
    ));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Unlisted {
    A,
    B,
}

impl ClosedSet for Unlisted {
    fn members() -> &'static [Self] {
        &[Unlisted::A, Unlisted::A]
    }
}

#[test]
fn duplicate_members_are_not_a_closed_enumeration() {
    let err = StateSwitcher::<Lamp, Unlisted, LampEvent>::builder()
        .state_accessor(|_| Unlisted::A)
        .ignore::<TurnedOn>(Unlisted::B)
        .build()
        .unwrap_err();

    assert!(matches!(err, SwitcherBuildError::NotClosedEnumeration { .. }));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Partial {
    Listed,
    Hidden,
}

impl ClosedSet for Partial {
    fn members() -> &'static [Self] {
        &[Partial::Listed]
    }
}

#[test]
fn undeclared_state_fails_build() {
    let err = StateSwitcher::<Lamp, Partial, LampEvent>::builder()
        .state_accessor(|_| Partial::Listed)
        .ignore::<TurnedOn>(Partial::Hidden)
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        SwitcherBuildError::UndeclaredState {
            state: "Hidden".to_string()
        }
    );
}
