use super::*;
use crate::presenter::{write_events, ConsolePresenter, Event};
use coinbot_execution::{
    casino::GameRng,
    mocks::{context, create_casino, instant_settings},
    Casino, Ledger, Memory, PresentError, Presenter,
};
use coinbot_types::{
    api::{MessageHandle, View},
    casino::{Account, ChannelId, GuildId, Symbol},
};
use std::sync::Arc;
use tokio::sync::mpsc;

fn parse(yaml: &str) -> Config {
    serde_yaml::from_str(yaml).unwrap()
}

/// Unique scratch file under the system temp directory.
fn scratch(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("coinbot-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

fn drain(receiver: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_config_defaults() {
    let config = parse("{}").validate().unwrap();
    assert_eq!(config.log_level, Level::INFO);
    assert!(!config.json_logs);
    assert_eq!(config.starting_balance, 1_000);
    assert!(config.auto_provision);
    assert_eq!(config.sweep_interval, Duration::from_secs(30));
    assert_eq!(config.seed, None);
    assert_eq!(config.machine, Machine::standard());

    let settings = config.settings;
    assert_eq!(settings.reveal_frames, 3);
    assert_eq!(settings.frame_delay, Duration::from_secs(1));
    assert_eq!(settings.autoplay_rounds, 10);
    assert_eq!(settings.session_timeout, Duration::from_secs(600));
    assert_eq!(settings.natural_return, Decimal::from_f64(3.5));
    assert_eq!(settings.leaderboard_limit, 50);
    assert!(settings.privileged.is_empty());
}

#[test]
fn test_config_overrides() {
    let config = parse(
        r#"
log_level: debug
json_logs: true
starting_balance: 250
privileged_players: [7]
operators: [8, 9]
frame_delay_ms: 0
natural_return: 2.5
seed: 42
"#,
    )
    .validate()
    .unwrap();
    assert_eq!(config.log_level, Level::DEBUG);
    assert!(config.json_logs);
    assert_eq!(config.starting_balance, 250);
    assert_eq!(config.seed, Some(42));
    assert!(config.settings.privileged.contains(&PlayerId(7)));
    assert_eq!(config.settings.operators.len(), 2);
    assert_eq!(config.settings.frame_delay, Duration::ZERO);
    assert_eq!(config.settings.natural_return, Decimal::from_f64(2.5));
}

#[test]
fn test_config_rejections() {
    assert!(matches!(
        parse("log_level: loud").validate(),
        Err(ConfigError::InvalidLogLevel { .. })
    ));
    assert!(matches!(
        parse("autoplay_rounds: 0").validate(),
        Err(ConfigError::InvalidNonZero {
            field: "autoplay_rounds",
            ..
        })
    ));
    assert!(matches!(
        parse("sweep_interval_secs: 0").validate(),
        Err(ConfigError::InvalidNonZero { .. })
    ));
    assert!(matches!(
        parse("starting_balance: -1").validate(),
        Err(ConfigError::NegativeStartingBalance(-1))
    ));
    assert!(matches!(
        parse("natural_return: 0.5").validate(),
        Err(ConfigError::InvalidNaturalReturn(_))
    ));
    assert!(matches!(
        parse("machine: /nonexistent/coinbot/machine.yaml").validate(),
        Err(ConfigError::MachineRead { .. })
    ));
}

#[test]
fn test_machine_file() {
    let mut machine = Machine::standard();
    machine.frequencies.set_weight(Symbol::Jackpot, 3);
    let path = scratch("machine.yaml", &serde_yaml::to_string(&machine).unwrap());
    let config = parse(&format!("machine: {}", path.display()))
        .validate()
        .unwrap();
    assert_eq!(config.machine, machine);
    std::fs::remove_file(&path).unwrap();

    let path = scratch("broken.yaml", "frequencies: {wild: 0}\npayouts: {}\n");
    assert!(matches!(
        load_machine(&path),
        Err(ConfigError::MachineParse { .. })
    ));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_example_config_is_valid() {
    let raw = include_str!("../config.example.yaml");
    let config = parse(raw).validate().unwrap();
    assert_eq!(config.settings.operators.len(), 1);
}

#[tokio::test]
async fn test_console_presenter_events() {
    let (presenter, mut receiver) = ConsolePresenter::new();
    let view = View::Notice {
        message: "hello".into(),
    };

    let handle = presenter
        .send_initial(ChannelId(1), PlayerId(2), view.clone())
        .await
        .unwrap();
    presenter.update(handle, view.clone()).await.unwrap();
    assert_eq!(presenter.open_messages(), 1);
    assert_eq!(
        presenter.update(MessageHandle(999), view.clone()).await,
        Err(PresentError::NotFound(MessageHandle(999)))
    );
    presenter
        .report_outcome(ChannelId(1), PlayerId(2), view.clone())
        .await
        .unwrap();

    let events = drain(&mut receiver);
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Event::Post { handle: h, .. } if h == handle));
    assert!(matches!(events[1], Event::Edit { handle: h, .. } if h == handle));
    assert!(matches!(events[2], Event::Outcome { .. }));

    // A closed message can no longer be edited
    presenter.close(handle).await;
    assert_eq!(presenter.open_messages(), 0);
    assert_eq!(
        presenter.update(handle, view.clone()).await,
        Err(PresentError::NotFound(handle))
    );

    // A closed writer surfaces as a presentation failure
    drop(receiver);
    assert!(matches!(
        presenter.report_outcome(ChannelId(1), PlayerId(2), view).await,
        Err(PresentError::Failed(_))
    ));
}

#[tokio::test]
async fn test_events_are_json_lines() {
    let (presenter, receiver) = ConsolePresenter::new();
    presenter
        .report_outcome(
            ChannelId(3),
            PlayerId(4),
            View::Balance {
                player: PlayerId(4),
                balance: 10,
            },
        )
        .await
        .unwrap();
    drop(presenter);

    let mut out = Vec::new();
    let written = write_events(receiver, &mut out).await.unwrap();
    assert_eq!(written, 1);
    let text = String::from_utf8(out).unwrap();
    assert!(text.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(value["event"], "outcome");
    assert_eq!(value["channel"], 3);
    assert_eq!(value["view"]["view"], "balance");
    assert_eq!(value["view"]["balance"], 10);
}

#[tokio::test]
async fn test_frontend_dispatches_requests() {
    let casino = Arc::new(create_casino(
        Memory::default(),
        Machine::standard(),
        instant_settings(),
        1,
    ));
    let input = concat!(
        r#"{"guild":1,"channel":1,"player":1,"command":"slot","bet":100}"#,
        "\n\n",
        "not json\n",
        r#"{"guild":1,"channel":1,"player":2,"command":"balance"}"#,
        "\n",
        r#"{"guild":1,"channel":1,"player":3,"command":"slot","bet":-1}"#,
        "\n",
    );

    let intake = frontend::run(input.as_bytes(), casino.clone()).await.unwrap();
    assert_eq!(
        intake,
        frontend::Intake {
            dispatched: 3,
            malformed: 1
        }
    );
    assert!(casino.registry().is_empty());

    let outcomes = casino.presenter().outcomes();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().any(|view| matches!(view, View::SlotResult { bet: 100, .. })));
    assert!(outcomes.contains(&View::Balance {
        player: PlayerId(2),
        balance: 1_000
    }));
    assert!(outcomes
        .iter()
        .any(|view| matches!(view, View::Rejected { .. })));
}

#[tokio::test]
async fn test_frontend_with_console_presenter() {
    let (presenter, mut receiver) = ConsolePresenter::new();
    let casino = Arc::new(Casino::new(
        Memory::default(),
        presenter,
        Machine::standard(),
        GameRng::new(3),
        instant_settings(),
    ));
    let input = r#"{"guild":5,"channel":6,"player":7,"command":"slot","bet":10}"#;
    frontend::run(input.as_bytes(), casino.clone()).await.unwrap();

    let events = drain(&mut receiver);
    // Post, three reveal frames, final edit, outcome
    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], Event::Post { .. }));
    assert!(matches!(
        events.last(),
        Some(Event::Outcome { view: View::SlotResult { .. }, .. })
    ));
    let balance = casino
        .ledger()
        .balance(Account::new(GuildId(5), PlayerId(7)))
        .await
        .unwrap();
    let Some(Event::Outcome {
        view: View::SlotResult {
            balance: reported, ..
        },
        ..
    }) = events.last()
    else {
        unreachable!();
    };
    assert_eq!(balance, *reported);
}

#[tokio::test]
async fn test_console_presenter_forgets_settled_messages() {
    let (presenter, mut receiver) = ConsolePresenter::new();
    let casino = Arc::new(Casino::new(
        Memory::default(),
        presenter,
        Machine::standard(),
        GameRng::new(9),
        instant_settings(),
    ));
    let input: String = (1..=20)
        .map(|player| {
            format!(
                r#"{{"guild":1,"channel":1,"player":{player},"command":"slot","bet":10}}"#
            ) + "\n"
        })
        .collect();
    let intake = frontend::run(input.as_bytes(), casino.clone()).await.unwrap();
    assert_eq!(intake.dispatched, 20);

    let posts = drain(&mut receiver)
        .into_iter()
        .filter(|event| matches!(event, Event::Post { .. }))
        .count();
    assert_eq!(posts, 20);
    assert_eq!(casino.presenter().open_messages(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_expires_idle_hands() {
    let casino = Arc::new(create_casino(
        Memory::default(),
        Machine::standard(),
        instant_settings(),
        3,
    ));

    // Find a hand that is still open after the deal
    let mut open = None;
    for player in 1..100 {
        let view = casino.start_blackjack(context(player), 100).await.unwrap();
        if view.result.is_none() {
            open = Some(player);
            break;
        }
    }
    let player = open.unwrap();
    assert!(casino.registry().is_active(PlayerId(player)));

    let sweeper = tokio::spawn(sweeper::run(casino.clone(), Duration::from_secs(30)));
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(casino.registry().is_active(PlayerId(player)));

    tokio::time::sleep(Duration::from_secs(400)).await;
    assert!(!casino.registry().is_active(PlayerId(player)));
    sweeper.abort();

    let balance = casino.balance(context(player)).await.unwrap();
    let settled = casino
        .presenter()
        .outcomes()
        .into_iter()
        .filter_map(|view| match view {
            View::Blackjack {
                table,
                balance: Some(balance),
            } if table.result.is_some() => Some((table, balance)),
            _ => None,
        })
        .last()
        .unwrap();
    assert_eq!(settled.1, balance);
    assert_eq!(balance, 1_000 - settled.0.stake + settled.0.returned);
}
