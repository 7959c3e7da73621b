mod ui;

use std::collections::VecDeque;
use std::env;
use std::error::Error;
use std::fs;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use sweep_core::config::Config;
use sweep_core::layout::load_layout;
use sweep_core::layout::BoardLayout;
use sweep_core::reduce;
use sweep_core::Board;
use sweep_core::BoardAction;
use sweep_core::BoardEffect;
use sweep_core::BoardState;
use sweep_core::ChannelStatus;
use sweep_core::FilterChip;
use sweep_core::LogLevel;
use sweep_core::PreferenceStore;
use sweep_core::Preferences;
use sweep_core::RoomKey;
use sweep_core::TaskKey;
use sweep_core::UserAction;
use sweep_sync::remote;
use sweep_sync::ChannelConfig;
use sweep_sync::ChannelHandle;
use sweep_sync::Controller;
use sweep_sync::HttpRemoteStore;
use sweep_sync::MemoryRemoteStore;
use sweep_sync::Relay;
use sweep_sync::RemoteStore;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const DEFAULT_RELAY_BIND: &str = "0.0.0.0:9001";
const CONNECT_WAIT: Duration = Duration::from_secs(2);
const CLOSE_GRACE: Duration = Duration::from_millis(500);
const SHUTDOWN_WAIT: Duration = Duration::from_secs(1);

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct Options {
    config_path: Option<PathBuf>,
    offline: bool,
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut options = Options::default();
    let mut args = env::args().skip(1).peekable();
    while let Some(arg) = args.next_if(|arg| arg == "--config" || arg == "--offline") {
        if arg == "--offline" {
            options.offline = true;
            continue;
        }
        let Some(path) = args.next() else {
            return Err("--config requires a path".into());
        };
        options.config_path = Some(PathBuf::from(path));
    }

    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("sweep {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "relay" => {
            init_logging(None)?;
            run_relay(&rest)
        }
        "watch" => {
            expect_args::<0>("watch", &rest, &[])?;
            let config = load_config(&options)?;
            init_logging(Some(log_path()))?;
            watch(&config, &options)
        }
        "label" => {
            let config = load_config(&options)?;
            run_label(&config, &rest)
        }
        "title" => {
            let config = load_config(&options)?;
            run_title(&config, &rest)
        }
        "status" => {
            expect_args::<0>("status", &rest, &[])?;
            let config = load_config(&options)?;
            init_logging(None)?;
            let state = block_on(apply_once(&config, &options, None))?;
            print_board(&state);
            Ok(())
        }
        other => {
            let action = parse_board_command(other, &rest)?;
            let config = load_config(&options)?;
            init_logging(None)?;
            let state = block_on(apply_once(&config, &options, Some(action.clone())))?;
            print_outcome(&state, &action);
            Ok(())
        }
    }
}

fn parse_board_command(command: &str, rest: &[String]) -> Result<UserAction, Box<dyn Error>> {
    let action = match command {
        "click" => {
            let [floor, room, task] = expect_args(command, rest, &["FLOOR", "ROOM", "TASK"])?;
            UserAction::AdvanceProgress(TaskKey::new(floor, room, task))
        }
        "assign" => {
            let [floor, room, task] = expect_args(command, rest, &["FLOOR", "ROOM", "TASK"])?;
            UserAction::CycleAssignment(TaskKey::new(floor, room, task))
        }
        "reset" => {
            expect_args::<0>(command, rest, &[])?;
            UserAction::ResetTasks
        }
        "reset-room" => {
            let [floor, room] = expect_args(command, rest, &["FLOOR", "ROOM"])?;
            UserAction::ResetRoom(RoomKey::new(floor, room))
        }
        "reset-hidden" => {
            expect_args::<0>(command, rest, &[])?;
            UserAction::ResetHidden
        }
        "toggle-hidden" => {
            let [floor, room] = expect_args(command, rest, &["FLOOR", "ROOM"])?;
            UserAction::ToggleRoomHidden(RoomKey::new(floor, room))
        }
        _ => {
            print_help();
            return Err(format!("unknown command: {command}").into());
        }
    };
    Ok(action)
}

fn expect_args<const N: usize>(
    command: &str,
    rest: &[String],
    names: &[&str],
) -> Result<[String; N], Box<dyn Error>> {
    <[String; N]>::try_from(rest.to_vec())
        .map_err(|_| format!("usage: sweep {command} {}", names.join(" ")).into())
}

fn load_config(options: &Options) -> Result<Config, Box<dyn Error>> {
    let path = options
        .config_path
        .clone()
        .or_else(|| dirs::config_dir().map(|dir| dir.join("sweep").join("config.toml")));
    match path {
        Some(path) => Ok(Config::load(&path)?),
        None => Ok(Config::default()),
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("sweep")
}

fn log_path() -> PathBuf {
    data_dir().join("sweep.log")
}

fn init_logging(file: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_env("SWEEP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let installed = match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    installed.map_err(|err| -> Box<dyn Error> { err })
}

fn open_preferences(config: &Config) -> Result<PreferenceStore, Box<dyn Error>> {
    let path = config
        .storage
        .preferences_path
        .clone()
        .unwrap_or_else(|| data_dir().join("preferences.json"));
    Ok(PreferenceStore::open(path)?)
}

fn load_board_layout(config: &Config) -> Result<BoardLayout, Box<dyn Error>> {
    match &config.layout.dir {
        Some(dir) => Ok(load_layout(dir)?),
        None => Ok(BoardLayout::default()),
    }
}

fn remote_store(
    config: &Config,
    options: &Options,
    layout: &BoardLayout,
) -> Result<Arc<dyn RemoteStore>, Box<dyn Error>> {
    if options.offline {
        return Ok(Arc::new(MemoryRemoteStore::from_layout(layout)));
    }
    Ok(Arc::new(HttpRemoteStore::new(
        &config.server.base_url,
        config.server.request_timeout(),
    )?))
}

fn channel_config(config: &Config) -> ChannelConfig {
    ChannelConfig {
        url: config.channel_url(),
        reconnect_delay: config.realtime.reconnect_delay(),
    }
}

fn block_on<F, T>(future: F) -> Result<T, Box<dyn Error>>
where
    F: Future<Output = Result<T, Box<dyn Error>>>,
{
    tokio::runtime::Runtime::new()?.block_on(future)
}

/// Reconciles with the store, then applies `action` and drains every effect
/// it produces before returning. Animation timers are not run.
async fn apply_once(
    config: &Config,
    options: &Options,
    action: Option<UserAction>,
) -> Result<BoardState, Box<dyn Error>> {
    let layout = load_board_layout(config)?;
    let mut preferences = open_preferences(config)?;
    let mut state = BoardState::new(
        Board::from_layout(&layout),
        Preferences::load(&preferences),
        config.progress.policy(),
    );
    let store = remote_store(config, options, &layout)?;

    drain(&mut state, store.as_ref(), None, &mut preferences, UserAction::Refresh).await;
    fail_on_errors(&state)?;
    let Some(action) = action else {
        return Ok(state);
    };
    ensure_target(&state, &action)?;

    let (inbound_tx, _inbound) = mpsc::unbounded_channel();
    let channel = if options.offline {
        None
    } else {
        let channel = ChannelHandle::spawn(channel_config(config), inbound_tx)?;
        if !channel.wait_open(CONNECT_WAIT).await {
            warn!(url = %config.channel_url(), "relay unreachable, other dashboards will not see this change");
        }
        Some(channel)
    };

    drain(&mut state, store.as_ref(), channel.as_ref(), &mut preferences, action).await;
    if let Some(channel) = channel {
        channel.close(CLOSE_GRACE).await;
    }
    fail_on_errors(&state)?;
    Ok(state)
}

async fn drain(
    state: &mut BoardState,
    store: &dyn RemoteStore,
    channel: Option<&ChannelHandle>,
    preferences: &mut PreferenceStore,
    action: UserAction,
) {
    let mut queue = VecDeque::from([BoardAction::User(action)]);
    while let Some(action) = queue.pop_front() {
        for effect in reduce(state, action) {
            match effect {
                BoardEffect::Remote(call) => {
                    queue.push_back(BoardAction::Remote(remote::execute(store, call).await));
                }
                BoardEffect::Broadcast(message) => {
                    if let Some(channel) = channel {
                        channel.send(message);
                    }
                }
                BoardEffect::SavePreferences => {
                    if let Err(err) = state.preferences.save(preferences) {
                        warn!(error = %err, "failed to save preferences");
                    }
                }
                BoardEffect::Schedule { .. }
                | BoardEffect::PlayCue(_)
                | BoardEffect::Shake { .. }
                | BoardEffect::Burst { .. }
                | BoardEffect::RequestFrame => {}
            }
        }
    }
}

fn fail_on_errors(state: &BoardState) -> Result<(), Box<dyn Error>> {
    let errors: Vec<&str> = state
        .activity
        .iter()
        .filter(|entry| entry.level == LogLevel::Error)
        .map(|entry| entry.message.as_str())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; ").into())
    }
}

fn ensure_target(state: &BoardState, action: &UserAction) -> Result<(), Box<dyn Error>> {
    match action {
        UserAction::AdvanceProgress(key) | UserAction::CycleAssignment(key) => {
            if state.board.task(key).is_none() {
                return Err(format!("unknown task {key}").into());
            }
        }
        UserAction::ResetRoom(room) | UserAction::ToggleRoomHidden(room) => {
            if state.board.room(room).is_none() {
                return Err(format!("unknown room {room}").into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn print_outcome(state: &BoardState, action: &UserAction) {
    match action {
        UserAction::AdvanceProgress(key) | UserAction::CycleAssignment(key) => {
            if let Some(task) = state.board.task(key) {
                println!(
                    "{key}: {} ({})",
                    task.progress,
                    state.preferences.assignment_label(task.assignment)
                );
            }
        }
        UserAction::ToggleRoomHidden(room) => {
            if let Some(entry) = state.board.room(room) {
                let label = if entry.hidden { "hidden" } else { "shown" };
                println!("{room}: {label}");
            }
        }
        UserAction::ResetRoom(room) => println!("{room}: reset"),
        UserAction::ResetTasks => println!("all tasks reset"),
        UserAction::ResetHidden => println!("all rooms shown"),
        _ => {}
    }
}

fn print_board(state: &BoardState) {
    let prefs = &state.preferences;
    println!("{}", prefs.title());
    for (floor_name, floor) in &state.board.floors {
        println!("{floor_name}  {:.0}%", floor.progress());
        for (room_name, room) in &floor.rooms {
            let hidden = if room.hidden { "  (hidden)" } else { "" };
            println!("  {room_name}  {:.0}%{hidden}", room.progress());
            for (task_name, task) in &room.tasks {
                println!(
                    "    {task_name:<24} {:>4}  {}",
                    task.progress.to_string(),
                    prefs.assignment_label(task.assignment)
                );
            }
        }
    }
}

fn local_state(config: &Config) -> Result<(BoardState, PreferenceStore), Box<dyn Error>> {
    let store = open_preferences(config)?;
    let state = BoardState::new(
        Board::default(),
        Preferences::load(&store),
        config.progress.policy(),
    );
    Ok((state, store))
}

fn apply_local(
    state: &mut BoardState,
    store: &mut PreferenceStore,
    action: UserAction,
) -> Result<(), Box<dyn Error>> {
    for effect in reduce(state, BoardAction::User(action)) {
        if effect == BoardEffect::SavePreferences {
            state.preferences.save(store)?;
        }
    }
    Ok(())
}

fn run_label(config: &Config, rest: &[String]) -> Result<(), Box<dyn Error>> {
    let (mut state, mut store) = local_state(config)?;
    let Some((key, text)) = rest.split_first() else {
        for chip in FilterChip::chips() {
            println!("{:>3}  {}", chip.key(), state.preferences.chip_label(&chip));
        }
        return Ok(());
    };
    let Some(chip) = FilterChip::parse(key) else {
        return Err(format!("label index must be `all` or 0-6, got {key}").into());
    };
    let action = match text {
        [] => return Err("usage: sweep label INDEX TEXT | sweep label INDEX --reset".into()),
        [flag] if flag == "--reset" => UserAction::ResetLabel(chip.clone()),
        words => UserAction::SetLabel {
            chip: chip.clone(),
            label: words.join(" "),
        },
    };
    apply_local(&mut state, &mut store, action)?;
    println!("{}  {}", chip.key(), state.preferences.chip_label(&chip));
    Ok(())
}

fn run_title(config: &Config, rest: &[String]) -> Result<(), Box<dyn Error>> {
    let (mut state, mut store) = local_state(config)?;
    let action = match rest {
        [] => {
            println!("{}", state.preferences.title());
            return Ok(());
        }
        [flag] if flag == "--reset" => UserAction::ResetTitle,
        words => UserAction::SetTitle(words.join(" ")),
    };
    apply_local(&mut state, &mut store, action)?;
    println!("{}", state.preferences.title());
    Ok(())
}

fn run_relay(rest: &[String]) -> Result<(), Box<dyn Error>> {
    let bind = match rest {
        [] => DEFAULT_RELAY_BIND.to_string(),
        [flag, addr] if flag == "--bind" => addr.clone(),
        _ => return Err("usage: sweep relay [--bind ADDR]".into()),
    };
    block_on(serve_relay(bind))
}

async fn serve_relay(bind: String) -> Result<(), Box<dyn Error>> {
    let relay = Relay::bind(bind.as_str()).await?;
    println!("relaying on ws://{}/ws", relay.local_addr()?);
    relay.serve().await?;
    Ok(())
}

fn watch(config: &Config, options: &Options) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let layout = load_board_layout(config)?;
    let preferences = open_preferences(config)?;
    let state = BoardState::new(
        Board::from_layout(&layout),
        Preferences::load(&preferences),
        config.progress.policy(),
    );
    let store = remote_store(config, options, &layout)?;

    let _enter = runtime.enter();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let channel = if options.offline {
        let (channel, _outbound) = ChannelHandle::detached();
        channel.set_status(ChannelStatus::Closed);
        channel
    } else {
        ChannelHandle::spawn(channel_config(config), inbound_tx)?
    };
    let (controller, handle, presentation) =
        Controller::new(state, store, channel, inbound_rx, preferences);
    let controller = runtime.spawn(controller.run());

    let result = ui::run(handle, presentation);
    runtime.block_on(async {
        if tokio::time::timeout(SHUTDOWN_WAIT, controller).await.is_err() {
            warn!("controller did not stop in time");
        }
    });
    result
}

fn print_help() {
    println!("sweep {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  sweep [--config PATH] [--offline] watch");
    println!("  sweep [--config PATH] [--offline] status");
    println!("  sweep [--config PATH] click FLOOR ROOM TASK");
    println!("  sweep [--config PATH] assign FLOOR ROOM TASK");
    println!("  sweep [--config PATH] reset");
    println!("  sweep [--config PATH] reset-room FLOOR ROOM");
    println!("  sweep [--config PATH] reset-hidden");
    println!("  sweep [--config PATH] toggle-hidden FLOOR ROOM");
    println!("  sweep label [INDEX TEXT | INDEX --reset]");
    println!("  sweep title [TEXT | --reset]");
    println!("  sweep relay [--bind ADDR]");
    println!("  sweep --help");
    println!("  sweep --version");
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn second_logging_init_reports_error() {
        let _ = init_logging(None);
        let err = init_logging(None).expect_err("subscriber already installed");
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn board_commands_parse_into_actions() {
        let action = parse_board_command("click", &strings(&["downstairs", "Kitchen", "Sink"]))
            .expect("click");
        assert!(matches!(
            action,
            UserAction::AdvanceProgress(key) if key == TaskKey::new("downstairs", "Kitchen", "Sink")
        ));

        let action =
            parse_board_command("toggle-hidden", &strings(&["upstairs", "Bathroom"])).expect("toggle");
        assert!(matches!(
            action,
            UserAction::ToggleRoomHidden(room) if room == RoomKey::new("upstairs", "Bathroom")
        ));
    }

    #[test]
    fn wrong_arity_reports_usage() {
        let err = parse_board_command("assign", &strings(&["downstairs", "Kitchen"]))
            .expect_err("arity");
        assert_eq!(err.to_string(), "usage: sweep assign FLOOR ROOM TASK");
        assert!(parse_board_command("reset", &strings(&["extra"])).is_err());
    }

    #[test]
    fn labels_and_title_persist_locally() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let mut config = Config::default();
        config.storage.preferences_path = Some(dir.path().join("prefs.json"));

        run_label(&config, &strings(&["2", "Sam's", "chores"])).expect("label");
        run_title(&config, &strings(&["Flat", "3B"])).expect("title");

        let (state, _) = local_state(&config).expect("reload");
        assert_eq!(
            state.preferences.chip_label(&FilterChip::parse("2").expect("chip")),
            "Sam's chores"
        );
        assert_eq!(state.preferences.title(), "Flat 3B");

        run_title(&config, &strings(&["--reset"])).expect("reset");
        let (state, _) = local_state(&config).expect("reload");
        assert_eq!(state.preferences.title(), "Cleaning Dashboard");
    }

    #[test]
    fn offline_click_advances_seeded_task() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let layout_dir = dir.path().join("layout");
        fs::create_dir_all(layout_dir.join("downstairs")).expect("floor");
        fs::write(
            layout_dir.join("downstairs").join("kitchen.yaml"),
            "tasks:\n  - name: Sink\n",
        )
        .expect("room");

        let mut config = Config::default();
        config.storage.preferences_path = Some(dir.path().join("prefs.json"));
        config.layout.dir = Some(layout_dir);
        let options = Options {
            config_path: None,
            offline: true,
        };

        let sink = TaskKey::new("downstairs", "Kitchen", "Sink");
        let state = block_on(apply_once(
            &config,
            &options,
            Some(UserAction::AdvanceProgress(sink.clone())),
        ))
        .expect("click");
        assert_eq!(state.board.task(&sink).map(|task| task.progress.value()), Some(25));

        let err = block_on(apply_once(
            &config,
            &options,
            Some(UserAction::ResetRoom(RoomKey::new("attic", "Storage"))),
        ))
        .expect_err("unknown room");
        assert_eq!(err.to_string(), "unknown room attic/Storage");
    }
}
