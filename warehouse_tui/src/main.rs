mod canvas;

use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use warehouse_core::{
    ItemType, RobotState, TickResult, Warehouse, WarehouseConfig, WarehouseSnapshot,
};

use crate::canvas::{Canvas, Glyph};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML file with warehouse parameters
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Number of robots
    #[arg(short, long)]
    robots: Option<usize>,

    /// Seed for robot and item placement
    #[arg(short, long)]
    seed: Option<u64>,

    /// Warehouse width
    #[arg(long)]
    width: Option<f64>,

    /// Warehouse height
    #[arg(long)]
    height: Option<f64>,

    /// Milliseconds between simulation ticks
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Run without a terminal UI until every item is delivered
    #[arg(long)]
    headless: bool,

    /// Tick limit for headless runs
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,

    /// Where log output goes while the terminal UI is running
    #[arg(long, value_name = "LOG_FILE", default_value = "warehouse.log")]
    log_file: PathBuf,
}

struct App {
    /// The core simulation.
    warehouse: Warehouse,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Ticks are skipped while paused.
    paused: bool,
}

impl App {
    fn new(warehouse: Warehouse) -> Self {
        App {
            warehouse,
            should_quit: false,
            paused: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.paused {
            return;
        }
        if self.warehouse.tick() == TickResult::JustCompleted {
            info!(
                ticks = self.warehouse.tick_count(),
                "warehouse sorted, press 'q' to quit"
            );
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.headless {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
        let warehouse = Warehouse::new(config)?;
        return run_headless(warehouse, args.max_ticks);
    }

    let log_file = File::create(&args.log_file)
        .with_context(|| format!("creating log file {}", args.log_file.display()))?;
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    let warehouse = Warehouse::new(config)?;
    let mut app = App::new(warehouse);

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));

    // Restore the terminal state even if the loop failed
    restore_terminal(&mut terminal)?;

    result
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warehouse_core=info,warehouse_tui=info"))
}

/// Reads the optional config file and applies command line overrides.
fn load_config(args: &Args) -> Result<WarehouseConfig> {
    let mut config = match &args.config {
        Some(path) => read_config_file(path)?,
        None => WarehouseConfig::default(),
    };
    if let Some(robots) = args.robots {
        config.robot_count = robots;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<WarehouseConfig> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Config file does not exist: {}",
            path.display()
        ));
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config file {}", path.display()))
}

fn parse_config(contents: &str) -> Result<WarehouseConfig> {
    Ok(toml::from_str(contents)?)
}

/// Ticks until the task completes or `max_ticks` is reached, then prints a summary.
fn run_headless(mut warehouse: Warehouse, max_ticks: u64) -> Result<()> {
    while !warehouse.task_completed() && warehouse.tick_count() < max_ticks {
        warehouse.tick();
    }

    let snapshot = warehouse.snapshot();
    println!("{}", summary(&snapshot));
    if !snapshot.task_completed {
        info!(max_ticks, "tick limit reached before all items were delivered");
    }
    Ok(())
}

fn summary(snapshot: &WarehouseSnapshot) -> String {
    let mut lines = Vec::with_capacity(snapshot.robots.len() + 2);
    let status = if snapshot.task_completed {
        "completed"
    } else {
        "incomplete"
    };
    lines.push(format!(
        "Task {status} after {} ticks ({:.1}s)",
        snapshot.tick,
        snapshot.elapsed.as_secs_f64()
    ));
    lines.push(format!(
        "Delivered {} items, {} still pending",
        snapshot.delivered(),
        snapshot.items.len()
    ));
    for robot in &snapshot.robots {
        lines.push(format!(
            "Robot {}: {} movements",
            robot.id, robot.movement_count
        ));
    }
    lines.join("\n")
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        let snapshot = app.warehouse.snapshot();
        terminal.draw(|f| ui(f, &snapshot, app.paused))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, snapshot: &WarehouseSnapshot, paused: bool) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the floor
            Constraint::Percentage(20), // Area for robot counters
            Constraint::Percentage(10), // Area for status/help
        ])
        .split(frame.area());

    render_floor(frame, main_layout[0], snapshot);
    render_robots(frame, main_layout[1], snapshot);
    render_status(frame, main_layout[2], snapshot, paused);
}

fn item_color(item_type: ItemType) -> Color {
    match item_type {
        ItemType::Electronics => Color::Red,
        ItemType::Clothing => Color::Green,
        ItemType::Food => Color::Blue,
        ItemType::Tools => Color::Yellow,
    }
}

/// Draws stacks, loose items and robots, in that order.
fn render_floor(frame: &mut Frame, area: Rect, snapshot: &WarehouseSnapshot) {
    let block = Block::default().title("Warehouse").borders(Borders::ALL);
    let inner = block.inner(area);
    let mut canvas = Canvas::new(
        inner.width as usize,
        inner.height as usize,
        snapshot.width,
        snapshot.height,
    );

    for stack in &snapshot.stacks {
        let symbol = char::from_digit(stack.items.len() as u32, 10).unwrap_or('#');
        canvas.plot(
            stack.position,
            Glyph {
                symbol,
                style: Style::default()
                    .fg(Color::Black)
                    .bg(item_color(stack.item_type)),
            },
        );
    }

    for item in snapshot.items.iter().filter(|item| item.claimed_by.is_none()) {
        canvas.plot(
            item.position,
            Glyph {
                symbol: 'o',
                style: Style::default().fg(item_color(item.item_type)),
            },
        );
    }

    for robot in &snapshot.robots {
        let color = robot
            .carried_item
            .map(|item| item_color(item.item_type))
            .unwrap_or(Color::Gray);
        canvas.plot(
            robot.position,
            Glyph {
                symbol: '@',
                style: Style::default().fg(color).bold(),
            },
        );
    }

    let lines: Vec<Line> = canvas
        .lines()
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|glyph| Span::styled(glyph.symbol.to_string(), glyph.style))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders the per-robot movement counters and task state.
fn render_robots(frame: &mut Frame, area: Rect, snapshot: &WarehouseSnapshot) {
    let robot_items: Vec<ListItem> = snapshot
        .robots
        .iter()
        .map(|robot| {
            let state = match robot.state {
                RobotState::Idle => "idle",
                RobotState::Seeking => "seeking",
                RobotState::Carrying => "carrying",
                RobotState::Stacking => "stacking",
            };
            let mut spans = vec![Span::raw(format!(
                "Robot {}: {} movements, {} at {}",
                robot.id, robot.movement_count, state, robot.position
            ))];
            if let Some(item) = robot.carried_item {
                spans.push(Span::styled(
                    format!(" [{} #{}]", item.item_type, item.id),
                    Style::default().fg(item_color(item.item_type)),
                ));
            }
            ListItem::from(Line::from(spans))
        })
        .collect();

    let robots_widget =
        List::new(robot_items).block(Block::default().borders(Borders::ALL).title("Robots"));
    frame.render_widget(robots_widget, area);
}

fn render_status(frame: &mut Frame, area: Rect, snapshot: &WarehouseSnapshot, paused: bool) {
    let progress = if snapshot.task_completed {
        "all items delivered".to_string()
    } else if paused {
        "paused".to_string()
    } else {
        format!("{} items pending", snapshot.items.len())
    };
    let status = format!(
        "Time: {:.1}s  Tick: {}  Delivered: {}  ({progress})  Space: pause  q/Esc: quit",
        snapshot.elapsed.as_secs_f64(),
        snapshot.tick,
        snapshot.delivered(),
    );
    let status_text = Paragraph::new(status)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_text, area);
}
