use anyhow::Result;
use carbonbadge::{
    Activation, AppConfig, CacheStore, CarbonApiClient, CarbonBadge, FileStorage, MemoryStorage,
    Storage,
};
use carbonbadge::measure::MeasurementFetcher;
use carbonbadge::ui::widgets::BadgeWidget;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Alignment, Rect},
    prelude::CrosstermBackend,
    style::{Color, Style},
    widgets::Paragraph,
    Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "carbonbadge",
    version,
    about = "Carbon footprint badge for a web page, in your terminal"
)]
struct Cli {
    /// Page URL to measure (the badge's "current location")
    url: String,

    /// Measure this URL instead of the positional one
    #[arg(long)]
    custom_url: Option<String>,

    /// Render the badge in dark mode
    #[arg(long)]
    dark: bool,

    /// Show the outbound websitecarbon.com link
    #[arg(long)]
    link: bool,

    /// Config file path (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the on-disk cache for this run
    #[arg(long)]
    no_cache: bool,

    /// Print the result and exit instead of opening the TUI
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = AppConfig::load_or_default(cli.config.as_deref())?;

    let mut config = app.badge.clone();
    if cli.dark {
        config.use_dark_mode = true;
    }
    if cli.link {
        config.show_link_to_web_carbon = true;
    }
    if let Some(custom) = &cli.custom_url {
        config.use_custom_url = true;
        config.custom_url_to_check = urlencoding::encode(custom).into_owned();
    }

    let storage: Box<dyn Storage> = if cli.no_cache {
        Box::new(MemoryStorage::new())
    } else {
        match FileStorage::default_path() {
            Some(path) => Box::new(FileStorage::open(path)),
            None => Box::new(MemoryStorage::new()),
        }
    };
    let mut cache = CacheStore::new(storage);

    let client = match app.api_base.as_deref() {
        Some(base) => CarbonApiClient::with_base_url(base),
        None => CarbonApiClient::new(),
    };

    let mut badge = CarbonBadge::new(config);

    if cli.once {
        badge.run(&mut cache, &client, &cli.url).await;
        let fields = badge.display();
        println!("{}", fields.measure_text);
        if !fields.below_text.is_empty() {
            println!("{}", fields.below_text);
        }
        if let Some(href) = fields.link_href {
            println!("{}", href);
        }
        return Ok(());
    }

    run_tui(&mut badge, &mut cache, &client, &cli.url).await
}

async fn run_tui<S: Storage>(
    badge: &mut CarbonBadge,
    cache: &mut CacheStore<S>,
    client: &CarbonApiClient,
    url: &str,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_loop(&mut terminal, badge, cache, client, url).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_loop<S: Storage>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    badge: &mut CarbonBadge,
    cache: &mut CacheStore<S>,
    client: &CarbonApiClient,
    url: &str,
) -> Result<()> {
    let activation = badge.activate(cache, url);
    draw(terminal, badge)?;

    if let Activation::FetchNeeded(target) = activation {
        let outcome = client.measure(&target).await;
        badge.apply_fetch(cache, &target, outcome);
        draw(terminal, badge)?;
    }

    loop {
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('d') => {
                let dark = badge.display().dark_mode;
                badge.set_dark_mode(!dark);
                draw(terminal, badge)?;
            }
            KeyCode::Char('l') => {
                let link = badge.display().show_link;
                badge.set_show_link(!link);
                draw(terminal, badge)?;
            }
            KeyCode::Char('r') => {
                if let Activation::FetchNeeded(target) = badge.activate(cache, url) {
                    draw(terminal, badge)?;
                    let outcome = client.measure(&target).await;
                    badge.apply_fetch(cache, &target, outcome);
                }
                draw(terminal, badge)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    badge: &CarbonBadge,
) -> Result<()> {
    let fields = badge.display();
    terminal.draw(|frame| {
        let area = frame.area();
        BadgeWidget::new(&fields).render(frame, badge_area(area));

        if area.height > 1 {
            let hint = Paragraph::new("q quit | d dark mode | l link | r refresh")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            let hint_area = Rect {
                x: area.x,
                y: area.y + area.height - 1,
                width: area.width,
                height: 1,
            };
            frame.render_widget(hint, hint_area);
        }
    })?;
    Ok(())
}

/// Badge block centered in the terminal.
fn badge_area(area: Rect) -> Rect {
    let width = area.width.min(64);
    let height = area.height.min(5);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
