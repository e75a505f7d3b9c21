use std::{
    error::Error,
    fs,
    io::{self, stdin},
    path::PathBuf,
    time::Instant,
};

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use tracing::{info, warn};

use readbuddy::{
    analyzer::{
        gemini::GeminiClient, worker::AnalysisWorker, Analyzer, AnalyzerError, Offline,
        TextGenerator,
    },
    app::{App, AppSettings},
    app_dirs::AppDirs,
    audio_backend::{AudioBackend, READY_STATUS},
    book::Catalog,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    runtime::{AppEvent, CrosstermEventSource, Runner},
};

/// read a book aloud with a tutor, answer questions, then play
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A reading tutor for the terminal: read each line of a book, get feedback on the first word you missed, answer comprehension questions and spend the lives you earn in a small platform game."
)]
pub struct Cli {
    /// number of lives to start with (overrides the config file)
    #[clap(long)]
    lives: Option<u32>,

    /// use the built-in feedback instead of the remote model
    #[clap(long, global = true)]
    offline: bool,

    /// API key for the text-generation service (defaults to GEMINI_API_KEY)
    #[clap(long, global = true)]
    api_key: Option<String>,

    /// text-generation model name
    #[clap(long, global = true)]
    model: Option<String>,

    /// path to a config file instead of the platform default
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// check one reading against its line and print the verdict as JSON
    Analyze {
        /// what the reader said
        #[clap(long)]
        spoken: String,
        /// the line on the page
        #[clap(long)]
        reference: String,
    },
    /// send a WAV recording to the audio backend and save the reply
    ProcessAudio {
        #[clap(long)]
        input: PathBuf,
        #[clap(long)]
        output: PathBuf,
        /// backend endpoint (overrides the config file)
        #[clap(long)]
        url: Option<String>,
    },
    /// list the bundled books
    Books,
}

impl Cli {
    /// Config file, then environment, then flags.
    fn load_config(&self) -> Config {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut config = store.load().with_env_key();
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(lives) = self.lives {
            config.starting_lives = lives;
        }
        config
    }

    fn text_generator(&self, config: &Config) -> Result<Box<dyn TextGenerator>, AnalyzerError> {
        if self.offline {
            Ok(Box::new(Offline))
        } else {
            Ok(Box::new(GeminiClient::new(config.gemini_settings())?))
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = cli.load_config();

    if let Some(command) = cli.command.clone() {
        logging::init_stderr();
        return run_command(&cli, &config, command);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = AppDirs::log_path() {
        if let Err(err) = logging::init_file(&path) {
            eprintln!("logging disabled: {err}");
        }
    }

    let catalog = Catalog::bundled()?;
    let worker = AnalysisWorker::spawn(Analyzer::new(cli.text_generator(&config)?));

    enable_raw_mode()?;
    let reports_release = matches!(supports_keyboard_enhancement(), Ok(true));

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if reports_release {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let settings = AppSettings::from_config(&config, reports_release);
    let mut app = App::new(catalog, Box::new(worker), settings).offline(cli.offline);
    info!(
        lives = config.starting_lives,
        offline = cli.offline,
        reports_release,
        "session started"
    );
    let result = start_tui(&mut terminal, &mut app);

    if reports_release {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::spawn());
    terminal.draw(|f| ui(app, f))?;

    loop {
        let deadline = app.next_deadline(Instant::now());
        let event = runner.step(deadline, Instant::now());
        let now = Instant::now();
        let mut redraw = match event {
            AppEvent::Key(key) => {
                app.on_key(key, now)?;
                true
            }
            AppEvent::Resize => true,
            AppEvent::Wake => false,
            AppEvent::Closed => {
                warn!("input closed, leaving");
                break;
            }
        };
        redraw |= app.pump(now)?;

        if app.should_quit() {
            break;
        }
        if redraw {
            terminal.draw(|f| ui(app, f))?;
        }
    }

    info!("session ended");
    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

fn run_command(cli: &Cli, config: &Config, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Analyze { spoken, reference } => {
            let mut analyzer = Analyzer::new(cli.text_generator(config)?);
            let analysis = analyzer.analyze(&spoken, &reference);
            println!("{}", serde_json::to_string(analysis.verdict())?);
            println!("source: {}", analysis.source());
        }
        Command::ProcessAudio { input, output, url } => {
            let url = url.unwrap_or_else(|| config.backend_url.clone());
            let backend = AudioBackend::new(url, config.request_timeout())?;
            println!("Sending audio...");
            match backend.process_file(&input) {
                Ok(wav) => {
                    fs::write(&output, wav)?;
                    println!("{READY_STATUS} Saved to {}", output.display());
                }
                Err(err) => {
                    eprintln!("{}", err.status_message());
                    std::process::exit(1);
                }
            }
        }
        Command::Books => {
            for book in Catalog::bundled()?.books() {
                println!(
                    "{}\t{}\t{} lines\t{} questions",
                    book.id,
                    book.title,
                    book.lines.len(),
                    book.comprehension.len()
                );
            }
        }
    }
    Ok(())
}
