//! A terminal front-end for the chat proxy.

#[macro_use]
extern crate tracing;

use std::env;
use std::future::pending;
use std::io::{self, Write as _};
use std::process::{self, ExitCode};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use persona_chat_client::core::Persona;
use persona_chat_client::storage::FileStore;
use persona_chat_client::{
    AnswerFrame, ChatController, ChatOptions, ChatView, ConversationStore,
    HttpTransport, Input, Message, Role, ThreadEntry, ThreadManager, next_line,
};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const BAR_CHAR: &str = "▎";
const DEFAULT_URL: &str = "http://localhost:3000";

const HELP: &str = "\
/new           start a new chat
/threads       list chats
/switch N      open chat N of /threads
/delete N      delete chat N of /threads
/edit TEXT     replace your last message and regenerate
/clear         clear the current chat
/persona [KEY] show or set the persona
/quit          exit
Ctrl-C stops a reply.";

struct TerminalView {
    spinner: Option<ProgressBar>,
    spinner_style: ProgressStyle,
    threads: Vec<ThreadEntry>,
    /// Answer to the next [`ChatView::confirm`], asked by the input loop.
    confirmed: Option<bool>,
}

impl TerminalView {
    fn new() -> Self {
        let spinner_style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        Self {
            spinner: None,
            spinner_style,
            threads: vec![],
            confirmed: None,
        }
    }

    fn stop_spinner(&mut self) -> bool {
        // Finish the spinner before printing anything else.
        match self.spinner.take() {
            Some(spinner) => {
                spinner.finish_and_clear();
                true
            }
            None => false,
        }
    }

    fn print_threads(&self) {
        for (idx, entry) in self.threads.iter().enumerate() {
            let marker = if entry.current { "*" } else { " " };
            println!(
                "{marker} {:>2}. {}  {}",
                idx + 1,
                entry.title.bright_white(),
                entry.updated_label.dimmed()
            );
        }
    }

    fn thread_id(&self, arg: &str) -> Option<String> {
        let idx: usize = arg.trim().parse().ok()?;
        self.threads.get(idx.checked_sub(1)?).map(|e| e.id.clone())
    }
}

impl ChatView for TerminalView {
    fn show_conversation(&mut self, messages: &[Message]) {
        println!();
        for message in messages {
            match message.role {
                Role::User => {
                    println!("{}🧑 {}", BAR_CHAR.bright_green(), message.content)
                }
                Role::Assistant => println!(
                    "{}🤖 {}",
                    BAR_CHAR.bright_cyan(),
                    message.content.bright_white()
                ),
            }
        }
    }

    fn show_greeting(&mut self, text: &str) {
        println!("{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
    }

    fn show_threads(&mut self, threads: &[ThreadEntry]) {
        self.threads = threads.to_vec();
    }

    fn show_user_message(&mut self, _text: &str) {
        // Already on screen as typed.
    }

    fn show_thinking(&mut self) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(self.spinner_style.clone());
        spinner.set_message("🤔 Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn show_answer(&mut self, frame: &AnswerFrame<'_>) {
        if self.stop_spinner() {
            print!("{}🤖 ", BAR_CHAR.bright_cyan());
        }
        print!("{}", frame.delta.bright_white());
        if !frame.typing {
            println!();
        }
        io::stdout().flush().ok();
    }

    fn show_error(&mut self, text: &str) {
        if !self.stop_spinner() {
            println!();
        }
        println!("{}⚠️  {}", BAR_CHAR.bright_red(), text.bright_red());
    }

    fn highlight_code(&mut self) {}

    fn confirm(&mut self, _prompt: &str) -> bool {
        self.confirmed.take().unwrap_or(false)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let url = env::var("PERSONA_CHAT_URL")
        .unwrap_or_else(|_| DEFAULT_URL.to_owned());
    let transport = match HttpTransport::new(&url) {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let mut options = ChatOptions::default();
    if let Ok(model) = env::var("PERSONA_CHAT_MODEL") {
        options.model = model;
    }
    if let Ok(budget) = env::var("PERSONA_CHAT_THINKING") {
        let Ok(budget) = budget.trim().parse() else {
            eprintln!(
                "PERSONA_CHAT_THINKING must be an integer, got {budget:?}"
            );
            return ExitCode::FAILURE;
        };
        options.thinking_budget = budget;
    }
    let storage = match FileStore::open_default() {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    debug!("using store at {}", storage.path().display());

    let threads = ThreadManager::bootstrap(ConversationStore::new(storage));
    let mut controller =
        ChatController::new(threads, transport, TerminalView::new(), options);
    println!(
        "{}",
        format!("persona: {} · /help for commands", controller.persona())
            .dimmed()
    );

    let mut input = BufReader::new(tokio::io::stdin());
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let line = match next_line(&mut input, ctrl_c()).await {
            Input::Line(line) => line,
            Input::Closed => break,
            Input::Interrupted => {
                println!();
                // The abandoned stdin read blocks runtime shutdown.
                process::exit(0);
            }
        };
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => {}
            "/quit" => break,
            "/help" => println!("{HELP}"),
            "/new" => {
                controller.new_thread();
            }
            "/threads" => controller.view().print_threads(),
            "/switch" => match controller.view().thread_id(arg) {
                Some(id) => {
                    controller.switch_thread(&id);
                }
                None => println!("no chat {arg:?}, see /threads"),
            },
            "/delete" => match controller.view().thread_id(arg) {
                Some(id) => {
                    let Some(prompt) = controller.delete_prompt(&id) else {
                        continue;
                    };
                    let yes = ask_yes_no(&mut input, &prompt).await;
                    controller.view_mut().confirmed = Some(yes);
                    controller.delete_thread(&id);
                }
                None => println!("no chat {arg:?}, see /threads"),
            },
            "/clear" => {
                controller.clear();
            }
            "/persona" => {
                if arg.is_empty() {
                    let keys: Vec<_> =
                        Persona::ALL.iter().map(|p| p.key()).collect();
                    println!(
                        "persona: {} (one of {})",
                        controller.persona(),
                        keys.join(", ")
                    );
                } else {
                    match arg.trim().parse::<Persona>() {
                        Ok(persona) => controller.set_persona(persona),
                        Err(err) => println!("{err}"),
                    }
                }
            }
            "/edit" => {
                if !controller.can_edit_last_user() {
                    println!("nothing to edit");
                    continue;
                }
                let cancel = CancellationToken::new();
                let watcher = stop_on_ctrl_c(cancel.clone());
                controller.edit_last_user(arg, &cancel).await;
                watcher.abort();
            }
            _ => {
                let cancel = CancellationToken::new();
                let watcher = stop_on_ctrl_c(cancel.clone());
                controller.send(line, &cancel).await;
                watcher.abort();
            }
        }
    }
    ExitCode::SUCCESS
}

/// Cancels `cancel` on Ctrl-C, until the returned task is aborted.
fn stop_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

/// Resolves on Ctrl-C, or never if the handler can't be installed.
async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {err}");
        pending::<()>().await;
    }
}

async fn ask_yes_no<R>(input: &mut R, prompt: &str) -> bool
where
    R: AsyncBufRead + Unpin,
{
    print!("{prompt} [y/N]: ");
    io::stdout().flush().ok();
    match next_line(input, ctrl_c()).await {
        Input::Line(answer) => answer.trim().eq_ignore_ascii_case("y"),
        Input::Closed => false,
        Input::Interrupted => {
            println!();
            false
        }
    }
}
