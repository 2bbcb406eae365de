// Interactive session: commands from stdin, popups on their own timers
use crate::render;
use anyhow::Result;
use browsealizer_core::{
    fetch_detail, Browser, Category, Command, DateRange, GitHubProvider, RepositoryDetail,
    SearchCompletion, SearchFilters, SearchProvider, SortKey, Task, ViewMode,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// A line of user input, parsed
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    /// 1-based position in the current listing
    Open(usize),
    Favorite(usize),
    Unfavorite(usize),
    Filter(FilterEdit),
    ListFavorites,
    Settings,
    Quota,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

/// One change to the active filters
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEdit {
    Language(Option<String>),
    MinStars(u32),
    Since(Option<DateRange>),
    Sort(SortKey),
}

impl FilterEdit {
    fn apply(self, mut filters: SearchFilters) -> SearchFilters {
        match self {
            FilterEdit::Language(lang) => filters.language = lang,
            FilterEdit::MinStars(n) => filters.min_stars = n,
            FilterEdit::Since(range) => filters.date_range = range,
            FilterEdit::Sort(key) => filters.sort = key,
        }
        filters
    }
}

pub fn parse(line: &str) -> Input {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let result = match word.to_lowercase().as_str() {
        "" => Ok(Input::Empty),
        "search" | "s" | "/" => Ok(Input::Command(Command::Search(rest.to_string()))),
        "category" | "c" => rest
            .parse::<Category>()
            .map(|c| Input::Command(Command::SelectCategory(c)))
            .map_err(|e| e.to_string()),
        "topic" | "t" => {
            if rest.is_empty() {
                Err("topic needs a name".to_string())
            } else {
                Ok(Input::Command(Command::SelectTopic(rest.to_string())))
            }
        }
        "lang" => Ok(Input::Filter(FilterEdit::Language(optional(rest)))),
        "stars" => rest
            .parse()
            .map(|n| Input::Filter(FilterEdit::MinStars(n)))
            .map_err(|_| format!("not a number: {}", rest)),
        "since" => match optional(rest) {
            None => Ok(Input::Filter(FilterEdit::Since(None))),
            Some(range) => range
                .parse::<DateRange>()
                .map(|r| Input::Filter(FilterEdit::Since(Some(r))))
                .map_err(|e| e.to_string()),
        },
        "sort" => rest
            .parse::<SortKey>()
            .map(|k| Input::Filter(FilterEdit::Sort(k)))
            .map_err(|e| e.to_string()),
        "reset" => Ok(Input::Command(Command::ResetFilters)),
        "next" | "n" => Ok(Input::Command(Command::NextPage)),
        "prev" | "p" => Ok(Input::Command(Command::PrevPage)),
        "page" => rest
            .parse()
            .map(|n| Input::Command(Command::GoToPage(n)))
            .map_err(|_| format!("not a page number: {}", rest)),
        "open" | "o" => position(rest).map(Input::Open),
        "fav" => position(rest).map(Input::Favorite),
        "unfav" => position(rest).map(Input::Unfavorite),
        "favorites" | "favs" => Ok(Input::ListFavorites),
        "dismiss" | "d" => Ok(Input::Command(Command::DismissRecommendation)),
        "save" => Ok(Input::Command(Command::FavoriteRecommendation)),
        "view" | "v" => Ok(Input::Command(Command::ViewRecommendation)),
        "recs" => switch(rest).map(|on| Input::Command(Command::SetRecommendations(on))),
        "interval" => rest
            .parse::<u64>()
            .map(|secs| {
                Input::Command(Command::SetRecommendationInterval(Duration::from_secs(secs)))
            })
            .map_err(|_| format!("not a number of seconds: {}", rest)),
        "dark" => switch(rest).map(|on| Input::Command(Command::SetDarkMode(on))),
        "layout" => rest
            .parse::<ViewMode>()
            .map(|v| Input::Command(Command::SetView(v)))
            .map_err(|e| e.to_string()),
        "settings" => Ok(Input::Settings),
        "quota" => Ok(Input::Quota),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Quit),
        other => Err(format!("unknown command: {}", other)),
    };

    result.unwrap_or_else(Input::Invalid)
}

fn optional(arg: &str) -> Option<String> {
    match arg {
        "" | "none" | "any" => None,
        other => Some(other.to_string()),
    }
}

fn position(arg: &str) -> std::result::Result<usize, String> {
    match arg.trim_start_matches('#').parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a result number, got '{}'", arg)),
    }
}

fn switch(arg: &str) -> std::result::Result<bool, String> {
    match arg.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("expected on/off, got '{}'", other)),
    }
}

const HELP: &str = "\
Commands:
  search <query>      free-text search            category <trending|stars|recent|recommendations>
  topic <name>        repositories with a topic   next / prev / page <n>
  lang <name|none>    language filter             stars <n>      minimum stars
  since <daily|weekly|monthly|yearly|none>        sort <stars|forks|updated|help-wanted-issues>
  reset               clear filters               open <n>       details for result n
  fav <n> / unfav <n> favorite result n           favorites      list favorites
  dismiss / save / view                           act on the current recommendation
  recs on|off  interval <secs>  dark on|off  layout grid|list  settings  quota  help  quit";

enum Done {
    Search(SearchCompletion),
    Detail(Box<RepositoryDetail>),
}

fn spawn(task: Task, provider: &Arc<dyn SearchProvider>, tx: &mpsc::UnboundedSender<Done>) {
    let provider = Arc::clone(provider);
    let tx = tx.clone();

    match task {
        Task::Search(pending) => {
            tokio::spawn(async move {
                let completion = pending.run(provider.as_ref()).await;
                // Receiver only goes away on quit
                let _ = tx.send(Done::Search(completion));
            });
        }
        Task::Open(repo) => {
            tokio::spawn(async move {
                let detail = fetch_detail(provider.as_ref(), repo).await;
                let _ = tx.send(Done::Detail(Box::new(detail)));
            });
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

pub async fn run(mut browser: Browser, github: Arc<GitHubProvider>) -> Result<()> {
    let provider = browser.provider();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    browser.refresh_quota().await;
    let initial = browser.start(Instant::now());
    spawn(Task::Search(initial), &provider, &tx);
    println!("{}\n", HELP);

    loop {
        for event in browser.drain_events() {
            render::event(&event, browser.preferences());
        }

        let deadline = browser.next_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = parse(&line);
                debug!("Input: {:?}", input);

                let command = match input {
                    Input::Command(command) => Some(command),
                    Input::Open(n) => listing_id(&browser, n).map(Command::OpenRepository),
                    Input::Favorite(n) => listing_id(&browser, n).map(Command::AddFavorite),
                    Input::Unfavorite(n) => listing_id(&browser, n).map(Command::RemoveFavorite),
                    Input::Filter(edit) => {
                        Some(Command::ApplyFilters(edit.apply(browser.filters().clone())))
                    }
                    Input::ListFavorites => {
                        render::favorites(browser.preferences().favorites().list());
                        None
                    }
                    Input::Settings => {
                        render::settings(browser.preferences());
                        None
                    }
                    Input::Quota => {
                        render::rate_limit(
                            &browser.rate_limit_state(),
                            github.client().time_until_reset(),
                            &github.client().request_log(),
                        );
                        None
                    }
                    Input::Help => {
                        println!("{}", HELP);
                        None
                    }
                    Input::Quit => break,
                    Input::Empty => None,
                    Input::Invalid(message) => {
                        println!("{}", message);
                        None
                    }
                };

                if let Some(command) = command {
                    match browser.dispatch(command, Instant::now()) {
                        Ok(Some(task)) => spawn(task, &provider, &tx),
                        Ok(None) => {}
                        Err(e) => eprintln!("✗ {}", e),
                    }
                }
            }
            Some(done) = rx.recv() => match done {
                Done::Search(completion) => {
                    browser.complete_search(completion, Instant::now());
                }
                Done::Detail(detail) => browser.complete_open(*detail),
            },
            _ = wait_until(deadline) => browser.tick(Instant::now()),
        }
    }

    Ok(())
}

fn listing_id(browser: &Browser, n: usize) -> Option<u64> {
    match browser.listing().get(n - 1) {
        Some(repo) => Some(repo.id),
        None => {
            println!("No result #{} on this page", n);
            None
        }
    }
}
