// Plain-text rendering of UI events
use browsealizer_api::{RateLimitState, RequestLogEntry, LOW_QUOTA_THRESHOLD};
use browsealizer_core::format::{compact_count, format_count, format_size_kb, relative_date};
use browsealizer_core::{
    FavoriteEntry, NoticeLevel, PageItem, Pagination, Preferences, Repository, RepositoryDetail,
    SearchPage, UiEvent, ViewMode,
};
use chrono::Utc;
use termimad::MadSkin;

pub fn event(event: &UiEvent, prefs: &Preferences) {
    match event {
        UiEvent::Loading { title } => println!("Loading {}...", title),
        UiEvent::SearchCompleted { title, page } => listing(title, page, prefs.view()),
        UiEvent::NoResults { title } => {
            println!("\n{}\n", title);
            println!("No repositories found.");
        }
        UiEvent::SearchFailed { message } => println!("\n{}", message),
        UiEvent::PaginationChanged(pagination) => pager(pagination),
        UiEvent::DetailOpened(detail) => self::detail(detail, prefs.dark_mode()),
        UiEvent::RecommendationShown(repo) => recommendation(repo, prefs),
        UiEvent::RecommendationHidden => println!("(recommendation dismissed)"),
        UiEvent::FavoritesChanged(entries) => {
            println!("{} favorite(s)", entries.len());
        }
        UiEvent::SettingsChanged => settings(prefs),
        UiEvent::OpenUrl(url) => println!("Open in your browser: {}", url),
        UiEvent::Notice { level, message } => notice(*level, message),
    }
}

fn notice(level: NoticeLevel, message: &str) {
    match level {
        NoticeLevel::Info => println!("ℹ {}", message),
        NoticeLevel::Success => println!("✓ {}", message),
        NoticeLevel::Warning => eprintln!("⚠ {}", message),
        NoticeLevel::Error => eprintln!("✗ {}", message),
    }
}

fn listing(title: &str, page: &SearchPage, view: ViewMode) {
    println!(
        "\n{} - {} repositories (page {} of {})\n",
        title,
        format_count(page.total_count),
        page.page,
        page.total_pages
    );

    let now = Utc::now();
    for (i, repo) in page.items.iter().enumerate() {
        match view {
            ViewMode::Grid => println!(
                "{:>3}. {:<45} ★ {:>6}  ⑂ {:>6}  {}",
                i + 1,
                repo.full_name,
                compact_count(u64::from(repo.stars)),
                compact_count(u64::from(repo.forks)),
                repo.language.as_deref().unwrap_or("")
            ),
            ViewMode::List => {
                println!("{:>3}. {}", i + 1, repo.full_name);
                println!(
                    "     {}",
                    repo.description
                        .as_deref()
                        .unwrap_or("No description available")
                );
                let tags = repo.tags();
                if !tags.is_empty() {
                    println!("     [{}]", tags.join("] ["));
                }
                println!(
                    "     ★ {}  ⑂ {}  👁 {}  updated {}\n",
                    format_count(u64::from(repo.stars)),
                    format_count(u64::from(repo.forks)),
                    format_count(u64::from(repo.watchers)),
                    relative_date(repo.updated_at, now)
                );
            }
        }
    }
}

fn pager(pagination: &Pagination) {
    if !pagination.is_visible() {
        return;
    }

    let buttons: Vec<String> = pagination
        .window()
        .into_iter()
        .map(|item| match item {
            PageItem::Page {
                number,
                current: true,
            } => format!("[{}]", number),
            PageItem::Page { number, .. } => number.to_string(),
            PageItem::Ellipsis => "…".to_string(),
        })
        .collect();

    let prev = if pagination.has_prev() { "‹ prev" } else { "      " };
    let next = if pagination.has_next() { "next ›" } else { "" };
    println!("\n{}  {}  {}", prev, buttons.join(" "), next);
}

pub fn recommendation(repo: &Repository, prefs: &Preferences) {
    let favorite = if prefs.is_favorite(repo.id) {
        "♥ in favorites"
    } else {
        "♡ 'save' to favorite"
    };

    println!("\n┌─ You might like ─────────────────────────");
    println!("│ {}", repo.full_name);
    println!(
        "│ {}",
        repo.description
            .as_deref()
            .unwrap_or("No description available")
    );
    println!(
        "│ ★ {} stars  ⑂ {} forks  {}  updated {}",
        format_count(u64::from(repo.stars)),
        format_count(u64::from(repo.forks)),
        repo.language.as_deref().unwrap_or("Not specified"),
        relative_date(repo.updated_at, Utc::now())
    );
    let tags = repo.tags();
    if !tags.is_empty() {
        println!("│ [{}]", tags.join("] ["));
    }
    println!("│ {}  ·  'view' to open  ·  'dismiss'", favorite);
    println!("└──────────────────────────────────────────");
}

pub fn detail(detail: &RepositoryDetail, dark_mode: bool) {
    let repo = &detail.repository;
    let now = Utc::now();

    println!("\n══ {} ══", repo.full_name);
    if let Some(desc) = &repo.description {
        println!("{}", desc);
    }
    println!(
        "★ {} stars  ⑂ {} forks  👁 {} watchers  {} open issues",
        format_count(u64::from(repo.stars)),
        format_count(u64::from(repo.forks)),
        format_count(u64::from(repo.watchers)),
        format_count(u64::from(repo.open_issues))
    );
    println!(
        "Created {}  ·  Last push {}  ·  Size {}  ·  Branch {}",
        relative_date(repo.created_at, now),
        relative_date(repo.pushed_at, now),
        format_size_kb(repo.size),
        repo.default_branch
    );
    if let Some(license) = &repo.license {
        println!("License: {}", license);
    }
    if let Some(homepage) = &repo.homepage_url {
        println!("Homepage: {}", homepage);
    }
    if repo.is_archived {
        println!("This repository is archived.");
    }
    println!("{}", repo.url);

    println!("\n── README ──");
    match &detail.readme {
        Ok(Some(markdown)) => {
            let skin = if dark_mode {
                MadSkin::default_dark()
            } else {
                MadSkin::default_light()
            };
            skin.print_text(markdown);
        }
        Ok(None) => println!("No README found for this repository."),
        Err(e) => println!("{}", e),
    }

    println!("\n── Commit activity (last 12 weeks) ──");
    match &detail.activity {
        Ok(activity) if activity.is_empty() => println!("No commit activity data available."),
        Ok(activity) => {
            let peak = activity.weeks.iter().map(|w| w.total).max().unwrap_or(0).max(1);
            for week in &activity.weeks {
                let bar = "▇".repeat((week.total * 30 / peak) as usize);
                println!("{}  {:<30} {}", week.week_start.format("%b %d"), bar, week.total);
            }
            println!("{} commits in the last 12 weeks", activity.total_commits());
        }
        Err(e) => println!("{}", e),
    }

    println!("\n── Open issues ──");
    match &detail.issues {
        Ok(issues) if issues.is_empty() => println!("No open issues found."),
        Ok(issues) => {
            for issue in issues {
                let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
                println!(
                    "#{} {} (by {}, {}, {} comments){}",
                    issue.number,
                    issue.title,
                    issue.author,
                    relative_date(issue.created_at, now),
                    issue.comments,
                    if labels.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", labels.join(", "))
                    }
                );
            }
        }
        Err(e) => println!("{}", e),
    }

    println!("\n── Contributors ──");
    match &detail.contributors {
        Ok(contributors) if contributors.is_empty() => println!("No contributors found."),
        Ok(contributors) => {
            for c in contributors {
                println!("{:<24} {} contributions", c.login, format_count(u64::from(c.contributions)));
            }
        }
        Err(e) => println!("{}", e),
    }
}

pub fn favorites(entries: &[FavoriteEntry]) {
    if entries.is_empty() {
        println!("No favorites yet.");
        return;
    }

    let now = Utc::now();
    for entry in entries {
        println!(
            "{:<45} ★ {:>6}  {:<12} added {}",
            entry.name,
            compact_count(u64::from(entry.stars)),
            entry.language.as_deref().unwrap_or(""),
            relative_date(entry.added_at, now)
        );
    }
}

pub fn settings(prefs: &Preferences) {
    let on_off = |b: bool| if b { "on" } else { "off" };
    println!("Dark mode:        {}", on_off(prefs.dark_mode()));
    println!("Recommendations:  {}", on_off(prefs.show_recommendations()));
    println!(
        "Popup interval:   {}s",
        prefs.recommendation_interval().as_secs_f32()
    );
    println!(
        "View:             {}",
        match prefs.view() {
            ViewMode::Grid => "grid",
            ViewMode::List => "list",
        }
    );
}

pub fn rate_limit<'a>(
    state: &RateLimitState,
    reset: impl std::fmt::Display,
    log: impl IntoIterator<Item = &'a RequestLogEntry>,
) {
    let low = if state.remaining < LOW_QUOTA_THRESHOLD {
        " (low)"
    } else {
        ""
    };
    println!(
        "GitHub API rate limit: {}/{}{}. Resets in {}.",
        state.remaining, state.limit, low, reset
    );

    let recent: Vec<_> = log.into_iter().collect();
    if !recent.is_empty() {
        println!("\nRecent requests:");
        for entry in recent {
            println!("  {}  {}", entry.timestamp.format("%H:%M:%S"), entry.url);
        }
    }
}
