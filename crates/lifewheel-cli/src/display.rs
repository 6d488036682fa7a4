//! Text rendering for wheels, history series, feedback and notices.

use chrono::NaiveDate;
use lifewheel_ai::{Classification, Source};
use lifewheel_core::{BaselineOrigin, Category, MAX_SCORE, Notice, User, format_score};
use lifewheel_session::UserView;

const BAR_WIDTH: usize = 10;

// ── Public API ──

/// One line per user: id, name, latest snapshot average.
pub fn print_users(views: &[UserView], today: NaiveDate) {
    println!("{:<4} {:<12} {}", "ID", "USER", "AVERAGE");
    for view in views {
        let average = view
            .history
            .at_or_before(today)
            .and_then(|(_, s)| s.average())
            .map(format_score)
            .unwrap_or_else(|| "-".to_string());
        println!("{:<4} {:<12} {}", view.user.id, view.user.username, average);
    }
}

/// Print a user's wheel as of `date` as a vertical card.
pub fn print_wheel_card(view: &UserView, date: NaiveDate) {
    let baseline = view.history.resolve(date);
    println!("=== {} ===", view.user.username);
    match baseline.origin {
        BaselineOrigin::Exact(d) => println!("Scores for {d}"),
        BaselineOrigin::CarriedForward(d) => println!("Scores for {date} (from {d})"),
        BaselineOrigin::Neutral => println!("Scores for {date} (no data yet, neutral)"),
    }
    println!();

    let scores = &baseline.scores;
    for category in Category::ALL {
        match scores.get(category) {
            Some(v) => println!("  {:<16} {} {}", category, score_bar(v), format_score(v)),
            None => println!("  {:<16} {}", category, "-"),
        }
    }
    println!();

    if let (Some(avg), Some((high, hv)), Some((low, lv))) =
        (scores.average(), scores.highest(), scores.lowest())
    {
        println!("  {:<16} {}", "average", format_score(avg));
        println!("  {:<16} {} ({})", "strongest", high, format_score(hv));
        println!("  {:<16} {} ({})", "weakest", low, format_score(lv));
        println!();
    }
}

/// Day-by-day scores for the `days` days ending at `end`.
pub fn print_history(view: &UserView, end: NaiveDate, days: u32) {
    println!("=== {} ({} days to {end}) ===", view.user.username, days);
    print!("{:<12}", "DATE");
    for category in Category::ALL {
        print!(" {:>6}", short_label(category));
    }
    println!(" {:>6}", "AVG");

    for (date, scores) in view.history.series(end, days) {
        print!("{:<12}", date.to_string());
        match scores {
            Some(scores) => {
                for category in Category::ALL {
                    let cell = scores.get(category).map(format_score).unwrap_or_default();
                    print!(" {:>6}", cell);
                }
                let avg = scores.average().map(format_score).unwrap_or_default();
                println!(" {:>6}", avg);
            }
            None => println!(" {:>6}", "-"),
        }
    }
}

/// Feedback received and given, with user ids resolved to names.
pub fn print_feedback(view: &UserView, users: &[User]) {
    let name = |id: &str| {
        users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| id.to_string())
    };

    println!("Feedback received ({})", view.feedback.received.len());
    for fb in &view.feedback.received {
        println!("  {} from {}: {}", fb.date, name(&fb.from), fb.text);
        print_categories(&fb.categories);
    }
    println!();

    println!("Feedback given ({})", view.feedback.given.len());
    for fb in &view.feedback.given {
        println!("  {} to {}: {}", fb.date, name(&fb.to), fb.text);
        print_categories(&fb.categories);
    }
}

pub fn print_classification(text: &str, classification: &Classification) {
    println!("Text: {text}");
    let via = match classification.source {
        Source::Remote => "model",
        Source::Fallback => "keywords",
        Source::Skipped => "none",
    };
    if classification.categories.is_empty() {
        println!("No categories detected ({via})");
    } else {
        let labels: Vec<&str> = classification.categories.iter().map(|c| c.label()).collect();
        println!("Categories ({via}): {}", labels.join(", "));
    }
}

/// Notices go to stderr so stdout stays clean.
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("{notice}");
    }
}

// ── Helpers ──

fn print_categories(categories: &[Category]) {
    if categories.is_empty() {
        return;
    }
    let labels: Vec<&str> = categories.iter().map(|c| c.label()).collect();
    println!("    [{}]", labels.join(", "));
}

fn score_bar(score: f64) -> String {
    let filled = ((score / MAX_SCORE) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn short_label(category: Category) -> &'static str {
    match category {
        Category::Career => "CAR",
        Category::Relationships => "REL",
        Category::PersonalGrowth => "GROW",
        Category::PhysicalHealth => "PHYS",
        Category::Finance => "FIN",
        Category::MentalHealth => "MENT",
    }
}
