use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::app::{AppContext, BroadsheetError, Result};
use crate::config::format_interval;
use crate::domain::{ArticleList, ArticleRecord, SyncEvent};
use crate::store::Store;

const WATCH_PREVIEW: usize = 5;

pub async fn refresh(ctx: &AppContext) -> Result<()> {
    println!("Refreshing {}", ctx.coordinator.feed_url());

    let report = ctx.coordinator.request_refresh().await?;

    println!(
        "Stored {} articles ({} skipped), snapshot {}",
        report.stored,
        report.skipped,
        report.snapshot.short_digest()
    );
    Ok(())
}

pub fn list_articles(ctx: &AppContext) -> Result<()> {
    let articles = ctx.bridge.list_all()?;

    if articles.is_empty() {
        println!("No articles cached. Run `broadsheet refresh` first.");
        return Ok(());
    }

    for article in articles.iter() {
        println!(
            "{:>6}  {}  {}",
            article.server_id,
            format_date(article),
            article.display_title()
        );
    }

    Ok(())
}

pub fn show_article(ctx: &AppContext, id: &str) -> Result<()> {
    let article = ctx
        .bridge
        .get_by_id(id)?
        .ok_or_else(|| BroadsheetError::ArticleNotFound(id.to_string()))?;

    println!("{}", article.display_title());
    println!("{}", byline(&article));
    if !article.photo_url.is_empty() {
        println!("Photo: {} (aspect {:.3})", article.photo_url, article.aspect_ratio);
    }
    println!();
    println!("{}", article.body);

    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    println!("Feed: {}", ctx.coordinator.feed_url());

    match ctx.store.snapshot_info()? {
        Some(info) => {
            println!("Articles: {}", info.article_count);
            println!(
                "Refreshed: {}",
                info.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Digest: {}", info.digest);
        }
        None => println!("No snapshot yet"),
    }

    Ok(())
}

/// Refresh on an interval until Ctrl-C, printing list and refresh updates.
pub async fn watch(ctx: &AppContext, every: Duration, initial_refresh: bool) -> Result<()> {
    watch_until(ctx, every, initial_refresh, tokio::signal::ctrl_c()).await
}

async fn watch_until<F>(
    ctx: &AppContext,
    every: Duration,
    initial_refresh: bool,
    shutdown: F,
) -> Result<()>
where
    F: Future,
{
    println!(
        "Watching {} (refresh every {}, Ctrl-C to stop)",
        ctx.coordinator.feed_url(),
        format_interval(every)
    );

    let list_subscription = ctx.bridge.subscribe(|articles| {
        println!("{}", summarize(&articles));
    });
    let refresh_subscription = ctx.bridge.watch_refresh(|event| {
        println!("{}", describe_event(event));
    });

    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    if !initial_refresh {
        // The first tick completes immediately
        timer.tick().await;
    }

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = timer.tick() => {
                let coordinator = ctx.coordinator.clone();
                // Outcome arrives through the refresh subscription
                tokio::spawn(async move {
                    let _ = coordinator.request_refresh().await;
                });
            }
        }
    }

    refresh_subscription.unsubscribe();
    list_subscription.unsubscribe();
    println!("Stopped watching");
    Ok(())
}

fn format_date(article: &ArticleRecord) -> String {
    article
        .published_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown   ".to_string())
}

fn byline(article: &ArticleRecord) -> String {
    let date = article
        .published_date
        .map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| "Unknown date".to_string());

    if article.author.is_empty() {
        date
    } else {
        format!("{} by {}", date, article.author)
    }
}

fn summarize(articles: &ArticleList) -> String {
    let mut out = format!("{} articles cached", articles.len());
    for article in articles.iter().take(WATCH_PREVIEW) {
        out.push_str(&format!("\n  {}  {}", format_date(article), article.display_title()));
    }
    if articles.len() > WATCH_PREVIEW {
        out.push_str(&format!("\n  ... and {} more", articles.len() - WATCH_PREVIEW));
    }
    out
}

fn describe_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::Refreshing => "Refreshing...".to_string(),
        SyncEvent::Succeeded(report) if report.skipped > 0 => format!(
            "Refreshed: {} articles ({} entries skipped)",
            report.stored, report.skipped
        ),
        SyncEvent::Succeeded(report) => format!("Refreshed: {} articles", report.stored),
        SyncEvent::Failed(e) => format!("Refresh failed ({}): {}", e.cause(), e),
    }
}
