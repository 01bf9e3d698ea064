//! Command handlers. Each one is a thin view: call the portal API, print the result.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use docportal_core::api::ApiError;
use docportal_core::models::{ContentUpdate, Feedback, NewContent, Upload};
use docportal_core::utils::{filter_by_name, format_date, or_dash, strip_html, truncate};
use docportal_core::{Config, PortalApi};

use crate::Command;

const ENV_EMAIL: &str = "DOCPORTAL_EMAIL";
const ENV_PASSWORD: &str = "DOCPORTAL_PASSWORD";

/// Column width for titles in listings
const TITLE_WIDTH: usize = 40;

/// Column width for descriptions in listings
const DESCRIPTION_WIDTH: usize = 50;

/// Column width for tag lists in listings
const TAGS_WIDTH: usize = 30;

pub async fn run(command: Command, api: &PortalApi, mut config: Config) -> Result<()> {
    match command {
        Command::Login { email } => login(api, &mut config, email).await,
        Command::Logout => {
            api.session().logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Status => status(api, &config),
        Command::Categories => categories(api, &config).await,
        Command::Contents { category, page } => contents(api, category, page).await,
        Command::Show { id } => show(api, id).await,
        Command::Add { category, title, notes, file, tags } => {
            let content = NewContent {
                category_id: category,
                title,
                notes,
                media_file: file.as_deref().map(read_upload).transpose()?,
                tag_ids: tags,
            };
            api.create_content(&content).await?;
            println!("Content added successfully.");
            Ok(())
        }
        Command::Edit { id, title, notes, files, tags } => edit(api, id, title, notes, files, tags).await,
        Command::Tags => tags(api).await,
        Command::TagAdd { name } => {
            api.create_tag(&name).await?;
            println!("Tag added successfully.");
            Ok(())
        }
        Command::Feedback { title, message } => {
            let feedback = Feedback::new(&title, &message)
                .map_err(|errors| anyhow::anyhow!(errors.messages().join(" ")))?;
            api.submit_feedback(&feedback).await?;
            println!("Thank you for your feedback.");
            Ok(())
        }
        Command::Search { query } => search(api, &query).await,
    }
}

async fn login(api: &PortalApi, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email
        .or_else(|| std::env::var(ENV_EMAIL).ok())
        .or_else(|| config.last_email.clone())
    {
        Some(email) if !email.trim().is_empty() => email.trim().to_string(),
        _ => prompt("Email: ")?,
    };

    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    if email.is_empty() || password.is_empty() {
        anyhow::bail!("Email and password required");
    }

    println!("Authenticating...");
    match api.session().login(&email, &password).await {
        Ok(_) => {}
        Err(ApiError::Unauthorized) => anyhow::bail!("Invalid email or password"),
        Err(e) => return Err(e).context("Login failed"),
    }

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    info!("Login successful");
    println!("Login successful!");
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn status(api: &PortalApi, config: &Config) -> Result<()> {
    println!("API:      {}", config.base_url());
    println!("Locale:   {}", api.locale());
    println!("Storage:  {:?}", config.token_backend);

    match api.session().credentials()? {
        Some(pair) => {
            let refresh = if pair.refresh_token().is_some() { "yes" } else { "no" };
            if pair.is_expired() {
                println!("Session:  signed in (access token expired, refreshed on next call)");
            } else if let Some(minutes) = pair.minutes_until_expiry() {
                println!("Session:  signed in (access token valid for ~{} min)", minutes);
            } else {
                println!("Session:  signed in");
            }
            println!("Refresh:  {}", refresh);
        }
        None => println!("Session:  not signed in"),
    }
    Ok(())
}

async fn categories(api: &PortalApi, config: &Config) -> Result<()> {
    let categories = api.categories().await?;
    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }
    let host = config.service_host();
    for category in &categories {
        let icon = category.icon_url(&host);
        println!(
            "{:>5}  {:<30}  {:<10}  {}",
            category.id,
            truncate(&category.name, 30),
            category.display_content_count(),
            or_dash(icon.as_deref()),
        );
    }
    Ok(())
}

async fn contents(api: &PortalApi, category: Option<i64>, page: u32) -> Result<()> {
    let page = api.category_contents(category, page).await?;
    if page.is_empty() {
        println!("No records found.");
        return Ok(());
    }

    println!(
        "{:>4}  {:>6}  {:<40}  {:<50}  {:<30}  {}",
        "#", "ID", "Title", "Description", "Tags", "Created At"
    );
    for (index, item) in page.data.iter().enumerate() {
        let description = item.description.as_deref().or(item.notes.as_deref()).map(strip_html);
        let tags = item.tag_names().join(", ");
        println!(
            "{:>4}  {:>6}  {:<40}  {:<50}  {:<30}  {}",
            page.row_number(index),
            item.id,
            truncate(item.display_title(), TITLE_WIDTH),
            truncate(or_dash(description.as_deref()), DESCRIPTION_WIDTH),
            truncate(or_dash(Some(tags.as_str())), TAGS_WIDTH),
            item.created_at.as_deref().map(format_date).unwrap_or_else(|| "-".to_string()),
        );
    }

    println!();
    println!("{}", page.display_position());
    if page.has_prev() || page.has_next() {
        let mut hints = Vec::new();
        if page.has_prev() {
            hints.push(format!("previous: --page {}", page.current_page - 1));
        }
        if page.has_next() {
            hints.push(format!("next: --page {}", page.current_page + 1));
        }
        println!("({})", hints.join(", "));
    }
    Ok(())
}

async fn show(api: &PortalApi, id: i64) -> Result<()> {
    let details = api.content(id).await?;
    let content = &details.content;

    println!("{}", content.title);
    println!("{}", "=".repeat(content.title.chars().count().max(1)));
    if let Some(notes) = content.notes.as_deref() {
        println!("{}", strip_html(notes));
    }
    if !content.media_file.is_empty() {
        println!();
        println!("Files:");
        for file in &content.media_file {
            println!("  {}", file);
        }
    }
    if !details.tags.is_empty() {
        let names: Vec<&str> = details.tags.iter().map(|t| t.tag.as_str()).collect();
        println!();
        println!("Tags: {}", names.join(", "));
    }
    Ok(())
}

async fn edit(
    api: &PortalApi,
    id: i64,
    title: Option<String>,
    notes: Option<String>,
    files: Vec<std::path::PathBuf>,
    tags: Option<Vec<i64>>,
) -> Result<()> {
    // Prefill from the current item so unspecified fields are kept
    let details = api.content(id).await?;
    let mut update = ContentUpdate::from_details(&details);

    if let Some(title) = title {
        update.title = title;
    }
    if let Some(notes) = notes {
        update.notes = notes;
    }
    if let Some(tags) = tags {
        update.tag_ids = tags;
    }
    update.media_files = files
        .iter()
        .map(|path| read_upload(path))
        .collect::<Result<Vec<_>>>()?;

    api.update_content(id, &update).await?;
    println!("Content updated successfully.");
    Ok(())
}

async fn tags(api: &PortalApi) -> Result<()> {
    let tags = api.tags().await?;
    if tags.is_empty() {
        println!("No tags found.");
    }
    for tag in &tags {
        println!("{:>5}  {}", tag.id, tag.tag);
    }
    Ok(())
}

async fn search(api: &PortalApi, query: &str) -> Result<()> {
    let (categories, tags) = futures::future::try_join(api.categories(), api.tags()).await?;

    let matched_categories = filter_by_name(&categories, query);
    let matched_tags = filter_by_name(&tags, query);

    if matched_categories.is_empty() && matched_tags.is_empty() {
        println!("No results found.");
        return Ok(());
    }
    for category in matched_categories {
        println!("category  {:>5}  {}", category.id, category.name);
    }
    for tag in matched_tags {
        println!("tag       {:>5}  {}", tag.id, tag.tag);
    }
    Ok(())
}

fn read_upload(path: &Path) -> Result<Upload> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", path.display()))?;
    Ok(Upload::new(file_name, bytes))
}
