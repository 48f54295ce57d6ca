use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{render, Command, ListArgs, ReviewsCommand, SubmitArgs};
use crate::config::Config;
use crate::feed::ReviewFeed;
use crate::models::{LoginInput, NewReview, RegisterInput};
use crate::services::{AuthServiceError, ReviewDraft, ServiceContainer};

/// Execute one command against the configured services
pub async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    let services = ServiceContainer::from_config(config)?;
    let sync = config
        .session
        .sync_interval()
        .map(|every| services.tokens.spawn_sync(every));

    let result = dispatch(command, config, &services).await;

    if let Some(handle) = sync {
        handle.abort();
    }
    result
}

async fn dispatch(command: Command, config: &Config, services: &ServiceContainer) -> anyhow::Result<()> {
    match command {
        Command::Search { name } => search(services, &name).await,
        Command::Artist {
            id,
            top_tracks,
            market,
        } => {
            let market = market.unwrap_or_else(|| config.spotify.market.clone());
            artist(services, &id, top_tracks, &market).await
        }
        Command::Reviews { command } => match command {
            ReviewsCommand::List(args) => list_reviews(services, &args).await,
            ReviewsCommand::Submit(args) => submit_review(services, args).await,
            ReviewsCommand::Delete { id, yes } => delete_review(services, id, yes).await,
        },
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ").await?,
            };
            services
                .auth
                .login(&LoginInput { username, password })
                .await?;
            println!("Logged in.");
            Ok(())
        }
        Command::Register {
            username,
            email,
            password,
            password2,
        } => {
            let input = RegisterInput {
                username,
                email,
                password2: password2.unwrap_or_else(|| password.clone()),
                password,
            };
            register(services, &input).await
        }
        Command::Logout => {
            services.auth.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Profile => {
            let overview = services.profile.overview().await?;
            println!("{}", render::profile(&overview.profile));
            println!("\nMy reviews");
            println!("{}", render::reviews(&overview.reviews));
            Ok(())
        }
        Command::Whoami => {
            if !services.auth.is_authenticated() {
                println!("Not logged in.");
                return Ok(());
            }
            match services.profile.me().await {
                Ok(profile) => println!("Logged in as {}", profile.username),
                Err(e) => {
                    tracing::warn!("Could not load profile: {}", e);
                    // A dead session is cleared while loading the profile
                    if services.auth.is_authenticated() {
                        println!("Logged in.");
                    } else {
                        println!("Not logged in.");
                    }
                }
            }
            Ok(())
        }
    }
}

async fn search(services: &ServiceContainer, name: &str) -> anyhow::Result<()> {
    let artists = services.artists.search(name).await?;
    if artists.is_empty() {
        println!("No artists found.");
    }
    for artist in &artists {
        println!("{}", render::artist_line(artist));
    }
    Ok(())
}

async fn artist(services: &ServiceContainer, id: &str, top_tracks: bool, market: &str) -> anyhow::Result<()> {
    let detail = services.artists.detail(id).await?;

    println!("{}", render::artist(&detail.artist));
    println!("\nAlbums & Singles");
    for album in &detail.albums {
        println!("{}", render::album(album));
    }

    if top_tracks {
        let tracks = services.artists.top_tracks(id, market).await?;
        println!("\nTop tracks ({})", market);
        for (i, track) in tracks.iter().enumerate() {
            println!("{}", render::track(i + 1, track));
        }
    }

    println!("\nReviews");
    println!("{}", render::reviews(&detail.reviews));
    Ok(())
}

async fn list_reviews(services: &ServiceContainer, args: &ListArgs) -> anyhow::Result<()> {
    let reviews = services
        .reviews
        .list(args.artist_id.as_deref())
        .await
        .context("Failed to fetch reviews")?;
    let feed = ReviewFeed::with_filter(reviews, args.to_filter());

    println!("{}", render::feed(&feed));
    if services.auth.is_authenticated() && services.profile.is_admin().await {
        println!("\nAdministrator: remove a review with `mytune reviews delete <id>`.");
    }
    Ok(())
}

async fn submit_review(services: &ServiceContainer, args: SubmitArgs) -> anyhow::Result<()> {
    let draft = ReviewDraft {
        title: args.title,
        content: args.content,
        rating: args.rating,
    };

    match (args.artist_id, args.artist) {
        (Some(artist_id), _) => {
            let detail = services.artists.detail(&artist_id).await?;
            let album = match &args.album_id {
                Some(album_id) => Some(
                    detail
                        .albums
                        .iter()
                        .find(|a| &a.id == album_id)
                        .with_context(|| format!("{} has no album {}", detail.artist.name, album_id))?,
                ),
                None => None,
            };
            let reviews = services
                .artists
                .submit_review(&detail.artist, album, &draft)
                .await?;
            println!("Review submitted successfully!");
            println!("\nReviews");
            println!("{}", render::reviews(&reviews));
        }
        (None, Some(artist)) => {
            if args.album_id.is_some() {
                bail!("--album-id can only be used with --artist-id");
            }
            let review = NewReview::new(draft.title, draft.content, draft.rating, artist);
            services.reviews.submit(&review).await?;
            println!("Review submitted successfully!");
        }
        (None, None) => bail!("Either --artist or --artist-id is required"),
    }
    Ok(())
}

async fn delete_review(services: &ServiceContainer, id: i64, yes: bool) -> anyhow::Result<()> {
    if !yes {
        let answer = prompt("Are you sure you want to delete this review? [y/N] ").await?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Cancelled.");
            return Ok(());
        }
    }
    services
        .reviews
        .delete(id)
        .await
        .context("Failed to delete review")?;
    println!("Review {} deleted.", id);
    Ok(())
}

async fn register(services: &ServiceContainer, input: &RegisterInput) -> anyhow::Result<()> {
    match services.auth.register(input).await {
        Ok(message) => {
            println!("{}", message);
            println!("You can now log in with `mytune login --username {}`.", input.username);
            Ok(())
        }
        Err(AuthServiceError::Rejected { message, fields }) => {
            for (field, messages) in &fields {
                eprintln!("{}: {}", field, messages.join(" "));
            }
            bail!(message)
        }
        Err(e) => Err(e.into()),
    }
}

/// Ask on stderr, read one line from stdin
async fn prompt(question: &str) -> anyhow::Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(question.as_bytes()).await?;
    stderr.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
