//! Command-line front end
//!
//! Argument definitions (clap derive) and the command runners. The binary
//! only parses arguments, sets up logging and loads the configuration.

mod commands;
pub mod render;

pub use commands::run;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::feed::{AlbumFilter, ReviewFilter, SortKey};
use crate::models::{MAX_RATING, MIN_RATING};

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and review music from the terminal")]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search Spotify artists by name
    Search { name: String },

    /// Show an artist with its albums and reviews
    Artist {
        /// Spotify artist id
        id: String,
        /// Also list the artist's top tracks
        #[arg(long)]
        top_tracks: bool,
        /// Market for top tracks (defaults to the configured one)
        #[arg(long)]
        market: Option<String>,
    },

    /// List, submit or delete reviews
    Reviews {
        #[command(subcommand)]
        command: ReviewsCommand,
    },

    /// Log in and remember the session
    Login {
        #[arg(long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Confirmation; defaults to the password
        #[arg(long)]
        password2: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show your profile and your reviews
    Profile,

    /// Show whether a session is stored
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum ReviewsCommand {
    /// List reviews with optional filters
    List(ListArgs),
    /// Post a review of an artist or one of its albums
    Submit(SubmitArgs),
    /// Delete a review (administrators)
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only reviews of this Spotify artist (filtered by the backend)
    #[arg(long)]
    pub artist_id: Option<String>,
    /// Case-insensitive text search
    #[arg(long)]
    pub search: Option<String>,
    /// Exact artist name
    #[arg(long)]
    pub artist: Option<String>,
    /// Exact album title
    #[arg(long, conflicts_with = "no_album")]
    pub album: Option<String>,
    /// Only reviews not attached to an album
    #[arg(long)]
    pub no_album: bool,
    #[arg(long, value_parser = clap::value_parser!(u8).range(MIN_RATING as i64..=MAX_RATING as i64))]
    pub min_rating: Option<u8>,
    /// newest, oldest, rating_desc or rating_asc
    #[arg(long, default_value_t = SortKey::Newest)]
    pub sort: SortKey,
}

impl ListArgs {
    pub fn to_filter(&self) -> ReviewFilter {
        let album = match (&self.album, self.no_album) {
            (_, true) => AlbumFilter::Untitled,
            (Some(title), false) if title.trim().is_empty() => AlbumFilter::Untitled,
            (Some(title), false) => AlbumFilter::Named(title.clone()),
            (None, false) => AlbumFilter::Any,
        };
        ReviewFilter {
            search: self.search.clone().unwrap_or_default(),
            artist: self.artist.clone(),
            album,
            min_rating: self.min_rating,
            sort: self.sort,
        }
    }
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub content: String,
    #[arg(long, value_parser = clap::value_parser!(u8).range(MIN_RATING as i64..=MAX_RATING as i64))]
    pub rating: u8,
    /// Free-form artist name
    #[arg(long, required_unless_present = "artist_id", conflicts_with = "artist_id")]
    pub artist: Option<String>,
    /// Spotify artist id; the name is looked up
    #[arg(long)]
    pub artist_id: Option<String>,
    /// Spotify album id of that artist
    #[arg(long, requires = "artist_id", conflicts_with = "artist")]
    pub album_id: Option<String>,
}
