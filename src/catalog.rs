use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    backend::BackendClient,
    cache::CacheManager,
    error::AppResult,
    models::{Movie, Showtime, TheaterWithShowtimes},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Category {
    #[default]
    Movies,
    Stream,
    Events,
    Plays,
    Sports,
    Activities,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Movies,
        Category::Stream,
        Category::Events,
        Category::Plays,
        Category::Sports,
        Category::Activities,
    ];

    pub fn parse(s: &str) -> Self {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(s.trim())).unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Movies => "Movies",
            Category::Stream => "Stream",
            Category::Events => "Events",
            Category::Plays => "Plays",
            Category::Sports => "Sports",
            Category::Activities => "Activities",
        }
    }

    /// Backend `category` column value; `Movies` lists everything.
    pub fn filter(self) -> Option<&'static str> {
        match self {
            Category::Movies => None,
            Category::Stream => Some("stream"),
            Category::Events => Some("events"),
            Category::Plays => Some("plays"),
            Category::Sports => Some("sports"),
            Category::Activities => Some("activities"),
        }
    }

    pub fn cache_key(self) -> &'static str {
        self.filter().unwrap_or("all")
    }

    fn emoji(self) -> &'static str {
        match self {
            Category::Movies => "🎬",
            Category::Stream => "📺",
            Category::Events => "🎉",
            Category::Plays => "🎭",
            Category::Sports => "⚽",
            Category::Activities => "🎯",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Section {
    #[default]
    NowShowing,
    Upcoming,
    Recommended,
    All,
}

impl Section {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "now-showing" => Section::NowShowing,
            "upcoming" => Section::Upcoming,
            "recommended" => Section::Recommended,
            _ => Section::All,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Section::NowShowing => "now-showing",
            Section::Upcoming => "upcoming",
            Section::Recommended => "recommended",
            Section::All => "all",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Section::NowShowing => "Now Showing",
            Section::Upcoming => "Coming Soon",
            Section::Recommended => "Recommended For You",
            Section::All => "All",
        }
    }
}

pub fn is_now_showing(movie: &Movie) -> bool {
    movie.is_available == Some(true) && movie.rating_value() > 0.0
}

pub fn is_upcoming(movie: &Movie) -> bool {
    !is_now_showing(movie)
}

pub fn now_showing(movies: &[Movie]) -> Vec<Movie> {
    movies.iter().filter(|m| is_now_showing(m)).cloned().collect()
}

pub fn upcoming(movies: &[Movie]) -> Vec<Movie> {
    movies.iter().filter(|m| is_upcoming(m)).cloned().collect()
}

pub fn recommended(movies: &[Movie]) -> Vec<Movie> {
    let mut out = now_showing(movies);
    out.reverse();
    out
}

pub fn featured(movies: &[Movie]) -> Option<&Movie> {
    movies.iter().find(|m| is_now_showing(m))
}

pub fn all_genres(movies: &[Movie]) -> Vec<String> {
    movies
        .iter()
        .flat_map(|m| m.genre_list().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn filter_movies(movies: &[Movie], section: Section, genre: Option<&str>) -> Vec<Movie> {
    let mut out = match section {
        Section::NowShowing => now_showing(movies),
        Section::Upcoming => upcoming(movies),
        Section::Recommended => recommended(movies),
        Section::All => movies.to_vec(),
    };
    if let Some(genre) = genre {
        out.retain(|m| m.genre_list().iter().any(|g| g == genre));
    }
    out
}

pub fn section_title(category: Category, section: Section, location: Option<&str>) -> String {
    let mut title = format!("{} {}", category.emoji(), section.name());
    if let Some(city) = location {
        title.push_str(" in ");
        title.push_str(city);
    }
    title
}

pub fn format_duration(minutes: Option<i32>) -> String {
    match minutes {
        Some(m) if m > 0 => {
            let (hrs, mins) = (m / 60, m % 60);
            if hrs > 0 { format!("{hrs}h {mins}m") } else { format!("{mins}m") }
        },
        _ => String::new(),
    }
}

/// Strips characters that carry meaning in the backend's filter grammar.
pub fn sanitize_search(query: &str) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '%' | '*' | '\\' | '"' | ':'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Groups showtimes by theater in first-seen order, keeping each theater's showtime order.
///
/// With a location selected only theaters in that city are kept.
pub fn group_by_theater(showtimes: Vec<Showtime>, location: Option<&str>) -> Vec<TheaterWithShowtimes> {
    let mut out: Vec<TheaterWithShowtimes> = Vec::new();
    for showtime in showtimes {
        if location.is_some_and(|city| !showtime.theater.location.eq_ignore_ascii_case(city)) {
            continue;
        }
        match out.iter_mut().find(|t| t.theater.id == showtime.theater.id) {
            Some(group) => group.showtimes.push(showtime),
            None => out.push(TheaterWithShowtimes { theater: showtime.theater.clone(), showtimes: vec![showtime] }),
        }
    }
    out
}

/// Movie list for a category, served from the local cache while it is fresh.
pub async fn load_movies(
    cache: &CacheManager,
    backend: &BackendClient,
    category: Category,
) -> AppResult<Vec<Movie>> {
    if let Some(movies) = cache.get_movies(category.cache_key()).await? {
        debug!(category = category.name(), count = movies.len(), "using cached movies");
        return Ok(movies);
    }

    let movies = backend.list_movies(category.filter()).await?;
    debug!(category = category.name(), count = movies.len(), "fetched movies");
    cache.put_movies(category.cache_key(), &movies).await?;
    Ok(movies)
}

pub async fn search(backend: &BackendClient, query: &str) -> AppResult<Vec<Movie>> {
    let term = sanitize_search(query);
    if term.is_empty() {
        return Ok(Vec::new());
    }
    Ok(backend.search_movies(&term).await?)
}
