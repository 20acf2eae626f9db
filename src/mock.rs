use std::collections::BTreeSet;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use jiff::{
    Timestamp,
    civil::{Date, Time, time},
};
use tokio::sync::RwLock;

use crate::{
    backend::BackendError,
    location::AVAILABLE_LOCATIONS,
    models::{AuthSession, Booking, Movie, NewBooking, PaymentStatus, Showtime, Theater},
};

const SLOTS: [(i8, i8); 5] = [(10, 0), (13, 0), (16, 0), (19, 0), (22, 0)];
const MIN_PASSWORD: usize = 6;

struct MockData {
    movies: Vec<Movie>,
    theaters: Vec<Theater>,
    showtimes: Vec<Showtime>,
    scheduled: BTreeSet<Date>,
    bookings: Vec<Booking>,
}

impl MockData {
    /// Schedules `from` and the following day the first time either is asked for.
    fn schedule_from(&mut self, from: Date) {
        for date in [from, from.tomorrow().unwrap_or(from)] {
            if self.scheduled.insert(date) {
                let shows = showtimes_on(&self.movies, &self.theaters, date);
                self.showtimes.extend(shows);
            }
        }
    }
}

/// In-memory stand-in for the hosted backend, used when no backend URL is configured.
pub struct MockBackend {
    data: RwLock<MockData>,
    #[cfg(test)]
    fail_updates: AtomicBool,
}

impl MockBackend {
    pub fn seeded() -> Self {
        let data = MockData {
            movies: seed_movies(),
            theaters: seed_theaters(),
            showtimes: Vec::new(),
            scheduled: BTreeSet::new(),
            bookings: Vec::new(),
        };
        Self {
            data: RwLock::new(data),
            #[cfg(test)]
            fail_updates: AtomicBool::new(false),
        }
    }

    pub async fn list_movies(&self, category: Option<&str>) -> Vec<Movie> {
        let data = self.data.read().await;
        let mut out: Vec<Movie> = data
            .movies
            .iter()
            .filter(|m| category.is_none() || m.category.as_deref() == category)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.rating_value().total_cmp(&a.rating_value()));
        out
    }

    pub async fn search_movies(&self, term: &str, limit: usize) -> Vec<Movie> {
        let needle = term.to_lowercase();
        let mut out: Vec<Movie> = self
            .list_movies(None)
            .await
            .into_iter()
            .filter(|m| {
                m.title.to_lowercase().contains(&needle)
                    || m.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect();
        out.truncate(limit);
        out
    }

    pub async fn get_movie(&self, id: &str) -> Option<Movie> {
        self.data.read().await.movies.iter().find(|m| m.id == id).cloned()
    }

    pub async fn showtimes_for_movie(&self, movie_id: &str, from: Date) -> Vec<Showtime> {
        let mut data = self.data.write().await;
        data.schedule_from(from);
        let mut out: Vec<Showtime> = data
            .showtimes
            .iter()
            .filter(|s| s.movie_id == movie_id && s.is_active == Some(true) && s.show_date >= from)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.show_time);
        out
    }

    pub async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, BackendError> {
        let mut data = self.data.write().await;
        if !data.movies.iter().any(|m| m.id == booking.movie_id) {
            return Err(BackendError::Api {
                status: 409,
                message: "insert or update on table \"bookings\" violates foreign key constraint"
                    .to_string(),
            });
        }

        let row = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: booking.user_id.clone(),
            movie_id: booking.movie_id.clone(),
            seats: booking.seats.clone(),
            show_time: booking.show_time,
            total_price: booking.total_price,
            payment_status: booking.payment_status,
            booking_date: Timestamp::now(),
        };
        data.bookings.push(row.clone());
        Ok(row)
    }

    pub async fn update_payment_status(
        &self,
        user_id: &str,
        booking_id: &str,
        status: PaymentStatus,
    ) -> Result<(), BackendError> {
        #[cfg(test)]
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(BackendError::Api { status: 503, message: "service unavailable".to_string() });
        }

        let mut data = self.data.write().await;
        let booking = data
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id && b.user_id == user_id)
            .ok_or(BackendError::NotFound("booking"))?;
        booking.payment_status = status;
        Ok(())
    }

    pub async fn list_bookings(&self, user_id: &str) -> Vec<Booking> {
        let data = self.data.read().await;
        let mut out: Vec<Booking> =
            data.bookings.iter().filter(|b| b.user_id == user_id).cloned().collect();
        out.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        out
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') || password.len() < MIN_PASSWORD {
            return Err(BackendError::Auth("Invalid login credentials".to_string()));
        }
        let user_id = format!("user-{:08x}", fnv1a(&email));
        Ok(AuthSession { access_token: format!("mock-token-{user_id}"), user_id, email })
    }

    #[cfg(test)]
    pub async fn upsert_movie(&self, movie: Movie) {
        let mut data = self.data.write().await;
        match data.movies.iter_mut().find(|m| m.id == movie.id) {
            Some(existing) => *existing = movie,
            None => data.movies.push(movie),
        }
    }

    #[cfg(test)]
    pub async fn remove_movie(&self, id: &str) {
        self.data.write().await.movies.retain(|m| m.id != id);
    }

    #[cfg(test)]
    pub async fn remove_showtime(&self, id: &str) {
        self.data.write().await.showtimes.retain(|s| s.id != id);
    }

    /// Makes every later payment status update fail, as if the backend were down.
    #[cfg(test)]
    pub fn fail_payment_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

fn fnv1a(s: &str) -> u32 {
    s.bytes().fold(0x811c_9dc5u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193))
}

fn movie(
    n: u32,
    title: &str,
    rating: f64,
    genres: &[&str],
    duration: Option<i32>,
    category: &str,
    description: &str,
) -> Movie {
    let showing = rating > 0.0;
    Movie {
        id: format!("movie-{n}"),
        title: title.to_string(),
        description: Some(description.to_string()),
        poster_url: Some(format!("https://picsum.photos/seed/movie-{n}/400/600")),
        trailer_url: None,
        rating: Some(rating),
        votes: showing.then_some(i64::from(n) * 37_000 + 120_000),
        duration,
        genres: Some(genres.iter().map(|g| g.to_string()).collect()),
        release_date: None,
        category: Some(category.to_string()),
        is_available: Some(showing),
    }
}

fn seed_movies() -> Vec<Movie> {
    vec![
        movie(1, "Dune: Part Two", 8.8, &["Action", "Adventure", "Sci-Fi"], Some(166), "movies",
            "Paul Atreides unites with Chani and the Fremen while seeking revenge against the conspirators who destroyed his family."),
        movie(2, "Oppenheimer", 8.9, &["Biography", "Drama", "History"], Some(180), "movies",
            "The story of J. Robert Oppenheimer and the race to build the atomic bomb."),
        movie(3, "The Batman", 8.1, &["Action", "Crime", "Drama"], Some(176), "movies",
            "Batman ventures into Gotham City's underworld when a sadistic killer leaves behind a trail of cryptic clues."),
        movie(4, "Avatar: The Way of Water", 7.8, &["Action", "Adventure", "Fantasy"], Some(192), "movies",
            "Jake Sully lives with his newfound family formed on the extrasolar moon Pandora."),
        movie(5, "John Wick 4", 8.2, &["Action", "Crime", "Thriller"], Some(169), "movies",
            "John Wick uncovers a path to defeating The High Table."),
        movie(6, "Spider-Man: Across the Spider-Verse", 8.7, &["Animation", "Action", "Adventure"], Some(140), "movies",
            "Miles Morales catapults across the Multiverse."),
        movie(7, "Guardians of the Galaxy Vol. 3", 8.0, &["Action", "Adventure", "Comedy"], Some(150), "movies",
            "Peter Quill rallies his team to defend the universe and protect one of their own."),
        movie(8, "Deadpool 3", 0.0, &["Action", "Comedy", "Sci-Fi"], None, "movies",
            "The merc with a mouth returns."),
        movie(9, "Furiosa", 0.0, &["Action", "Adventure", "Sci-Fi"], None, "movies",
            "The origin story of renegade warrior Furiosa."),
        movie(10, "Kingdom of the Planet of the Apes", 0.0, &["Action", "Adventure", "Drama"], None, "movies",
            "Many years after the reign of Caesar, a young ape goes on a journey."),
        movie(11, "The Fall Guy", 0.0, &["Action", "Comedy"], None, "movies",
            "A stuntman is drawn back into service when the star of a mega-budget film goes missing."),
        movie(12, "Godzilla x Kong", 0.0, &["Action", "Sci-Fi", "Thriller"], None, "movies",
            "Two ancient titans clash in an epic battle."),
        movie(13, "Sunburn Arena: Live", 9.1, &["Music", "Concert"], Some(240), "events",
            "An evening of electronic music under the open sky."),
        movie(14, "Hamlet Reimagined", 8.4, &["Drama", "Theatre"], Some(150), "plays",
            "Shakespeare's tragedy staged in a modern newsroom."),
    ]
}

fn seed_theaters() -> Vec<Theater> {
    AVAILABLE_LOCATIONS
        .iter()
        .flat_map(|city| {
            let slug = city.to_lowercase();
            [
                Theater {
                    id: format!("theater-{slug}-pvr"),
                    name: format!("PVR {city} Central"),
                    location: city.to_string(),
                    address: Some(format!("Central Mall, {city}")),
                    amenities: Some(vec!["Dolby Atmos".to_string(), "Recliners".to_string()]),
                },
                Theater {
                    id: format!("theater-{slug}-inox"),
                    name: format!("INOX {city} Megaplex"),
                    location: city.to_string(),
                    address: None,
                    amenities: Some(vec!["IMAX".to_string(), "4K Laser".to_string()]),
                },
            ]
        })
        .collect()
}

fn showtimes_on(movies: &[Movie], theaters: &[Theater], date: Date) -> Vec<Showtime> {
    let mut out = Vec::new();

    for (mi, movie) in movies.iter().enumerate() {
        if movie.is_available != Some(true) {
            continue;
        }
        for (ti, theater) in theaters.iter().enumerate() {
            let price = if theater.id.ends_with("-inox") { 300.0 } else { 250.0 };
            for k in 0..3 {
                let (h, m) = SLOTS[(mi + ti + k * 2) % SLOTS.len()];
                let show_time: Time = time(h, m, 0, 0);
                out.push(Showtime {
                    id: format!("st-{}-{}-{}-{:02}{:02}", movie.id, theater.id, date, h, m),
                    movie_id: movie.id.clone(),
                    theater_id: theater.id.clone(),
                    show_date: date,
                    show_time,
                    available_seats: 96,
                    price,
                    is_active: Some(true),
                    theater: theater.clone(),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MockBackend {
        MockBackend::seeded()
    }

    #[tokio::test]
    async fn movies_are_ordered_by_rating_and_filtered_by_category() {
        let mock = backend();
        let all = mock.list_movies(None).await;
        assert_eq!(all[0].title, "Sunburn Arena: Live");
        assert!(all.windows(2).all(|w| w[0].rating_value() >= w[1].rating_value()));

        let events = mock.list_movies(Some("events")).await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn search_matches_title_and_description() {
        let mock = backend();
        assert_eq!(mock.search_movies("dune", 10).await.len(), 1);
        assert_eq!(mock.search_movies("fremen", 10).await[0].title, "Dune: Part Two");
        assert_eq!(mock.search_movies("a", 3).await.len(), 3);
    }

    #[tokio::test]
    async fn showtimes_only_for_now_showing_movies() {
        let mock = backend();
        let today = jiff::civil::date(2025, 10, 18);
        let shows = mock.showtimes_for_movie("movie-1", today).await;
        assert_eq!(shows.len(), AVAILABLE_LOCATIONS.len() * 2 * 2 * 3);
        assert!(shows.windows(2).all(|w| w[0].show_time <= w[1].show_time));

        assert!(mock.showtimes_for_movie("movie-8", today).await.is_empty());
        let tomorrow = jiff::civil::date(2025, 10, 19);
        assert_eq!(mock.showtimes_for_movie("movie-1", tomorrow).await.len(), shows.len());
    }

    #[tokio::test]
    async fn schedule_follows_the_requested_date() {
        let mock = backend();
        let later = jiff::civil::date(2026, 3, 1);
        let shows = mock.showtimes_for_movie("movie-1", later).await;
        assert!(!shows.is_empty());
        assert!(shows.iter().all(|s| s.show_date >= later));
        assert!(shows.iter().any(|s| s.show_date == jiff::civil::date(2026, 3, 2)));

        let first = shows[0].id.clone();
        mock.remove_showtime(&first).await;
        let again = mock.showtimes_for_movie("movie-1", later).await;
        assert_eq!(again.len(), shows.len() - 1);
        assert!(again.iter().all(|s| s.id != first));
    }

    #[tokio::test]
    async fn payment_updates_can_be_made_to_fail() {
        let mock = backend();
        let session = mock.sign_in("asha@example.com", "secret1").unwrap();
        let booking = mock
            .create_booking(&NewBooking {
                user_id: session.user_id.clone(),
                movie_id: "movie-1".to_string(),
                seats: vec!["A1".to_string()],
                show_time: Timestamp::UNIX_EPOCH,
                total_price: 250.0,
                payment_status: PaymentStatus::Pending,
            })
            .await
            .unwrap();

        mock.fail_payment_updates(true);
        assert!(mock.update_payment_status(&session.user_id, &booking.id, PaymentStatus::Paid).await.is_err());
        mock.fail_payment_updates(false);
        mock.update_payment_status(&session.user_id, &booking.id, PaymentStatus::Paid).await.unwrap();
    }

    #[tokio::test]
    async fn bookings_are_scoped_to_their_user() {
        let mock = backend();
        let session = mock.sign_in("asha@example.com", "secret1").unwrap();
        let booking = mock
            .create_booking(&NewBooking {
                user_id: session.user_id.clone(),
                movie_id: "movie-1".to_string(),
                seats: vec!["A1".to_string()],
                show_time: Timestamp::UNIX_EPOCH,
                total_price: 250.0,
                payment_status: PaymentStatus::Pending,
            })
            .await
            .unwrap();

        assert!(mock.update_payment_status("someone-else", &booking.id, PaymentStatus::Paid).await.is_err());
        mock.update_payment_status(&session.user_id, &booking.id, PaymentStatus::Paid).await.unwrap();

        let mine = mock.list_bookings(&session.user_id).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].payment_status, PaymentStatus::Paid);
        assert!(mock.list_bookings("someone-else").await.is_empty());
    }

    #[test]
    fn sign_in_is_stable_per_email() {
        let mock = backend();
        let a = mock.sign_in("Asha@Example.com", "secret1").unwrap();
        let b = mock.sign_in("asha@example.com", "another").unwrap();
        assert_eq!(a.user_id, b.user_id);
        assert!(mock.sign_in("asha@example.com", "short").is_err());
        assert!(mock.sign_in("not-an-email", "secret1").is_err());
    }
}
