use jiff::{
    Timestamp,
    civil::{Date, Time},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub votes: Option<i64>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub release_date: Option<Date>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl Movie {
    pub fn rating_value(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    pub fn genre_list(&self) -> &[String] {
        self.genres.as_deref().unwrap_or(&[])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theater {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Showtime {
    pub id: String,
    pub movie_id: String,
    pub theater_id: String,
    pub show_date: Date,
    pub show_time: Time,
    pub available_seats: i32,
    pub price: f64,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(rename = "theaters")]
    pub theater: Theater,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TheaterWithShowtimes {
    pub theater: Theater,
    pub showtimes: Vec<Showtime>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub movie_id: String,
    #[serde(default)]
    pub seats: Vec<String>,
    pub show_time: Timestamp,
    pub total_price: f64,
    pub payment_status: PaymentStatus,
    pub booking_date: Timestamp,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewBooking {
    pub user_id: String,
    pub movie_id: String,
    pub seats: Vec<String>,
    pub show_time: Timestamp,
    pub total_price: f64,
    pub payment_status: PaymentStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub return_to: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// A user-facing notification rendered at the top of the page.
#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), variant: ToastVariant::Default }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn showtime_deserializes_embedded_theater() {
        let json = r#"{
            "id": "st-1",
            "movie_id": "m-1",
            "theater_id": "t-1",
            "show_date": "2025-10-18",
            "show_time": "19:30:00",
            "available_seats": 80,
            "price": 250.0,
            "is_active": true,
            "theaters": {
                "id": "t-1",
                "name": "PVR Phoenix",
                "location": "Mumbai",
                "address": null,
                "amenities": ["Dolby Atmos"]
            }
        }"#;

        let showtime: Showtime = serde_json::from_str(json).unwrap();
        assert_eq!(showtime.theater.name, "PVR Phoenix");
        assert_eq!(showtime.show_time, jiff::civil::time(19, 30, 0, 0));
        assert_eq!(showtime.show_date, jiff::civil::date(2025, 10, 18));
    }

    #[test]
    fn movie_tolerates_missing_optional_columns() {
        let movie: Movie = serde_json::from_str(r#"{"id": "m-1", "title": "Dune"}"#).unwrap();
        assert_eq!(movie.rating_value(), 0.0);
        assert!(movie.genre_list().is_empty());
        assert_eq!(movie.is_available, None);
    }

    #[test]
    fn payment_status_uses_lowercase_wire_names() {
        let json = serde_json::to_string(&PaymentStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let status: PaymentStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(status, PaymentStatus::Paid);
    }
}
