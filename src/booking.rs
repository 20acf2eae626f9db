use std::{collections::BTreeSet, fmt, str::FromStr};

use jiff::civil::{Date, Time};
use serde::{Deserialize, Serialize};

use crate::models::Showtime;

pub const SEAT_ROWS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
pub const SEATS_PER_ROW: u8 = 12;
pub const MAX_TICKETS: u8 = 10;

const MIN_BOOKED: u32 = 8;
const BOOKED_SPREAD: u32 = 8;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStep {
    #[default]
    Theater,
    Tickets,
    Seats,
    Payment,
    Success,
}

impl BookingStep {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStep::Theater => "theater",
            BookingStep::Tickets => "tickets",
            BookingStep::Seats => "seats",
            BookingStep::Payment => "payment",
            BookingStep::Success => "success",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BookingStep::Theater => "Theater & showtime",
            BookingStep::Tickets => "Tickets",
            BookingStep::Seats => "Seats",
            BookingStep::Payment => "Payment",
            BookingStep::Success => "Confirmed",
        }
    }
}

impl fmt::Display for BookingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BookingError {
    #[error("cannot {action} during the {step} step")]
    WrongStep { action: &'static str, step: BookingStep },
    #[error("showtime does not belong to this movie")]
    ForeignShowtime,
    #[error("choose between 1 and {max} tickets", max = MAX_TICKETS)]
    InvalidTicketCount(u8),
    #[error("{0:?} is not a seat in this auditorium")]
    InvalidSeat(String),
    #[error("seat {0} is already booked")]
    SeatBooked(SeatId),
    #[error("you can only select {0} seat(s)")]
    TooManySeats(u8),
    #[error("select {required} seat(s), {selected} selected")]
    SeatsIncomplete { selected: usize, required: u8 },
    #[error("you need to be signed in to book tickets")]
    NotSignedIn,
}

/// A seat in the auditorium grid, written as row letter + seat number ("C4").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    row: char,
    number: u8,
}

impl SeatId {
    pub fn new(row: char, number: u8) -> Option<Self> {
        let row = row.to_ascii_uppercase();
        (SEAT_ROWS.contains(&row) && (1..=SEATS_PER_ROW).contains(&number))
            .then_some(Self { row, number })
    }

    pub fn row(self) -> char {
        self.row
    }

    pub fn number(self) -> u8 {
        self.number
    }

    fn from_index(index: u32) -> Self {
        let per_row = u32::from(SEATS_PER_ROW);
        let row = SEAT_ROWS[(index / per_row) as usize % SEAT_ROWS.len()];
        Self { row, number: (index % per_row) as u8 + 1 }
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

impl FromStr for SeatId {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let invalid = || BookingError::InvalidSeat(s.to_string());
        let row = chars.next().ok_or_else(invalid)?;
        let number: u8 = chars.as_str().parse().map_err(|_| invalid())?;
        SeatId::new(row, number).ok_or_else(invalid)
    }
}

impl TryFrom<String> for SeatId {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.to_string()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SeatState {
    Available,
    Selected,
    Booked,
}

/// Stable 32-bit string hash (`h * 31 + byte`), independent of platform and toolchain.
fn hash_id(id: &str) -> u32 {
    id.bytes().fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

/// Seats shown as taken for a showtime.
///
/// This is a stand-in for real inventory: the set is derived from the showtime id alone,
/// so every visitor sees the same seats taken and nothing is reserved anywhere.
pub fn booked_seats(showtime_id: &str) -> BTreeSet<SeatId> {
    let seed = hash_id(showtime_id);
    let total = SEAT_ROWS.len() as u32 * u32::from(SEATS_PER_ROW);
    let count = (MIN_BOOKED + seed % BOOKED_SPREAD) as usize;

    let mut state = seed;
    let mut out = BTreeSet::new();
    while out.len() < count {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        out.insert(SeatId::from_index((state >> 8) % total));
    }
    out
}

/// The showtime chosen in the first step, copied so later steps don't need the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedShow {
    pub showtime_id: String,
    pub theater_id: String,
    pub theater_name: String,
    pub theater_location: String,
    pub show_date: Date,
    pub show_time: Time,
    pub price: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub booking_id: String,
    pub payment_label: String,
}

/// Server-side state of one booking flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub movie_id: String,
    pub step: BookingStep,
    pub show: Option<SelectedShow>,
    pub ticket_count: u8,
    pub selected_seats: Vec<SeatId>,
    pub confirmation: Option<Confirmation>,
}

impl BookingDraft {
    pub fn new(movie_id: impl Into<String>) -> Self {
        Self {
            movie_id: movie_id.into(),
            step: BookingStep::Theater,
            show: None,
            ticket_count: 0,
            selected_seats: Vec::new(),
            confirmation: None,
        }
    }

    fn expect_step(&self, step: BookingStep, action: &'static str) -> Result<(), BookingError> {
        if self.step == step { Ok(()) } else { Err(BookingError::WrongStep { action, step: self.step }) }
    }

    pub fn select_showtime(&mut self, showtime: &Showtime) -> Result<(), BookingError> {
        self.expect_step(BookingStep::Theater, "choose a showtime")?;
        if showtime.movie_id != self.movie_id {
            return Err(BookingError::ForeignShowtime);
        }

        self.show = Some(SelectedShow {
            showtime_id: showtime.id.clone(),
            theater_id: showtime.theater.id.clone(),
            theater_name: showtime.theater.name.clone(),
            theater_location: showtime.theater.location.clone(),
            show_date: showtime.show_date,
            show_time: showtime.show_time,
            price: showtime.price,
        });
        self.ticket_count = 0;
        self.selected_seats.clear();
        self.step = BookingStep::Tickets;
        Ok(())
    }

    pub fn set_ticket_count(&mut self, count: u8) -> Result<(), BookingError> {
        self.expect_step(BookingStep::Tickets, "choose tickets")?;
        if !(1..=MAX_TICKETS).contains(&count) {
            return Err(BookingError::InvalidTicketCount(count));
        }
        self.ticket_count = count;
        self.selected_seats.clear();
        self.step = BookingStep::Seats;
        Ok(())
    }

    pub fn booked(&self) -> BTreeSet<SeatId> {
        self.show.as_ref().map(|s| booked_seats(&s.showtime_id)).unwrap_or_default()
    }

    pub fn toggle_seat(&mut self, seat: &str) -> Result<(), BookingError> {
        self.expect_step(BookingStep::Seats, "pick seats")?;
        let seat: SeatId = seat.parse()?;

        if let Some(pos) = self.selected_seats.iter().position(|s| *s == seat) {
            self.selected_seats.remove(pos);
            return Ok(());
        }
        if self.booked().contains(&seat) {
            return Err(BookingError::SeatBooked(seat));
        }
        if self.selected_seats.len() >= usize::from(self.ticket_count) {
            return Err(BookingError::TooManySeats(self.ticket_count));
        }
        self.selected_seats.push(seat);
        Ok(())
    }

    pub fn seat_state(&self, seat: SeatId, booked: &BTreeSet<SeatId>) -> SeatState {
        if self.selected_seats.contains(&seat) {
            SeatState::Selected
        } else if booked.contains(&seat) {
            SeatState::Booked
        } else {
            SeatState::Available
        }
    }

    pub fn can_proceed(&self) -> bool {
        self.ticket_count > 0 && self.selected_seats.len() == usize::from(self.ticket_count)
    }

    pub fn proceed_to_payment(&mut self, signed_in: bool) -> Result<(), BookingError> {
        self.expect_step(BookingStep::Seats, "continue to payment")?;
        if !self.can_proceed() {
            return Err(BookingError::SeatsIncomplete {
                selected: self.selected_seats.len(),
                required: self.ticket_count,
            });
        }
        if !signed_in {
            return Err(BookingError::NotSignedIn);
        }
        self.step = BookingStep::Payment;
        Ok(())
    }

    pub fn back(&mut self) {
        self.step = match self.step {
            BookingStep::Tickets => BookingStep::Theater,
            BookingStep::Seats => BookingStep::Tickets,
            BookingStep::Payment => BookingStep::Seats,
            other => other,
        };
    }

    pub fn complete(&mut self, confirmation: Confirmation) -> Result<(), BookingError> {
        self.expect_step(BookingStep::Payment, "confirm payment")?;
        self.confirmation = Some(confirmation);
        self.step = BookingStep::Success;
        Ok(())
    }

    pub fn seat_labels(&self) -> Vec<String> {
        self.selected_seats.iter().map(ToString::to_string).collect()
    }

    pub fn total_price(&self) -> f64 {
        let price = self.show.as_ref().map(|s| s.price).unwrap_or(0.0);
        let tickets = if self.selected_seats.is_empty() {
            usize::from(self.ticket_count)
        } else {
            self.selected_seats.len()
        };
        price * tickets as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theater;

    fn showtime(id: &str, movie_id: &str) -> Showtime {
        Showtime {
            id: id.to_string(),
            movie_id: movie_id.to_string(),
            theater_id: "t-1".to_string(),
            show_date: jiff::civil::date(2025, 10, 18),
            show_time: jiff::civil::time(19, 0, 0, 0),
            available_seats: 96,
            price: 250.0,
            is_active: Some(true),
            theater: Theater {
                id: "t-1".to_string(),
                name: "PVR Phoenix".to_string(),
                location: "Mumbai".to_string(),
                address: None,
                amenities: None,
            },
        }
    }

    fn free_seats(draft: &BookingDraft, n: usize) -> Vec<SeatId> {
        let booked = draft.booked();
        SEAT_ROWS
            .iter()
            .flat_map(|&r| (1..=SEATS_PER_ROW).filter_map(move |num| SeatId::new(r, num)))
            .filter(|s| !booked.contains(s))
            .take(n)
            .collect()
    }

    fn draft_at_seats(tickets: u8) -> BookingDraft {
        let mut draft = BookingDraft::new("m-1");
        draft.select_showtime(&showtime("st-42", "m-1")).unwrap();
        draft.set_ticket_count(tickets).unwrap();
        draft
    }

    #[test]
    fn seat_ids_parse_and_display() {
        let seat: SeatId = "c4".parse().unwrap();
        assert_eq!(seat.to_string(), "C4");
        assert_eq!(seat.row(), 'C');
        assert_eq!(seat.number(), 4);

        assert!("Z1".parse::<SeatId>().is_err());
        assert!("A0".parse::<SeatId>().is_err());
        assert!("A13".parse::<SeatId>().is_err());
        assert!("".parse::<SeatId>().is_err());
        assert!("AA".parse::<SeatId>().is_err());
    }

    #[test]
    fn booked_seats_are_deterministic() {
        let a = booked_seats("showtime-123");
        let b = booked_seats("showtime-123");
        assert_eq!(a, b);
        assert!((8..16).contains(&a.len()));
        assert_ne!(booked_seats("showtime-123"), booked_seats("showtime-124"));
    }

    #[test]
    fn hash_matches_java_style_string_hash() {
        assert_eq!(hash_id(""), 0);
        assert_eq!(hash_id("a"), 97);
        assert_eq!(hash_id("ab"), 97 * 31 + 98);
    }

    #[test]
    fn steps_advance_in_order() {
        let mut draft = BookingDraft::new("m-1");
        assert_eq!(
            draft.set_ticket_count(2),
            Err(BookingError::WrongStep { action: "choose tickets", step: BookingStep::Theater })
        );

        draft.select_showtime(&showtime("st-1", "m-1")).unwrap();
        assert_eq!(draft.step, BookingStep::Tickets);
        assert_eq!(draft.set_ticket_count(0), Err(BookingError::InvalidTicketCount(0)));
        assert_eq!(draft.set_ticket_count(11), Err(BookingError::InvalidTicketCount(11)));

        draft.set_ticket_count(2).unwrap();
        assert_eq!(draft.step, BookingStep::Seats);
        assert_eq!(draft.total_price(), 500.0);
    }

    #[test]
    fn showtime_from_another_movie_is_rejected() {
        let mut draft = BookingDraft::new("m-1");
        assert_eq!(
            draft.select_showtime(&showtime("st-1", "m-2")),
            Err(BookingError::ForeignShowtime)
        );
        assert_eq!(draft.step, BookingStep::Theater);
    }

    #[test]
    fn proceed_requires_exact_seat_count() {
        let mut draft = draft_at_seats(2);
        let seats = free_seats(&draft, 3);

        draft.toggle_seat(&seats[0].to_string()).unwrap();
        assert!(!draft.can_proceed());
        assert_eq!(
            draft.proceed_to_payment(true),
            Err(BookingError::SeatsIncomplete { selected: 1, required: 2 })
        );

        draft.toggle_seat(&seats[1].to_string()).unwrap();
        assert!(draft.can_proceed());
        assert_eq!(draft.toggle_seat(&seats[2].to_string()), Err(BookingError::TooManySeats(2)));

        assert_eq!(draft.proceed_to_payment(false), Err(BookingError::NotSignedIn));
        draft.proceed_to_payment(true).unwrap();
        assert_eq!(draft.step, BookingStep::Payment);
    }

    #[test]
    fn toggling_a_selected_seat_deselects_it() {
        let mut draft = draft_at_seats(1);
        let seat = free_seats(&draft, 1)[0].to_string();
        draft.toggle_seat(&seat).unwrap();
        draft.toggle_seat(&seat).unwrap();
        assert!(draft.selected_seats.is_empty());
    }

    #[test]
    fn booked_seats_cannot_be_selected() {
        let mut draft = draft_at_seats(4);
        let taken = *draft.booked().iter().next().unwrap();
        assert_eq!(draft.toggle_seat(&taken.to_string()), Err(BookingError::SeatBooked(taken)));
        assert_eq!(draft.seat_state(taken, &draft.booked()), SeatState::Booked);
    }

    #[test]
    fn back_walks_one_step_and_changing_tickets_clears_seats() {
        let mut draft = draft_at_seats(1);
        let seat = free_seats(&draft, 1)[0].to_string();
        draft.toggle_seat(&seat).unwrap();

        draft.back();
        assert_eq!(draft.step, BookingStep::Tickets);
        draft.set_ticket_count(3).unwrap();
        assert!(draft.selected_seats.is_empty());

        draft.back();
        draft.back();
        assert_eq!(draft.step, BookingStep::Theater);
        draft.back();
        assert_eq!(draft.step, BookingStep::Theater);
    }

    #[test]
    fn draft_survives_json_round_trip() {
        let mut draft = draft_at_seats(1);
        let seat = free_seats(&draft, 1)[0];
        draft.toggle_seat(&seat.to_string()).unwrap();

        let json = serde_json::to_string(&draft).unwrap();
        assert!(json.contains(&format!("\"{seat}\"")));
        let back: BookingDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(back, draft);
    }
}
