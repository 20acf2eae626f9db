use std::time::Duration;

use jiff::tz::TimeZone;
use tracing::{debug, info, warn};

use crate::{
    backend::BackendClient,
    booking::{BookingDraft, BookingError, BookingStep},
    error::AppResult,
    models::{AuthSession, Booking, NewBooking, PaymentStatus},
};

/// Row to insert for a draft that reached the payment step.
/// Show date and time are wall-clock values at the theater, interpreted in `tz`.
pub fn new_booking(session: &AuthSession, draft: &BookingDraft, tz: &TimeZone) -> AppResult<NewBooking> {
    let wrong_step = || BookingError::WrongStep { action: "confirm payment", step: draft.step };
    if draft.step != BookingStep::Payment {
        return Err(wrong_step().into());
    }
    let show = draft.show.as_ref().ok_or_else(wrong_step)?;

    let show_time = show.show_date.to_datetime(show.show_time).to_zoned(tz.clone())?.timestamp();

    Ok(NewBooking {
        user_id: session.user_id.clone(),
        movie_id: draft.movie_id.clone(),
        seats: draft.seat_labels(),
        show_time,
        total_price: draft.total_price(),
        payment_status: PaymentStatus::Pending,
    })
}

/// Records the booking as pending, waits out the simulated payment, then marks it paid.
///
/// A failure after the insert leaves the pending row in place.
pub async fn checkout(
    backend: &BackendClient,
    session: &AuthSession,
    draft: &BookingDraft,
    payment_delay_ms: u64,
    tz: &TimeZone,
) -> AppResult<Booking> {
    let row = new_booking(session, draft, tz)?;
    let mut booking = backend.create_booking(session, &row).await?;
    debug!(booking_id = %booking.id, seats = ?booking.seats, "booking created");

    if payment_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(payment_delay_ms)).await;
    }

    if let Err(err) = backend.update_payment_status(session, &booking.id, PaymentStatus::Paid).await {
        warn!(booking_id = %booking.id, error = %err, "payment confirmation failed");
        return Err(err.into());
    }
    booking.payment_status = PaymentStatus::Paid;

    info!(booking_id = %booking.id, movie_id = %booking.movie_id, total = booking.total_price, "booking paid");
    Ok(booking)
}
