//! Bookable events and catalog filtering.

use crate::error::ValidationError;
use crate::types::{Capacity, EventId, Price, SeatCount};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Category
// ============================================================================

/// Event category, as shown on the discovery chips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Concerts, festivals, DJ sets
    Music,
    /// Meetups, hackathons, conferences
    Tech,
    /// Exhibitions, galleries, theatre
    Art,
    /// Food festivals, tastings
    Food,
    /// Business forums and summits
    Business,
    /// Matches, runs, tournaments
    Sports,
    /// Hikes, camping, nature trips
    Outdoors,
    /// Professional mixers
    Networking,
    /// Clubs and late-night events
    Nightlife,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 9] = [
        Self::Music,
        Self::Tech,
        Self::Art,
        Self::Food,
        Self::Business,
        Self::Sports,
        Self::Outdoors,
        Self::Networking,
        Self::Nightlife,
    ];

    /// Display name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Music => "Music",
            Self::Tech => "Tech",
            Self::Art => "Art",
            Self::Food => "Food",
            Self::Business => "Business",
            Self::Sports => "Sports",
            Self::Outdoors => "Outdoors",
            Self::Networking => "Networking",
            Self::Nightlife => "Nightlife",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for `Category` parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown category: {0}")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

// ============================================================================
// Event
// ============================================================================

/// A published, bookable event.
///
/// `booked_count` is only ever changed by a reservation commit and never
/// exceeds `capacity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Title
    pub title: String,
    /// Long description
    pub description: String,
    /// Category
    pub category: Category,
    /// Calendar date the event takes place
    pub date: NaiveDate,
    /// Free-form start time ("7:00 PM")
    pub time: String,
    /// Venue
    pub location: String,
    /// Neighbourhood ("Westlands", "Kilimani", ...)
    pub area: String,
    /// Price per seat
    pub price: Price,
    /// Banner image URL
    pub image_url: Option<String>,
    /// Total seats
    pub capacity: Capacity,
    /// Seats already reserved
    pub booked_count: u32,
    /// Organizer display name
    pub organizer: String,
    /// Organizer identity-provider uid
    pub organizer_uid: String,
    /// When the event was published
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Seats still available.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.capacity.value().saturating_sub(self.booked_count)
    }

    /// Whether no seats remain.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.remaining() == 0
    }

    /// Booked count after granting `seats`, or `None` if that would exceed capacity.
    #[must_use]
    pub fn booked_after(&self, seats: SeatCount) -> Option<u32> {
        self.booked_count
            .checked_add(seats.value())
            .filter(|booked| *booked <= self.capacity.value())
    }
}

/// Organizer input for publishing an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Title
    pub title: String,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Category
    pub category: Category,
    /// Calendar date
    pub date: NaiveDate,
    /// Free-form start time
    #[serde(default)]
    pub time: String,
    /// Venue
    #[serde(default)]
    pub location: String,
    /// Neighbourhood
    #[serde(default)]
    pub area: String,
    /// Price per seat
    #[serde(default)]
    pub price: Price,
    /// Banner image URL (already uploaded to object storage)
    #[serde(default)]
    pub image_url: Option<String>,
    /// Total seats
    pub capacity: Capacity,
    /// Organizer display name
    pub organizer: String,
    /// Organizer identity-provider uid
    pub organizer_uid: String,
}

impl NewEvent {
    /// Validate organizer input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Blank`] if the title or organizer uid is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Blank("title"));
        }
        if self.organizer_uid.trim().is_empty() {
            return Err(ValidationError::Blank("organizer_uid"));
        }
        Ok(())
    }

    /// Turn the input into a published event with nothing booked yet.
    #[must_use]
    pub fn publish(self, id: EventId, created_at: DateTime<Utc>) -> Event {
        Event {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            date: self.date,
            time: self.time,
            location: self.location,
            area: self.area,
            price: self.price,
            image_url: self.image_url,
            capacity: self.capacity,
            booked_count: 0,
            organizer: self.organizer,
            organizer_uid: self.organizer_uid,
            created_at,
        }
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// Discovery filter. Every field is optional; an empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Exact category
    pub category: Option<Category>,
    /// Case-insensitive substring of title, location or area
    pub search: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<Price>,
    /// Inclusive upper price bound
    pub max_price: Option<Price>,
    /// Inclusive earliest date
    pub from: Option<NaiveDate>,
    /// Inclusive latest date
    pub to: Option<NaiveDate>,
}

impl EventFilter {
    /// Whether `event` passes every populated criterion.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if self.category.is_some_and(|category| category != event.category) {
            return false;
        }
        if self.min_price.is_some_and(|min| event.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| event.price > max) {
            return false;
        }
        if self.from.is_some_and(|from| event.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| event.date > to) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [&event.title, &event.location, &event.area]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }

    /// Filter `events` and order them by date, then title.
    #[must_use]
    pub fn apply(&self, events: impl IntoIterator<Item = Event>) -> Vec<Event> {
        let mut matched: Vec<Event> = events.into_iter().filter(|e| self.matches(e)).collect();
        matched.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));
        matched
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event(title: &str, category: Category, date: &str, price: u64) -> Event {
        NewEvent {
            title: title.to_string(),
            description: String::new(),
            category,
            date: date.parse().unwrap(),
            time: "7:00 PM".to_string(),
            location: "KICC".to_string(),
            area: "CBD".to_string(),
            price: Price::new(price),
            image_url: None,
            capacity: Capacity::new(100).unwrap(),
            organizer: "Sol Generation".to_string(),
            organizer_uid: "org-1".to_string(),
        }
        .publish(EventId::new(), Utc::now())
    }

    #[test]
    fn remaining_and_booked_after() {
        let mut e = event("Sol Fest", Category::Music, "2026-12-12", 3500);
        e.booked_count = 98;

        assert_eq!(e.remaining(), 2);
        assert_eq!(e.booked_after(SeatCount::try_from(2).unwrap()), Some(100));
        assert_eq!(e.booked_after(SeatCount::try_from(3).unwrap()), None);

        e.booked_count = 100;
        assert!(e.is_sold_out());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("music".parse::<Category>().unwrap(), Category::Music);
        assert_eq!(" NightLife ".parse::<Category>().unwrap(), Category::Nightlife);
        assert!("opera".parse::<Category>().is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut input = NewEvent {
            title: "   ".to_string(),
            description: String::new(),
            category: Category::Tech,
            date: "2026-03-05".parse().unwrap(),
            time: String::new(),
            location: String::new(),
            area: String::new(),
            price: Price::FREE,
            image_url: None,
            capacity: Capacity::new(1).unwrap(),
            organizer: "Tech Week".to_string(),
            organizer_uid: "org-2".to_string(),
        };
        assert_eq!(input.validate(), Err(ValidationError::Blank("title")));

        input.title = "Nairobi Tech Week".to_string();
        assert_eq!(input.validate(), Ok(()));
    }

    #[test]
    fn search_matches_title_location_and_area() {
        let mut e = event("Jazz Night", Category::Music, "2026-05-01", 1000);
        e.location = "Alliance Française".to_string();
        e.area = "Westlands".to_string();

        for term in ["jazz", "ALLIANCE", "westl"] {
            let filter = EventFilter {
                search: Some(term.to_string()),
                ..EventFilter::default()
            };
            assert!(filter.matches(&e), "term {term} should match");
        }

        let filter = EventFilter {
            search: Some("karen".to_string()),
            ..EventFilter::default()
        };
        assert!(!filter.matches(&e));
    }

    #[test]
    fn price_and_date_bounds_are_inclusive() {
        let e = event("Food Fest", Category::Food, "2026-06-15", 2000);
        let filter = EventFilter {
            min_price: Some(Price::new(2000)),
            max_price: Some(Price::new(2000)),
            from: Some("2026-06-15".parse().unwrap()),
            to: Some("2026-06-15".parse().unwrap()),
            ..EventFilter::default()
        };
        assert!(filter.matches(&e));

        let filter = EventFilter {
            to: Some("2026-06-14".parse().unwrap()),
            ..EventFilter::default()
        };
        assert!(!filter.matches(&e));
    }

    #[test]
    fn apply_orders_by_date_then_title() {
        let events = vec![
            event("B", Category::Art, "2026-02-01", 0),
            event("A", Category::Art, "2026-02-01", 0),
            event("C", Category::Tech, "2026-01-01", 0),
        ];

        let filter = EventFilter {
            category: Some(Category::Art),
            ..EventFilter::default()
        };
        let titles: Vec<_> = filter
            .apply(events.clone())
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);

        let all: Vec<_> = EventFilter::default()
            .apply(events)
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(all, vec!["C", "A", "B"]);
    }
}
