//! Date-availability polls used to pick an event date.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PollError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("A poll needs at least one candidate date")]
    NoCandidates,

    #[error("Candidate date listed twice: {0}")]
    DuplicateCandidate(NaiveDate),

    #[error("Date is not a candidate of this poll: {0}")]
    UnknownDate(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Yes,
    Maybe,
    No,
}

/// Answer counts for one candidate date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTally {
    pub date: NaiveDate,
    pub yes: usize,
    pub maybe: usize,
    pub no: usize,
}

impl DateTally {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            yes: 0,
            maybe: 0,
            no: 0,
        }
    }

    fn count(&mut self, availability: Availability) {
        match availability {
            Availability::Yes => self.yes += 1,
            Availability::Maybe => self.maybe += 1,
            Availability::No => self.no += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AvailabilityPoll {
    id: Uuid,
    title: String,
    owner_id: String,
    candidates: Vec<NaiveDate>,
    /// employee id -> date -> answer
    answers: HashMap<String, BTreeMap<NaiveDate, Availability>>,
}

impl AvailabilityPoll {
    pub fn new(
        title: impl Into<String>,
        owner_id: impl Into<String>,
        candidates: impl IntoIterator<Item = NaiveDate>,
    ) -> Result<Self> {
        let mut candidates: Vec<NaiveDate> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(PollError::NoCandidates);
        }
        candidates.sort_unstable();
        if let Some(pair) = candidates.windows(2).find(|w| w[0] == w[1]) {
            return Err(PollError::DuplicateCandidate(pair[0]));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            title: title.into(),
            owner_id: owner_id.into(),
            candidates,
            answers: HashMap::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Candidate dates in ascending order.
    pub fn candidates(&self) -> &[NaiveDate] {
        &self.candidates
    }

    /// Record or replace one employee's answer for one date.
    pub fn answer(
        &mut self,
        employee_id: impl Into<String>,
        date: NaiveDate,
        availability: Availability,
    ) -> Result<()> {
        if self.candidates.binary_search(&date).is_err() {
            return Err(PollError::UnknownDate(date));
        }
        self.answers
            .entry(employee_id.into())
            .or_default()
            .insert(date, availability);
        Ok(())
    }

    pub fn respondents(&self) -> usize {
        self.answers.len()
    }

    /// Per-date counts, in candidate order.
    pub fn tally(&self) -> Vec<DateTally> {
        let mut tallies: BTreeMap<NaiveDate, DateTally> = self
            .candidates
            .iter()
            .map(|d| (*d, DateTally::new(*d)))
            .collect();
        for (date, availability) in self.answers.values().flatten() {
            if let Some(tally) = tallies.get_mut(date) {
                tally.count(*availability);
            }
        }
        tallies.into_values().collect()
    }

    /// Date with the most `yes`, then fewest `no`, then most `maybe`, then
    /// the earliest. `None` until somebody answers.
    pub fn best_date(&self) -> Option<NaiveDate> {
        if self.answers.values().all(BTreeMap::is_empty) {
            return None;
        }
        self.tally()
            .into_iter()
            .max_by(|a, b| {
                a.yes
                    .cmp(&b.yes)
                    .then(b.no.cmp(&a.no))
                    .then(a.maybe.cmp(&b.maybe))
                    .then(b.date.cmp(&a.date))
            })
            .map(|t| t.date)
    }
}
