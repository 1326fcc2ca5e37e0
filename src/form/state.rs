use std::collections::HashMap;

use indexmap::IndexMap;

use crate::domain::{FieldErrors, FieldKind, FormValues, TouchedSet};

/// Values the controller was built with. Never mutated after construction.
#[derive(Debug)]
pub(crate) struct Baseline {
    pub values: FormValues,
    pub kinds: IndexMap<String, FieldKind>,
}

impl Baseline {
    pub fn capture(values: &FormValues) -> Self {
        let kinds = values
            .iter()
            .map(|(name, value)| (name.to_string(), value.kind()))
            .collect();
        Self {
            values: values.clone(),
            kinds,
        }
    }
}

/// Identifies one dispatched validation of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub field: String,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub(crate) struct FormState {
    pub values: FormValues,
    pub errors: FieldErrors,
    pub touched: TouchedSet,
    pub disposed: bool,
    latest: HashMap<String, u64>,
    in_flight: HashMap<String, usize>,
    next_seq: u64,
    submission: Option<u64>,
}

impl FormState {
    pub fn new(values: FormValues) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn issue_tickets(&mut self, fields: &[String]) -> Vec<Ticket> {
        fields
            .iter()
            .map(|field| {
                self.next_seq += 1;
                self.latest.insert(field.clone(), self.next_seq);
                *self.in_flight.entry(field.clone()).or_default() += 1;
                Ticket {
                    field: field.clone(),
                    seq: self.next_seq,
                }
            })
            .collect()
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.latest.get(&ticket.field) == Some(&ticket.seq)
    }

    /// Applies a validation response in one step. Fields whose ticket was
    /// overtaken by a newer dispatch keep their current entry.
    pub fn apply_validation(
        &mut self,
        tickets: &[Ticket],
        response: &FieldErrors,
    ) -> (Vec<String>, Vec<String>) {
        let mut applied = Vec::with_capacity(tickets.len());
        let mut superseded = Vec::new();
        for ticket in tickets {
            if !self.is_latest(ticket) {
                superseded.push(ticket.field.clone());
                continue;
            }
            match response.get(&ticket.field) {
                Some(message) => self.errors.insert(ticket.field.clone(), message),
                None => {
                    self.errors.remove(&ticket.field);
                }
            }
            applied.push(ticket.field.clone());
        }
        (applied, superseded)
    }

    /// Marks every dispatched validation as stale.
    pub fn supersede_all(&mut self) {
        self.supersede_before(u64::MAX);
    }

    /// Marks validations dispatched before `boundary` as stale. Tickets and
    /// submission ids share one counter, so passing a submission id keeps
    /// validations dispatched while it was in flight.
    pub fn supersede_before(&mut self, boundary: u64) {
        for seq in self.latest.values_mut() {
            if *seq < boundary {
                self.next_seq += 1;
                *seq = self.next_seq;
            }
        }
    }

    pub fn release(&mut self, tickets: &[Ticket]) {
        for ticket in tickets {
            if let Some(count) = self.in_flight.get_mut(&ticket.field) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.in_flight.remove(&ticket.field);
                }
            }
        }
    }

    pub fn is_validating(&self, field: &str) -> bool {
        self.in_flight.contains_key(field)
    }

    pub fn begin_submission(&mut self) -> Option<u64> {
        if self.submission.is_some() {
            return None;
        }
        self.next_seq += 1;
        self.submission = Some(self.next_seq);
        self.submission
    }

    pub fn end_submission(&mut self, id: u64) {
        if self.submission == Some(id) {
            self.submission = None;
        }
    }

    pub fn is_processing(&self) -> bool {
        self.submission.is_some()
    }
}
