//! Selection controller
//!
//! Holds at most one selected object together with its forecast timeline and
//! prediction state. Every selection change bumps a generation counter; a
//! prediction result is applied only if its ticket still names the current
//! generation, so the last request always wins.

use chrono::{DateTime, Utc};
use collision_avoidance::{RiskLevel, RiskPrediction};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::{TimelinePoint, TrackedObject};
use crate::timeline::RiskTimelineGenerator;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum PredictionState {
    #[default]
    Idle,
    Pending,
    Available(RiskPrediction),
    /// Shown as "no prediction available"
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Selection {
    pub object_id: String,
    pub risk_level: RiskLevel,
    pub timeline: Vec<TimelinePoint>,
    pub prediction: PredictionState,
}

/// Proof of which selection a prediction request was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    object_id: String,
}

impl SelectionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

pub struct SelectionController<R: Rng = StdRng> {
    generation: u64,
    current: Option<Selection>,
    timeline: RiskTimelineGenerator<R>,
}

impl Default for SelectionController<StdRng> {
    fn default() -> Self {
        Self::new(RiskTimelineGenerator::new())
    }
}

impl<R: Rng> SelectionController<R> {
    pub fn new(timeline: RiskTimelineGenerator<R>) -> Self {
        Self {
            generation: 0,
            current: None,
            timeline,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Select `object`, replacing any previous selection wholesale.
    ///
    /// The caller issues the prediction request and hands the result back
    /// through [`complete`](Self::complete) with the returned ticket.
    pub fn select(&mut self, object: &TrackedObject, now: DateTime<Utc>) -> SelectionTicket {
        self.generation += 1;

        self.current = Some(Selection {
            object_id: object.id.clone(),
            risk_level: object.risk_level,
            timeline: self.timeline.generate(object.risk_level, now),
            prediction: PredictionState::Pending,
        });

        debug!("Selected {} (generation {})", object.id, self.generation);
        SelectionTicket {
            generation: self.generation,
            object_id: object.id.clone(),
        }
    }

    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.generation == self.generation
            && self
                .current
                .as_ref()
                .is_some_and(|s| s.object_id == ticket.object_id)
    }

    /// Apply a prediction result. Returns `false` if the ticket is stale.
    pub fn complete(&mut self, ticket: &SelectionTicket, result: Result<RiskPrediction>) -> bool {
        if !self.is_current(ticket) {
            debug!(
                "Discarding prediction for {} (generation {} < {})",
                ticket.object_id, ticket.generation, self.generation
            );
            return false;
        }

        let Some(selection) = self.current.as_mut() else {
            return false;
        };

        selection.prediction = match result {
            Ok(prediction) => PredictionState::Available(prediction),
            Err(e) => {
                debug!("No prediction for {}: {}", ticket.object_id, e);
                PredictionState::Unavailable(e.to_string())
            }
        };
        true
    }

    /// Deselect; in-flight results become stale
    pub fn clear(&mut self) {
        self.generation += 1;
        self.current = None;
    }
}
