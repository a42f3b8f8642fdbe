use crate::error::GenerationError;
use crate::events::{AnomalyEvent, Category, Field, Node, NodeId, TelemetryReading, Timestamp};
use crate::profiles::{
    AnomalySpec, ContextProfile, IndustrialProfile, RuralProfile, Sampling, UrbanProfile,
    ValueRange,
};
use chrono::{FixedOffset, Offset, Timelike, Utc};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

/// A freshly generated reading plus the anomalies injected into it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReading {
    pub reading: TelemetryReading,
    pub anomalies: Vec<AnomalyEvent>,
}

/// Context-aware synthetic telemetry generator
///
/// Produces one reading per call by evaluating the node's category profile
/// against the local hour of the requested timestamp. Randomness comes from
/// the injected generator `R`, so a seeded instance yields a reproducible
/// stream. Random-walk fields keep per-node state between calls.
pub struct TelemetryGenerator<R = StdRng> {
    rng: R,
    profiles: HashMap<Category, Arc<dyn ContextProfile>>,
    /// Offset used to derive the hour of day from UTC timestamps
    local_offset: FixedOffset,
    walk_state: HashMap<(NodeId, Field), f64>,
    last_timestamp: HashMap<NodeId, Timestamp>,
}

impl TelemetryGenerator<StdRng> {
    /// Create a generator with a reproducible seed
    ///
    /// # Example
    ///
    /// ```
    /// use aquanexus::generator::TelemetryGenerator;
    /// use aquanexus::events::{Category, Node};
    /// use chrono::Utc;
    ///
    /// let mut generator = TelemetryGenerator::seeded(42);
    /// let node = Node::new(1, "Sector 14", Category::Urban, 28.47, 77.03);
    /// let generated = generator.generate(&node, Utc::now()).unwrap();
    /// assert_eq!(generated.reading.node_id, 1);
    /// ```
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create a generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> TelemetryGenerator<R> {
    /// Create a generator drawing from `rng` with the built-in profiles
    pub fn with_rng(rng: R) -> Self {
        let mut profiles: HashMap<Category, Arc<dyn ContextProfile>> = HashMap::new();
        profiles.insert(Category::Urban, Arc::new(UrbanProfile));
        profiles.insert(Category::Industrial, Arc::new(IndustrialProfile));
        profiles.insert(Category::Rural, Arc::new(RuralProfile));

        Self {
            rng,
            profiles,
            local_offset: Utc.fix(),
            walk_state: HashMap::new(),
            last_timestamp: HashMap::new(),
        }
    }

    /// Use a fixed UTC offset when deriving the hour of day
    pub fn with_local_offset(mut self, offset: FixedOffset) -> Self {
        self.local_offset = offset;
        self
    }

    /// Register (or replace) the profile used for its category
    pub fn with_profile(mut self, profile: Arc<dyn ContextProfile>) -> Self {
        self.profiles.insert(profile.category(), profile);
        self
    }

    /// Remove the profile for a category; nodes of that category fail to generate
    pub fn without_profile(mut self, category: Category) -> Self {
        self.profiles.remove(&category);
        self
    }

    /// Generate one reading for `node` at `timestamp`
    ///
    /// Timestamps are kept monotonically non-decreasing per node: a timestamp
    /// earlier than the last one issued for the node is raised to it.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` if no profile is registered for the node's
    /// category or if the profile yields a missing or inconsistent range.
    /// Random-walk state is left untouched when generation fails.
    pub fn generate(
        &mut self,
        node: &Node,
        timestamp: Timestamp,
    ) -> Result<GeneratedReading, GenerationError> {
        let profile = self
            .profiles
            .get(&node.category)
            .cloned()
            .ok_or(GenerationError::MissingProfile(node.category))?;

        let timestamp = self.monotonic_timestamp(node.id, timestamp);
        let hour = timestamp.with_timezone(&self.local_offset).hour();

        let mut reading = TelemetryReading::new(node.id, node.category, timestamp);
        let mut anomalies = Vec::new();
        let mut walk_updates = Vec::new();

        for &field in profile.fields() {
            let range = profile
                .range_for(field, hour)
                .ok_or(GenerationError::MissingRange {
                    category: node.category,
                    field,
                })?;
            if !range.is_valid() {
                return Err(GenerationError::InvalidRange {
                    field,
                    min: range.min,
                    max: range.max,
                });
            }

            let anomaly = profile.anomaly_for(field);
            if let Some(spec) = &anomaly {
                validate_anomaly(field, spec)?;
            }

            let value = match anomaly.filter(|spec| self.rng.gen_bool(spec.probability)) {
                Some(spec) => {
                    let value = finalize(field, draw(&mut self.rng, spec.range));
                    warn!(
                        "Anomaly '{}' on node {} ({}): {} = {:.2}",
                        spec.label, node.id, node.name, field, value
                    );
                    anomalies.push(AnomalyEvent {
                        node_id: node.id,
                        field,
                        label: spec.label.to_string(),
                        value,
                        timestamp,
                    });
                    value
                }
                None => {
                    let value = match profile.sampling(field) {
                        Sampling::Uniform => draw(&mut self.rng, range),
                        Sampling::RandomWalk { start, step } => {
                            let next = match self.walk_state.get(&(node.id, field)) {
                                Some(previous) => {
                                    range.clamp(previous + draw_symmetric(&mut self.rng, step))
                                }
                                None => range.clamp(draw(&mut self.rng, start)),
                            };
                            let next = finalize(field, next);
                            walk_updates.push((field, next));
                            next
                        }
                        Sampling::Derived {
                            source,
                            factor,
                            noise,
                        } => match reading.get(source) {
                            Some(base) => {
                                range.clamp(base * factor + draw_symmetric(&mut self.rng, noise))
                            }
                            None => draw(&mut self.rng, range),
                        },
                    };
                    finalize(field, value)
                }
            };

            reading.set(field, value);
        }

        for (field, value) in walk_updates {
            self.walk_state.insert((node.id, field), value);
        }

        debug!(
            "Generated {} reading for node {} at {}",
            node.category, node.id, timestamp
        );

        Ok(GeneratedReading { reading, anomalies })
    }

    /// Current random-walk value for a node's field, if one has started
    pub fn walk_value(&self, node_id: NodeId, field: Field) -> Option<f64> {
        self.walk_state.get(&(node_id, field)).copied()
    }

    fn monotonic_timestamp(&mut self, node_id: NodeId, requested: Timestamp) -> Timestamp {
        let timestamp = match self.last_timestamp.get(&node_id) {
            Some(last) if *last > requested => {
                debug!(
                    "Raising timestamp for node {} from {} to {}",
                    node_id, requested, last
                );
                *last
            }
            _ => requested,
        };
        self.last_timestamp.insert(node_id, timestamp);
        timestamp
    }
}

fn validate_anomaly(field: Field, spec: &AnomalySpec) -> Result<(), GenerationError> {
    if spec.range.is_valid() && (0.0..=1.0).contains(&spec.probability) {
        Ok(())
    } else {
        Err(GenerationError::InvalidAnomaly(field))
    }
}

/// Uniform draw from a closed range; degenerate ranges return their bound
fn draw<R: Rng>(rng: &mut R, range: ValueRange) -> f64 {
    if range.min == range.max {
        range.min
    } else {
        rng.gen_range(range.min..=range.max)
    }
}

fn draw_symmetric<R: Rng>(rng: &mut R, half_width: f64) -> f64 {
    if half_width <= 0.0 {
        0.0
    } else {
        rng.gen_range(-half_width..=half_width)
    }
}

/// Round to two decimals and clamp to the field's physical bounds
fn finalize(field: Field, value: f64) -> f64 {
    let (lo, hi) = field.hard_bounds();
    ((value * 100.0).round() / 100.0).clamp(lo, hi)
}
