//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use charter_core::{PrivateSeed, PublicId};
use charter_stamp::ToolFact;

/// Generate a random private seed.
pub fn seed() -> impl Strategy<Value = PrivateSeed> {
    any::<[u8; 32]>().prop_map(PrivateSeed::from_bytes)
}

/// Generate a random public id.
pub fn public_id() -> impl Strategy<Value = PublicId> {
    any::<[u8; 32]>().prop_map(PublicId::from_bytes)
}

/// Generate an event tag.
pub fn event() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,23}".prop_map(String::from)
}

/// Generate a JSON string, including non-ASCII and control characters.
pub fn json_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 _-]{0,16}".prop_map(String::from),
        any::<String>(),
    ]
}

/// Generate a JSON value up to a small depth.
///
/// Floats are finite and never integral, so they survive a text round trip
/// as floats.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6f64)
            .prop_filter("non-integral", |f| f.fract() != 0.0)
            .prop_map(Value::from),
        json_string().prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(json_string(), inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate an event payload (always an object).
pub fn payload() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z_]{1,12}", json_value(), 0..6)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

/// Generate a tool fact.
pub fn tool_fact() -> impl Strategy<Value = ToolFact> {
    ("[a-z_]{1,16}", "[A-Za-z ]{1,16}", "[A-Za-z]{1,12}", any::<bool>())
        .prop_map(|(id, name, vendor, governable)| ToolFact::new(id, name, vendor, governable))
}

/// Generate up to `max` tool facts.
pub fn tool_facts(max: usize) -> impl Strategy<Value = Vec<ToolFact>> {
    prop::collection::vec(tool_fact(), 0..=max)
}

/// Parameters for building a chain.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub signer: PublicId,
    pub seed: PrivateSeed,
    pub events: Vec<(String, Value)>,
}

impl Arbitrary for ChainParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            public_id(),
            seed(),
            prop::collection::vec((event(), payload()), 1..12),
        )
            .prop_map(|(signer, seed, events)| ChainParams {
                signer,
                seed,
                events,
            })
            .boxed()
    }
}

/// Build the chain described by `params`.
pub fn chain_from_params(params: &ChainParams) -> Vec<charter_core::ChainEntry> {
    let mut chain: Vec<charter_core::ChainEntry> = Vec::with_capacity(params.events.len());
    for (event, data) in &params.events {
        let entry = charter_core::EntryBuilder::after(chain.last())
            .timestamp("2025-01-15T10:00:00Z")
            .event(event.clone())
            .data(data.clone())
            .sign(&params.signer, &params.seed);
        chain.push(entry);
    }
    chain
}
