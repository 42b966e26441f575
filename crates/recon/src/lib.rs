//! `inactives-recon`: inactive-ingredient matching and reconciliation engine.
//!
//! Pure engine crate: receives reference tables and answers as text, returns
//! validated identifiers and comparisons against ground truth.
//! No CLI or file IO.

pub mod alias;
pub mod answer;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod ground_truth;
pub mod matcher;
pub mod model;
pub mod rules;
pub mod table;
pub mod tokenize;

pub use alias::{AliasTable, Ingredient};
pub use config::RunConfig;
pub use engine::{
    extract_document, run_batch, run_batch_with, AnswerSource, BatchEvent, Reference, ReferenceData,
};
pub use error::ReconError;
pub use matcher::filter_valid_ingredients;
pub use model::{BatchResult, Comparison, DocumentAnswers, IngredientId};
pub use tokenize::decompose;
